//! Error types for the GAS engine
//!
//! Engine faults propagate to the caller as a failed run. The only retry the
//! engine performs on its own is the bounded signal delivery retry.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::graph::VertexId;

/// Stage of a computation in which a user callback failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    GatherEdges,
    Gather,
    Apply,
    ScatterEdges,
    Scatter,
    Select,
    MapReduce,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::GatherEdges => "gather_edges",
            Phase::Gather => "gather",
            Phase::Apply => "apply",
            Phase::ScatterEdges => "scatter_edges",
            Phase::Scatter => "scatter",
            Phase::Select => "select",
            Phase::MapReduce => "map_reduce",
        };
        f.write_str(name)
    }
}

/// Error raised by a vertex program, predicate or reducer
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProgramError {
    message: String,
}

impl ProgramError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type returned by user callbacks
pub type ProgramResult<T> = Result<T, ProgramError>;

/// Failure reported by a [`SignalTransport`](crate::channel::SignalTransport)
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("partition {0} is disconnected")]
    Disconnected(usize),

    #[error("unknown partition {0}")]
    UnknownPartition(usize),
}

/// Errors that can occur while building a graph or running the engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Scheduling or querying a graph before `finalize()`
    #[error("Graph has not been finalized")]
    GraphNotFinalized,

    /// Mutating topology after `finalize()`, or finalizing twice
    #[error("Graph topology is already finalized")]
    GraphAlreadyFinalized,

    /// Vertex id not present in the graph
    #[error("Unknown vertex: {0}")]
    UnknownVertex(VertexId),

    /// Signal could not be delivered within the retry budget
    #[error("Signal delivery to partition {partition} failed after {attempts} attempts: {reason}")]
    DeliveryFailed {
        partition: usize,
        attempts: usize,
        reason: String,
    },

    /// A user callback returned an error
    #[error("Vertex program failed in {phase} for vertex {vertex_id}: {source}")]
    Callback {
        vertex_id: VertexId,
        phase: Phase,
        #[source]
        source: ProgramError,
    },

    /// Synchronous run hit the configured superstep limit
    #[error("Max supersteps exceeded: {0}")]
    MaxSuperstepsExceeded(usize),

    /// A partition worker task panicked or was aborted
    #[error("Partition worker failed: {0}")]
    WorkerFailed(String),

    /// Vertex set built against a graph of a different size
    #[error("Vertex set covers {found} vertices, graph has {expected}")]
    ForeignVertexSet { expected: usize, found: usize },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path} at line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl EngineError {
    /// Wrap a callback failure with the vertex it happened on
    pub fn callback(vertex_id: VertexId, phase: Phase, source: ProgramError) -> Self {
        Self::Callback {
            vertex_id,
            phase,
            source,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    pub fn delivery_failed(partition: usize, attempts: usize, reason: impl Into<String>) -> Self {
        Self::DeliveryFailed {
            partition,
            attempts,
            reason: reason.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Vertex implicated by the error, if any
    pub fn vertex_id(&self) -> Option<VertexId> {
        match self {
            EngineError::Callback { vertex_id, .. } => Some(*vertex_id),
            EngineError::UnknownVertex(id) => Some(*id),
            _ => None,
        }
    }

    /// Check if the error came from user code rather than the engine
    pub fn is_callback(&self) -> bool {
        matches!(self, EngineError::Callback { .. })
    }
}

#[cfg(test)]
mod tests {
    // Ensure errors are Send + Sync (compile-time check)
    static_assertions::assert_impl_all!(super::EngineError: Send, Sync);
    static_assertions::assert_impl_all!(super::ProgramError: Send, Sync, Clone);
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::MaxSuperstepsExceeded(100);
        assert_eq!(format!("{}", err), "Max supersteps exceeded: 100");
        assert_eq!(
            EngineError::GraphNotFinalized.to_string(),
            "Graph has not been finalized"
        );
    }

    #[test]
    fn test_callback_error_carries_vertex() {
        let err = EngineError::callback(42, Phase::Apply, ProgramError::new("bad payload"));
        assert!(err.is_callback());
        assert_eq!(err.vertex_id(), Some(42));
        assert_eq!(
            err.to_string(),
            "Vertex program failed in apply for vertex 42: bad payload"
        );

        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("bad payload"));
    }

    #[test]
    fn test_delivery_failed() {
        let err = EngineError::delivery_failed(3, 4, TransportError::Disconnected(3).to_string());
        match err {
            EngineError::DeliveryFailed {
                partition,
                attempts,
                reason,
            } => {
                assert_eq!(partition, 3);
                assert_eq!(attempts, 4);
                assert_eq!(reason, "partition 3 is disconnected");
            }
            _ => panic!("Wrong error type"),
        }
    }

    #[test]
    fn test_parse_error_display() {
        let err = EngineError::parse("graph.tsv", 7, "expected two vertex ids");
        assert_eq!(
            err.to_string(),
            "Parse error in graph.tsv at line 7: expected two vertex ids"
        );
        assert_eq!(err.vertex_id(), None);
        assert!(!err.is_callback());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::GatherEdges.to_string(), "gather_edges");
        assert_eq!(Phase::MapReduce.to_string(), "map_reduce");
    }
}
