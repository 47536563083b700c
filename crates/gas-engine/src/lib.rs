//! gas-engine: vertex-centric Gather/Apply/Scatter graph computation
//!
//! A [`Graph`] is built, finalized and then handed to an [`Engine`] together
//! with a [`VertexProgram`]. The caller signals an initial set of vertices
//! and calls [`Engine::start`], which runs Gather/Apply/Scatter for every
//! activated vertex until no activations remain.
//!
//! # Execution modes
//!
//! - **Synchronous**: supersteps separated by barriers; signals raised in
//!   one superstep are processed in the next.
//! - **Asynchronous**: one worker per partition drains its queue
//!   continuously, highest priority first.
//!
//! # Example
//!
//! ```rust,ignore
//! use gas_engine::prelude::*;
//!
//! let mut graph: Graph<f64> = Graph::with_partitions(4);
//! graph.load("web-graph.txt", GraphFormat::Snap)?;
//! graph.finalize()?;
//! graph.transform_vertices(|v| *v.data_mut() = 1.0)?;
//!
//! let mut engine = Engine::new(&mut graph, PageRank::default(), EngineConfig::default())?;
//! engine.signal_all();
//! let summary = engine.start().await?;
//! ```

pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod program;
pub mod programs;
pub mod queue;
pub(crate) mod runtime;
pub mod subset;

pub use channel::{local_layer, Inbox, LocalTransport, Signal, SignalTransport, TransportLayer};
pub use config::{EngineConfig, ExecutionMode, RetryPolicy};
pub use engine::{Engine, RunSummary};
pub use error::{EngineError, Phase, ProgramError, ProgramResult, TransportError};
pub use graph::{
    EdgeRef, Graph, GraphFormat, GraphWriter, SaveOptions, VertexId, VertexMut, VertexRef,
};
pub use program::{Context, EdgeDir, GatherValue, VertexProgram};
pub use queue::ActivationQueue;
pub use subset::VertexSet;

/// Commonly used types
pub mod prelude {
    pub use crate::config::{EngineConfig, ExecutionMode, RetryPolicy};
    pub use crate::engine::{Engine, RunSummary};
    pub use crate::error::{EngineError, ProgramError, ProgramResult};
    pub use crate::graph::{
        EdgeRef, Graph, GraphFormat, GraphWriter, SaveOptions, VertexId, VertexMut, VertexRef,
    };
    pub use crate::program::{Context, EdgeDir, GatherValue, VertexProgram};
    pub use crate::programs::{
        simulate_random_walks, FixedIterPageRank, PageRank, PageRankParams, PageRankVertex,
        PageRankWriter, RandomWalk, SimulationReport, VisitShareWriter,
    };
    pub use crate::subset::VertexSet;
}
