//! Engine - schedules a vertex program over a finalized graph
//!
//! The engine owns one [`PartitionState`] per graph partition (activation
//! queue, signal inbox and RNG) and borrows the graph mutably for its whole
//! lifetime, so topology cannot change and results can only be read through
//! the engine while it exists.
//!
//! Signals travel through a [`SignalTransport`] built per partition set.
//! [`Engine::new`] uses the in-process channels directly;
//! [`Engine::with_transport`] lets the caller wrap them.
//!
//! A run (`start`) processes activations until every queue is empty. The
//! caller may then inspect results, re-seed activations and start again.

mod asynchronous;
mod sync;

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::channel::{
    local_layer, Inbox, LocalTransport, SignalRouter, SignalTransport, TransportLayer,
};
use crate::config::{EngineConfig, ExecutionMode};
use crate::error::EngineError;
use crate::graph::{Graph, Shared, VertexId, VertexRef};
use crate::program::VertexProgram;
use crate::queue::ActivationQueue;
use crate::subset::VertexSet;

/// Outcome of one `start()` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub mode: ExecutionMode,
    /// Supersteps executed (0 in asynchronous mode)
    pub supersteps: usize,
    /// Vertex program executions
    pub updates: usize,
    /// Signals raised by vertex programs
    pub signals: usize,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
}

/// Per-partition scheduling state, moved into the partition's task for a run
pub(crate) struct PartitionState {
    pub queue: ActivationQueue,
    pub inbox: Inbox,
    pub rng: ChaCha8Rng,
}

/// GAS engine bound to one graph and one program prototype
pub struct Engine<'g, P: VertexProgram> {
    graph: &'g mut Graph<P::VertexData, P::EdgeData>,
    shared: Shared<P::VertexData, P::EdgeData>,
    program: P,
    config: EngineConfig,
    partitions: Vec<PartitionState>,
    router: SignalRouter,
    transport: TransportLayer,
    elapsed: Duration,
    runs: usize,
    engine_id: String,
}

impl<'g, P: VertexProgram> Engine<'g, P> {
    /// Create an engine; the graph must be finalized
    pub fn new(
        graph: &'g mut Graph<P::VertexData, P::EdgeData>,
        program: P,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        Self::with_transport(graph, program, config, local_layer())
    }

    /// Create an engine whose signals go through `transport`
    pub fn with_transport(
        graph: &'g mut Graph<P::VertexData, P::EdgeData>,
        program: P,
        config: EngineConfig,
        transport: TransportLayer,
    ) -> Result<Self, EngineError> {
        let shared = graph.shared()?.clone();
        let (partitions, router) =
            build_partitions(shared.topology.num_partitions(), &config, &transport);
        let engine_id = uuid::Uuid::new_v4().to_string();

        info!(
            engine_id = %engine_id,
            mode = %config.execution_mode,
            vertices = shared.topology.num_vertices(),
            partitions = partitions.len(),
            "Engine created"
        );

        Ok(Self {
            graph,
            shared,
            program,
            config,
            partitions,
            router,
            transport,
            elapsed: Duration::ZERO,
            runs: 0,
            engine_id,
        })
    }

    pub fn graph(&self) -> &Graph<P::VertexData, P::EdgeData> {
        &*self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn program(&self) -> &P {
        &self.program
    }

    /// Unique identifier of this engine instance, attached to its log events
    pub fn engine_id(&self) -> &str {
        &self.engine_id
    }

    /// Schedule one vertex
    pub fn signal(&mut self, id: VertexId) -> Result<(), EngineError> {
        self.signal_with_priority(id, 0.0)
    }

    /// Schedule one vertex with a priority (asynchronous mode runs higher first)
    pub fn signal_with_priority(&mut self, id: VertexId, priority: f64) -> Result<(), EngineError> {
        let index = self
            .shared
            .topology
            .index_of(id)
            .ok_or(EngineError::UnknownVertex(id))?;
        self.activate(index, priority);
        Ok(())
    }

    /// Schedule every vertex
    pub fn signal_all(&mut self) {
        let topology = &self.shared.topology;
        for (partition, state) in self.partitions.iter_mut().enumerate() {
            state
                .queue
                .activate_all(topology.partition(partition).iter().copied(), 0.0);
        }
    }

    /// Schedule every member of `set`
    pub fn signal_vset(&mut self, set: &VertexSet) -> Result<(), EngineError> {
        set.check_universe(self.shared.topology.num_vertices())?;
        for index in set.indices() {
            self.activate(index, 0.0);
        }
        Ok(())
    }

    /// Schedule every vertex matching `predicate`; returns the number selected
    pub fn activate_subset<F>(&mut self, predicate: F) -> Result<usize, EngineError>
    where
        F: FnMut(&VertexRef<'_, P::VertexData, P::EdgeData>) -> bool,
    {
        let set = self.graph.select(predicate)?;
        self.signal_vset(&set)?;
        Ok(set.len())
    }

    /// Select vertices of the bound graph
    pub fn select<F>(&self, predicate: F) -> Result<VertexSet, EngineError>
    where
        F: FnMut(&VertexRef<'_, P::VertexData, P::EdgeData>) -> bool,
    {
        self.graph.select(predicate)
    }

    /// Map-reduce over the vertices of the bound graph
    pub fn map_reduce_vertices<R, M, C>(&self, map: M, combine: C) -> Result<R, EngineError>
    where
        R: Default,
        M: FnMut(&VertexRef<'_, P::VertexData, P::EdgeData>) -> R,
        C: FnMut(&mut R, R),
    {
        self.graph.map_reduce_vertices(map, combine)
    }

    /// Activations waiting for the next run
    pub fn pending_activations(&self) -> usize {
        self.partitions.iter().map(|p| p.queue.len()).sum()
    }

    /// Run until no activations remain
    ///
    /// On error the pending activations are discarded and the engine is
    /// ready to be re-seeded.
    pub async fn start(&mut self) -> Result<RunSummary, EngineError> {
        self.runs += 1;
        let mode = self.config.execution_mode;
        info!(
            engine_id = %self.engine_id,
            run = self.runs,
            mode = %mode,
            pending = self.pending_activations(),
            "Run started"
        );

        let started = Instant::now();
        let result = match mode {
            ExecutionMode::Synchronous => self.run_synchronous().await,
            ExecutionMode::Asynchronous => self.run_asynchronous().await,
        };
        let elapsed = started.elapsed();
        self.elapsed += elapsed;

        match result {
            Ok(mut summary) => {
                summary.elapsed = elapsed;
                info!(
                    engine_id = %self.engine_id,
                    run = self.runs,
                    supersteps = summary.supersteps,
                    updates = summary.updates,
                    signals = summary.signals,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Run finished"
                );
                Ok(summary)
            }
            Err(err) => {
                warn!(
                    engine_id = %self.engine_id,
                    run = self.runs,
                    error = %err,
                    "Run failed, discarding pending activations"
                );
                self.reset_after_failure();
                Err(err)
            }
        }
    }

    /// Wall-clock seconds spent in `start()` across all runs
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    fn activate(&mut self, index: usize, priority: f64) {
        let owner = self.shared.topology.owner(index);
        self.partitions[owner].queue.activate(index, priority);
    }

    fn reset_after_failure(&mut self) {
        let (partitions, router) = build_partitions(
            self.shared.topology.num_partitions(),
            &self.config,
            &self.transport,
        );
        self.partitions = partitions;
        self.router = router;
    }
}

fn build_partitions(
    num_partitions: usize,
    config: &EngineConfig,
    layer: &TransportLayer,
) -> (Vec<PartitionState>, SignalRouter) {
    let (local, inboxes) = LocalTransport::new(num_partitions);
    let transport: Arc<dyn SignalTransport> = layer(local);
    let router = SignalRouter::new(transport, config.delivery_retry.clone());
    let partitions = inboxes
        .into_iter()
        .enumerate()
        .map(|(partition, inbox)| PartitionState {
            queue: ActivationQueue::new(),
            inbox,
            rng: match config.seed {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(partition as u64)),
                None => ChaCha8Rng::from_entropy(),
            },
        })
        .collect();
    (partitions, router)
}

/// Wait for every partition task, then surface the first failure
///
/// All tasks are awaited before returning so a failed partition never
/// leaves siblings running past the barrier.
pub(crate) async fn join_partitions<T>(
    handles: Vec<JoinHandle<(PartitionState, Result<T, EngineError>)>>,
) -> (Vec<PartitionState>, Result<Vec<T>, EngineError>) {
    let mut partitions = Vec::with_capacity(handles.len());
    let mut outputs = Vec::with_capacity(handles.len());
    let mut failure = None;

    for joined in join_all(handles).await {
        match joined {
            Ok((partition, result)) => {
                partitions.push(partition);
                match result {
                    Ok(output) => outputs.push(output),
                    Err(err) => {
                        failure.get_or_insert(err);
                    }
                }
            }
            Err(join_err) => {
                failure.get_or_insert(EngineError::WorkerFailed(join_err.to_string()));
            }
        }
    }

    match failure {
        Some(err) => (partitions, Err(err)),
        None => (partitions, Ok(outputs)),
    }
}
