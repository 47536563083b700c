//! Synchronous scheduler
//!
//! Each superstep runs in three barrier-separated phases across all
//! partitions:
//!
//! 1. Gather + Apply for every active vertex against the payloads committed
//!    at the start of the superstep. New payloads stay private.
//! 2. Commit. Every new payload is published before any scatter runs.
//! 3. Scatter. Scatter callbacks observe every payload committed in this
//!    superstep, never a mix of old and new. Signals are routed to the
//!    owning partitions' inboxes and only drained at the start of the next
//!    superstep.
//!
//! The run ends when a superstep starts with no active vertex.

use tracing::debug;

use super::{join_partitions, Engine, RunSummary};
use crate::config::ExecutionMode;
use crate::error::EngineError;
use crate::program::VertexProgram;
use crate::runtime::{commit, gather_apply, scatter, Applied, Committed};

impl<P: VertexProgram> Engine<'_, P> {
    pub(super) async fn run_synchronous(&mut self) -> Result<RunSummary, EngineError> {
        let mut summary = RunSummary {
            mode: ExecutionMode::Synchronous,
            supersteps: 0,
            updates: 0,
            signals: 0,
            elapsed: Default::default(),
        };

        loop {
            let batches: Vec<Vec<usize>> = self
                .partitions
                .iter_mut()
                .map(|partition| {
                    partition.inbox.drain_into(&mut partition.queue);
                    partition.queue.drain_next_batch()
                })
                .collect();

            let active: usize = batches.iter().map(Vec::len).sum();
            if active == 0 {
                return Ok(summary);
            }

            let superstep = summary.supersteps;
            if self.config.exceeds_supersteps(superstep) {
                return Err(EngineError::MaxSuperstepsExceeded(superstep));
            }
            if self.config.tracing_enabled {
                debug!(engine_id = %self.engine_id, superstep, active, "Superstep started");
            }

            let applied = self.gather_apply_phase(batches, superstep).await?;
            let committed = self.commit_phase(applied);
            let signals = self.scatter_phase(committed, superstep).await?;

            if self.config.tracing_enabled {
                debug!(engine_id = %self.engine_id, superstep, signals, "Superstep finished");
            }
            summary.supersteps += 1;
            summary.updates += active;
            summary.signals += signals;
        }
    }

    async fn gather_apply_phase(
        &mut self,
        batches: Vec<Vec<usize>>,
        superstep: usize,
    ) -> Result<Vec<Vec<Applied<P>>>, EngineError> {
        let mut handles = Vec::with_capacity(batches.len());
        for (mut partition, batch) in std::mem::take(&mut self.partitions).into_iter().zip(batches) {
            let shared = self.shared.clone();
            let program = self.program.clone();

            handles.push(tokio::spawn(async move {
                let result = batch
                    .into_iter()
                    .map(|index| gather_apply(&program, &shared, index, superstep, &mut partition.rng))
                    .collect::<Result<Vec<_>, _>>();
                (partition, result)
            }));
        }

        let (partitions, result) = join_partitions(handles).await;
        self.partitions = partitions;
        result
    }

    /// Publishes every payload of the superstep; returns once all are visible
    fn commit_phase(&self, applied: Vec<Vec<Applied<P>>>) -> Vec<Vec<Committed<P>>> {
        applied
            .into_iter()
            .map(|batch| {
                batch
                    .into_iter()
                    .map(|vertex| commit(vertex, &self.shared))
                    .collect()
            })
            .collect()
    }

    /// Returns the number of signals raised
    async fn scatter_phase(
        &mut self,
        committed: Vec<Vec<Committed<P>>>,
        superstep: usize,
    ) -> Result<usize, EngineError> {
        let mut handles = Vec::with_capacity(committed.len());
        for (mut partition, committed) in std::mem::take(&mut self.partitions)
            .into_iter()
            .zip(committed)
        {
            let shared = self.shared.clone();
            let router = self.router.clone();

            handles.push(tokio::spawn(async move {
                let result = async {
                    let mut signals = Vec::new();
                    for vertex in committed {
                        signals.extend(scatter(vertex, &shared, superstep, &mut partition.rng)?);
                    }
                    let raised = signals.len();
                    router.route(signals).await?;
                    Ok::<_, EngineError>(raised)
                }
                .await;
                (partition, result)
            }));
        }

        let (partitions, result) = join_partitions(handles).await;
        self.partitions = partitions;
        Ok(result?.into_iter().sum())
    }
}
