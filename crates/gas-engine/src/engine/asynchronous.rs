//! Asynchronous scheduler
//!
//! One worker task per partition pops its queue continuously (highest
//! priority first, FIFO among equals) and runs the full Gather/Apply/Scatter
//! cycle for each vertex. Signals are visible to their target's partition as
//! soon as they are delivered.
//!
//! Termination uses a global count of outstanding activations. Signals are
//! counted before they are routed and a vertex is released only after its
//! own signals are counted, so the count can reach zero only when every
//! queue and inbox is empty. The worker that observes zero broadcasts stop.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::{join_partitions, Engine, PartitionState, RunSummary};
use crate::channel::SignalRouter;
use crate::config::ExecutionMode;
use crate::error::EngineError;
use crate::graph::Shared;
use crate::program::VertexProgram;
use crate::runtime::run_vertex;

/// Vertices processed between cooperative yields
const YIELD_INTERVAL: usize = 64;

struct Termination {
    outstanding: AtomicUsize,
    stop: watch::Sender<bool>,
}

impl Termination {
    fn acquire(&self, count: usize) {
        self.outstanding.fetch_add(count, Ordering::SeqCst);
    }

    fn release(&self, count: usize) {
        if count > 0 && self.outstanding.fetch_sub(count, Ordering::SeqCst) == count {
            self.stop.send_replace(true);
        }
    }

    fn abort(&self) {
        self.stop.send_replace(true);
    }
}

#[derive(Debug, Default)]
struct WorkerStats {
    updates: usize,
    signals: usize,
}

impl<P: VertexProgram> Engine<'_, P> {
    pub(super) async fn run_asynchronous(&mut self) -> Result<RunSummary, EngineError> {
        let mut summary = RunSummary {
            mode: ExecutionMode::Asynchronous,
            supersteps: 0,
            updates: 0,
            signals: 0,
            elapsed: Default::default(),
        };

        for partition in &mut self.partitions {
            partition.inbox.drain_into(&mut partition.queue);
        }
        let outstanding = self.pending_activations();
        if outstanding == 0 {
            return Ok(summary);
        }

        let (stop, _) = watch::channel(false);
        let termination = Arc::new(Termination {
            outstanding: AtomicUsize::new(outstanding),
            stop,
        });

        let mut handles = Vec::with_capacity(self.partitions.len());
        for (index, partition) in std::mem::take(&mut self.partitions).into_iter().enumerate() {
            let worker = Worker {
                index,
                shared: self.shared.clone(),
                program: self.program.clone(),
                router: self.router.clone(),
                termination: Arc::clone(&termination),
                trace: self.config.tracing_enabled,
            };
            handles.push(tokio::spawn(worker.run(partition)));
        }

        let (partitions, result) = join_partitions(handles).await;
        self.partitions = partitions;
        for stats in result? {
            summary.updates += stats.updates;
            summary.signals += stats.signals;
        }
        Ok(summary)
    }
}

struct Worker<P: VertexProgram> {
    index: usize,
    shared: Shared<P::VertexData, P::EdgeData>,
    program: P,
    router: SignalRouter,
    termination: Arc<Termination>,
    trace: bool,
}

impl<P: VertexProgram> Worker<P> {
    async fn run(self, mut partition: PartitionState) -> (PartitionState, Result<WorkerStats, EngineError>) {
        let result = self.drive(&mut partition).await;
        if result.is_err() {
            self.termination.abort();
        }
        if self.trace {
            if let Ok(stats) = &result {
                debug!(partition = self.index, updates = stats.updates, "Worker finished");
            }
        }
        (partition, result)
    }

    async fn drive(&self, partition: &mut PartitionState) -> Result<WorkerStats, EngineError> {
        let mut stop = self.termination.stop.subscribe();
        let mut stats = WorkerStats::default();

        loop {
            if *stop.borrow() {
                return Ok(stats);
            }

            let coalesced = partition.inbox.drain_into(&mut partition.queue);
            self.termination.release(coalesced);

            let Some(vertex) = partition.queue.pop() else {
                tokio::select! {
                    received = partition.inbox.recv() => match received {
                        Some(signals) => {
                            let coalesced = partition.queue.enqueue(signals);
                            self.termination.release(coalesced);
                        }
                        None => return Ok(stats),
                    },
                    _ = stop.changed() => {}
                }
                continue;
            };

            let signals = run_vertex(&self.program, &self.shared, vertex, &mut partition.rng)?;
            stats.updates += 1;
            stats.signals += signals.len();

            self.termination.acquire(signals.len());
            self.router.route(signals).await?;
            self.termination.release(1);

            if stats.updates % YIELD_INTERVAL == 0 {
                tokio::task::yield_now().await;
            }
        }
    }
}
