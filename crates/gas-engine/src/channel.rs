//! Cross-partition signal delivery
//!
//! Every signal raised by a vertex program is routed to the partition that
//! owns its target, including signals that stay on the same partition. The
//! [`SignalTransport`] trait is the seam for the delivery mechanism; the
//! engine builds a [`LocalTransport`], one unbounded tokio channel per
//! partition, and hands it to a [`TransportLayer`] that may wrap it (see
//! `Engine::with_transport`). [`SignalRouter`] batches signals per partition and retries
//! failed sends with exponential backoff before giving up with
//! `DeliveryFailed`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::RetryPolicy;
use crate::error::{EngineError, TransportError};
use crate::graph::topology::owner_of;
use crate::queue::ActivationQueue;

/// Activation request for a vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    /// Dense index of the target vertex
    pub vertex: usize,
    /// Scheduling priority, higher runs earlier in asynchronous mode
    pub priority: f64,
}

impl Signal {
    pub fn new(vertex: usize, priority: f64) -> Self {
        Self { vertex, priority }
    }
}

/// Delivers signal batches to partitions
#[async_trait]
pub trait SignalTransport: Send + Sync {
    fn num_partitions(&self) -> usize;

    /// Deliver a batch to one partition
    async fn send(&self, partition: usize, signals: &[Signal]) -> Result<(), TransportError>;
}

/// Wraps the in-process transport the engine builds for each run
///
/// Called again whenever the engine rebuilds its partitions after a failed
/// run. Signals still have to reach the engine's inboxes, so a layer is
/// expected to forward to the `LocalTransport` it is given.
pub type TransportLayer = Arc<dyn Fn(LocalTransport) -> Arc<dyn SignalTransport> + Send + Sync>;

/// Layer that uses the in-process transport as is
pub fn local_layer() -> TransportLayer {
    Arc::new(|local: LocalTransport| Arc::new(local) as Arc<dyn SignalTransport>)
}

/// In-process transport over unbounded mpsc channels
#[derive(Debug, Clone)]
pub struct LocalTransport {
    senders: Vec<mpsc::UnboundedSender<Vec<Signal>>>,
}

impl LocalTransport {
    /// Create a transport and the matching per-partition inboxes
    pub fn new(num_partitions: usize) -> (Self, Vec<Inbox>) {
        let (senders, inboxes): (Vec<_>, Vec<_>) = (0..num_partitions)
            .map(|_| {
                let (tx, rx) = mpsc::unbounded_channel();
                (tx, Inbox { rx })
            })
            .unzip();
        (Self { senders }, inboxes)
    }
}

#[async_trait]
impl SignalTransport for LocalTransport {
    fn num_partitions(&self) -> usize {
        self.senders.len()
    }

    async fn send(&self, partition: usize, signals: &[Signal]) -> Result<(), TransportError> {
        let sender = self
            .senders
            .get(partition)
            .ok_or(TransportError::UnknownPartition(partition))?;
        sender
            .send(signals.to_vec())
            .map_err(|_| TransportError::Disconnected(partition))
    }
}

/// Receiving end of one partition's signal channel
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<Vec<Signal>>,
}

impl Inbox {
    /// Move everything already delivered into `queue`
    ///
    /// Returns the number of signals that coalesced into pending entries.
    pub fn drain_into(&mut self, queue: &mut ActivationQueue) -> usize {
        let mut coalesced = 0;
        while let Ok(batch) = self.rx.try_recv() {
            coalesced += queue.enqueue(batch);
        }
        coalesced
    }

    /// Wait for the next batch; `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<Vec<Signal>> {
        self.rx.recv().await
    }
}

/// Groups signals by owning partition and delivers them with retry
#[derive(Clone)]
pub(crate) struct SignalRouter {
    transport: Arc<dyn SignalTransport>,
    retry: RetryPolicy,
}

impl SignalRouter {
    pub fn new(transport: Arc<dyn SignalTransport>, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    /// Route signals to their owners; fails if any batch exhausts its retries
    pub async fn route(&self, signals: Vec<Signal>) -> Result<(), EngineError> {
        if signals.is_empty() {
            return Ok(());
        }

        let num_partitions = self.transport.num_partitions();
        let mut batches = vec![Vec::new(); num_partitions];
        for signal in signals {
            batches[owner_of(signal.vertex, num_partitions)].push(signal);
        }

        for (partition, batch) in batches.iter().enumerate() {
            if !batch.is_empty() {
                self.deliver(partition, batch).await?;
            }
        }
        Ok(())
    }

    async fn deliver(&self, partition: usize, batch: &[Signal]) -> Result<(), EngineError> {
        let mut retries = 0;
        loop {
            match self.transport.send(partition, batch).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    if !self.retry.should_retry(retries) {
                        return Err(EngineError::delivery_failed(
                            partition,
                            retries + 1,
                            err.to_string(),
                        ));
                    }
                    let delay = self.retry.delay_for_attempt(retries);
                    warn!(
                        partition,
                        attempt = retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Signal delivery failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retries += 1;
                }
            }
        }
    }
}
