//! Per-partition activation queue
//!
//! Holds at most one pending entry per vertex. Activating an already pending
//! vertex coalesces into the existing entry, keeping the higher priority and
//! the original arrival order. `pop` yields the highest priority first, FIFO
//! among equal priorities; `drain_next_batch` empties the queue in one go
//! for a synchronous superstep.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::channel::Signal;

#[derive(Debug, Clone, Copy)]
struct Entry {
    vertex: usize,
    priority: f64,
    seq: u64,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority wins, then the earlier arrival
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending activations of one partition, keyed by dense vertex index
#[derive(Debug, Default)]
pub struct ActivationQueue {
    pending: HashMap<usize, (f64, u64)>,
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl ActivationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate a vertex; returns `false` if it was already pending
    pub fn activate(&mut self, vertex: usize, priority: f64) -> bool {
        if let Some((pending, seq)) = self.pending.get_mut(&vertex) {
            if priority > *pending {
                *pending = priority;
                self.heap.push(Entry {
                    vertex,
                    priority,
                    seq: *seq,
                });
            }
            return false;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(vertex, (priority, seq));
        self.heap.push(Entry {
            vertex,
            priority,
            seq,
        });
        true
    }

    /// Activate every vertex yielded by `vertices`; returns how many were newly queued
    pub fn activate_all(&mut self, vertices: impl IntoIterator<Item = usize>, priority: f64) -> usize {
        vertices
            .into_iter()
            .filter(|&vertex| self.activate(vertex, priority))
            .count()
    }

    /// Enqueue delivered signals; returns how many coalesced into pending entries
    pub fn enqueue(&mut self, signals: impl IntoIterator<Item = Signal>) -> usize {
        signals
            .into_iter()
            .filter(|signal| !self.activate(signal.vertex, signal.priority))
            .count()
    }

    /// Next vertex to run
    pub fn pop(&mut self) -> Option<usize> {
        while let Some(entry) = self.heap.pop() {
            let current = self.pending.get(&entry.vertex).copied();
            match current {
                Some((priority, seq))
                    if seq == entry.seq && priority.to_bits() == entry.priority.to_bits() =>
                {
                    self.pending.remove(&entry.vertex);
                    return Some(entry.vertex);
                }
                // Superseded by a priority raise
                _ => continue,
            }
        }
        None
    }

    /// Remove every pending vertex, in ascending index order
    pub fn drain_next_batch(&mut self) -> Vec<usize> {
        let mut batch: Vec<usize> = self.pending.drain().map(|(vertex, _)| vertex).collect();
        self.heap.clear();
        batch.sort_unstable();
        batch
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn contains(&self, vertex: usize) -> bool {
        self.pending.contains_key(&vertex)
    }
}
