//! Vertex program abstractions
//!
//! A vertex program runs the Gather/Apply/Scatter protocol for one active
//! vertex:
//!
//! 1. `gather_edges` picks the edge direction to gather over
//! 2. `gather` produces a partial value per edge, merged with
//!    [`GatherValue::merge`]
//! 3. `apply` receives the merged total and updates the vertex payload
//! 4. `scatter_edges` / `scatter` walk edges again and may signal vertices
//!
//! The engine clones a fresh program instance from the prototype every time
//! a vertex is dequeued, so fields written in `apply` are private scratch
//! that lives until the end of that vertex's scatter.

use rand_chacha::ChaCha8Rng;

use crate::channel::Signal;
use crate::error::{ProgramError, ProgramResult};
use crate::graph::{EdgeRef, VertexId, VertexMut, VertexRef};

/// Edge direction selector for Gather and Scatter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EdgeDir {
    /// Touch no edges
    #[default]
    None,
    /// Edges whose target is the vertex
    In,
    /// Edges whose source is the vertex
    Out,
    /// In-edges followed by out-edges
    All,
}

/// Partial result of Gather
///
/// `merge` must be associative and commutative; gather order across edges
/// is unspecified. `Default` is the identity used for vertices with no
/// edges in the gather direction.
pub trait GatherValue: Default + Send + 'static {
    fn merge(&mut self, other: Self);
}

macro_rules! impl_sum_gather {
    ($($t:ty),*) => {
        $(
            impl GatherValue for $t {
                fn merge(&mut self, other: Self) {
                    *self += other;
                }
            }
        )*
    };
}

impl_sum_gather!(f32, f64, i32, i64, u32, u64, usize);

impl GatherValue for () {
    fn merge(&mut self, _other: Self) {}
}

/// Per-vertex execution context
///
/// Gives callbacks the identity of the running vertex, the partition RNG
/// and an outbox for signals. Signals are routed once the vertex finishes
/// scatter.
pub struct Context<'a> {
    vertex_id: VertexId,
    superstep: usize,
    ids: &'a [VertexId],
    rng: &'a mut ChaCha8Rng,
    outbox: Vec<Signal>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        vertex_id: VertexId,
        superstep: usize,
        ids: &'a [VertexId],
        rng: &'a mut ChaCha8Rng,
    ) -> Self {
        Self {
            vertex_id,
            superstep,
            ids,
            rng,
            outbox: Vec::new(),
        }
    }

    /// Id of the vertex being processed
    pub fn vertex_id(&self) -> VertexId {
        self.vertex_id
    }

    /// Current superstep (always 0 in asynchronous mode)
    pub fn superstep(&self) -> usize {
        self.superstep
    }

    /// Number of vertices in the graph
    pub fn num_vertices(&self) -> usize {
        self.ids.len()
    }

    /// Random source owned by the executing partition
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        self.rng
    }

    /// Schedule a vertex by id with default priority
    pub fn signal(&mut self, id: VertexId) -> ProgramResult<()> {
        self.signal_with_priority(id, 0.0)
    }

    /// Schedule a vertex by id; higher priority runs earlier in asynchronous mode
    pub fn signal_with_priority(&mut self, id: VertexId, priority: f64) -> ProgramResult<()> {
        let vertex = self
            .ids
            .binary_search(&id)
            .map_err(|_| ProgramError::new(format!("signal to unknown vertex {id}")))?;
        self.outbox.push(Signal::new(vertex, priority));
        Ok(())
    }

    /// Schedule a vertex reached through an edge
    pub fn signal_vertex<V, E>(&mut self, vertex: &VertexRef<'_, V, E>) {
        self.outbox.push(Signal::new(vertex.index(), 0.0));
    }

    /// Schedule a vertex reached through an edge with an explicit priority
    pub fn signal_vertex_with_priority<V, E>(&mut self, vertex: &VertexRef<'_, V, E>, priority: f64) {
        self.outbox.push(Signal::new(vertex.index(), priority));
    }

    pub(crate) fn into_signals(self) -> Vec<Signal> {
        self.outbox
    }
}

/// A Gather/Apply/Scatter program
///
/// Workloads implement this trait once; the engine is generic over it.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Default)]
/// struct InDegree;
///
/// impl VertexProgram for InDegree {
///     type VertexData = u64;
///     type EdgeData = ();
///     type Gather = u64;
///
///     fn gather(&self, _ctx: &mut Context<'_>, _v: &VertexRef<'_, u64, ()>, _e: &EdgeRef<'_, u64, ()>) -> ProgramResult<u64> {
///         Ok(1)
///     }
///
///     fn apply(&mut self, _ctx: &mut Context<'_>, v: &mut VertexMut<'_, u64>, total: u64) -> ProgramResult<()> {
///         *v.data_mut() = total;
///         Ok(())
///     }
///
///     fn scatter_edges(&self, _ctx: &mut Context<'_>, _v: &VertexRef<'_, u64, ()>) -> ProgramResult<EdgeDir> {
///         Ok(EdgeDir::None)
///     }
/// }
/// ```
pub trait VertexProgram: Clone + Send + Sync + 'static {
    /// Vertex payload
    type VertexData: Clone + Default + Send + Sync + 'static;
    /// Edge payload
    type EdgeData: Send + Sync + 'static;
    /// Gather accumulator
    type Gather: GatherValue;

    fn gather_edges(
        &self,
        _ctx: &mut Context<'_>,
        _vertex: &VertexRef<'_, Self::VertexData, Self::EdgeData>,
    ) -> ProgramResult<EdgeDir> {
        Ok(EdgeDir::In)
    }

    fn gather(
        &self,
        _ctx: &mut Context<'_>,
        _vertex: &VertexRef<'_, Self::VertexData, Self::EdgeData>,
        _edge: &EdgeRef<'_, Self::VertexData, Self::EdgeData>,
    ) -> ProgramResult<Self::Gather> {
        Ok(Self::Gather::default())
    }

    /// Update the payload from the merged gather total
    fn apply(
        &mut self,
        ctx: &mut Context<'_>,
        vertex: &mut VertexMut<'_, Self::VertexData>,
        total: Self::Gather,
    ) -> ProgramResult<()>;

    fn scatter_edges(
        &self,
        _ctx: &mut Context<'_>,
        _vertex: &VertexRef<'_, Self::VertexData, Self::EdgeData>,
    ) -> ProgramResult<EdgeDir> {
        Ok(EdgeDir::Out)
    }

    fn scatter(
        &self,
        _ctx: &mut Context<'_>,
        _vertex: &VertexRef<'_, Self::VertexData, Self::EdgeData>,
        _edge: &EdgeRef<'_, Self::VertexData, Self::EdgeData>,
    ) -> ProgramResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_gather_merge() {
        let mut total = f64::default();
        total.merge(0.5);
        total.merge(1.25);
        assert_eq!(total, 1.75);

        let mut visits = 0u64;
        visits.merge(3);
        assert_eq!(visits, 3);
    }

    #[test]
    fn test_context_signal_resolves_ids() {
        let ids = [3, 10, 42];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut ctx = Context::new(10, 2, &ids, &mut rng);
        assert_eq!(ctx.vertex_id(), 10);
        assert_eq!(ctx.superstep(), 2);
        assert_eq!(ctx.num_vertices(), 3);

        ctx.signal(42).unwrap();
        ctx.signal_with_priority(3, 2.5).unwrap();
        let err = ctx.signal(7).unwrap_err();
        assert!(err.message().contains("unknown vertex 7"));

        let signals = ctx.into_signals();
        assert_eq!(signals, vec![Signal::new(2, 0.0), Signal::new(0, 2.5)]);
    }

    #[test]
    fn test_edge_dir_default() {
        assert_eq!(EdgeDir::default(), EdgeDir::None);
    }
}
