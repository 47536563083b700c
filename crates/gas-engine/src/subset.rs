//! Vertex subsets and map-reduce over vertices
//!
//! Both are evaluated against a finalized graph while no run is in progress.
//! Reductions fold each partition from `R::default()` and then combine the
//! partition results, so `combine` must be associative and commutative.

use crate::error::{EngineError, Phase, ProgramResult};
use crate::graph::{Graph, VertexId, VertexRef};

/// Opaque set of vertices of one finalized graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexSet {
    mask: Vec<bool>,
}

impl VertexSet {
    pub(crate) fn from_mask(mask: Vec<bool>) -> Self {
        Self { mask }
    }

    /// Number of member vertices
    pub fn len(&self) -> usize {
        self.mask.iter().filter(|&&member| member).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.mask.iter().any(|&member| member)
    }

    /// Size of the graph this set was selected from
    pub fn universe(&self) -> usize {
        self.mask.len()
    }

    pub fn union(&self, other: &VertexSet) -> Result<VertexSet, EngineError> {
        self.combine(other, |a, b| a || b)
    }

    pub fn intersection(&self, other: &VertexSet) -> Result<VertexSet, EngineError> {
        self.combine(other, |a, b| a && b)
    }

    pub fn difference(&self, other: &VertexSet) -> Result<VertexSet, EngineError> {
        self.combine(other, |a, b| a && !b)
    }

    fn combine(&self, other: &VertexSet, op: impl Fn(bool, bool) -> bool) -> Result<VertexSet, EngineError> {
        self.check_universe(other.universe())?;
        Ok(Self::from_mask(
            self.mask
                .iter()
                .zip(&other.mask)
                .map(|(&a, &b)| op(a, b))
                .collect(),
        ))
    }

    pub(crate) fn check_universe(&self, expected: usize) -> Result<(), EngineError> {
        if self.mask.len() != expected {
            return Err(EngineError::ForeignVertexSet {
                expected,
                found: self.mask.len(),
            });
        }
        Ok(())
    }

    /// Dense indices of the members, ascending
    pub(crate) fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.mask
            .iter()
            .enumerate()
            .filter_map(|(index, &member)| member.then_some(index))
    }
}

impl<V, E> Graph<V, E> {
    /// Select the vertices matching `predicate`
    pub fn select<F>(&self, mut predicate: F) -> Result<VertexSet, EngineError>
    where
        F: FnMut(&VertexRef<'_, V, E>) -> bool,
    {
        self.try_select(|vertex| Ok(predicate(vertex)))
    }

    /// Fallible [`select`](Graph::select); errors carry the offending vertex id
    pub fn try_select<F>(&self, mut predicate: F) -> Result<VertexSet, EngineError>
    where
        F: FnMut(&VertexRef<'_, V, E>) -> ProgramResult<bool>,
    {
        let mask = self
            .vertices()?
            .map(|vertex| {
                predicate(&vertex).map_err(|e| EngineError::callback(vertex.id(), Phase::Select, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(VertexSet::from_mask(mask))
    }

    /// Ids of the members of `set`, ascending
    pub fn ids_of(&self, set: &VertexSet) -> Result<Vec<VertexId>, EngineError> {
        let shared = self.shared()?;
        set.check_universe(shared.topology.num_vertices())?;
        Ok(set.indices().map(|index| shared.topology.id(index)).collect())
    }

    /// Map every vertex to a value and reduce with `combine`
    pub fn map_reduce_vertices<R, M, C>(&self, mut map: M, combine: C) -> Result<R, EngineError>
    where
        R: Default,
        M: FnMut(&VertexRef<'_, V, E>) -> R,
        C: FnMut(&mut R, R),
    {
        self.try_map_reduce_vertices(|vertex| Ok(map(vertex)), combine)
    }

    /// Fallible [`map_reduce_vertices`](Graph::map_reduce_vertices)
    pub fn try_map_reduce_vertices<R, M, C>(&self, mut map: M, mut combine: C) -> Result<R, EngineError>
    where
        R: Default,
        M: FnMut(&VertexRef<'_, V, E>) -> ProgramResult<R>,
        C: FnMut(&mut R, R),
    {
        let shared = self.shared()?;
        let topology = &shared.topology;

        let mut result = R::default();
        for partition in 0..topology.num_partitions() {
            let mut partial = R::default();
            for &index in topology.partition(partition) {
                let vertex = shared.vertex(index);
                let value = map(&vertex)
                    .map_err(|e| EngineError::callback(vertex.id(), Phase::MapReduce, e))?;
                combine(&mut partial, value);
            }
            combine(&mut result, partial);
        }
        Ok(result)
    }
}
