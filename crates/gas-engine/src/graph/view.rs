//! Borrowed views handed to vertex programs and graph callbacks

use std::sync::RwLockReadGuard;

use super::store::VertexStore;
use super::topology::Topology;
use super::VertexId;

/// Read-only view of a vertex
pub struct VertexRef<'a, V, E> {
    index: usize,
    topology: &'a Topology<E>,
    store: &'a VertexStore<V>,
}

impl<V, E> Clone for VertexRef<'_, V, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V, E> Copy for VertexRef<'_, V, E> {}

impl<'a, V, E> VertexRef<'a, V, E> {
    pub(crate) fn new(index: usize, topology: &'a Topology<E>, store: &'a VertexStore<V>) -> Self {
        Self {
            index,
            topology,
            store,
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub fn id(&self) -> VertexId {
        self.topology.id(self.index)
    }

    /// Current payload. Hold the guard only as long as needed.
    pub fn data(&self) -> RwLockReadGuard<'a, V> {
        self.store.read(self.index)
    }

    pub fn num_in_edges(&self) -> usize {
        self.topology.num_in_edges(self.index)
    }

    pub fn num_out_edges(&self) -> usize {
        self.topology.num_out_edges(self.index)
    }

    /// Partition that owns this vertex
    pub fn partition(&self) -> usize {
        self.topology.owner(self.index)
    }
}

/// Read-only view of a directed edge
pub struct EdgeRef<'a, V, E> {
    index: usize,
    topology: &'a Topology<E>,
    store: &'a VertexStore<V>,
}

impl<'a, V, E> EdgeRef<'a, V, E> {
    pub(crate) fn new(index: usize, topology: &'a Topology<E>, store: &'a VertexStore<V>) -> Self {
        Self {
            index,
            topology,
            store,
        }
    }

    pub fn source(&self) -> VertexRef<'a, V, E> {
        VertexRef::new(self.topology.edge(self.index).source, self.topology, self.store)
    }

    pub fn target(&self) -> VertexRef<'a, V, E> {
        VertexRef::new(self.topology.edge(self.index).target, self.topology, self.store)
    }

    /// Endpoint across the edge from `vertex`
    pub fn other(&self, vertex: &VertexRef<'_, V, E>) -> VertexRef<'a, V, E> {
        let record = self.topology.edge(self.index);
        let index = if record.source == vertex.index() {
            record.target
        } else {
            record.source
        };
        VertexRef::new(index, self.topology, self.store)
    }

    pub fn data(&self) -> &'a E {
        &self.topology.edge(self.index).data
    }
}

/// Exclusive view of a vertex payload during Apply and bulk transforms
pub struct VertexMut<'a, V> {
    id: VertexId,
    num_in_edges: usize,
    num_out_edges: usize,
    data: &'a mut V,
}

impl<'a, V> VertexMut<'a, V> {
    pub(crate) fn new(id: VertexId, num_in_edges: usize, num_out_edges: usize, data: &'a mut V) -> Self {
        Self {
            id,
            num_in_edges,
            num_out_edges,
            data,
        }
    }

    pub fn id(&self) -> VertexId {
        self.id
    }

    pub fn num_in_edges(&self) -> usize {
        self.num_in_edges
    }

    pub fn num_out_edges(&self) -> usize {
        self.num_out_edges
    }

    pub fn data(&self) -> &V {
        self.data
    }

    pub fn data_mut(&mut self) -> &mut V {
        self.data
    }
}
