//! Partitioned graph store
//!
//! A [`Graph`] is built in two stages. While building, vertices and edges are
//! added freely (edges implicitly create missing endpoints with a default
//! payload). `finalize()` then locks the topology exactly once: ids are
//! sorted into dense indices, in/out adjacency and degree caches are built,
//! and every vertex is assigned to one partition (`dense index % partitions`).
//! Vertex programs may only run against a finalized graph.

pub mod loader;
pub(crate) mod store;
pub(crate) mod topology;
pub mod view;
pub mod writer;

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::error::EngineError;
use store::VertexStore;
use topology::{EdgeRecord, Topology};

pub use loader::GraphFormat;
pub use view::{EdgeRef, VertexMut, VertexRef};
pub use writer::{GraphWriter, SaveOptions};

/// Stable vertex identifier (dense or sparse)
pub type VertexId = u64;

/// Shared handles to a finalized graph, cloned into partition workers
pub(crate) struct Shared<V, E> {
    pub topology: Arc<Topology<E>>,
    pub store: Arc<VertexStore<V>>,
}

impl<V, E> Clone for Shared<V, E> {
    fn clone(&self) -> Self {
        Self {
            topology: Arc::clone(&self.topology),
            store: Arc::clone(&self.store),
        }
    }
}

impl<V, E> Shared<V, E> {
    pub fn vertex(&self, index: usize) -> VertexRef<'_, V, E> {
        VertexRef::new(index, &self.topology, &self.store)
    }

    pub fn edge(&self, index: usize) -> EdgeRef<'_, V, E> {
        EdgeRef::new(index, &self.topology, &self.store)
    }
}

enum Stage<V, E> {
    Building {
        vertices: BTreeMap<VertexId, V>,
        edges: Vec<(VertexId, VertexId, E)>,
    },
    Finalized(Shared<V, E>),
}

/// Directed graph with vertex payload `V` and edge payload `E`
pub struct Graph<V, E = ()> {
    num_partitions: usize,
    stage: Stage<V, E>,
}

impl<V, E> Default for Graph<V, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, E> Graph<V, E> {
    /// Create an empty graph partitioned across all available cores
    pub fn new() -> Self {
        Self::with_partitions(num_cpus::get())
    }

    /// Create an empty graph with an explicit partition count
    pub fn with_partitions(num_partitions: usize) -> Self {
        Self {
            num_partitions: num_partitions.max(1),
            stage: Stage::Building {
                vertices: BTreeMap::new(),
                edges: Vec::new(),
            },
        }
    }

    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.stage, Stage::Finalized(_))
    }

    pub fn num_vertices(&self) -> usize {
        match &self.stage {
            Stage::Building { vertices, .. } => vertices.len(),
            Stage::Finalized(shared) => shared.topology.num_vertices(),
        }
    }

    pub fn num_edges(&self) -> usize {
        match &self.stage {
            Stage::Building { edges, .. } => edges.len(),
            Stage::Finalized(shared) => shared.topology.num_edges(),
        }
    }

    pub fn contains(&self, id: VertexId) -> bool {
        match &self.stage {
            Stage::Building { vertices, .. } => vertices.contains_key(&id),
            Stage::Finalized(shared) => shared.topology.index_of(id).is_some(),
        }
    }

    /// Add a vertex, replacing the payload if it already exists
    pub fn add_vertex(&mut self, id: VertexId, data: V) -> Result<(), EngineError> {
        match &mut self.stage {
            Stage::Building { vertices, .. } => {
                vertices.insert(id, data);
                Ok(())
            }
            Stage::Finalized(_) => Err(EngineError::GraphAlreadyFinalized),
        }
    }

    /// Lock the topology, build adjacency and partition ownership
    pub fn finalize(&mut self) -> Result<(), EngineError> {
        let (vertices, edges) = match &mut self.stage {
            Stage::Building { vertices, edges } => {
                (std::mem::take(vertices), std::mem::take(edges))
            }
            Stage::Finalized(_) => return Err(EngineError::GraphAlreadyFinalized),
        };

        let (ids, values): (Vec<VertexId>, Vec<V>) = vertices.into_iter().unzip();
        let mut records = Vec::with_capacity(edges.len());
        for (source, target, data) in edges {
            let source = ids
                .binary_search(&source)
                .map_err(|_| EngineError::UnknownVertex(source))?;
            let target = ids
                .binary_search(&target)
                .map_err(|_| EngineError::UnknownVertex(target))?;
            records.push(EdgeRecord {
                source,
                target,
                data,
            });
        }

        let topology = Topology::build(ids, records, self.num_partitions);
        info!(
            vertices = topology.num_vertices(),
            edges = topology.num_edges(),
            partitions = topology.num_partitions(),
            "Graph finalized"
        );

        self.stage = Stage::Finalized(Shared {
            topology: Arc::new(topology),
            store: Arc::new(VertexStore::new(values)),
        });
        Ok(())
    }

    pub(crate) fn shared(&self) -> Result<&Shared<V, E>, EngineError> {
        match &self.stage {
            Stage::Finalized(shared) => Ok(shared),
            Stage::Building { .. } => Err(EngineError::GraphNotFinalized),
        }
    }

    /// View of a single vertex
    pub fn vertex(&self, id: VertexId) -> Result<VertexRef<'_, V, E>, EngineError> {
        let shared = self.shared()?;
        let index = shared
            .topology
            .index_of(id)
            .ok_or(EngineError::UnknownVertex(id))?;
        Ok(shared.vertex(index))
    }

    /// All vertices in ascending id order
    pub fn vertices(&self) -> Result<impl Iterator<Item = VertexRef<'_, V, E>> + '_, EngineError> {
        let shared = self.shared()?;
        Ok((0..shared.topology.num_vertices()).map(move |index| shared.vertex(index)))
    }

    /// Outgoing edges of a vertex
    pub fn out_edges(&self, id: VertexId) -> Result<Vec<EdgeRef<'_, V, E>>, EngineError> {
        let vertex = self.vertex(id)?;
        let shared = self.shared()?;
        Ok(shared
            .topology
            .out_edges(vertex.index())
            .iter()
            .map(|&e| shared.edge(e))
            .collect())
    }

    /// Incoming edges of a vertex
    pub fn in_edges(&self, id: VertexId) -> Result<Vec<EdgeRef<'_, V, E>>, EngineError> {
        let vertex = self.vertex(id)?;
        let shared = self.shared()?;
        Ok(shared
            .topology
            .in_edges(vertex.index())
            .iter()
            .map(|&e| shared.edge(e))
            .collect())
    }

    /// Apply `f` to every vertex payload once, e.g. to set initial values
    pub fn transform_vertices<F>(&mut self, mut f: F) -> Result<(), EngineError>
    where
        F: FnMut(&mut VertexMut<'_, V>),
    {
        let shared = self.shared()?;
        let topology = &shared.topology;
        for index in 0..topology.num_vertices() {
            let mut data = shared.store.write(index);
            let mut vertex = VertexMut::new(
                topology.id(index),
                topology.num_in_edges(index),
                topology.num_out_edges(index),
                &mut *data,
            );
            f(&mut vertex);
        }
        Ok(())
    }
}

impl<V: Clone, E> Graph<V, E> {
    /// Copy of a vertex payload
    pub fn vertex_data(&self, id: VertexId) -> Result<V, EngineError> {
        Ok(self.vertex(id)?.data().clone())
    }
}

impl<V: Default, E> Graph<V, E> {
    /// Add a directed edge; missing endpoints are created with default payloads
    pub fn add_edge(&mut self, source: VertexId, target: VertexId, data: E) -> Result<(), EngineError> {
        match &mut self.stage {
            Stage::Building { vertices, edges } => {
                vertices.entry(source).or_default();
                vertices.entry(target).or_default();
                edges.push((source, target, data));
                Ok(())
            }
            Stage::Finalized(_) => Err(EngineError::GraphAlreadyFinalized),
        }
    }
}
