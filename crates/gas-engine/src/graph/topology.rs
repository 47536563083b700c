//! Immutable graph topology built by `finalize()`
//!
//! Vertices are addressed internally by a dense index into the sorted id
//! list. Edges are stored once and referenced from compressed in/out
//! adjacency arrays.

use super::VertexId;
use crate::program::EdgeDir;

/// Partition owning a dense vertex index
pub(crate) fn owner_of(index: usize, num_partitions: usize) -> usize {
    index % num_partitions
}

#[derive(Debug)]
pub(crate) struct EdgeRecord<E> {
    pub source: usize,
    pub target: usize,
    pub data: E,
}

#[derive(Debug)]
pub(crate) struct Topology<E> {
    ids: Vec<VertexId>,
    edges: Vec<EdgeRecord<E>>,
    in_offsets: Vec<usize>,
    in_edges: Vec<usize>,
    out_offsets: Vec<usize>,
    out_edges: Vec<usize>,
    partitions: Vec<Vec<usize>>,
}

impl<E> Topology<E> {
    /// Build from sorted, unique ids and edges expressed in dense indices
    pub fn build(ids: Vec<VertexId>, edges: Vec<EdgeRecord<E>>, num_partitions: usize) -> Self {
        let n = ids.len();
        let num_partitions = num_partitions.max(1);
        let (in_offsets, in_edges) = build_csr(n, &edges, |e| e.target);
        let (out_offsets, out_edges) = build_csr(n, &edges, |e| e.source);

        let mut partitions = vec![Vec::new(); num_partitions];
        for index in 0..n {
            partitions[owner_of(index, num_partitions)].push(index);
        }

        Self {
            ids,
            edges,
            in_offsets,
            in_edges,
            out_offsets,
            out_edges,
            partitions,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.ids.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn ids(&self) -> &[VertexId] {
        &self.ids
    }

    pub fn id(&self, index: usize) -> VertexId {
        self.ids[index]
    }

    pub fn index_of(&self, id: VertexId) -> Option<usize> {
        self.ids.binary_search(&id).ok()
    }

    pub fn owner(&self, index: usize) -> usize {
        owner_of(index, self.num_partitions())
    }

    pub fn partition(&self, partition: usize) -> &[usize] {
        &self.partitions[partition]
    }

    pub fn edge(&self, edge: usize) -> &EdgeRecord<E> {
        &self.edges[edge]
    }

    pub fn in_edges(&self, index: usize) -> &[usize] {
        &self.in_edges[self.in_offsets[index]..self.in_offsets[index + 1]]
    }

    pub fn out_edges(&self, index: usize) -> &[usize] {
        &self.out_edges[self.out_offsets[index]..self.out_offsets[index + 1]]
    }

    pub fn num_in_edges(&self, index: usize) -> usize {
        self.in_offsets[index + 1] - self.in_offsets[index]
    }

    pub fn num_out_edges(&self, index: usize) -> usize {
        self.out_offsets[index + 1] - self.out_offsets[index]
    }

    /// Edges touching `index` in the given direction; in-edges first for `All`
    pub fn incident(&self, index: usize, dir: EdgeDir) -> impl Iterator<Item = usize> + '_ {
        let (ins, outs): (&[usize], &[usize]) = match dir {
            EdgeDir::None => (&[], &[]),
            EdgeDir::In => (self.in_edges(index), &[]),
            EdgeDir::Out => (&[], self.out_edges(index)),
            EdgeDir::All => (self.in_edges(index), self.out_edges(index)),
        };
        ins.iter().chain(outs.iter()).copied()
    }
}

fn build_csr<E>(
    n: usize,
    edges: &[EdgeRecord<E>],
    key: impl Fn(&EdgeRecord<E>) -> usize,
) -> (Vec<usize>, Vec<usize>) {
    let mut offsets = vec![0usize; n + 1];
    for edge in edges {
        offsets[key(edge) + 1] += 1;
    }
    for i in 0..n {
        offsets[i + 1] += offsets[i];
    }

    let mut cursor = offsets.clone();
    let mut slots = vec![0usize; edges.len()];
    for (e, edge) in edges.iter().enumerate() {
        let k = key(edge);
        slots[cursor[k]] = e;
        cursor[k] += 1;
    }
    (offsets, slots)
}
