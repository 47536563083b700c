//! Sequential PageRank for cross-checking engine results
//!
//! Jacobi power iteration with the same unnormalized update rule as
//! [`PageRank`](super::PageRank). Iterates until the largest per-vertex
//! change is within the tolerance or `max_iterations` is reached.

use std::collections::BTreeMap;

use super::pagerank::PageRankParams;
use crate::error::EngineError;
use crate::graph::{Graph, VertexId};

pub fn reference_pagerank<V, E>(
    graph: &Graph<V, E>,
    params: &PageRankParams,
    max_iterations: usize,
) -> Result<BTreeMap<VertexId, f64>, EngineError> {
    let topology = &graph.shared()?.topology;
    let n = topology.num_vertices();
    let mut ranks = vec![1.0; n];

    for _ in 0..max_iterations {
        let mut next = vec![params.reset_prob; n];
        for (index, rank) in next.iter_mut().enumerate() {
            for &edge in topology.in_edges(index) {
                let source = topology.edge(edge).source;
                *rank += params.contribution(ranks[source], topology.num_out_edges(source));
            }
        }

        let change = ranks
            .iter()
            .zip(&next)
            .map(|(old, new)| (new - old).abs())
            .fold(0.0, f64::max);
        ranks = next;
        if params.is_converged(change) {
            break;
        }
    }

    Ok(topology.ids().iter().copied().zip(ranks).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_is_uniform() {
        let mut graph: Graph<f64> = Graph::with_partitions(1);
        graph.add_edge(1, 2, ()).unwrap();
        graph.add_edge(2, 3, ()).unwrap();
        graph.add_edge(3, 1, ()).unwrap();
        graph.finalize().unwrap();

        let ranks = reference_pagerank(&graph, &PageRankParams::default(), 100).unwrap();
        for rank in ranks.values() {
            assert!((rank - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_star_center_ranks_highest() {
        // 1, 2, 3 all point at 0; 0 points back at each of them
        let mut graph: Graph<f64> = Graph::with_partitions(2);
        for leaf in 1..=3 {
            graph.add_edge(leaf, 0, ()).unwrap();
            graph.add_edge(0, leaf, ()).unwrap();
        }
        graph.finalize().unwrap();

        let ranks = reference_pagerank(&graph, &PageRankParams::default(), 1000).unwrap();
        let total: f64 = ranks.values().sum();
        assert!((total - 4.0).abs() < 1e-3);
        assert!(ranks[&0] > ranks[&1]);
        assert!((ranks[&1] - ranks[&2]).abs() < 1e-9);
    }

    #[test]
    fn test_requires_finalize() {
        let graph: Graph<f64> = Graph::with_partitions(1);
        let result = reference_pagerank(&graph, &PageRankParams::default(), 10);
        assert!(matches!(result, Err(EngineError::GraphNotFinalized)));
    }
}
