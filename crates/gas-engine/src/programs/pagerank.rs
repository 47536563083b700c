//! Adaptive PageRank
//!
//! Unnormalized form: `rank(v) = r + (1 - r) * sum(rank(u) / outdeg(u))`
//! over in-neighbors `u`. A vertex re-signals its out-neighbors only while
//! its rank moved by more than the tolerance, so the computation converges
//! vertex by vertex.

use serde::{Deserialize, Serialize};

use crate::error::ProgramResult;
use crate::graph::{EdgeRef, GraphWriter, VertexMut, VertexRef};
use crate::program::{Context, EdgeDir, VertexProgram};

/// Probability of a random jump
pub const RESET_PROB: f64 = 0.15;

/// Largest rank change that still counts as converged
pub const TOLERANCE: f64 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRankParams {
    pub reset_prob: f64,
    pub tolerance: f64,
}

impl Default for PageRankParams {
    fn default() -> Self {
        Self {
            reset_prob: RESET_PROB,
            tolerance: TOLERANCE,
        }
    }
}

impl PageRankParams {
    pub fn new(reset_prob: f64, tolerance: f64) -> Self {
        Self {
            reset_prob,
            tolerance,
        }
    }

    /// A change equal to the tolerance is converged
    pub fn is_converged(&self, change: f64) -> bool {
        change <= self.tolerance
    }

    /// Contribution of an in-neighbor with the given rank and out-degree
    pub(crate) fn contribution(&self, rank: f64, out_degree: usize) -> f64 {
        (1.0 - self.reset_prob) / out_degree as f64 * rank
    }
}

#[derive(Debug, Clone, Default)]
pub struct PageRank {
    params: PageRankParams,
    last_change: f64,
}

impl PageRank {
    pub fn new(params: PageRankParams) -> Self {
        Self {
            params,
            last_change: 0.0,
        }
    }

    pub fn params(&self) -> &PageRankParams {
        &self.params
    }
}

impl VertexProgram for PageRank {
    type VertexData = f64;
    type EdgeData = ();
    type Gather = f64;

    fn gather(
        &self,
        _ctx: &mut Context<'_>,
        _vertex: &VertexRef<'_, f64, ()>,
        edge: &EdgeRef<'_, f64, ()>,
    ) -> ProgramResult<f64> {
        let source = edge.source();
        let rank = *source.data();
        Ok(self.params.contribution(rank, source.num_out_edges()))
    }

    fn apply(
        &mut self,
        _ctx: &mut Context<'_>,
        vertex: &mut VertexMut<'_, f64>,
        total: f64,
    ) -> ProgramResult<()> {
        let new_rank = total + self.params.reset_prob;
        self.last_change = (new_rank - *vertex.data()).abs();
        *vertex.data_mut() = new_rank;
        Ok(())
    }

    fn scatter_edges(
        &self,
        _ctx: &mut Context<'_>,
        _vertex: &VertexRef<'_, f64, ()>,
    ) -> ProgramResult<EdgeDir> {
        if self.params.is_converged(self.last_change) {
            Ok(EdgeDir::None)
        } else {
            Ok(EdgeDir::Out)
        }
    }

    fn scatter(
        &self,
        ctx: &mut Context<'_>,
        _vertex: &VertexRef<'_, f64, ()>,
        edge: &EdgeRef<'_, f64, ()>,
    ) -> ProgramResult<()> {
        ctx.signal_vertex(&edge.target());
        Ok(())
    }
}

/// Writes `vertex:{id}\t{rank / num_vertices}` lines
#[derive(Debug, Clone, Copy)]
pub struct PageRankWriter {
    num_vertices: usize,
}

impl PageRankWriter {
    pub fn new(num_vertices: usize) -> Self {
        Self {
            num_vertices: num_vertices.max(1),
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }
}

impl GraphWriter<f64, ()> for PageRankWriter {
    fn save_vertex(&self, vertex: &VertexRef<'_, f64, ()>) -> String {
        format!(
            "vertex:{}\t{}\n",
            vertex.id(),
            *vertex.data() / self.num_vertices as f64
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = PageRankParams::default();
        assert_eq!(params.reset_prob, 0.15);
        assert_eq!(params.tolerance, 1e-5);
    }

    #[test]
    fn test_tolerance_boundary_is_converged() {
        let params = PageRankParams::new(0.15, 0.5);
        assert!(params.is_converged(0.0));
        assert!(params.is_converged(0.5));
        assert!(!params.is_converged(0.5000001));
    }

    #[test]
    fn test_contribution() {
        let params = PageRankParams::default();
        assert!((params.contribution(2.0, 4) - 0.425).abs() < 1e-12);
    }
}
