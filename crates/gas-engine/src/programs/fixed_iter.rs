//! PageRank with a fixed number of applies per vertex
//!
//! Same update rule as [`PageRank`](super::PageRank), but a vertex keeps
//! scattering until it has been applied `schedule_count` times instead of
//! checking for convergence.
//!
//! Every vertex that runs at least once is applied exactly `schedule_count`
//! times in either execution mode. Until it reaches the count a vertex also
//! re-signals itself: in asynchronous mode a neighbor's signal can coalesce
//! with one already pending, and the self-signal keeps those lost
//! activations from stalling the vertex short of the count. Activations that
//! arrive after the count is reached leave the vertex untouched.

use serde::{Deserialize, Serialize};

use super::pagerank::{PageRankParams, PageRankWriter};
use crate::error::ProgramResult;
use crate::graph::{EdgeRef, GraphWriter, VertexMut, VertexRef};
use crate::program::{Context, EdgeDir, VertexProgram};

/// Default number of applies per vertex
pub const SCHEDULE_COUNT: usize = 10;

/// Rank plus the number of times the vertex has been applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRankVertex {
    pub value: f64,
    pub count: usize,
}

impl PageRankVertex {
    pub fn new(value: f64) -> Self {
        Self { value, count: 0 }
    }
}

#[derive(Debug, Clone)]
pub struct FixedIterPageRank {
    params: PageRankParams,
    schedule_count: usize,
}

impl Default for FixedIterPageRank {
    fn default() -> Self {
        Self::new(PageRankParams::default(), SCHEDULE_COUNT)
    }
}

impl FixedIterPageRank {
    pub fn new(params: PageRankParams, schedule_count: usize) -> Self {
        Self {
            params,
            schedule_count,
        }
    }

    pub fn schedule_count(&self) -> usize {
        self.schedule_count
    }
}

impl VertexProgram for FixedIterPageRank {
    type VertexData = PageRankVertex;
    type EdgeData = ();
    type Gather = f64;

    fn gather(
        &self,
        _ctx: &mut Context<'_>,
        _vertex: &VertexRef<'_, PageRankVertex, ()>,
        edge: &EdgeRef<'_, PageRankVertex, ()>,
    ) -> ProgramResult<f64> {
        let source = edge.source();
        let rank = source.data().value;
        Ok(self.params.contribution(rank, source.num_out_edges()))
    }

    fn apply(
        &mut self,
        ctx: &mut Context<'_>,
        vertex: &mut VertexMut<'_, PageRankVertex>,
        total: f64,
    ) -> ProgramResult<()> {
        let data = vertex.data_mut();
        if data.count >= self.schedule_count {
            return Ok(());
        }
        data.value = total + self.params.reset_prob;
        data.count += 1;
        if data.count < self.schedule_count {
            ctx.signal(ctx.vertex_id())?;
        }
        Ok(())
    }

    fn scatter_edges(
        &self,
        _ctx: &mut Context<'_>,
        vertex: &VertexRef<'_, PageRankVertex, ()>,
    ) -> ProgramResult<EdgeDir> {
        if vertex.data().count < self.schedule_count {
            Ok(EdgeDir::Out)
        } else {
            Ok(EdgeDir::None)
        }
    }

    fn scatter(
        &self,
        ctx: &mut Context<'_>,
        _vertex: &VertexRef<'_, PageRankVertex, ()>,
        edge: &EdgeRef<'_, PageRankVertex, ()>,
    ) -> ProgramResult<()> {
        ctx.signal_vertex(&edge.target());
        Ok(())
    }
}

impl GraphWriter<PageRankVertex, ()> for PageRankWriter {
    fn save_vertex(&self, vertex: &VertexRef<'_, PageRankVertex, ()>) -> String {
        format!(
            "vertex:{}\t{}\n",
            vertex.id(),
            vertex.data().value / self.num_vertices() as f64
        )
    }
}
