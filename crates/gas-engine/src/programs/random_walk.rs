//! Random-walk PageRank simulation
//!
//! Each signal is a walker arriving at a vertex. The vertex counts the
//! visit, then the walker either gets bored and stops (with the reset
//! probability) or moves on: every out-edge is followed independently with
//! probability `1 / outdeg`. The caller keeps injecting walkers at random
//! vertices until enough visits have been recorded; visit shares then
//! approximate PageRank.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::pagerank::RESET_PROB;
use crate::engine::Engine;
use crate::error::{EngineError, ProgramResult};
use crate::graph::{EdgeRef, GraphWriter, VertexMut, VertexRef};
use crate::program::{Context, EdgeDir, VertexProgram};

/// Default visit budget for a simulation
pub const MAX_VISITS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct RandomWalk {
    reset_prob: f64,
}

impl Default for RandomWalk {
    fn default() -> Self {
        Self::new(RESET_PROB)
    }
}

impl RandomWalk {
    pub fn new(reset_prob: f64) -> Self {
        Self { reset_prob }
    }

    pub fn reset_prob(&self) -> f64 {
        self.reset_prob
    }
}

impl VertexProgram for RandomWalk {
    type VertexData = u64;
    type EdgeData = ();
    type Gather = ();

    fn gather_edges(
        &self,
        _ctx: &mut Context<'_>,
        _vertex: &VertexRef<'_, u64, ()>,
    ) -> ProgramResult<EdgeDir> {
        Ok(EdgeDir::None)
    }

    fn apply(
        &mut self,
        _ctx: &mut Context<'_>,
        vertex: &mut VertexMut<'_, u64>,
        _total: (),
    ) -> ProgramResult<()> {
        *vertex.data_mut() += 1;
        Ok(())
    }

    fn scatter_edges(
        &self,
        ctx: &mut Context<'_>,
        _vertex: &VertexRef<'_, u64, ()>,
    ) -> ProgramResult<EdgeDir> {
        if ctx.rng().gen::<f64>() < self.reset_prob {
            Ok(EdgeDir::None)
        } else {
            Ok(EdgeDir::Out)
        }
    }

    fn scatter(
        &self,
        ctx: &mut Context<'_>,
        vertex: &VertexRef<'_, u64, ()>,
        edge: &EdgeRef<'_, u64, ()>,
    ) -> ProgramResult<()> {
        let follow = 1.0 / vertex.num_out_edges() as f64;
        if ctx.rng().gen::<f64>() < follow {
            ctx.signal_vertex(&edge.target());
        }
        Ok(())
    }
}

/// Outcome of [`simulate_random_walks`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Injection rounds run
    pub rounds: usize,
    /// Visits recorded across all vertices
    pub total_visits: u64,
    /// Visits recorded during the final round
    pub last_round_visits: u64,
}

/// Inject walkers until at least `max_visits` visits are recorded
///
/// Every round selects each vertex with probability `1 / num_vertices`,
/// signals the selection and runs the engine to quiescence. The loop stops
/// at the first round boundary where the total reaches `max_visits`.
pub async fn simulate_random_walks<R>(
    engine: &mut Engine<'_, RandomWalk>,
    max_visits: u64,
    rng: &mut R,
) -> Result<SimulationReport, EngineError>
where
    R: Rng,
{
    let mut report = SimulationReport {
        rounds: 0,
        total_visits: total_visits(engine)?,
        last_round_visits: 0,
    };

    let num_vertices = engine.graph().num_vertices();
    if num_vertices == 0 {
        return Ok(report);
    }
    let pick = 1.0 / num_vertices as f64;

    while report.total_visits < max_visits {
        let walkers = engine.select(|_| rng.gen::<f64>() < pick)?;
        engine.signal_vset(&walkers)?;
        engine.start().await?;

        let total = total_visits(engine)?;
        report.rounds += 1;
        report.last_round_visits = total - report.total_visits;
        report.total_visits = total;
        debug!(
            round = report.rounds,
            walkers = walkers.len(),
            total_visits = total,
            "Simulation round finished"
        );
    }

    info!(
        rounds = report.rounds,
        total_visits = report.total_visits,
        "Simulation finished"
    );
    Ok(report)
}

fn total_visits(engine: &Engine<'_, RandomWalk>) -> Result<u64, EngineError> {
    engine.map_reduce_vertices(|v| *v.data(), |acc, visits| *acc += visits)
}

/// Writes `vertex:{id}\t{visits / total_visits}` lines
#[derive(Debug, Clone, Copy)]
pub struct VisitShareWriter {
    total_visits: u64,
}

impl VisitShareWriter {
    pub fn new(total_visits: u64) -> Self {
        Self {
            total_visits: total_visits.max(1),
        }
    }
}

impl GraphWriter<u64, ()> for VisitShareWriter {
    fn save_vertex(&self, vertex: &VertexRef<'_, u64, ()>) -> String {
        format!(
            "vertex:{}\t{}\n",
            vertex.id(),
            *vertex.data() as f64 / self.total_visits as f64
        )
    }
}
