//! # Demo Workloads
//!
//! Each demo follows the same shape: load an edge list, finalize the graph,
//! initialize vertex data, seed the activation queue, run the engine and
//! optionally save per-partition results.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};

use gas_engine::prelude::*;

use crate::config::Config;

// =============================================================================
// REPORT
// =============================================================================
/// What a demo run produced.
///
/// Printed as text by default, or as JSON with `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct DemoReport {
    pub workload: &'static str,
    pub vertices: usize,
    pub edges: usize,
    pub partitions: usize,
    /// Summary of the engine run (absent for multi-round simulations)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
    /// Wall time across every run of the engine
    pub elapsed_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationReport>,
    pub saved: Vec<PathBuf>,
}

impl std::fmt::Display for DemoReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "workload:    {}", self.workload)?;
        writeln!(
            f,
            "graph:       {} vertices, {} edges, {} partitions",
            self.vertices, self.edges, self.partitions
        )?;
        if let Some(summary) = &self.summary {
            writeln!(f, "mode:        {}", summary.mode)?;
            writeln!(f, "supersteps:  {}", summary.supersteps)?;
            writeln!(f, "updates:     {}", summary.updates)?;
            writeln!(f, "signals:     {}", summary.signals)?;
        }
        if let Some(simulation) = &self.simulation {
            writeln!(
                f,
                "walks:       {} rounds, {} visits",
                simulation.rounds, simulation.total_visits
            )?;
        }
        write!(f, "elapsed:     {:.3}s", self.elapsed_seconds)?;
        for path in &self.saved {
            write!(f, "\nsaved:       {}", path.display())?;
        }
        Ok(())
    }
}

// =============================================================================
// DEMOS
// =============================================================================
/// Adaptive PageRank: every vertex starts at 1.0 and reschedules its
/// neighbors until its rank moves by no more than the tolerance.
pub async fn pagerank(config: &Config, input: &Path, save: Option<&Path>) -> Result<DemoReport> {
    let mut graph: Graph<f64> = load_graph(config, input)?;
    graph.transform_vertices(|v| *v.data_mut() = 1.0)?;

    let program = PageRank::new(config.pagerank_params());
    let mut engine = Engine::new(&mut graph, program, config.engine_config())?;
    engine.signal_all();
    let summary = engine.start().await.context("PageRank run failed")?;
    let elapsed_seconds = engine.elapsed_seconds();
    drop(engine);

    let writer = PageRankWriter::new(graph.num_vertices());
    let saved = save_results(&graph, &writer, save)?;

    Ok(report("pagerank", &graph, Some(summary), elapsed_seconds, None, saved))
}

/// PageRank with a fixed number of applies per vertex.
pub async fn fixed_iter(config: &Config, input: &Path, save: Option<&Path>) -> Result<DemoReport> {
    let mut graph: Graph<PageRankVertex> = load_graph(config, input)?;
    graph.transform_vertices(|v| *v.data_mut() = PageRankVertex::new(1.0))?;

    let program = FixedIterPageRank::new(config.pagerank_params(), config.schedule_count);
    let mut engine = Engine::new(&mut graph, program, config.engine_config())?;
    engine.signal_all();
    let summary = engine
        .start()
        .await
        .context("fixed-iteration PageRank run failed")?;
    let elapsed_seconds = engine.elapsed_seconds();
    drop(engine);

    let writer = PageRankWriter::new(graph.num_vertices());
    let saved = save_results(&graph, &writer, save)?;

    Ok(report("fixed-iter", &graph, Some(summary), elapsed_seconds, None, saved))
}

/// Random-walk simulation: inject walkers round by round until the visit
/// budget is spent, then report each vertex's share of the visits.
pub async fn simulate(config: &Config, input: &Path, save: Option<&Path>) -> Result<DemoReport> {
    let mut graph: Graph<u64> = load_graph(config, input)?;

    let program = RandomWalk::new(config.reset_prob);
    let mut engine = Engine::new(&mut graph, program, config.engine_config())?;
    let mut rng = match config.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let simulation = simulate_random_walks(&mut engine, config.max_visits, &mut rng)
        .await
        .context("random-walk simulation failed")?;
    let elapsed_seconds = engine.elapsed_seconds();
    drop(engine);

    let writer = VisitShareWriter::new(simulation.total_visits);
    let saved = save_results(&graph, &writer, save)?;

    Ok(report(
        "simulate",
        &graph,
        None,
        elapsed_seconds,
        Some(simulation),
        saved,
    ))
}

// =============================================================================
// HELPERS
// =============================================================================
fn load_graph<V: Default>(config: &Config, input: &Path) -> Result<Graph<V>> {
    let mut graph = match config.partitions {
        Some(n) => Graph::with_partitions(n),
        None => Graph::new(),
    };

    let edges = graph
        .load(input, config.format)
        .with_context(|| format!("Failed to load graph from {}", input.display()))?;
    graph.finalize()?;

    info!(
        path = %input.display(),
        edges,
        vertices = graph.num_vertices(),
        partitions = graph.num_partitions(),
        "Graph loaded"
    );
    Ok(graph)
}

fn save_results<V, W>(graph: &Graph<V>, writer: &W, prefix: Option<&Path>) -> Result<Vec<PathBuf>>
where
    W: GraphWriter<V, ()>,
{
    let Some(prefix) = prefix else {
        debug!("No output prefix given, skipping save");
        return Ok(Vec::new());
    };

    graph
        .save(prefix, writer, SaveOptions::default())
        .with_context(|| format!("Failed to save results to {}", prefix.display()))
}

fn report<V>(
    workload: &'static str,
    graph: &Graph<V>,
    summary: Option<RunSummary>,
    elapsed_seconds: f64,
    simulation: Option<SimulationReport>,
    saved: Vec<PathBuf>,
) -> DemoReport {
    DemoReport {
        workload,
        vertices: graph.num_vertices(),
        edges: graph.num_edges(),
        partitions: graph.num_partitions(),
        summary,
        elapsed_seconds,
        simulation,
        saved,
    }
}
