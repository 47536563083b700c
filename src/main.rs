//! # GAS Demos
//!
//! Command-line front end for the `gas-engine` crate. Runs one of the
//! bundled vertex programs over an edge-list file.
//!
//! This application demonstrates:
//! - Loading a partitioned graph from edge-list files
//! - Synchronous and asynchronous Gather/Apply/Scatter execution
//! - Writing per-partition results
//!
//! ## Quick Start
//! ```bash
//! cargo run -- pagerank --graph web-Google.txt --format snap --save out/rank
//! ```

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

/// Configuration management
mod config;

/// Demo workloads
mod demos;

// =============================================================================
// IMPORTS
// =============================================================================
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use gas_engine::{ExecutionMode, GraphFormat};

use crate::config::Config;
use crate::demos::DemoReport;

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
/// # Rust Concept: Subcommands with Clap
///
/// A `#[derive(Subcommand)]` enum gives each workload its own arguments,
/// while `global = true` options may appear before or after the subcommand.
#[derive(Parser, Debug)]
#[command(
    name = "gas-demos",
    version = "0.1.0",
    about = "Run PageRank and random-walk workloads on a Gather/Apply/Scatter engine",
    long_about = r#"
GAS Demos - vertex programs over partitioned graphs.

Input is a directory or file of edge lists, one "source target" pair per
line. Results are written as one file per partition, named
{prefix}_{k}_of_{n}.

EXAMPLES:
  # Adaptive PageRank on a SNAP dump, four partitions, asynchronous
  gas-demos --partitions 4 --mode async pagerank --graph web.txt --format snap

  # Ten applies per vertex, results under out/
  gas-demos fixed-iter --graph edges/ --save out/rank

  # Random walks until 10000 visits are recorded
  gas-demos simulate --graph edges.tsv --max-visits 10000 --seed 7
"#
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Number of graph partitions (overrides GAS_PARTITIONS)
    #[arg(short = 'p', long = "partitions", global = true)]
    partitions: Option<usize>,

    /// Execution mode: sync or async (overrides GAS_EXEC_MODE)
    #[arg(short = 'm', long = "mode", global = true)]
    mode: Option<ExecutionMode>,

    /// Seed for reproducible runs (overrides GAS_SEED)
    #[arg(long = "seed", global = true)]
    seed: Option<u64>,

    /// Print the run report as JSON
    #[arg(long = "json", global = true, default_value = "false")]
    json: bool,

    /// Verbose output (debug logging)
    #[arg(
        short = 'v',
        long = "verbose",
        help = "Enable verbose/debug logging",
        global = true,
        default_value = "false"
    )]
    verbose: bool,
}

/// Options shared by every workload
#[derive(clap::Args, Debug)]
struct GraphArgs {
    /// Edge-list file or directory of files
    #[arg(short = 'g', long = "graph", value_name = "PATH")]
    graph: PathBuf,

    /// Edge-list format: tsv or snap (overrides GAS_FORMAT)
    #[arg(short = 'f', long = "format")]
    format: Option<GraphFormat>,

    /// Output prefix for per-partition result files
    #[arg(short = 's', long = "save", value_name = "PREFIX")]
    save: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// PageRank until every rank changes by at most the tolerance
    Pagerank {
        #[command(flatten)]
        graph: GraphArgs,

        /// Convergence tolerance (overrides GAS_TOLERANCE)
        #[arg(short = 't', long = "tolerance")]
        tolerance: Option<f64>,

        /// Random-jump probability (overrides GAS_RESET_PROB)
        #[arg(short = 'r', long = "reset-prob")]
        reset_prob: Option<f64>,
    },

    /// PageRank with a fixed number of applies per vertex
    FixedIter {
        #[command(flatten)]
        graph: GraphArgs,

        /// Applies per vertex (overrides GAS_SCHEDULE_COUNT)
        #[arg(short = 'n', long = "iterations")]
        iterations: Option<usize>,
    },

    /// Random-walk simulation until a visit budget is spent
    Simulate {
        #[command(flatten)]
        graph: GraphArgs,

        /// Visit budget (overrides GAS_MAX_VISITS)
        #[arg(long = "max-visits")]
        max_visits: Option<u64>,

        /// Probability a walker stops at each step (overrides GAS_RESET_PROB)
        #[arg(short = 'r', long = "reset-prob")]
        reset_prob: Option<f64>,
    },
}

impl Args {
    /// Fold command-line overrides into the environment configuration.
    fn apply_to(&self, config: &mut Config) {
        if let Some(partitions) = self.partitions {
            config.partitions = Some(partitions);
        }
        if let Some(mode) = self.mode {
            config.execution_mode = mode;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }

        let graph = self.command.graph_args();
        if let Some(format) = graph.format {
            config.format = format;
        }

        match &self.command {
            Command::Pagerank {
                tolerance,
                reset_prob,
                ..
            } => {
                if let Some(tolerance) = tolerance {
                    config.tolerance = *tolerance;
                }
                if let Some(reset_prob) = reset_prob {
                    config.reset_prob = *reset_prob;
                }
            }
            Command::FixedIter { iterations, .. } => {
                if let Some(iterations) = iterations {
                    config.schedule_count = *iterations;
                }
            }
            Command::Simulate {
                max_visits,
                reset_prob,
                ..
            } => {
                if let Some(max_visits) = max_visits {
                    config.max_visits = *max_visits;
                }
                if let Some(reset_prob) = reset_prob {
                    config.reset_prob = *reset_prob;
                }
            }
        }
    }
}

impl Command {
    fn graph_args(&self) -> &GraphArgs {
        match self {
            Command::Pagerank { graph, .. }
            | Command::FixedIter { graph, .. }
            | Command::Simulate { graph, .. } => graph,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Command::Pagerank { .. } => "pagerank",
            Command::FixedIter { .. } => "fixed-iter",
            Command::Simulate { .. } => "simulate",
        }
    }
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
/// The multi-threaded runtime lets asynchronous mode run partition workers
/// in parallel; synchronous mode fans out one task per partition per phase.
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    info!(workload = args.command.name(), "GAS demos starting up...");

    // Load configuration from environment/.env file, then apply flags
    let mut config = Config::from_env()?;
    args.apply_to(&mut config);
    config.validate()?;

    info!(
        mode = %config.execution_mode,
        format = %config.format,
        partitions = ?config.partitions,
        "Configuration loaded"
    );

    let graph = args.command.graph_args();
    let input = graph.graph.as_path();
    let save = graph.save.as_deref();

    let result = match &args.command {
        Command::Pagerank { .. } => demos::pagerank(&config, input, save).await,
        Command::FixedIter { .. } => demos::fixed_iter(&config, input, save).await,
        Command::Simulate { .. } => demos::simulate(&config, input, save).await,
    };

    match result {
        Ok(report) => print_report(&report, args.json)?,
        Err(e) => {
            error!(error = %e, "Run failed");
            eprintln!("\nRun failed: {:#}", e);
            return Err(e);
        }
    }

    info!("Run completed successfully");
    Ok(())
}

fn print_report(report: &DemoReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("\n{}", "=".repeat(60));
        println!("RUN REPORT");
        println!("{}\n", "=".repeat(60));
        println!("{}", report);
        println!("\n{}", "=".repeat(60));
    }
    Ok(())
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Initialize the tracing subscriber for structured logging.
///
/// Logs go to stderr so `--json` output on stdout stays machine-readable.
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
