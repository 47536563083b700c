//! Bundled vertex programs
//!
//! - [`PageRank`]: adaptive PageRank, each vertex stops once its rank settles
//! - [`FixedIterPageRank`]: PageRank with a fixed number of applies per vertex
//! - [`RandomWalk`]: random-walk simulation driven by [`simulate_random_walks`]

mod fixed_iter;
mod pagerank;
mod random_walk;
mod reference;

pub use fixed_iter::{FixedIterPageRank, PageRankVertex, SCHEDULE_COUNT};
pub use pagerank::{PageRank, PageRankParams, PageRankWriter, RESET_PROB, TOLERANCE};
pub use random_walk::{
    simulate_random_walks, RandomWalk, SimulationReport, VisitShareWriter, MAX_VISITS,
};
pub use reference::reference_pagerank;
