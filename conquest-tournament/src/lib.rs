//! CONQUEST Tournament - Fitness evaluation through sampled matches
//!
//! This crate scores a population of agents:
//! - Planning matches (participants and seeds drawn from a master RNG)
//! - Running the planned matches, sequentially or on rayon workers
//! - Reducing outcomes into agent statistics and fitness
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: evaluate_population (orchestration)
//! - Level 2: plan_matches, play_matches (phases)
//! - Level 3: play_planned, apply_results (steps)
//! - Level 4: utilities, configuration

mod config;
mod fitness;
mod match_play;

pub use config::EvalConfig;
pub use fitness::{apply_results, evaluate_population, EvaluationSummary};
pub use match_play::{plan_matches, play_matches, MatchPlan, MatchResult};
