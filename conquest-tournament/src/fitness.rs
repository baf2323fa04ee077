//! Fitness evaluation for evolution
//!
//! Level 1 - Orchestration of one evaluation pass

use std::cmp::Ordering;
use std::sync::Arc;

use conquest_core::{Agent, MatchError, PlayerId, Topology};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::EvalConfig;
use crate::match_play::{plan_matches, play_matches, MatchResult};

/// Aggregate view of one evaluation pass
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub matches_played: usize,
    /// Matches that ended on the round cap
    pub capped_matches: usize,
    pub mean_rounds: f64,
    pub best_fitness: f64,
    pub mean_fitness: f64,
}

/// Score every agent by sampled matches and rank the population (Level 1)
///
/// Resets statistics, plays `matches_per_evaluation` matches drawn from
/// `rng`, reduces their outcomes, recomputes fitness and sorts `agents` by
/// descending fitness (stable, so ties keep their previous order).
pub fn evaluate_population<R: Rng>(
    agents: &mut [Agent],
    topology: &Arc<Topology>,
    config: &EvalConfig,
    rng: &mut R,
) -> Result<EvaluationSummary, MatchError> {
    for agent in agents.iter_mut() {
        agent.reset_stats();
    }

    let plans = plan_matches(agents.len(), config, rng);
    let results = play_matches(topology, agents, &plans, config)?;
    apply_results(agents, &results);

    for agent in agents.iter_mut() {
        agent.compute_fitness();
    }
    rank(agents);

    let summary = summarize(agents, &results);
    tracing::debug!(
        matches = summary.matches_played,
        capped = summary.capped_matches,
        best = summary.best_fitness,
        "population evaluated"
    );
    Ok(summary)
}

// ============================================================================
// Level 3 - Steps
// ============================================================================

/// Fold match outcomes into the statistics of the seated agents
///
/// `agents` must be in the order the plans were drawn against.
pub fn apply_results(agents: &mut [Agent], results: &[MatchResult]) {
    for result in results {
        for (seat, &idx) in result.plan.participants.iter().enumerate() {
            let player = PlayerId(seat as u8);
            let won = result.outcome.winner == Some(player);
            let held = result.outcome.territories.get(seat).copied().unwrap_or(0);
            agents[idx].stats.record(won, held);
        }
    }
}

/// Stable sort by descending fitness
fn rank(agents: &mut [Agent]) {
    agents.sort_by(|a, b| b.fitness.partial_cmp(&a.fitness).unwrap_or(Ordering::Equal));
}

fn summarize(agents: &[Agent], results: &[MatchResult]) -> EvaluationSummary {
    let matches_played = results.len();
    let capped_matches = results.iter().filter(|r| r.outcome.capped).count();
    let mean_rounds = if matches_played > 0 {
        results
            .iter()
            .map(|r| r.outcome.rounds_played as f64)
            .sum::<f64>()
            / matches_played as f64
    } else {
        0.0
    };
    let best_fitness = agents.first().map(|a| a.fitness).unwrap_or(0.0);
    let mean_fitness = if agents.is_empty() {
        0.0
    } else {
        agents.iter().map(|a| a.fitness).sum::<f64>() / agents.len() as f64
    };

    EvaluationSummary {
        matches_played,
        capped_matches,
        mean_rounds,
        best_fitness,
        mean_fitness,
    }
}
