//! Match play - planning and running the sampled matches of a pass
//!
//! Level 2 - Phase-level implementation

use std::sync::Arc;

use conquest_core::{run_match, Agent, MatchConfig, MatchError, MatchOutcome, Topology};
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::config::EvalConfig;

/// One planned match: who sits where, and the seed it is played with
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchPlan {
    /// Position of the match in the pass
    pub index: usize,
    /// Population indices, in seat order
    pub participants: Vec<usize>,
    pub seed: u64,
}

/// A played match
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchResult {
    pub plan: MatchPlan,
    pub outcome: MatchOutcome,
}

/// Draw every match of a pass from the master RNG (Level 2 phase)
///
/// Each plan samples `players_per_match` distinct agents uniformly, then a
/// seed. Plans are drawn in order, so the whole pass depends only on the
/// master RNG.
pub fn plan_matches<R: Rng>(population: usize, config: &EvalConfig, rng: &mut R) -> Vec<MatchPlan> {
    let seats = config.players_per_match.min(population);
    if seats < 2 {
        return Vec::new();
    }

    (0..config.matches_per_evaluation)
        .map(|i| {
            let participants = index::sample(rng, population, seats).into_vec();
            let seed = rng.gen();
            MatchPlan {
                index: i,
                participants,
                seed,
            }
        })
        .collect()
}

/// Play planned matches (Level 2 phase)
///
/// Results come back in plan order whether or not they ran in parallel.
pub fn play_matches(
    topology: &Arc<Topology>,
    agents: &[Agent],
    plans: &[MatchPlan],
    config: &EvalConfig,
) -> Result<Vec<MatchResult>, MatchError> {
    if config.parallel {
        execute_parallel(topology, agents, plans, &config.match_config)
    } else {
        execute_sequential(topology, agents, plans, &config.match_config)
    }
}

// ============================================================================
// Level 3 - Steps
// ============================================================================

fn execute_sequential(
    topology: &Arc<Topology>,
    agents: &[Agent],
    plans: &[MatchPlan],
    match_config: &MatchConfig,
) -> Result<Vec<MatchResult>, MatchError> {
    plans
        .iter()
        .map(|plan| play_planned(topology, agents, plan, match_config))
        .collect()
}

/// Execute matches in parallel using rayon
fn execute_parallel(
    topology: &Arc<Topology>,
    agents: &[Agent],
    plans: &[MatchPlan],
    match_config: &MatchConfig,
) -> Result<Vec<MatchResult>, MatchError> {
    plans
        .par_iter()
        .map(|plan| play_planned(topology, agents, plan, match_config))
        .collect()
}

/// Play a single planned match on its own RNG
fn play_planned(
    topology: &Arc<Topology>,
    agents: &[Agent],
    plan: &MatchPlan,
    match_config: &MatchConfig,
) -> Result<MatchResult, MatchError> {
    let seated: Vec<Agent> = plan.participants.iter().map(|&i| agents[i].clone()).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(plan.seed);

    let outcome = run_match(Arc::clone(topology), seated, match_config, &mut rng)?;
    tracing::trace!(
        index = plan.index,
        winner = ?outcome.winner_agent,
        rounds = outcome.rounds_played,
        "evaluation match played"
    );

    Ok(MatchResult {
        plan: plan.clone(),
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use conquest_core::{Gene, Strategy, ALL_STRATEGIES};

    fn population() -> Vec<Agent> {
        ALL_STRATEGIES
            .iter()
            .cycle()
            .take(12)
            .enumerate()
            .map(|(i, &s)| Agent::new(i as u32, Gene::simple(s)))
            .collect()
    }

    fn topology() -> Arc<Topology> {
        Arc::new(Topology::standard().unwrap())
    }

    #[test]
    fn test_plans_have_distinct_participants() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let plans = plan_matches(12, &EvalConfig::default(), &mut rng);
        assert_eq!(plans.len(), 20);
        for (i, plan) in plans.iter().enumerate() {
            assert_eq!(plan.index, i);
            assert_eq!(plan.participants.len(), 6);
            let mut sorted = plan.participants.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), 6);
            assert!(plan.participants.iter().all(|&p| p < 12));
        }
    }

    #[test]
    fn test_plans_depend_only_on_seed() {
        let config = EvalConfig::default();
        let a = plan_matches(12, &config, &mut ChaCha8Rng::seed_from_u64(9));
        let b = plan_matches(12, &config, &mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_too_small_population_plans_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert!(plan_matches(1, &EvalConfig::default(), &mut rng).is_empty());
        // Seats shrink to the population size
        let plans = plan_matches(3, &EvalConfig::default(), &mut rng);
        assert!(plans.iter().all(|p| p.participants.len() == 3));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let agents = population();
        let topo = topology();
        let config = EvalConfig::new(8)
            .with_match_config(MatchConfig::default().with_max_rounds(30));
        let plans = plan_matches(agents.len(), &config, &mut ChaCha8Rng::seed_from_u64(5));

        let parallel = play_matches(&topo, &agents, &plans, &config).unwrap();
        let sequential = play_matches(&topo, &agents, &plans, &config.clone().sequential()).unwrap();

        assert_eq!(parallel, sequential);
        assert_eq!(parallel.len(), 8);
    }

    #[test]
    fn test_results_follow_plan_order() {
        let agents = population();
        let topo = topology();
        let config = EvalConfig::new(5);
        let plans = plan_matches(agents.len(), &config, &mut ChaCha8Rng::seed_from_u64(1));
        let results = play_matches(&topo, &agents, &plans, &config).unwrap();

        for (plan, result) in plans.iter().zip(&results) {
            assert_eq!(&result.plan, plan);
            assert_eq!(result.outcome.territories.len(), plan.participants.len());
            if let Some(agent) = result.outcome.winner_agent {
                assert!(plan.participants.iter().any(|&i| agents[i].id == agent));
            }
        }
    }

    #[test]
    fn test_pacifist_table_is_capped() {
        let agents: Vec<Agent> = (0..6)
            .map(|i| Agent::new(i, Gene::simple(Strategy::Pacifist)))
            .collect();
        let config = EvalConfig::new(2)
            .with_match_config(MatchConfig::default().with_max_rounds(3))
            .sequential();
        let plans = plan_matches(6, &config, &mut ChaCha8Rng::seed_from_u64(3));
        let results = play_matches(&topology(), &agents, &plans, &config).unwrap();
        assert!(results.iter().all(|r| r.outcome.capped && r.outcome.rounds_played == 3));
    }
}
