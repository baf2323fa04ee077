//! Integration tests for the CONQUEST evolution stack
//!
//! Tests the full stack: map topology, match rules, strategies, evaluation
//! and evolution

use std::sync::Arc;

use conquest_core::{
    rules, run_match, Agent, Attack, Gene, Match, MatchConfig, MatchState, MatchStatus, PlayerId,
    Strategy, Topology, ALL_STRATEGIES,
};
use conquest_evolve::{evolve, EvolutionConfig};
use conquest_tournament::{evaluate_population, EvalConfig};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn topology() -> Arc<Topology> {
    Arc::new(Topology::standard().unwrap())
}

/// One agent per strategy, in code order
fn every_strategy() -> Vec<Agent> {
    ALL_STRATEGIES
        .iter()
        .enumerate()
        .map(|(i, &s)| Agent::new(i as u32, Gene::simple(s)))
        .collect()
}

// ============================================================================
// BOARD AND RULES
// ============================================================================

#[test]
fn test_initial_deal_covers_board() {
    let topo = topology();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let state = MatchState::initialize(Arc::clone(&topo), 6, 20, &mut rng);

    for seat in 0..6u8 {
        let player = PlayerId(seat);
        assert_eq!(state.territory_count(player), 7);
        assert_eq!(state.total_troops(player), 20);
    }
    assert!(state.iter().all(|(_, t)| t.owner.is_some() && t.troops >= 1));
}

#[test]
fn test_adjacency_is_symmetric() {
    let topo = topology();
    for a in topo.territories() {
        for &b in topo.neighbours(a) {
            assert!(topo.are_adjacent(b, a), "{} -> {}", topo.name(a), topo.name(b));
        }
    }
}

#[test]
fn test_invalid_attack_leaves_state_unchanged() {
    let topo = topology();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut state = MatchState::initialize(Arc::clone(&topo), 2, 20, &mut rng);
    let brazil = topo.territory("Brazil").unwrap();
    let japan = topo.territory("Japan").unwrap();
    state.set(brazil, Some(PlayerId(0)), 9);
    state.set(japan, Some(PlayerId(1)), 2);
    let before: Vec<_> = state.iter().map(|(_, t)| *t).collect();

    assert!(rules::resolve_attack(&mut state, Attack::new(brazil, japan)).is_err());
    let after: Vec<_> = state.iter().map(|(_, t)| *t).collect();
    assert_eq!(after, before);
}

// ============================================================================
// MATCHES
// ============================================================================

#[test]
fn test_full_match_between_all_strategies() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let outcome = run_match(
        topology(),
        every_strategy()[..6].to_vec(),
        &MatchConfig::default(),
        &mut rng,
    )
    .unwrap();

    assert!(outcome.rounds_played <= 100);
    assert_eq!(outcome.territories.iter().sum::<u32>(), 42);
    if !outcome.capped {
        let winner = outcome.winner.unwrap();
        assert_eq!(outcome.territories[winner.index()], 42);
    }
}

#[test]
fn test_match_snapshot_after_each_turn() {
    let mut game = Match::new(
        topology(),
        every_strategy()[2..6].to_vec(),
        MatchConfig::default().with_max_rounds(5),
        ChaCha8Rng::seed_from_u64(11),
    )
    .unwrap();
    game.start().unwrap();

    while game.status() == MatchStatus::Playing {
        let record = game.play_turn().unwrap();
        let snapshot = game.snapshot();
        assert_eq!(snapshot.territories.len(), 42);
        assert_eq!(snapshot.last_turn.as_ref().map(|t| t.player), Some(record.player));
        assert!(snapshot.to_json().unwrap().contains("\"territories\""));
    }

    assert_eq!(game.status(), MatchStatus::Finished);
    assert!(game.outcome().is_some());
}

#[test]
fn test_pacifists_never_attack() {
    let agents: Vec<Agent> = (0..4)
        .map(|i| Agent::new(i, Gene::simple(Strategy::Pacifist)))
        .collect();
    let mut game = Match::new(
        topology(),
        agents,
        MatchConfig::default().with_max_rounds(4),
        ChaCha8Rng::seed_from_u64(1),
    )
    .unwrap();

    let outcome = game.run_to_end().unwrap();
    assert!(outcome.capped);
    assert_eq!(outcome.rounds_played, 4);
    assert_eq!(outcome.winner, Some(PlayerId(0)));
}

// ============================================================================
// EVALUATION AND EVOLUTION
// ============================================================================

#[test]
fn test_evaluation_is_seed_deterministic() {
    let config = EvalConfig::new(8).with_match_config(MatchConfig::default().with_max_rounds(30));
    let run = |parallel: bool| {
        let mut agents = every_strategy();
        let config = if parallel { config.clone() } else { config.clone().sequential() };
        let summary = evaluate_population(
            &mut agents,
            &topology(),
            &config,
            &mut ChaCha8Rng::seed_from_u64(17),
        )
        .unwrap();
        (agents, summary)
    };

    assert_eq!(run(true), run(false));
}

#[test]
fn test_small_evolution_run() {
    let config = EvolutionConfig {
        population_size: 10,
        generations: 4,
        elitism: 2,
        evaluation: EvalConfig::new(5)
            .with_players(4)
            .with_match_config(MatchConfig::default().with_max_rounds(25)),
        ..Default::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(2024);

    let result = evolve(topology(), &config, &mut rng).unwrap();

    assert_eq!(result.history.len(), 4);
    assert_eq!(result.population.len(), 10);
    assert!(result
        .history
        .windows(2)
        .all(|w| w[1].champion_fitness >= w[0].champion_fitness));
    assert!(result.best_ever.fitness >= result.champion.fitness);
}

#[test]
fn test_hybrid_gene_round_trip_through_evolution() {
    let config = EvolutionConfig {
        population_size: 8,
        generations: 2,
        elitism: 1,
        hybrid_genes: true,
        evaluation: EvalConfig::new(3)
            .with_players(4)
            .with_match_config(MatchConfig::default().with_max_rounds(15)),
        ..Default::default()
    };
    let result = evolve(topology(), &config, &mut ChaCha8Rng::seed_from_u64(8)).unwrap();

    let gene = result.champion.gene;
    assert!(gene.is_hybrid());
    let parsed: Gene = gene.to_string().parse().unwrap();
    assert_eq!(parsed, gene);
}
