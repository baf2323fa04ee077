//! Play command - run one match between chosen genes
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: seat_agents(), play_match(), report_results()
//! - Level 3: log_turn()
//! - Level 4: formatting utilities

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use conquest_core::{Agent, Gene, Match, MatchConfig, MatchOutcome, MatchSnapshot, Topology, TurnRecord};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct PlayArgs {
    /// Comma-separated genes, one per seat
    #[arg(long, value_delimiter = ',', default_value = "000,101,110,111,100,010")]
    pub genes: Vec<Gene>,

    /// Round cap
    #[arg(long, default_value = "100")]
    pub max_rounds: u32,

    /// Troops dealt to each player at setup
    #[arg(long, default_value = "20")]
    pub initial_troops: u32,

    /// Print the final snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

/// What a finished match leaves behind
struct PlayReport {
    outcome: MatchOutcome,
    snapshot: MatchSnapshot,
    turns: usize,
    conquests: usize,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run play command
///
/// 1. Seat one agent per gene
/// 2. Play the match turn by turn
/// 3. Report the outcome
pub fn run(args: PlayArgs, topology: Arc<Topology>, seed: Option<u64>) -> Result<()> {
    let agents = seat_agents(&args.genes);

    tracing::info!(
        "Starting match: {} players, max {} rounds",
        agents.len(),
        args.max_rounds
    );

    let config = MatchConfig::default()
        .with_max_rounds(args.max_rounds)
        .with_initial_troops(args.initial_troops);
    let report = play_match(topology, agents, config, create_rng(seed))?;

    report_results(&report, &args)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn seat_agents(genes: &[Gene]) -> Vec<Agent> {
    genes
        .iter()
        .enumerate()
        .map(|(i, &gene)| Agent::new(i as u32, gene))
        .collect()
}

fn play_match(
    topology: Arc<Topology>,
    agents: Vec<Agent>,
    config: MatchConfig,
    rng: ChaCha8Rng,
) -> Result<PlayReport> {
    let mut game = Match::new(topology, agents, config, rng).context("Failed to set up match")?;
    game.start()?;

    let mut turns = 0;
    let mut conquests = 0;
    while game.outcome().is_none() {
        let record = game.play_turn()?;
        log_turn(&record);
        turns += 1;
        conquests += record.conquests();
    }

    let outcome = game
        .outcome()
        .cloned()
        .context("Match ended without an outcome")?;

    Ok(PlayReport {
        outcome,
        snapshot: game.snapshot(),
        turns,
        conquests,
    })
}

fn report_results(report: &PlayReport, args: &PlayArgs) -> Result<()> {
    if args.json {
        println!("{}", report.snapshot.to_json()?);
    } else {
        print_text_results(report);
    }
    Ok(())
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

fn log_turn(record: &TurnRecord) {
    if record.eliminated {
        tracing::info!("Round {}: {} eliminated", record.round, record.player);
        return;
    }
    tracing::debug!(
        "Round {}: {} +{} troops, {} attacks ({} won), {} redistributed",
        record.round,
        record.player,
        record.reinforcements,
        record.attacks.len(),
        record.conquests(),
        record.redistributed
    );
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

/// Create RNG from seed or random
fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

fn print_text_results(report: &PlayReport) {
    let outcome = &report.outcome;

    println!("\n=== Match Results ===");
    println!("Rounds:    {}{}", outcome.rounds_played, if outcome.capped { " (capped)" } else { "" });
    println!("Turns:     {}", report.turns);
    println!("Conquests: {}", report.conquests);
    match outcome.winner {
        Some(winner) => println!("Winner:    {}", winner),
        None => println!("Winner:    none"),
    }

    println!("\nStandings:");
    for player in &report.snapshot.players {
        println!(
            "  {} {:<24} {:>2} territories {:>4} troops{}",
            player.seat,
            player.strategy,
            player.territories,
            player.troops,
            if player.eliminated { "  (eliminated)" } else { "" }
        );
    }
}
