//! Evolution command - run the genetic algorithm over strategy genes
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: build_evolution_config(), run_evolution(), save_results()
//! - Level 3: apply_overrides(), create_progress_bar()
//! - Level 4: file I/O, formatting utilities

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use conquest_core::{Agent, Topology};
use conquest_evolve::{evolve_with_callback, EvolutionConfig, EvolutionResult, GenerationStats};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

/// Flags left unset fall back to the config file, then to the defaults
#[derive(Args, Default)]
pub struct EvolveArgs {
    /// Evolution config JSON file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Population size
    #[arg(long)]
    pub population: Option<usize>,

    /// Number of generations to run
    #[arg(long)]
    pub generations: Option<usize>,

    /// Matches per fitness evaluation
    #[arg(long)]
    pub matches: Option<usize>,

    /// Players seated per match
    #[arg(long)]
    pub players: Option<usize>,

    /// Number of elite individuals to preserve
    #[arg(long)]
    pub elitism: Option<usize>,

    /// Initial mutation rate (0.0-1.0)
    #[arg(long)]
    pub mutation_rate: Option<f64>,

    /// Initial crossover rate (0.0-1.0)
    #[arg(long)]
    pub crossover_rate: Option<f64>,

    /// Round cap per match
    #[arg(long)]
    pub max_rounds: Option<u32>,

    /// Evolve 9-bit hybrid genes
    #[arg(long)]
    pub hybrid: bool,

    /// Play evaluation matches on one thread
    #[arg(long)]
    pub sequential: bool,

    /// Output directory for results
    #[arg(long, default_value = "evolution_output")]
    pub output: PathBuf,

    /// Print the result summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Contents of `champion.json`
#[derive(Serialize)]
struct ChampionFile<'a> {
    created: DateTime<Utc>,
    seed: u64,
    champion: &'a Agent,
    best_ever: &'a Agent,
    config: &'a EvolutionConfig,
}

/// Contents of `history.json`
#[derive(Serialize)]
struct HistoryFile<'a> {
    created: DateTime<Utc>,
    seed: u64,
    generations: &'a [GenerationStats],
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run evolution command
///
/// This function reads like a table of contents:
/// 1. Build the configuration (file, then flags)
/// 2. Run the evolution loop with a progress bar
/// 3. Save and report results
pub fn run(args: EvolveArgs, topology: Arc<Topology>, seed: Option<u64>) -> Result<()> {
    let config = build_evolution_config(&args)?;
    let seed = seed.or(config.seed).unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    tracing::info!(
        "Starting evolution: pop={}, gen={}, matches={}, seed={}",
        config.population_size,
        config.generations,
        config.evaluation.matches_per_evaluation,
        seed
    );

    let result = run_evolution(topology, &config, &args, &mut rng)?;

    save_results(&result, &config, seed, &args.output)?;

    if args.json {
        print_json_results(&result, seed)?;
    } else {
        print_summary(&result, &args);
    }

    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Build evolution configuration from the config file and command arguments
fn build_evolution_config(args: &EvolveArgs) -> Result<EvolutionConfig> {
    let base = match &args.config {
        Some(path) => EvolutionConfig::load(path)?,
        None => EvolutionConfig::default(),
    };

    let config = apply_overrides(base, args);
    config.validate().context("Invalid evolution configuration")?;
    Ok(config)
}

/// Run the evolution loop with progress reporting
fn run_evolution(
    topology: Arc<Topology>,
    config: &EvolutionConfig,
    args: &EvolveArgs,
    rng: &mut ChaCha8Rng,
) -> Result<EvolutionResult> {
    let progress = create_progress_bar(config.generations as u64, args.json)?;

    let callback = |stats: &GenerationStats| {
        progress.set_message(format!(
            "best={:.1} avg={:.1} leader={}",
            stats.best_fitness, stats.mean_fitness, stats.best_strategy
        ));
        progress.inc(1);
    };

    let result = evolve_with_callback(topology, config, rng, callback)?;
    progress.finish_and_clear();

    Ok(result)
}

/// Save evolution results to output directory
fn save_results(
    result: &EvolutionResult,
    config: &EvolutionConfig,
    seed: u64,
    output: &Path,
) -> Result<()> {
    create_output_directory(output)?;
    let created = Utc::now();

    let champion = ChampionFile {
        created,
        seed,
        champion: &result.champion,
        best_ever: &result.best_ever,
        config,
    };
    write_json(&output.join("champion.json"), &champion)?;

    let history = HistoryFile {
        created,
        seed,
        generations: &result.history,
    };
    write_json(&output.join("history.json"), &history)?;

    Ok(())
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

fn apply_overrides(mut config: EvolutionConfig, args: &EvolveArgs) -> EvolutionConfig {
    if let Some(population) = args.population {
        config.population_size = population;
    }
    if let Some(generations) = args.generations {
        config.generations = generations;
    }
    if let Some(matches) = args.matches {
        config.evaluation.matches_per_evaluation = matches;
    }
    if let Some(players) = args.players {
        config.evaluation.players_per_match = players;
    }
    if let Some(elitism) = args.elitism {
        config.elitism = elitism;
    }
    if let Some(rate) = args.mutation_rate {
        config.mutation_rate = rate;
    }
    if let Some(rate) = args.crossover_rate {
        config.crossover_rate = rate;
    }
    if let Some(max_rounds) = args.max_rounds {
        config.evaluation.match_config.max_rounds = max_rounds;
    }
    if args.hybrid {
        config.hybrid_genes = true;
    }
    if args.sequential {
        config.evaluation.parallel = false;
    }
    config
}

fn create_progress_bar(generations: u64, hidden: bool) -> Result<ProgressBar> {
    if hidden {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(generations);
    bar.set_style(
        ProgressStyle::with_template("{elapsed_precise} [{bar:40}] {pos}/{len} {msg}")
            .context("Invalid progress template")?
            .progress_chars("=> "),
    );
    Ok(bar)
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn create_output_directory(output: &Path) -> Result<()> {
    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory {}", output.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Saved {}", path.display());
    Ok(())
}

/// Print JSON results to stdout
fn print_json_results(result: &EvolutionResult, seed: u64) -> Result<()> {
    #[derive(Serialize)]
    struct JsonOutput<'a> {
        seed: u64,
        generations_run: usize,
        best_fitness: f64,
        final_avg_fitness: f64,
        champion: &'a Agent,
        best_ever: &'a Agent,
    }

    let last = result.history.last();
    let output = JsonOutput {
        seed,
        generations_run: result.history.len(),
        best_fitness: last.map_or(0.0, |s| s.best_fitness),
        final_avg_fitness: last.map_or(0.0, |s| s.mean_fitness),
        champion: &result.champion,
        best_ever: &result.best_ever,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Print summary to console
fn print_summary(result: &EvolutionResult, args: &EvolveArgs) {
    println!("\n=== Evolution Complete ===");
    println!("Generations: {}", result.history.len());
    println!("Champion:    {}", result.champion);
    println!("Best ever:   {}", result.best_ever);
    if let Some(last) = result.history.last() {
        println!("Final avg fitness: {:.2}", last.mean_fitness);
        println!("\nFinal gene distribution:");
        for (gene, count) in &last.gene_histogram {
            println!("  {:>9}  {}", gene.to_string(), count);
        }
    }
    println!("Output directory: {}", args.output.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_flags() {
        let config = build_evolution_config(&EvolveArgs::default()).unwrap();
        assert_eq!(config, EvolutionConfig::default());
    }

    #[test]
    fn test_flags_override_config() {
        let args = EvolveArgs {
            population: Some(12),
            generations: Some(3),
            players: Some(4),
            elitism: Some(2),
            max_rounds: Some(30),
            hybrid: true,
            sequential: true,
            ..Default::default()
        };
        let config = build_evolution_config(&args).unwrap();
        assert_eq!(config.population_size, 12);
        assert_eq!(config.generations, 3);
        assert_eq!(config.evaluation.players_per_match, 4);
        assert_eq!(config.evaluation.match_config.max_rounds, 30);
        assert!(config.hybrid_genes);
        assert!(!config.evaluation.parallel);
        // Untouched values keep their defaults
        assert_eq!(config.evaluation.matches_per_evaluation, 20);
    }

    #[test]
    fn test_invalid_flags_rejected() {
        let args = EvolveArgs {
            mutation_rate: Some(2.0),
            ..Default::default()
        };
        assert!(build_evolution_config(&args).is_err());
    }

    #[test]
    fn test_save_results_writes_files() {
        let config = EvolutionConfig {
            population_size: 8,
            generations: 2,
            elitism: 1,
            ..Default::default()
        }
        .with_seed(5);
        let mut eval = config.clone();
        eval.evaluation.matches_per_evaluation = 2;
        eval.evaluation.match_config.max_rounds = 10;

        let topology = Arc::new(Topology::standard().unwrap());
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let result = conquest_evolve::evolve(topology, &eval, &mut rng).unwrap();

        let dir = std::env::temp_dir().join(format!("conquest-evolve-out-{}", std::process::id()));
        save_results(&result, &eval, 5, &dir).unwrap();

        let champion: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("champion.json")).unwrap()).unwrap();
        let history: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("history.json")).unwrap()).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(champion["seed"], 5);
        assert!(champion["created"].is_string());
        assert_eq!(history["generations"].as_array().unwrap().len(), 2);
    }
}
