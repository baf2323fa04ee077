//! CONQUEST Evolution - Genetic algorithm over strategy genes
//!
//! This crate provides the evolutionary loop:
//! - Population management and generational replacement
//! - Selection (elitism + roulette)
//! - Single-point crossover and bit-flip mutation
//! - Rate decay over generations and per-generation statistics

pub mod crossover;
pub mod mutation;
pub mod population;
pub mod selection;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use conquest_core::{Agent, MatchError, Topology};
use conquest_tournament::EvalConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crossover::crossover;
pub use mutation::mutate;
pub use population::{GenerationStats, Population};
pub use selection::{roulette_select, select_elite, select_parents};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Evolution configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub generations: usize,
    /// Initial mutation rate (decays to half by the last generation)
    pub mutation_rate: f64,
    /// Initial crossover rate (decays by 30% by the last generation)
    pub crossover_rate: f64,
    /// Agents carried forward unchanged
    pub elitism: usize,
    /// Use 9-bit hybrid genes instead of 3-bit ones
    pub hybrid_genes: bool,
    /// How each generation is scored
    pub evaluation: EvalConfig,
    /// Master seed (None = from entropy)
    pub seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 40,
            generations: 500,
            mutation_rate: 0.7,
            crossover_rate: 0.7,
            elitism: 6,
            hybrid_genes: false,
            evaluation: EvalConfig::default(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("at least one generation is required")]
    NoGenerations,

    #[error("matches need at least 2 players, got {0}")]
    TooFewPlayers(usize),

    #[error("population of {population} cannot seat {players} players per match")]
    PopulationTooSmall { population: usize, players: usize },

    #[error("breeding pool of {0} cannot supply two distinct parents")]
    PoolTooSmall(usize),

    #[error("elitism {elitism} exceeds the breeding pool of {pool}")]
    ElitismTooLarge { elitism: usize, pool: usize },

    #[error("{name} must be within [0, 1], got {value}")]
    RateOutOfRange { name: &'static str, value: f64 },
}

impl EvolutionConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_generations(mut self, generations: usize) -> Self {
        self.generations = generations;
        self
    }

    pub fn with_population(mut self, population_size: usize) -> Self {
        self.population_size = population_size;
        self
    }

    /// Size of the breeding pool
    pub fn pool_size(&self) -> usize {
        self.population_size / 2
    }

    /// `m0 * (1 - 0.5 * g / G)`
    pub fn mutation_rate_at(&self, generation: usize) -> f64 {
        self.mutation_rate * (1.0 - 0.5 * self.progress(generation))
    }

    /// `c0 * (1 - 0.3 * g / G)`
    pub fn crossover_rate_at(&self, generation: usize) -> f64 {
        self.crossover_rate * (1.0 - 0.3 * self.progress(generation))
    }

    fn progress(&self, generation: usize) -> f64 {
        if self.generations == 0 {
            0.0
        } else {
            generation as f64 / self.generations as f64
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generations == 0 {
            return Err(ConfigError::NoGenerations);
        }
        let players = self.evaluation.players_per_match;
        if players < 2 {
            return Err(ConfigError::TooFewPlayers(players));
        }
        if self.population_size < players {
            return Err(ConfigError::PopulationTooSmall {
                population: self.population_size,
                players,
            });
        }
        if self.pool_size() < 2 {
            return Err(ConfigError::PoolTooSmall(self.pool_size()));
        }
        if self.elitism > self.pool_size() {
            return Err(ConfigError::ElitismTooLarge {
                elitism: self.elitism,
                pool: self.pool_size(),
            });
        }
        for (name, value) in [
            ("mutation_rate", self.mutation_rate),
            ("crossover_rate", self.crossover_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::RateOutOfRange { name, value });
            }
        }
        Ok(())
    }
}

// ============================================================================
// EVOLUTION LOOP
// ============================================================================

#[derive(Debug, Error)]
pub enum EvolveError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("evaluation failed: {0}")]
    Match(#[from] MatchError),

    #[error("population is empty")]
    EmptyPopulation,
}

/// Result of an evolutionary run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Top agent of the final evaluation
    pub champion: Agent,
    /// Highest-fitness agent of any generation
    pub best_ever: Agent,
    /// Final ranked population
    pub population: Vec<Agent>,
    pub history: Vec<GenerationStats>,
}

/// Run the full evolution
pub fn evolve<R: Rng>(
    topology: Arc<Topology>,
    config: &EvolutionConfig,
    rng: &mut R,
) -> Result<EvolutionResult, EvolveError> {
    evolve_with_callback(topology, config, rng, |_| {})
}

/// Run the full evolution, reporting each generation's statistics
pub fn evolve_with_callback<R, F>(
    topology: Arc<Topology>,
    config: &EvolutionConfig,
    rng: &mut R,
    mut on_generation: F,
) -> Result<EvolutionResult, EvolveError>
where
    R: Rng,
    F: FnMut(&GenerationStats),
{
    config.validate()?;

    let mut population = Population::random(config.population_size, config.hybrid_genes, rng);
    let mut history = Vec::with_capacity(config.generations);

    for generation in 0..config.generations {
        let stats = population.run_generation(&topology, config, rng)?;
        tracing::info!(
            "Generation {}: best={:.3}, avg={:.3}, leader={} ({})",
            generation + 1,
            stats.best_fitness,
            stats.mean_fitness,
            stats.best_gene.map(|g| g.to_string()).unwrap_or_default(),
            stats.best_strategy
        );
        on_generation(&stats);
        history.push(stats);

        // The last evaluated generation is not bred
        if generation + 1 < config.generations {
            population.next_generation(config, rng);
        }
    }

    let champion = population.best().cloned().ok_or(EvolveError::EmptyPopulation)?;
    let best_ever = population
        .best_ever()
        .cloned()
        .ok_or(EvolveError::EmptyPopulation)?;

    Ok(EvolutionResult {
        champion,
        best_ever,
        population: population.agents().to_vec(),
        history,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use conquest_core::MatchConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn quick_config() -> EvolutionConfig {
        EvolutionConfig {
            population_size: 12,
            generations: 5,
            elitism: 2,
            evaluation: EvalConfig::new(6)
                .with_players(4)
                .with_match_config(MatchConfig::default().with_max_rounds(25)),
            ..Default::default()
        }
    }

    fn topology() -> Arc<Topology> {
        Arc::new(Topology::standard().unwrap())
    }

    #[test]
    fn test_evolution_config_defaults() {
        let config = EvolutionConfig::default();
        assert_eq!(config.population_size, 40);
        assert_eq!(config.generations, 500);
        assert_eq!(config.elitism, 6);
        assert_eq!(config.pool_size(), 20);
        assert_eq!(config.evaluation.matches_per_evaluation, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rate_decay() {
        let config = EvolutionConfig::default();
        assert!((config.mutation_rate_at(0) - 0.7).abs() < 1e-12);
        assert!((config.crossover_rate_at(0) - 0.7).abs() < 1e-12);
        // Half way: 0.7 * 0.75 and 0.7 * 0.85
        assert!((config.mutation_rate_at(250) - 0.525).abs() < 1e-12);
        assert!((config.crossover_rate_at(250) - 0.595).abs() < 1e-12);
        // Final generation approaches 0.35 and 0.49
        assert!((config.mutation_rate_at(500) - 0.35).abs() < 1e-12);
        assert!((config.crossover_rate_at(500) - 0.49).abs() < 1e-12);
    }

    #[test]
    fn test_validation_errors() {
        let base = quick_config();

        assert_eq!(
            base.clone().with_generations(0).validate(),
            Err(ConfigError::NoGenerations)
        );
        assert_eq!(
            base.clone().with_population(3).validate(),
            Err(ConfigError::PopulationTooSmall {
                population: 3,
                players: 4
            })
        );
        assert!(matches!(
            EvolutionConfig {
                elitism: 7,
                ..base.clone()
            }
            .validate(),
            Err(ConfigError::ElitismTooLarge { elitism: 7, pool: 6 })
        ));
        assert!(matches!(
            EvolutionConfig {
                mutation_rate: 1.5,
                ..base.clone()
            }
            .validate(),
            Err(ConfigError::RateOutOfRange { name: "mutation_rate", .. })
        ));
        let mut two_players = base.clone();
        two_players.evaluation.players_per_match = 2;
        assert_eq!(
            two_players.with_population(3).validate(),
            Err(ConfigError::PoolTooSmall(1))
        );
    }

    #[test]
    fn test_invalid_config_rejected_before_running() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let config = quick_config().with_generations(0);
        assert!(matches!(
            evolve(topology(), &config, &mut rng),
            Err(EvolveError::Config(ConfigError::NoGenerations))
        ));
    }

    #[test]
    fn test_evolve_returns_champion_and_history() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let config = quick_config();
        let mut seen = Vec::new();

        let result =
            evolve_with_callback(topology(), &config, &mut rng, |s| seen.push(s.generation)).unwrap();

        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert_eq!(result.history.len(), 5);
        assert_eq!(result.population.len(), 12);
        assert_eq!(result.champion, result.population[0]);
        assert_eq!(result.history[4].best_fitness, result.champion.fitness);
    }

    #[test]
    fn test_champion_fitness_non_decreasing() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let result = evolve(topology(), &quick_config(), &mut rng).unwrap();

        for pair in result.history.windows(2) {
            assert!(pair[1].champion_fitness >= pair[0].champion_fitness);
        }
        let max_best = result
            .history
            .iter()
            .map(|s| s.best_fitness)
            .fold(f64::MIN, f64::max);
        assert_eq!(result.best_ever.fitness, max_best);
    }

    #[test]
    fn test_evolve_is_reproducible() {
        let run = || {
            let mut rng = ChaCha8Rng::seed_from_u64(99);
            evolve(topology(), &quick_config(), &mut rng).unwrap()
        };
        let (a, b) = (run(), run());
        assert_eq!(a.champion, b.champion);
        assert_eq!(a.history, b.history);
    }

    #[test]
    fn test_config_load_partial_json() {
        let path = std::env::temp_dir().join(format!("conquest-evolve-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"population_size": 10, "evaluation": {"matches_per_evaluation": 3}}"#)
            .unwrap();

        let config = EvolutionConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.population_size, 10);
        assert_eq!(config.generations, 500);
        assert_eq!(config.evaluation.matches_per_evaluation, 3);
        assert_eq!(config.evaluation.players_per_match, 6);
    }
}
