//! Configuration types for fitness evaluation
//!
//! Level 4 - Utilities and configuration

use conquest_core::MatchConfig;
use serde::{Deserialize, Serialize};

/// Configuration for one evaluation pass
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Matches sampled per pass
    pub matches_per_evaluation: usize,
    /// Seats per match
    pub players_per_match: usize,
    /// Rules every match is played with
    pub match_config: MatchConfig,
    /// Whether to run matches in parallel
    pub parallel: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            matches_per_evaluation: 20,
            players_per_match: 6,
            match_config: MatchConfig::default(),
            parallel: true,
        }
    }
}

impl EvalConfig {
    /// Create config with the given number of matches per pass
    pub fn new(matches_per_evaluation: usize) -> Self {
        Self {
            matches_per_evaluation,
            ..Default::default()
        }
    }

    pub fn with_players(mut self, players_per_match: usize) -> Self {
        self.players_per_match = players_per_match;
        self
    }

    pub fn with_match_config(mut self, match_config: MatchConfig) -> Self {
        self.match_config = match_config;
        self
    }

    /// Run matches one after another on the calling thread
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_config_defaults() {
        let config = EvalConfig::default();
        assert_eq!(config.matches_per_evaluation, 20);
        assert_eq!(config.players_per_match, 6);
        assert_eq!(config.match_config.max_rounds, 100);
        assert!(config.parallel);
    }

    #[test]
    fn test_eval_config_builders() {
        let config = EvalConfig::new(4)
            .with_players(3)
            .with_match_config(MatchConfig::default().with_max_rounds(10))
            .sequential();
        assert_eq!(config.matches_per_evaluation, 4);
        assert_eq!(config.players_per_match, 3);
        assert_eq!(config.match_config.max_rounds, 10);
        assert!(!config.parallel);
    }

    #[test]
    fn test_eval_config_from_partial_json() {
        let config: EvalConfig =
            serde_json::from_str(r#"{"players_per_match": 4, "match_config": {"max_rounds": 30}}"#)
                .unwrap();
        assert_eq!(config.players_per_match, 4);
        assert_eq!(config.matches_per_evaluation, 20);
        assert_eq!(config.match_config.max_rounds, 30);
        assert_eq!(config.match_config.initial_troops, 20);
    }
}
