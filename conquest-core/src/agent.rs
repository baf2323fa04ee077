//! Gene-driven agents and their running statistics

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::gene::Gene;
use crate::rules::Attack;
use crate::state::{MatchState, PlayerId};

/// Population-wide agent identity
pub type AgentId = u32;

/// Weight of the win rate in the fitness score
pub const WIN_WEIGHT: f64 = 100.0;
/// Weight of the mean final territory count in the fitness score
pub const TERRITORY_WEIGHT: f64 = 2.0;

/// Results accumulated over one evaluation pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStats {
    pub matches_played: u32,
    pub wins: u32,
    /// Territories held at the end of each match, summed
    pub territories_held: u32,
}

impl AgentStats {
    pub fn record(&mut self, won: bool, territories: u32) {
        self.matches_played += 1;
        if won {
            self.wins += 1;
        }
        self.territories_held += territories;
    }

    pub fn win_rate(&self) -> f64 {
        if self.matches_played == 0 {
            0.0
        } else {
            self.wins as f64 / self.matches_played as f64
        }
    }

    pub fn mean_territories(&self) -> f64 {
        if self.matches_played == 0 {
            0.0
        } else {
            self.territories_held as f64 / self.matches_played as f64
        }
    }

    /// `win_rate * 100 + mean_territories * 2`, zero without matches
    pub fn fitness(&self) -> f64 {
        self.win_rate() * WIN_WEIGHT + self.mean_territories() * TERRITORY_WEIGHT
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub gene: Gene,
    #[serde(default)]
    pub stats: AgentStats,
    #[serde(default)]
    pub fitness: f64,
}

impl Agent {
    pub fn new(id: AgentId, gene: Gene) -> Self {
        Self {
            id,
            gene,
            stats: AgentStats::default(),
            fitness: 0.0,
        }
    }

    /// Pick at most one attack for the seat `player`. Hybrid genes draw one
    /// uniform number per decision; simple genes draw nothing.
    pub fn choose_move<R: Rng>(
        &self,
        state: &MatchState,
        player: PlayerId,
        moves: &[Attack],
        rng: &mut R,
    ) -> Option<Attack> {
        if moves.is_empty() {
            return None;
        }
        let strategy = self.gene.decode().choose(rng);
        strategy.decide(state, player, moves)
    }

    pub fn reset_stats(&mut self) {
        self.stats = AgentStats::default();
        self.fitness = 0.0;
    }

    /// Recompute `fitness` from the current statistics
    pub fn compute_fitness(&mut self) -> f64 {
        self.fitness = self.stats.fitness();
        self.fitness
    }

    pub fn strategy_name(&self) -> String {
        self.gene.decode().name()
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Agent {} ({} - {})", self.id, self.gene, self.strategy_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules;
    use crate::strategy::Strategy;
    use crate::topology::Topology;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;

    #[test]
    fn test_fitness_formula() {
        let mut agent = Agent::new(0, Gene::simple(Strategy::Fortress));
        agent.stats.record(true, 42);
        agent.stats.record(false, 0);
        agent.stats.record(false, 3);
        agent.stats.record(true, 42);
        // 0.5 * 100 + (87 / 4) * 2
        assert!((agent.compute_fitness() - 93.5).abs() < 1e-9);
    }

    #[test]
    fn test_fitness_without_matches_is_zero() {
        let mut agent = Agent::new(0, Gene::simple(Strategy::Fortress));
        assert_eq!(agent.compute_fitness(), 0.0);
    }

    #[test]
    fn test_reset_stats() {
        let mut agent = Agent::new(3, Gene::simple(Strategy::Retake));
        agent.stats.record(true, 10);
        agent.compute_fitness();
        agent.reset_stats();
        assert_eq!(agent.stats, AgentStats::default());
        assert_eq!(agent.fitness, 0.0);
    }

    #[test]
    fn test_simple_gene_consumes_no_randomness() {
        let topo = Arc::new(Topology::standard().unwrap());
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let state = MatchState::initialize(topo, 6, 20, &mut rng);
        let player = PlayerId(0);
        let moves = rules::legal_moves(&state, player);

        let agent = Agent::new(0, Gene::simple(Strategy::ModerateInvader));
        let mut used = ChaCha8Rng::seed_from_u64(1);
        let mut untouched = ChaCha8Rng::seed_from_u64(1);
        agent.choose_move(&state, player, &moves, &mut used);
        assert_eq!(used.gen::<u64>(), untouched.gen::<u64>());
    }

    #[test]
    fn test_hybrid_mixes_strategies() {
        let topo = Arc::new(Topology::standard().unwrap());
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let state = MatchState::initialize(topo, 6, 20, &mut rng);
        let player = PlayerId(0);
        let moves = rules::legal_moves(&state, player);
        assert!(!moves.is_empty());

        // Half-ish Pacifist, half-ish "first move" bonus hunting
        let agent = Agent::new(
            0,
            Gene::hybrid(Strategy::Pacifist, Strategy::BonusHunter, 3),
        );
        let picks: Vec<bool> = (0..200)
            .map(|_| agent.choose_move(&state, player, &moves, &mut rng).is_some())
            .collect();
        assert!(picks.iter().any(|&p| p));
        assert!(picks.iter().any(|&p| !p));
    }

    #[test]
    fn test_agent_serde() {
        let agent = Agent::new(7, "101".parse().unwrap());
        let json = serde_json::to_string(&agent).unwrap();
        assert!(json.contains("\"gene\":\"101\""));
        let back: Agent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, agent);
    }
}
