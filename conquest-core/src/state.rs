//! Match state: ownership, troop counts and per-player round flags

use std::fmt;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::topology::{TerritoryId, Topology};

/// Seat index of a player within one match
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// A territory on the board
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Territory {
    pub owner: Option<PlayerId>,
    pub troops: u32,
}

/// Mutable per-match board
#[derive(Clone, Debug)]
pub struct MatchState {
    topology: Arc<Topology>,
    territories: Vec<Territory>,
    lost_territory: Vec<bool>,
    /// Rounds completed so far
    pub round: u32,
}

impl MatchState {
    /// Empty board: no owners, no troops
    pub fn new(topology: Arc<Topology>, players: usize) -> Self {
        let territories = vec![Territory::default(); topology.len()];
        Self {
            topology,
            territories,
            lost_territory: vec![false; players],
            round: 0,
        }
    }

    /// Deal a fresh board to `players` seats.
    ///
    /// Territories are shuffled and handed out round-robin with one troop
    /// each, then every player's remaining budget is scattered one troop at
    /// a time over their own territories.
    pub fn initialize<R: Rng>(
        topology: Arc<Topology>,
        players: usize,
        initial_troops: u32,
        rng: &mut R,
    ) -> Self {
        let mut state = Self::new(topology, players);
        if players == 0 {
            return state;
        }

        let mut order: Vec<TerritoryId> = state.topology.territories().collect();
        order.shuffle(rng);

        for (i, &t) in order.iter().enumerate() {
            state.territories[t.index()] = Territory {
                owner: Some(PlayerId((i % players) as u8)),
                troops: 1,
            };
        }

        for p in 0..players {
            let player = PlayerId(p as u8);
            let owned = state.owned_territories(player);
            if owned.is_empty() {
                continue;
            }
            let remaining = initial_troops.saturating_sub(owned.len() as u32);
            for _ in 0..remaining {
                let t = owned[rng.gen_range(0..owned.len())];
                state.territories[t.index()].troops += 1;
            }
        }

        state
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn players(&self) -> impl Iterator<Item = PlayerId> {
        (0..self.lost_territory.len()).map(|p| PlayerId(p as u8))
    }

    pub fn territory(&self, t: TerritoryId) -> &Territory {
        &self.territories[t.index()]
    }

    pub fn territory_mut(&mut self, t: TerritoryId) -> &mut Territory {
        &mut self.territories[t.index()]
    }

    pub fn owner(&self, t: TerritoryId) -> Option<PlayerId> {
        self.territories[t.index()].owner
    }

    pub fn troops(&self, t: TerritoryId) -> u32 {
        self.territories[t.index()].troops
    }

    /// Place a territory directly (used to set up positions)
    pub fn set(&mut self, t: TerritoryId, owner: Option<PlayerId>, troops: u32) {
        self.territories[t.index()] = Territory { owner, troops };
    }

    /// Iterate `(id, territory)` in topology order
    pub fn iter(&self) -> impl Iterator<Item = (TerritoryId, &Territory)> + '_ {
        self.territories
            .iter()
            .enumerate()
            .map(|(i, t)| (TerritoryId(i as u8), t))
    }

    /// Territories owned by `player`, in topology order
    pub fn owned_territories(&self, player: PlayerId) -> Vec<TerritoryId> {
        self.iter()
            .filter(|(_, t)| t.owner == Some(player))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn territory_count(&self, player: PlayerId) -> usize {
        self.territories
            .iter()
            .filter(|t| t.owner == Some(player))
            .count()
    }

    pub fn total_troops(&self, player: PlayerId) -> u32 {
        self.territories
            .iter()
            .filter(|t| t.owner == Some(player))
            .map(|t| t.troops)
            .sum()
    }

    /// True if `t` is held by someone other than `player` (or by nobody)
    pub fn is_enemy(&self, t: TerritoryId, player: PlayerId) -> bool {
        self.owner(t) != Some(player)
    }

    pub fn lost_territory(&self, player: PlayerId) -> bool {
        self.lost_territory
            .get(player.index())
            .copied()
            .unwrap_or(false)
    }

    pub fn mark_lost(&mut self, player: PlayerId) {
        if let Some(flag) = self.lost_territory.get_mut(player.index()) {
            *flag = true;
        }
    }

    /// Clear every "lost territory" flag at the start of a round
    pub fn reset_losses(&mut self) {
        self.lost_territory.iter_mut().for_each(|f| *f = false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn standard() -> Arc<Topology> {
        Arc::new(Topology::standard().unwrap())
    }

    #[test]
    fn test_initialize_assigns_every_territory() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let state = MatchState::initialize(standard(), 6, 20, &mut rng);

        for (_, t) in state.iter() {
            assert!(t.owner.is_some());
            assert!(t.troops >= 1);
        }
        for p in state.players() {
            assert_eq!(state.territory_count(p), 7);
        }
    }

    #[test]
    fn test_initialize_troop_budget_per_player() {
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let state = MatchState::initialize(standard(), 6, 20, &mut rng);
            for p in state.players() {
                assert_eq!(state.total_troops(p), 20, "seed {} player {}", seed, p);
            }
        }
    }

    #[test]
    fn test_initialize_uneven_deal() {
        // 42 territories over 4 players: 11, 11, 10, 10
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let state = MatchState::initialize(standard(), 4, 20, &mut rng);
        let counts: Vec<usize> = state.players().map(|p| state.territory_count(p)).collect();
        assert_eq!(counts, vec![11, 11, 10, 10]);
        for p in state.players() {
            assert_eq!(state.total_troops(p), 20);
        }
    }

    #[test]
    fn test_initialize_resets_losses() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let state = MatchState::initialize(standard(), 3, 20, &mut rng);
        assert!(state.players().all(|p| !state.lost_territory(p)));
    }

    #[test]
    fn test_initialize_is_seed_deterministic() {
        let a = MatchState::initialize(standard(), 6, 20, &mut ChaCha8Rng::seed_from_u64(99));
        let b = MatchState::initialize(standard(), 6, 20, &mut ChaCha8Rng::seed_from_u64(99));
        let ta: Vec<Territory> = a.iter().map(|(_, t)| *t).collect();
        let tb: Vec<Territory> = b.iter().map(|(_, t)| *t).collect();
        assert_eq!(ta, tb);
    }

    #[test]
    fn test_loss_flags() {
        let mut state = MatchState::new(standard(), 2);
        state.mark_lost(PlayerId(1));
        assert!(state.lost_territory(PlayerId(1)));
        assert!(!state.lost_territory(PlayerId(0)));
        state.reset_losses();
        assert!(!state.lost_territory(PlayerId(1)));
    }
}
