//! The eight attack strategies
//!
//! Each strategy inspects the legal-move list (in its fixed order) and picks
//! at most one attack. Deciding never mutates the state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rules::{self, Attack};
use crate::state::{MatchState, PlayerId};

/// Strategy selected by a 3-bit gene
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Strategy {
    /// 000: never attacks
    Pacifist,
    /// 001: answers a loss this round with the first legal attack
    CounterStrike,
    /// 010: only attacks with more than double the defenders
    Fortress,
    /// 011: after a loss this round, attacks any non-owned territory
    Retake,
    /// 100: attacks with a margin of more than two troops
    SafeExpansion,
    /// 101: attacks territories held by two troops or fewer
    Opportunist,
    /// 110: attacks whenever it outnumbers the defender
    ModerateInvader,
    /// 111: pushes into continents it mostly holds, else attacks anything
    BonusHunter,
}

pub const ALL_STRATEGIES: [Strategy; 8] = [
    Strategy::Pacifist,
    Strategy::CounterStrike,
    Strategy::Fortress,
    Strategy::Retake,
    Strategy::SafeExpansion,
    Strategy::Opportunist,
    Strategy::ModerateInvader,
    Strategy::BonusHunter,
];

impl Strategy {
    pub fn from_code(code: u8) -> Option<Self> {
        ALL_STRATEGIES.get(code as usize).copied()
    }

    /// Strategy from the low three bits of `bits`
    pub fn from_bits(bits: u16) -> Self {
        ALL_STRATEGIES[(bits & 0b111) as usize]
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Pacifist => "Pacifist",
            Strategy::CounterStrike => "Counter-strike",
            Strategy::Fortress => "Fortress",
            Strategy::Retake => "Retake",
            Strategy::SafeExpansion => "Safe expansion",
            Strategy::Opportunist => "Opportunist",
            Strategy::ModerateInvader => "Moderate invader",
            Strategy::BonusHunter => "Bonus hunter",
        }
    }

    /// Pick an attack from `moves` for `player`, or abstain
    pub fn decide(self, state: &MatchState, player: PlayerId, moves: &[Attack]) -> Option<Attack> {
        if moves.is_empty() {
            return None;
        }

        let attackers = |a: &Attack| state.troops(a.origin);
        let defenders = |a: &Attack| state.troops(a.destination);
        let lost = state.lost_territory(player);

        match self {
            Strategy::Pacifist => None,
            Strategy::CounterStrike => {
                if lost {
                    moves.first().copied()
                } else {
                    None
                }
            }
            Strategy::Fortress => moves
                .iter()
                .copied()
                .find(|a| attackers(a) > 2 * defenders(a)),
            Strategy::Retake => {
                if !lost {
                    return None;
                }
                moves
                    .iter()
                    .copied()
                    .find(|a| state.owner(a.destination) != Some(player))
            }
            Strategy::SafeExpansion => moves
                .iter()
                .copied()
                .find(|a| attackers(a) > defenders(a) + 2),
            Strategy::Opportunist => moves.iter().copied().find(|a| defenders(a) <= 2),
            Strategy::ModerateInvader => moves
                .iter()
                .copied()
                .find(|a| attackers(a) > defenders(a)),
            Strategy::BonusHunter => {
                continent_push(state, player, moves).or_else(|| moves.first().copied())
            }
        }
    }
}

/// First move into a continent where `player` holds at least 60%,
/// continents in topology order
fn continent_push(state: &MatchState, player: PlayerId, moves: &[Attack]) -> Option<Attack> {
    let topo = state.topology();
    topo.continents()
        .iter()
        .enumerate()
        .filter(|(_, c)| rules::holds_majority(state, player, &c.members))
        .find_map(|(ci, _)| {
            moves
                .iter()
                .find(|a| topo.continent_of(a.destination).index() == ci)
                .copied()
        })
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
