//! Serialisable match snapshots
//!
//! A snapshot is a detached copy of everything a viewer needs: board,
//! per-seat summary and the last turn, with territories named rather than
//! indexed.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::agent::AgentId;
use crate::driver::{Match, MatchStatus, TurnRecord};
use crate::gene::Gene;
use crate::rules;
use crate::state::{MatchState, PlayerId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerritorySnapshot {
    pub name: String,
    pub continent: String,
    pub owner: Option<PlayerId>,
    pub troops: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub seat: PlayerId,
    pub agent_id: AgentId,
    pub gene: Gene,
    pub strategy: String,
    pub territories: usize,
    pub troops: u32,
    pub continent_bonus: u32,
    pub eliminated: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttackSnapshot {
    pub from: String,
    pub to: String,
    pub defender: Option<PlayerId>,
    pub success: bool,
    pub troops_moved: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnSnapshot {
    pub round: u32,
    pub player: PlayerId,
    pub agent: AgentId,
    pub reinforcements: u32,
    pub attacks: Vec<AttackSnapshot>,
    pub redistributed: u32,
    pub eliminated: bool,
}

impl TurnSnapshot {
    fn from_record(state: &MatchState, record: &TurnRecord) -> Self {
        let topo = state.topology();
        let attacks = record
            .attacks
            .iter()
            .map(|a| AttackSnapshot {
                from: topo.name(a.attack.origin).to_string(),
                to: topo.name(a.attack.destination).to_string(),
                defender: a.defender,
                success: a.success,
                troops_moved: a.troops_moved,
            })
            .collect();

        Self {
            round: record.round,
            player: record.player,
            agent: record.agent,
            reinforcements: record.reinforcements,
            attacks,
            redistributed: record.redistributed,
            eliminated: record.eliminated,
        }
    }
}

/// Point-in-time view of a match
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    /// Rounds completed
    pub round: u32,
    pub status: MatchStatus,
    pub current_player: Option<PlayerId>,
    pub winner: Option<PlayerId>,
    pub territories: Vec<TerritorySnapshot>,
    pub players: Vec<PlayerSnapshot>,
    pub last_turn: Option<TurnSnapshot>,
}

impl MatchSnapshot {
    pub fn capture<R: Rng>(game: &Match<R>) -> Self {
        let state = game.state();
        let topo = state.topology();

        let territories = state
            .iter()
            .map(|(id, t)| TerritorySnapshot {
                name: topo.name(id).to_string(),
                continent: topo.continent(topo.continent_of(id)).name.clone(),
                owner: t.owner,
                troops: t.troops,
            })
            .collect();

        let players = game
            .agents()
            .iter()
            .enumerate()
            .map(|(seat, agent)| {
                let player = PlayerId(seat as u8);
                PlayerSnapshot {
                    seat: player,
                    agent_id: agent.id,
                    gene: agent.gene,
                    strategy: agent.strategy_name(),
                    territories: state.territory_count(player),
                    troops: state.total_troops(player),
                    continent_bonus: rules::continent_bonus(state, player),
                    eliminated: !game.is_active(player) || rules::is_eliminated(state, player),
                }
            })
            .collect();

        Self {
            round: state.round,
            status: game.status(),
            current_player: game.current_player(),
            winner: game.outcome().and_then(|o| o.winner),
            territories,
            players,
            last_turn: game
                .last_turn()
                .map(|record| TurnSnapshot::from_record(state, record)),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
