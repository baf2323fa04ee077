//! Match driver: the turn state machine
//!
//! A `Match` owns its seats, board and RNG. Each turn a seat is reinforced,
//! attacks up to `max_attacks_per_turn` times (stopping on abstention or the
//! first failed attack), then redistributes. A match ends as soon as one
//! player owns the whole board, or after `max_rounds` rounds, when the active
//! player holding the most territories wins.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::{Agent, AgentId};
use crate::rules::{self, AttackOutcome, RuleError};
use crate::snapshot::MatchSnapshot;
use crate::state::{MatchState, PlayerId};
use crate::topology::Topology;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Round cap
    pub max_rounds: u32,
    /// Attack attempts per turn
    pub max_attacks_per_turn: u32,
    /// Troops dealt to each player at setup
    pub initial_troops: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_rounds: 100,
            max_attacks_per_turn: 10,
            initial_troops: 20,
        }
    }
}

impl MatchConfig {
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_initial_troops(mut self, initial_troops: u32) -> Self {
        self.initial_troops = initial_troops;
        self
    }
}

// ============================================================================
// TYPES
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Waiting,
    Playing,
    Paused,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("a match needs at least 2 players, got {0}")]
    TooFewPlayers(usize),

    #[error("{players} players cannot share {territories} territories")]
    TooManyPlayers { players: usize, territories: usize },

    #[error("cannot {action} a match that is {status:?}")]
    InvalidTransition {
        action: &'static str,
        status: MatchStatus,
    },

    #[error("match is not being played (status {0:?})")]
    NotPlaying(MatchStatus),

    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// Everything one seat did during its turn
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    /// 1-based round the turn belongs to
    pub round: u32,
    pub player: PlayerId,
    pub agent: AgentId,
    pub reinforcements: u32,
    pub attacks: Vec<AttackOutcome>,
    /// Troops moved from interior to frontier
    pub redistributed: u32,
    /// The seat owned nothing and left the match
    pub eliminated: bool,
}

impl TurnRecord {
    pub fn conquests(&self) -> usize {
        self.attacks.iter().filter(|a| a.success).count()
    }
}

/// Final result of a match
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub winner: Option<PlayerId>,
    pub winner_agent: Option<AgentId>,
    /// Territories held at the end, per seat
    pub territories: Vec<u32>,
    pub rounds_played: u32,
    /// Ended by the round cap rather than total conquest
    pub capped: bool,
}

// ============================================================================
// MATCH
// ============================================================================

pub struct Match<R: Rng> {
    config: MatchConfig,
    agents: Vec<Agent>,
    state: MatchState,
    status: MatchStatus,
    /// Seats not yet removed for owning nothing
    active: Vec<bool>,
    /// Seat whose turn is next
    cursor: usize,
    rng: R,
    last_turn: Option<TurnRecord>,
    outcome: Option<MatchOutcome>,
}

impl<R: Rng> Match<R> {
    /// Seat `agents` in order and deal the board
    pub fn new(
        topology: Arc<Topology>,
        agents: Vec<Agent>,
        config: MatchConfig,
        mut rng: R,
    ) -> Result<Self, MatchError> {
        let players = agents.len();
        if players < 2 {
            return Err(MatchError::TooFewPlayers(players));
        }
        if players > topology.len() {
            return Err(MatchError::TooManyPlayers {
                players,
                territories: topology.len(),
            });
        }

        let state = MatchState::initialize(topology, players, config.initial_troops, &mut rng);

        Ok(Self {
            config,
            agents,
            state,
            status: MatchStatus::Waiting,
            active: vec![true; players],
            cursor: 0,
            rng,
            last_turn: None,
            outcome: None,
        })
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn is_active(&self, player: PlayerId) -> bool {
        self.active.get(player.index()).copied().unwrap_or(false)
    }

    /// Seat that plays next, if the match is not over
    pub fn current_player(&self) -> Option<PlayerId> {
        (self.status != MatchStatus::Finished).then_some(PlayerId(self.cursor as u8))
    }

    pub fn last_turn(&self) -> Option<&TurnRecord> {
        self.last_turn.as_ref()
    }

    /// Final result, once finished
    pub fn outcome(&self) -> Option<&MatchOutcome> {
        self.outcome.as_ref()
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot::capture(self)
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    pub fn start(&mut self) -> Result<(), MatchError> {
        if self.status != MatchStatus::Waiting {
            return Err(MatchError::InvalidTransition {
                action: "start",
                status: self.status,
            });
        }
        self.status = MatchStatus::Playing;
        tracing::debug!(players = self.agents.len(), "match started");

        if self.config.max_rounds == 0 {
            self.finish(true);
        }
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), MatchError> {
        if self.status != MatchStatus::Playing {
            return Err(MatchError::InvalidTransition {
                action: "pause",
                status: self.status,
            });
        }
        self.status = MatchStatus::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), MatchError> {
        if self.status != MatchStatus::Paused {
            return Err(MatchError::InvalidTransition {
                action: "resume",
                status: self.status,
            });
        }
        self.status = MatchStatus::Playing;
        Ok(())
    }

    fn ensure_playing(&self) -> Result<(), MatchError> {
        if self.status == MatchStatus::Playing {
            Ok(())
        } else {
            Err(MatchError::NotPlaying(self.status))
        }
    }

    // ========================================================================
    // Play
    // ========================================================================

    /// Play the current seat's turn
    pub fn play_turn(&mut self) -> Result<TurnRecord, MatchError> {
        self.ensure_playing()?;

        let seat = self.cursor;
        let player = PlayerId(seat as u8);
        let mut record = TurnRecord {
            round: self.state.round + 1,
            player,
            agent: self.agents[seat].id,
            reinforcements: 0,
            attacks: Vec::new(),
            redistributed: 0,
            eliminated: false,
        };

        if rules::is_eliminated(&self.state, player) {
            self.active[seat] = false;
            record.eliminated = true;
            tracing::debug!(%player, round = record.round, "player eliminated");
        } else {
            record.reinforcements = rules::reinforce(&mut self.state, player);

            for _ in 0..self.config.max_attacks_per_turn {
                let moves = rules::legal_moves(&self.state, player);
                let Some(attack) =
                    self.agents[seat].choose_move(&self.state, player, &moves, &mut self.rng)
                else {
                    break;
                };
                let outcome = rules::resolve_attack(&mut self.state, attack)?;
                record.attacks.push(outcome);
                if !outcome.success {
                    break;
                }
            }

            record.redistributed = rules::redistribute(&mut self.state, player);
        }

        self.last_turn = Some(record.clone());

        if rules::winner(&self.state).is_some() {
            // The interrupted round still counts
            self.state.round += 1;
            self.finish(false);
        } else {
            self.advance();
        }

        Ok(record)
    }

    /// Play turns until the current round ends or the match finishes
    pub fn play_round(&mut self) -> Result<Vec<TurnRecord>, MatchError> {
        self.ensure_playing()?;

        let round = self.state.round;
        let mut turns = Vec::new();
        while self.status == MatchStatus::Playing && self.state.round == round {
            turns.push(self.play_turn()?);
        }
        Ok(turns)
    }

    /// Start if needed and play until the match finishes
    pub fn run_to_end(&mut self) -> Result<MatchOutcome, MatchError> {
        if self.status == MatchStatus::Waiting {
            self.start()?;
        }
        while self.status == MatchStatus::Playing {
            self.play_turn()?;
        }
        self.outcome
            .clone()
            .ok_or(MatchError::NotPlaying(self.status))
    }

    /// Move the cursor to the next active seat, closing the round on wrap
    fn advance(&mut self) {
        let seats = self.agents.len();
        let mut next = self.cursor + 1;
        while next < seats && !self.active[next] {
            next += 1;
        }
        if next < seats {
            self.cursor = next;
            return;
        }

        self.state.round += 1;
        let remaining = self.active.iter().filter(|&&a| a).count();
        if self.state.round >= self.config.max_rounds || remaining <= 1 {
            self.finish(self.state.round >= self.config.max_rounds);
            return;
        }

        self.state.reset_losses();
        self.cursor = self.active.iter().position(|&a| a).unwrap_or(0);
    }

    fn finish(&mut self, capped: bool) {
        let winner = self.decide_winner();
        let capped = capped && rules::winner(&self.state).is_none();
        let territories = self
            .state
            .players()
            .map(|p| self.state.territory_count(p) as u32)
            .collect();

        let outcome = MatchOutcome {
            winner,
            winner_agent: winner.map(|w| self.agents[w.index()].id),
            territories,
            rounds_played: self.state.round,
            capped,
        };
        tracing::debug!(
            winner = ?outcome.winner,
            rounds = outcome.rounds_played,
            capped = outcome.capped,
            "match finished"
        );

        self.status = MatchStatus::Finished;
        self.outcome = Some(outcome);
    }

    /// Sole owner if there is one; otherwise the active seat holding the
    /// most territories, first seat on ties
    fn decide_winner(&self) -> Option<PlayerId> {
        if let Some(w) = rules::winner(&self.state) {
            return Some(w);
        }

        let mut best: Option<(PlayerId, usize)> = None;
        for player in self.state.players().filter(|&p| self.is_active(p)) {
            let held = self.state.territory_count(player);
            match best {
                Some((_, most)) if most >= held => {}
                _ => best = Some((player, held)),
            }
        }
        best.map(|(p, _)| p)
    }
}

/// Play a whole match between `agents` (seated in order)
pub fn run_match<R: Rng>(
    topology: Arc<Topology>,
    agents: Vec<Agent>,
    config: &MatchConfig,
    rng: &mut R,
) -> Result<MatchOutcome, MatchError> {
    let mut game = Match::new(topology, agents, config.clone(), rng)?;
    game.run_to_end()
}
