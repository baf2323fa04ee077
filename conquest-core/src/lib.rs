//! CONQUEST Core - Match engine and strategy agents
//!
//! This crate provides the core game logic for CONQUEST:
//! - Board topology (territories, continents, symmetric adjacency)
//! - Match state and initial deal
//! - Combat, reinforcement and redistribution rules
//! - Gene encoding and the eight attack strategies
//! - The turn state machine and serialisable snapshots

pub mod topology;
pub mod state;
pub mod rules;
pub mod gene;
pub mod strategy;
pub mod agent;
pub mod driver;
pub mod snapshot;

// Re-exports for convenient access
pub use topology::{Continent, ContinentId, MapSpec, TerritoryId, Topology, TopologyError};
pub use state::{MatchState, PlayerId, Territory};
pub use rules::{Attack, AttackOutcome, RuleError};
pub use gene::{Gene, GeneError, Genotype, HybridStrategy};
pub use strategy::{Strategy, ALL_STRATEGIES};
pub use agent::{Agent, AgentId, AgentStats};
pub use driver::{run_match, Match, MatchConfig, MatchError, MatchOutcome, MatchStatus, TurnRecord};
pub use snapshot::MatchSnapshot;
