//! Combat and allocation rules
//!
//! Stateless functions over a `MatchState`: reinforcement sizing, the
//! border-strength heuristics that drive troop placement, attack legality and
//! resolution, connectivity, redistribution, and win/elimination checks.
//!
//! Every "round" in these formulas is round-half-to-even.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::{MatchState, PlayerId};
use crate::topology::TerritoryId;

/// Minimum reinforcement per turn
pub const MIN_REINFORCEMENT: u32 = 3;

/// Fraction of the defending troops the attacker loses on a successful attack
pub const CONQUEST_LOSS_FACTOR: f64 = 0.2;

/// Share of a continent a player must hold before the bonus hunter targets it
const CONTINENT_TARGET_NUM: usize = 3;
const CONTINENT_TARGET_DEN: usize = 5;

// ============================================================================
// TYPES
// ============================================================================

/// An attack from one territory into an adjacent one
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attack {
    pub origin: TerritoryId,
    pub destination: TerritoryId,
}

impl Attack {
    pub fn new(origin: TerritoryId, destination: TerritoryId) -> Self {
        Self {
            origin,
            destination,
        }
    }
}

/// What happened when an attack was resolved
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub attack: Attack,
    pub attacker: PlayerId,
    pub defender: Option<PlayerId>,
    pub success: bool,
    /// Troops now standing on the conquered territory (0 on failure)
    pub troops_moved: u32,
}

/// Rejected operation request; the state is left unchanged
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("unknown territory id {0}")]
    UnknownTerritory(u8),

    #[error("{territory} is not owned by {player}")]
    NotOwner { territory: String, player: PlayerId },

    #[error("{0} has no owner")]
    Unowned(String),

    #[error("{territory} has {troops} troops, need more than {required}")]
    InsufficientTroops {
        territory: String,
        troops: u32,
        required: u32,
    },

    #[error("{from} is not adjacent to {to}")]
    NotAdjacent { from: String, to: String },

    #[error("{0} already belongs to the attacker")]
    OwnTerritory(String),

    #[error("cannot place {requested} troops, only {available} available")]
    ExceedsAvailable { requested: u32, available: u32 },

    #[error("{from} and {to} are not connected through the player's territories")]
    NotConnected { from: String, to: String },
}

// ============================================================================
// REINFORCEMENT
// ============================================================================

/// Sum of bonuses of every continent fully held by `player`
pub fn continent_bonus(state: &MatchState, player: PlayerId) -> u32 {
    state
        .topology()
        .continents()
        .iter()
        .filter(|c| c.members.iter().all(|&t| state.owner(t) == Some(player)))
        .map(|c| c.bonus)
        .sum()
}

/// Troops granted at the start of a turn
pub fn reinforcement_size(state: &MatchState, player: PlayerId) -> u32 {
    let owned = state.territory_count(player) as u32;
    (owned / 2).max(MIN_REINFORCEMENT) + continent_bonus(state, player)
}

/// Grant the turn's reinforcements and place them by border pressure.
/// Returns the number of troops granted.
pub fn reinforce(state: &mut MatchState, player: PlayerId) -> u32 {
    if is_eliminated(state, player) {
        return 0;
    }
    let granted = reinforcement_size(state, player);
    distribute_troops(state, player, granted);
    granted
}

// ============================================================================
// BORDER STRENGTH
// ============================================================================

/// BST: enemy troops adjacent to `t`
pub fn border_strength(state: &MatchState, t: TerritoryId) -> u32 {
    let owner = state.owner(t);
    state
        .topology()
        .neighbours(t)
        .iter()
        .filter(|&&n| state.owner(n) != owner)
        .map(|&n| state.troops(n))
        .sum()
}

/// BSR: border strength over own troops (infinite on an empty territory)
pub fn border_strength_ratio(state: &MatchState, t: TerritoryId) -> f64 {
    let troops = state.troops(t);
    if troops == 0 {
        return f64::INFINITY;
    }
    border_strength(state, t) as f64 / troops as f64
}

/// NBSR: each territory's share of the set's total BSR, parallel to `territories`
pub fn normalized_border_strength(state: &MatchState, territories: &[TerritoryId]) -> Vec<f64> {
    let ratios: Vec<f64> = territories
        .iter()
        .map(|&t| border_strength_ratio(state, t))
        .collect();
    normalize(&ratios)
}

fn normalize(ratios: &[f64]) -> Vec<f64> {
    let infinite = ratios.iter().filter(|r| r.is_infinite()).count();
    if infinite > 0 {
        // Unreachable with legal play; split evenly between the empty territories
        return ratios
            .iter()
            .map(|r| if r.is_infinite() { 1.0 / infinite as f64 } else { 0.0 })
            .collect();
    }

    let total: f64 = ratios.iter().sum();
    if total > 0.0 {
        ratios.iter().map(|r| r / total).collect()
    } else {
        vec![0.0; ratios.len()]
    }
}

/// Index of the first maximum
fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some(b) if values[b] >= v => {}
            _ => best = Some(i),
        }
    }
    best
}

fn round_half_even(x: f64) -> u32 {
    x.round_ties_even().max(0.0) as u32
}

/// Place `available` troops over the player's territories by NBSR.
///
/// Each territory, in topology order, receives `round(NBSR * remaining)`;
/// whatever is left over lands on the highest-NBSR territory. Returns the
/// number of troops placed (always `available` unless the player holds
/// nothing).
pub fn distribute_troops(state: &mut MatchState, player: PlayerId, available: u32) -> u32 {
    let owned = state.owned_territories(player);
    if owned.is_empty() || available == 0 {
        return 0;
    }

    let nbsr = normalized_border_strength(state, &owned);
    let mut remaining = available;

    for (&t, &share) in owned.iter().zip(&nbsr) {
        let alloc = round_half_even(share * remaining as f64).min(remaining);
        state.territory_mut(t).troops += alloc;
        remaining -= alloc;
    }

    if remaining > 0 {
        if let Some(i) = argmax(&nbsr) {
            state.territory_mut(owned[i]).troops += remaining;
        }
    }

    available
}

// ============================================================================
// ATTACKS
// ============================================================================

/// Every legal attack for `player`: origins with more than one troop, in
/// topology order, crossed with their non-owned neighbours in adjacency order
pub fn legal_moves(state: &MatchState, player: PlayerId) -> Vec<Attack> {
    let topo = state.topology();
    let mut moves = Vec::new();

    for (origin, territory) in state.iter() {
        if territory.owner != Some(player) || territory.troops <= 1 {
            continue;
        }
        for &destination in topo.neighbours(origin) {
            if state.is_enemy(destination, player) {
                moves.push(Attack::new(origin, destination));
            }
        }
    }

    moves
}

fn check_known(state: &MatchState, t: TerritoryId) -> Result<(), RuleError> {
    if t.index() < state.topology().len() {
        Ok(())
    } else {
        Err(RuleError::UnknownTerritory(t.0))
    }
}

/// Check that `player` may launch `attack`
pub fn validate_attack(state: &MatchState, player: PlayerId, attack: Attack) -> Result<(), RuleError> {
    check_known(state, attack.origin)?;
    check_known(state, attack.destination)?;
    let topo = state.topology();

    if state.owner(attack.origin) != Some(player) {
        return Err(RuleError::NotOwner {
            territory: topo.name(attack.origin).to_string(),
            player,
        });
    }
    let troops = state.troops(attack.origin);
    if troops <= 1 {
        return Err(RuleError::InsufficientTroops {
            territory: topo.name(attack.origin).to_string(),
            troops,
            required: 1,
        });
    }
    if !topo.are_adjacent(attack.origin, attack.destination) {
        return Err(RuleError::NotAdjacent {
            from: topo.name(attack.origin).to_string(),
            to: topo.name(attack.destination).to_string(),
        });
    }
    if state.owner(attack.destination) == Some(player) {
        return Err(RuleError::OwnTerritory(
            topo.name(attack.destination).to_string(),
        ));
    }

    Ok(())
}

/// Resolve an attack deterministically.
///
/// The attacker wins iff it has more troops than the defender. On success
/// the destination changes hands with `max(1, attackers - round(defenders *
/// 0.2) - 1)` troops, the origin keeps one troop and the defender is flagged
/// as having lost territory. On failure the origin loses one troop.
pub fn resolve_attack(state: &mut MatchState, attack: Attack) -> Result<AttackOutcome, RuleError> {
    check_known(state, attack.origin)?;
    let attacker = state
        .owner(attack.origin)
        .ok_or_else(|| RuleError::Unowned(state.topology().name(attack.origin).to_string()))?;
    validate_attack(state, attacker, attack)?;

    let attacking = state.troops(attack.origin);
    let defending = state.troops(attack.destination);
    let defender = state.owner(attack.destination);

    if attacking > defending {
        let loss = round_half_even(defending as f64 * CONQUEST_LOSS_FACTOR);
        let moved = attacking.saturating_sub(loss).saturating_sub(1).max(1);

        state.set(attack.destination, Some(attacker), moved);
        state.territory_mut(attack.origin).troops = 1;
        if let Some(d) = defender {
            state.mark_lost(d);
        }

        Ok(AttackOutcome {
            attack,
            attacker,
            defender,
            success: true,
            troops_moved: moved,
        })
    } else {
        state.territory_mut(attack.origin).troops -= 1;
        Ok(AttackOutcome {
            attack,
            attacker,
            defender,
            success: false,
            troops_moved: 0,
        })
    }
}

// ============================================================================
// CONNECTIVITY AND REDISTRIBUTION
// ============================================================================

/// Territories of `player` reachable from `origin` through the player's own
/// territories (BFS), excluding `origin`
pub fn connected_territories(
    state: &MatchState,
    origin: TerritoryId,
    player: PlayerId,
) -> FxHashSet<TerritoryId> {
    let mut visited = FxHashSet::default();
    if state.owner(origin) != Some(player) {
        return visited;
    }

    let mut queue = VecDeque::from([origin]);
    visited.insert(origin);

    while let Some(current) = queue.pop_front() {
        for &n in state.topology().neighbours(current) {
            if state.owner(n) == Some(player) && visited.insert(n) {
                queue.push_back(n);
            }
        }
    }

    visited.remove(&origin);
    visited
}

/// True if `t` touches a territory not held by its owner
pub fn is_frontier(state: &MatchState, t: TerritoryId) -> bool {
    let owner = state.owner(t);
    state
        .topology()
        .neighbours(t)
        .iter()
        .any(|&n| state.owner(n) != owner)
}

/// Split the player's territories into (frontier, interior), topology order
pub fn frontier_and_interior(state: &MatchState, player: PlayerId) -> (Vec<TerritoryId>, Vec<TerritoryId>) {
    state
        .owned_territories(player)
        .into_iter()
        .partition(|&t| is_frontier(state, t))
}

/// Push surplus troops from interior territories to the connected frontier,
/// weighted by NBSR. Returns the number of troops moved.
pub fn redistribute(state: &mut MatchState, player: PlayerId) -> u32 {
    let owned = state.owned_territories(player);
    if owned.is_empty() {
        return 0;
    }

    let nbsr = normalized_border_strength(state, &owned);
    let weight = |t: TerritoryId| -> f64 {
        owned
            .iter()
            .position(|&o| o == t)
            .map(|i| nbsr[i])
            .unwrap_or(0.0)
    };
    let (frontier, interior) = frontier_and_interior(state, player);
    let mut total_moved = 0;

    for source in interior {
        let mut surplus = state.troops(source).saturating_sub(1);
        if surplus == 0 {
            continue;
        }

        let connected = connected_territories(state, source, player);
        let targets: Vec<(TerritoryId, f64)> = frontier
            .iter()
            .filter(|f| connected.contains(*f))
            .map(|&f| (f, weight(f)))
            .collect();
        if targets.is_empty() {
            continue;
        }

        let total_weight: f64 = targets.iter().map(|(_, w)| w).sum();
        for &(target, w) in &targets {
            if surplus == 0 {
                break;
            }
            let fraction = if total_weight > 0.0 {
                w / total_weight
            } else {
                1.0 / targets.len() as f64
            };
            let moved = round_half_even(fraction * surplus as f64).min(surplus);
            if moved > 0 {
                state.territory_mut(source).troops -= moved;
                state.territory_mut(target).troops += moved;
                surplus -= moved;
                total_moved += moved;
            }
        }
    }

    total_moved
}

// ============================================================================
// MANUAL OPERATIONS (validated)
// ============================================================================

/// Place `troops` of the `available` reinforcements on one territory
pub fn deploy(
    state: &mut MatchState,
    player: PlayerId,
    territory: TerritoryId,
    troops: u32,
    available: u32,
) -> Result<(), RuleError> {
    check_known(state, territory)?;
    if state.owner(territory) != Some(player) {
        return Err(RuleError::NotOwner {
            territory: state.topology().name(territory).to_string(),
            player,
        });
    }
    if troops > available {
        return Err(RuleError::ExceedsAvailable {
            requested: troops,
            available,
        });
    }

    state.territory_mut(territory).troops += troops;
    Ok(())
}

/// Move `count` troops between two connected territories of `player`,
/// always leaving at least one troop behind
pub fn move_troops(
    state: &mut MatchState,
    player: PlayerId,
    from: TerritoryId,
    to: TerritoryId,
    count: u32,
) -> Result<(), RuleError> {
    check_known(state, from)?;
    check_known(state, to)?;
    let topo = state.topology();

    for t in [from, to] {
        if state.owner(t) != Some(player) {
            return Err(RuleError::NotOwner {
                territory: topo.name(t).to_string(),
                player,
            });
        }
    }
    let troops = state.troops(from);
    if count >= troops {
        return Err(RuleError::InsufficientTroops {
            territory: topo.name(from).to_string(),
            troops,
            required: count,
        });
    }
    if !connected_territories(state, from, player).contains(&to) {
        return Err(RuleError::NotConnected {
            from: topo.name(from).to_string(),
            to: topo.name(to).to_string(),
        });
    }

    state.territory_mut(from).troops -= count;
    state.territory_mut(to).troops += count;
    Ok(())
}

// ============================================================================
// WIN / ELIMINATION
// ============================================================================

/// The sole owner of every territory, if there is one
pub fn winner(state: &MatchState) -> Option<PlayerId> {
    let mut owners = state.iter().map(|(_, t)| t.owner);
    let first = owners.next()??;
    owners.all(|o| o == Some(first)).then_some(first)
}

pub fn is_eliminated(state: &MatchState, player: PlayerId) -> bool {
    state.territory_count(player) == 0
}

/// True if `player` holds at least 60% of the continent containing `t`
pub fn holds_majority_of_continent(state: &MatchState, player: PlayerId, t: TerritoryId) -> bool {
    let topo = state.topology();
    let continent = topo.continent(topo.continent_of(t));
    holds_majority(state, player, &continent.members)
}

pub(crate) fn holds_majority(state: &MatchState, player: PlayerId, members: &[TerritoryId]) -> bool {
    let held = members
        .iter()
        .filter(|&&m| state.owner(m) == Some(player))
        .count();
    held * CONTINENT_TARGET_DEN >= members.len() * CONTINENT_TARGET_NUM
}
