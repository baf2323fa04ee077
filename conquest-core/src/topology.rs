//! Board topology: territories, continents and the adjacency graph
//!
//! A `Topology` is built once from a `MapSpec`, validated, and then shared
//! read-only (behind an `Arc`) by every match. Territory and continent ids
//! are indices into insertion order, which is also the iteration order every
//! rule and strategy relies on.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of territories addressable by `TerritoryId`
pub const MAX_TERRITORIES: usize = u8::MAX as usize;

// ============================================================================
// IDS
// ============================================================================

/// Territory index (insertion order of the map)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TerritoryId(pub u8);

impl TerritoryId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Continent index (insertion order of the map)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContinentId(pub u8);

impl ContinentId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Configuration defects detected while building a topology
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("map has no territories")]
    Empty,

    #[error("map has {0} territories, at most {MAX_TERRITORIES} are supported")]
    TooManyTerritories(usize),

    #[error("territory {0} is declared more than once")]
    DuplicateTerritory(String),

    #[error("territory {0} has no adjacency entry")]
    MissingAdjacency(String),

    #[error("adjacency entry for unknown territory {0}")]
    UnknownTerritory(String),

    #[error("territory {territory} lists unknown neighbour {neighbour}")]
    UnknownNeighbour { territory: String, neighbour: String },

    #[error("territory {0} lists itself as a neighbour")]
    SelfAdjacent(String),

    #[error("adjacency is not symmetric: {from} -> {to} has no reverse edge")]
    AsymmetricAdjacency { from: String, to: String },

    #[error("territory {0} does not belong to any continent")]
    MissingContinent(String),

    #[error("territory {territory} belongs to both {first} and {second}")]
    MultipleContinents {
        territory: String,
        first: String,
        second: String,
    },

    #[error("continent {continent} lists unknown territory {territory}")]
    UnknownContinentMember { continent: String, territory: String },

    #[error("continent {0} must have a positive bonus")]
    InvalidBonus(String),

    #[error("continent {0} has no members")]
    EmptyContinent(String),
}

// ============================================================================
// MAP SPECIFICATION (serde)
// ============================================================================

/// Continent declaration in a map file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinentSpec {
    pub name: String,
    pub bonus: u32,
    pub members: Vec<String>,
}

/// Unvalidated map description, as read from JSON
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSpec {
    /// Territory names in iteration order
    pub territories: Vec<String>,
    /// Territory name -> neighbour names (neighbour order is preserved)
    pub adjacency: BTreeMap<String, Vec<String>>,
    /// Continents in iteration order
    pub continents: Vec<ContinentSpec>,
}

impl MapSpec {
    /// Load a map from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read map file {}", path.display()))?;
        let spec = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse map file {}", path.display()))?;
        Ok(spec)
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The six-continent, 42-territory map of the classic game
    pub fn standard() -> Self {
        let territories = STANDARD_ADJACENCY
            .iter()
            .map(|(name, _)| name.to_string())
            .collect();
        let adjacency = STANDARD_ADJACENCY
            .iter()
            .map(|(name, neighbours)| {
                (
                    name.to_string(),
                    neighbours.iter().map(|n| n.to_string()).collect(),
                )
            })
            .collect();
        let continents = STANDARD_CONTINENTS
            .iter()
            .map(|(name, bonus, members)| ContinentSpec {
                name: name.to_string(),
                bonus: *bonus,
                members: members.iter().map(|m| m.to_string()).collect(),
            })
            .collect();

        Self {
            territories,
            adjacency,
            continents,
        }
    }
}

// ============================================================================
// TOPOLOGY
// ============================================================================

/// Validated continent
#[derive(Clone, Debug)]
pub struct Continent {
    pub name: String,
    pub bonus: u32,
    pub members: Vec<TerritoryId>,
}

/// Validated, immutable board topology
#[derive(Clone, Debug)]
pub struct Topology {
    names: Vec<String>,
    adjacency: Vec<Vec<TerritoryId>>,
    continent_of: Vec<ContinentId>,
    continents: Vec<Continent>,
    by_name: FxHashMap<String, TerritoryId>,
}

impl Topology {
    /// Build and validate a topology from a map specification
    pub fn from_spec(spec: &MapSpec) -> Result<Self, TopologyError> {
        if spec.territories.is_empty() {
            return Err(TopologyError::Empty);
        }
        if spec.territories.len() > MAX_TERRITORIES {
            return Err(TopologyError::TooManyTerritories(spec.territories.len()));
        }

        let mut by_name = FxHashMap::default();
        for (i, name) in spec.territories.iter().enumerate() {
            if by_name.insert(name.clone(), TerritoryId(i as u8)).is_some() {
                return Err(TopologyError::DuplicateTerritory(name.clone()));
            }
        }

        let adjacency = build_adjacency(spec, &by_name)?;
        check_symmetry(&spec.territories, &adjacency)?;
        let (continents, continent_of) = build_continents(spec, &by_name)?;

        Ok(Self {
            names: spec.territories.clone(),
            adjacency,
            continent_of,
            continents,
            by_name,
        })
    }

    /// The validated standard map
    pub fn standard() -> Result<Self, TopologyError> {
        Self::from_spec(&MapSpec::standard())
    }

    /// Number of territories
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All territory ids in iteration order
    pub fn territories(&self) -> impl Iterator<Item = TerritoryId> + '_ {
        (0..self.names.len()).map(|i| TerritoryId(i as u8))
    }

    pub fn name(&self, t: TerritoryId) -> &str {
        &self.names[t.index()]
    }

    /// Look up a territory by its exact name
    pub fn territory(&self, name: &str) -> Option<TerritoryId> {
        self.by_name.get(name).copied()
    }

    pub fn neighbours(&self, t: TerritoryId) -> &[TerritoryId] {
        &self.adjacency[t.index()]
    }

    pub fn are_adjacent(&self, a: TerritoryId, b: TerritoryId) -> bool {
        self.adjacency[a.index()].contains(&b)
    }

    pub fn continents(&self) -> &[Continent] {
        &self.continents
    }

    pub fn continent(&self, id: ContinentId) -> &Continent {
        &self.continents[id.index()]
    }

    pub fn continent_of(&self, t: TerritoryId) -> ContinentId {
        self.continent_of[t.index()]
    }

    pub fn bonus(&self, id: ContinentId) -> u32 {
        self.continents[id.index()].bonus
    }

    /// Convert back into a serialisable map specification
    pub fn to_spec(&self) -> MapSpec {
        let adjacency = self
            .territories()
            .map(|t| {
                (
                    self.name(t).to_string(),
                    self.neighbours(t)
                        .iter()
                        .map(|&n| self.name(n).to_string())
                        .collect(),
                )
            })
            .collect();
        let continents = self
            .continents
            .iter()
            .map(|c| ContinentSpec {
                name: c.name.clone(),
                bonus: c.bonus,
                members: c.members.iter().map(|&m| self.name(m).to_string()).collect(),
            })
            .collect();

        MapSpec {
            territories: self.names.clone(),
            adjacency,
            continents,
        }
    }
}

fn build_adjacency(
    spec: &MapSpec,
    by_name: &FxHashMap<String, TerritoryId>,
) -> Result<Vec<Vec<TerritoryId>>, TopologyError> {
    if let Some(unknown) = spec.adjacency.keys().find(|k| !by_name.contains_key(*k)) {
        return Err(TopologyError::UnknownTerritory(unknown.clone()));
    }

    let mut adjacency = Vec::with_capacity(spec.territories.len());
    for name in &spec.territories {
        let neighbours = match spec.adjacency.get(name) {
            Some(list) if !list.is_empty() => list,
            _ => return Err(TopologyError::MissingAdjacency(name.clone())),
        };

        let mut ids = Vec::with_capacity(neighbours.len());
        for neighbour in neighbours {
            if neighbour == name {
                return Err(TopologyError::SelfAdjacent(name.clone()));
            }
            let id = by_name.get(neighbour).copied().ok_or_else(|| {
                TopologyError::UnknownNeighbour {
                    territory: name.clone(),
                    neighbour: neighbour.clone(),
                }
            })?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        adjacency.push(ids);
    }

    Ok(adjacency)
}

fn check_symmetry(names: &[String], adjacency: &[Vec<TerritoryId>]) -> Result<(), TopologyError> {
    for (from, neighbours) in adjacency.iter().enumerate() {
        let from_id = TerritoryId(from as u8);
        for &to in neighbours {
            if !adjacency[to.index()].contains(&from_id) {
                return Err(TopologyError::AsymmetricAdjacency {
                    from: names[from].clone(),
                    to: names[to.index()].clone(),
                });
            }
        }
    }
    Ok(())
}

fn build_continents(
    spec: &MapSpec,
    by_name: &FxHashMap<String, TerritoryId>,
) -> Result<(Vec<Continent>, Vec<ContinentId>), TopologyError> {
    let mut assigned: Vec<Option<ContinentId>> = vec![None; spec.territories.len()];
    let mut continents = Vec::with_capacity(spec.continents.len());

    for (ci, cs) in spec.continents.iter().enumerate() {
        if cs.bonus == 0 {
            return Err(TopologyError::InvalidBonus(cs.name.clone()));
        }

        let cid = ContinentId(ci as u8);
        let mut members = Vec::with_capacity(cs.members.len());
        for member in &cs.members {
            let t = by_name.get(member).copied().ok_or_else(|| {
                TopologyError::UnknownContinentMember {
                    continent: cs.name.clone(),
                    territory: member.clone(),
                }
            })?;
            match assigned[t.index()] {
                Some(prev) if prev != cid => {
                    return Err(TopologyError::MultipleContinents {
                        territory: member.clone(),
                        first: spec.continents[prev.index()].name.clone(),
                        second: cs.name.clone(),
                    });
                }
                Some(_) => continue,
                None => assigned[t.index()] = Some(cid),
            }
            members.push(t);
        }
        if members.is_empty() {
            return Err(TopologyError::EmptyContinent(cs.name.clone()));
        }

        continents.push(Continent {
            name: cs.name.clone(),
            bonus: cs.bonus,
            members,
        });
    }

    let continent_of = assigned
        .into_iter()
        .enumerate()
        .map(|(i, c)| c.ok_or_else(|| TopologyError::MissingContinent(spec.territories[i].clone())))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((continents, continent_of))
}

// ============================================================================
// STANDARD MAP DATA
// ============================================================================

/// Territory -> neighbours, grouped by continent
const STANDARD_ADJACENCY: &[(&str, &[&str])] = &[
    // North America
    ("Alaska", &["Mackenzie", "Vancouver", "Vladivostok"]),
    ("Mackenzie", &["Alaska", "Vancouver", "Ottawa", "Greenland"]),
    ("Vancouver", &["Alaska", "Mackenzie", "Ottawa", "California"]),
    ("Greenland", &["Labrador", "Mackenzie", "Iceland"]),
    ("Labrador", &["Greenland", "Ottawa", "New York"]),
    ("Ottawa", &["Mackenzie", "Vancouver", "California", "New York", "Labrador"]),
    ("New York", &["Ottawa", "California", "Mexico", "Labrador"]),
    ("California", &["Vancouver", "Ottawa", "New York", "Mexico"]),
    ("Mexico", &["California", "New York", "Venezuela"]),
    // South America
    ("Venezuela", &["Mexico", "Brazil", "Peru"]),
    ("Peru", &["Venezuela", "Brazil", "Argentina"]),
    ("Brazil", &["Venezuela", "Peru", "Argentina", "Algeria"]),
    ("Argentina", &["Peru", "Brazil"]),
    // Europe
    ("England", &["Iceland", "France", "Germany", "Sweden"]),
    ("Iceland", &["Greenland", "England"]),
    ("France", &["England", "Germany", "Algeria", "Poland"]),
    ("Poland", &["France", "Germany", "Sweden", "Moscow", "Middle East", "Egypt"]),
    ("Germany", &["France", "Poland", "Sweden", "England"]),
    ("Sweden", &["Germany", "Poland", "Moscow", "England"]),
    ("Moscow", &["Sweden", "Poland", "Omsk", "Aral", "Middle East"]),
    // Asia
    ("Vladivostok", &["Alaska", "Siberia", "Chita", "China", "Japan"]),
    ("Siberia", &["Vladivostok", "Chita", "Dudinka"]),
    ("Chita", &["Vladivostok", "Siberia", "Dudinka", "Mongolia", "China"]),
    ("Dudinka", &["Siberia", "Chita", "Mongolia", "Omsk"]),
    ("Mongolia", &["Chita", "Dudinka", "Omsk", "China"]),
    ("Omsk", &["Mongolia", "Dudinka", "Aral", "Moscow", "China"]),
    ("Aral", &["Omsk", "Moscow", "China", "India", "Middle East"]),
    ("Japan", &["China", "Vladivostok"]),
    ("China", &["Japan", "Vietnam", "India", "Aral", "Mongolia", "Chita", "Vladivostok", "Omsk"]),
    ("Vietnam", &["Borneo", "China", "India"]),
    ("India", &["China", "Aral", "Middle East", "Sumatra", "Vietnam"]),
    ("Middle East", &["Moscow", "Egypt", "India", "Aral", "Poland"]),
    // Africa
    ("Egypt", &["Poland", "Algeria", "Sudan", "Middle East"]),
    ("Algeria", &["France", "Egypt", "Sudan", "Congo", "Brazil"]),
    ("Sudan", &["Algeria", "Egypt", "Congo", "South Africa", "Madagascar"]),
    ("Congo", &["Algeria", "Sudan", "South Africa"]),
    ("South Africa", &["Sudan", "Congo", "Madagascar"]),
    ("Madagascar", &["South Africa", "Sudan"]),
    // Oceania
    ("Australia", &["New Guinea", "Borneo", "Sumatra"]),
    ("Borneo", &["Australia", "New Guinea", "Vietnam"]),
    ("New Guinea", &["Australia", "Borneo"]),
    ("Sumatra", &["Australia", "India"]),
];

const STANDARD_CONTINENTS: &[(&str, u32, &[&str])] = &[
    (
        "North America",
        5,
        &[
            "Alaska", "Mackenzie", "Vancouver", "Greenland", "Labrador", "Ottawa", "New York",
            "California", "Mexico",
        ],
    ),
    ("South America", 2, &["Venezuela", "Peru", "Brazil", "Argentina"]),
    (
        "Europe",
        5,
        &["England", "Iceland", "France", "Poland", "Germany", "Sweden", "Moscow"],
    ),
    (
        "Asia",
        7,
        &[
            "Vladivostok", "Siberia", "Chita", "Dudinka", "Mongolia", "Omsk", "Aral", "Japan",
            "China", "Vietnam", "India", "Middle East",
        ],
    ),
    (
        "Africa",
        3,
        &["Egypt", "Algeria", "Sudan", "Congo", "South Africa", "Madagascar"],
    ),
    ("Oceania", 2, &["Australia", "Borneo", "New Guinea", "Sumatra"]),
];
