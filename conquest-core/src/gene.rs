//! Gene encoding
//!
//! A gene is a short bit string, most significant bit first. Three bits pick
//! one of the eight strategies. Nine bits encode a hybrid laid out as
//! `e1 | e2 | p`: two strategy selectors and a probability selector, where
//! the agent plays `e1` with probability `p / 7` and `e2` otherwise.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::strategy::Strategy;

/// Width of a single-strategy gene
pub const SIMPLE_WIDTH: usize = 3;
/// Width of a hybrid gene
pub const HYBRID_WIDTH: usize = 9;
/// Largest probability selector (always play the primary strategy)
pub const PROBABILITY_MAX: u8 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneError {
    #[error("gene must be {SIMPLE_WIDTH} or {HYBRID_WIDTH} bits, got {0}")]
    InvalidWidth(usize),

    #[error("gene contains non-binary character {0:?}")]
    InvalidCharacter(char),

    #[error("value {value:#b} does not fit in {width} bits")]
    Overflow { value: u16, width: usize },
}

/// Bit-string gene
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Gene {
    bits: u16,
    width: u8,
}

impl Gene {
    /// Build a gene from its integer value
    pub fn from_bits(bits: u16, width: usize) -> Result<Self, GeneError> {
        if width != SIMPLE_WIDTH && width != HYBRID_WIDTH {
            return Err(GeneError::InvalidWidth(width));
        }
        if bits >> width != 0 {
            return Err(GeneError::Overflow { value: bits, width });
        }
        Ok(Self {
            bits,
            width: width as u8,
        })
    }

    pub fn simple(strategy: Strategy) -> Self {
        Self {
            bits: strategy.code() as u16,
            width: SIMPLE_WIDTH as u8,
        }
    }

    /// Hybrid gene; `probability_code` is clamped to 0..=7
    pub fn hybrid(primary: Strategy, secondary: Strategy, probability_code: u8) -> Self {
        let p = probability_code.min(PROBABILITY_MAX) as u16;
        Self {
            bits: (primary.code() as u16) << 6 | (secondary.code() as u16) << 3 | p,
            width: HYBRID_WIDTH as u8,
        }
    }

    /// Uniformly random gene of the requested kind
    pub fn random<R: Rng>(rng: &mut R, hybrid: bool) -> Self {
        let width = if hybrid { HYBRID_WIDTH } else { SIMPLE_WIDTH };
        Self {
            bits: rng.gen_range(0..(1u16 << width)),
            width: width as u8,
        }
    }

    pub fn bits(&self) -> u16 {
        self.bits
    }

    pub fn width(&self) -> usize {
        self.width as usize
    }

    pub fn is_hybrid(&self) -> bool {
        self.width() == HYBRID_WIDTH
    }

    /// Bit at `pos`, counting from the most significant end
    pub fn bit(&self, pos: usize) -> bool {
        debug_assert!(pos < self.width());
        (self.bits >> (self.width() - 1 - pos)) & 1 == 1
    }

    /// Copy with the bit at `pos` inverted (MSB-first)
    pub fn flip(&self, pos: usize) -> Self {
        let pos = pos.min(self.width() - 1);
        Self {
            bits: self.bits ^ (1 << (self.width() - 1 - pos)),
            width: self.width,
        }
    }

    /// `self[..cut] + other[cut..]`, taking the width of `other`
    pub fn splice(&self, other: &Gene, cut: usize) -> Self {
        let width = other.width();
        let mut bits = 0u16;
        for pos in 0..width {
            let bit = if pos < cut && pos < self.width() {
                self.bit(pos)
            } else {
                other.bit(pos)
            };
            bits = (bits << 1) | bit as u16;
        }
        Self {
            bits,
            width: other.width,
        }
    }

    pub fn decode(&self) -> Genotype {
        if self.is_hybrid() {
            Genotype::Hybrid(HybridStrategy {
                primary: Strategy::from_bits(self.bits >> 6),
                secondary: Strategy::from_bits(self.bits >> 3),
                probability_code: (self.bits & 0b111) as u8,
            })
        } else {
            Genotype::Simple(Strategy::from_bits(self.bits))
        }
    }
}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$b}", self.bits, width = self.width())
    }
}

impl FromStr for Gene {
    type Err = GeneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let width = s.chars().count();
        if width != SIMPLE_WIDTH && width != HYBRID_WIDTH {
            return Err(GeneError::InvalidWidth(width));
        }

        let mut bits = 0u16;
        for c in s.chars() {
            let bit = match c {
                '0' => 0,
                '1' => 1,
                other => return Err(GeneError::InvalidCharacter(other)),
            };
            bits = (bits << 1) | bit;
        }
        Self::from_bits(bits, width)
    }
}

impl TryFrom<String> for Gene {
    type Error = GeneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Gene> for String {
    fn from(gene: Gene) -> Self {
        gene.to_string()
    }
}

// ============================================================================
// GENOTYPE
// ============================================================================

/// Two strategies mixed by a probability selector
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HybridStrategy {
    pub primary: Strategy,
    pub secondary: Strategy,
    pub probability_code: u8,
}

impl HybridStrategy {
    /// Probability of playing the primary strategy
    pub fn probability(&self) -> f64 {
        self.probability_code as f64 / PROBABILITY_MAX as f64
    }

    /// Draw one decision's strategy
    pub fn pick<R: Rng>(&self, rng: &mut R) -> Strategy {
        if rng.gen::<f64>() < self.probability() {
            self.primary
        } else {
            self.secondary
        }
    }
}

/// Decoded gene
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Genotype {
    Simple(Strategy),
    Hybrid(HybridStrategy),
}

impl Genotype {
    /// Strategy to use for one decision. Simple genes consume no randomness.
    pub fn choose<R: Rng>(&self, rng: &mut R) -> Strategy {
        match self {
            Genotype::Simple(s) => *s,
            Genotype::Hybrid(h) => h.pick(rng),
        }
    }

    /// Human-readable name
    pub fn name(&self) -> String {
        match self {
            Genotype::Simple(s) => s.name().to_string(),
            Genotype::Hybrid(h) => format!(
                "{} / {} ({}/{})",
                h.primary.name(),
                h.secondary.name(),
                h.probability_code,
                PROBABILITY_MAX
            ),
        }
    }
}
