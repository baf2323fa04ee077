//! Mutation operators for gene evolution
//!
//! A mutation flips one bit among the first three. Hybrid genes keep the
//! same window, so their secondary and probability selectors never mutate.

use conquest_core::Gene;
use rand::Rng;

/// Bit positions eligible for a flip (MSB-first)
pub const MUTATION_WINDOW: usize = 3;

/// With probability `rate`, flip one bit in the mutation window
pub fn mutate<R: Rng>(gene: &Gene, rate: f64, rng: &mut R) -> Gene {
    if !rng.gen_bool(rate.clamp(0.0, 1.0)) {
        return *gene;
    }

    let pos = rng.gen_range(0..MUTATION_WINDOW.min(gene.width()));
    gene.flip(pos)
}
