//! Crossover operators for gene evolution
//!
//! Single-point crossover on the bit string. The cut always falls after the
//! first or second bit, so on hybrid genes only the primary selector is ever
//! split and the tails travel whole.

use std::ops::RangeInclusive;

use conquest_core::Gene;
use rand::Rng;

/// Cut positions, counted from the most significant bit
pub const CUT_POINTS: RangeInclusive<usize> = 1..=2;

/// Crossover two genes at a random cut, with probability `rate`.
///
/// Returns `(a[..cut] + b[cut..], b[..cut] + a[cut..])`, or copies of the
/// parents when no crossover happens.
pub fn crossover<R: Rng>(a: &Gene, b: &Gene, rate: f64, rng: &mut R) -> (Gene, Gene) {
    if !rng.gen_bool(rate.clamp(0.0, 1.0)) {
        return (*a, *b);
    }

    let cut = rng.gen_range(CUT_POINTS);
    (a.splice(b, cut), b.splice(a, cut))
}
