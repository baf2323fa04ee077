//! Selection operators for genetic algorithms
//!
//! Elitism keeps the top agents; fitness-proportional (roulette) selection
//! fills the rest of the breeding pool.

use conquest_core::Agent;
use rand::Rng;

/// Select the top N individuals by fitness (elitism).
///
/// Returns indices of the best individuals, sorted by fitness (descending).
/// Ties keep their original order.
pub fn select_elite(fitness: &[f64], n: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..fitness.len()).collect();
    indices.sort_by(|&a, &b| {
        fitness[b].partial_cmp(&fitness[a]).unwrap_or(std::cmp::Ordering::Equal)
    });
    indices.truncate(n);
    indices
}

/// Roulette-wheel selection: index `i` is chosen with probability
/// `weights[i] / sum(weights)`. When every weight is zero the wheel is
/// uniform. Returns `None` for an empty slice.
pub fn roulette_select<R: Rng>(weights: &[f64], rng: &mut R) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }

    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Some(rng.gen_range(0..weights.len()));
    }

    let spin = rng.gen::<f64>() * total;
    let mut cumulative = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if w > 0.0 && cumulative >= spin {
            return Some(i);
        }
    }

    // Float drift: fall back to the last weighted slot
    weights.iter().rposition(|&w| w > 0.0)
}

/// Build the breeding pool: the `elitism` best agents, then roulette picks
/// over the whole population until the pool holds `pool_size` distinct
/// agents (or every agent).
///
/// Picks that would repeat an agent are redrawn; this samples the
/// remaining agents in proportion to fitness, uniformly once the remaining
/// fitness is zero.
pub fn select_parents<R: Rng>(
    agents: &[Agent],
    elitism: usize,
    pool_size: usize,
    rng: &mut R,
) -> Vec<usize> {
    let fitness: Vec<f64> = agents.iter().map(|a| a.fitness).collect();
    let target = pool_size.max(elitism).min(agents.len());

    let mut pool = select_elite(&fitness, elitism);
    let mut in_pool = vec![false; agents.len()];
    for &i in &pool {
        in_pool[i] = true;
    }

    while pool.len() < target {
        let candidates: Vec<usize> = (0..agents.len()).filter(|&i| !in_pool[i]).collect();
        let weights: Vec<f64> = candidates.iter().map(|&i| fitness[i]).collect();
        let Some(pick) = roulette_select(&weights, rng) else {
            break;
        };
        let chosen = candidates[pick];
        in_pool[chosen] = true;
        pool.push(chosen);
    }

    pool
}
