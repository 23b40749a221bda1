//! Variation operators for real-valued chromosomes.
//!
//! Every operator leaves its output inside the constraint set, so the
//! sampling invariant holds for offspring as well as for fresh samples.

use rand::{Rng, RngCore};
use rand_distr::{Distribution, Normal};

use nt_types::{
    config_error, Bound, Candidate, ConstraintSet, FitnessOrdering, NtResult, ScoredCandidate,
};

/// Pick `size` contestants at random (with replacement) and return the
/// fittest. Returns `None` only for an empty population.
pub fn tournament_select<'a>(
    population: &'a [ScoredCandidate],
    size: usize,
    ordering: &FitnessOrdering,
    rng: &mut dyn RngCore,
) -> Option<&'a ScoredCandidate> {
    if population.is_empty() {
        return None;
    }

    let mut winner = &population[rng.random_range(0..population.len())];
    for _ in 1..size.max(1) {
        let challenger = &population[rng.random_range(0..population.len())];
        if ordering.is_better(challenger.fitness, winner.fitness) {
            winner = challenger;
        }
    }
    Some(winner)
}

/// BLX-alpha crossover: each child gene is uniform on the parents' interval
/// widened by `alpha` times its length on both sides and cut back to the
/// dimension's bound.
pub fn blend_crossover(
    a: &[f64],
    b: &[f64],
    alpha: f64,
    constraints: &ConstraintSet,
    rng: &mut dyn RngCore,
) -> Candidate {
    a.iter()
        .zip(b)
        .zip(constraints.iter())
        .map(|((&x, &y), bound)| {
            let (lo, hi) = if x <= y { (x, y) } else { (y, x) };
            let spread = (hi - lo) * alpha;
            // The widened ends may overflow to infinity on very wide dimensions.
            let window = Bound {
                lower: bound.clamp(lo - spread),
                upper: bound.clamp(hi + spread),
            };
            if window.lower < window.upper {
                window.sample(rng)
            } else {
                window.lower
            }
        })
        .collect()
}

/// Gaussian mutation. Each gene mutates with probability `mutation_rate`,
/// drawing from a normal with standard deviation `scale` times the width of
/// its dimension. Returns the number of genes changed.
pub fn gaussian_mutation(
    genes: &mut [f64],
    mutation_rate: f64,
    scale: f64,
    constraints: &ConstraintSet,
    rng: &mut dyn RngCore,
) -> NtResult<usize> {
    let mut mutated = 0;
    for (gene, bound) in genes.iter_mut().zip(constraints.iter()) {
        if bound.width() == 0.0 || rng.random::<f64>() >= mutation_rate {
            continue;
        }
        let normal = Normal::new(0.0, scale * bound.width())
            .map_err(|e| config_error!("invalid mutation scale {scale}: {e}"))?;
        *gene = bound.clamp(*gene + normal.sample(rng));
        mutated += 1;
    }
    Ok(mutated)
}
