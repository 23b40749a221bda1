//! Exhaustive grid search over evenly spaced points.

use std::sync::Arc;
use tracing::{debug, info};

use nt_types::{Bound, Candidate, ConstraintSet, NtResult};

use crate::algorithm::{Algorithm, AlgorithmConfig, AlgorithmCore};
use crate::evaluator::Evaluator;
use crate::tracker::{FailurePolicy, OptimizationOutcome};

/// Evaluates the seeds, then every point of the Cartesian grid.
///
/// A grid visits each point once, so there is nothing to gain from keeping
/// an unevaluable point around as a penalised contender: failures are counted
/// and skipped. Points are scored in batches of `population_size`, one
/// generation per batch.
#[derive(Debug)]
pub struct GridAlgorithm {
    core: AlgorithmCore,
    steps_per_dimension: usize,
    max_points: usize,
}

impl GridAlgorithm {
    pub const NAME: &'static str = "grid";

    pub fn new(config: AlgorithmConfig, steps_per_dimension: usize) -> Self {
        Self {
            core: AlgorithmCore::new(Self::NAME, config),
            steps_per_dimension,
            max_points: 1_000_000,
        }
    }

    pub fn with_evaluator(
        config: AlgorithmConfig,
        steps_per_dimension: usize,
        evaluator: Arc<dyn Evaluator>,
    ) -> Self {
        Self {
            core: AlgorithmCore::with_evaluator(Self::NAME, config, evaluator),
            steps_per_dimension,
            max_points: 1_000_000,
        }
    }

    pub fn with_max_points(mut self, n: usize) -> Self {
        self.max_points = n;
        self
    }

    /// Number of grid points for the bound space; `None` when unbound or the
    /// count overflows.
    pub fn grid_size(&self) -> Option<usize> {
        let constraints = self.core.constraints().ok()?;
        let mut total: usize = 1;
        for bound in constraints.iter() {
            total = total.checked_mul(axis_len(bound, self.steps_per_dimension))?;
        }
        Some(total)
    }

    fn build_grid(&self, constraints: &ConstraintSet) -> NtResult<Vec<Candidate>> {
        let size = self.grid_size().ok_or_else(|| {
            self.core
                .invalid_config("grid point count overflows; use fewer steps per dimension")
        })?;
        if size > self.max_points {
            return Err(self
                .core
                .invalid_config(format!("grid has {size} points, limit is {}", self.max_points))
                .into());
        }

        let axes: Vec<Vec<f64>> = constraints
            .iter()
            .map(|bound| axis(bound, self.steps_per_dimension))
            .collect();

        // Cartesian product
        let mut result: Vec<Vec<f64>> = vec![Vec::with_capacity(axes.len())];
        for values in &axes {
            let mut next = Vec::with_capacity(result.len() * values.len());
            for existing in &result {
                for value in values {
                    let mut point = existing.clone();
                    point.push(*value);
                    next.push(point);
                }
            }
            result = next;
        }

        Ok(result.into_iter().map(Candidate::new).collect())
    }
}

fn axis_len(bound: &Bound, steps: usize) -> usize {
    if bound.width() == 0.0 {
        1
    } else {
        steps
    }
}

fn axis(bound: &Bound, steps: usize) -> Vec<f64> {
    let n = axis_len(bound, steps);
    if n == 1 {
        return vec![bound.lower];
    }
    (0..n)
        .map(|i| {
            if i == n - 1 {
                bound.upper
            } else {
                let t = i as f64 / (n - 1) as f64;
                bound.clamp(bound.lower + t * bound.width())
            }
        })
        .collect()
}

impl Algorithm for GridAlgorithm {
    fn core(&self) -> &AlgorithmCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AlgorithmCore {
        &mut self.core
    }

    fn optimize(&mut self, evaluator: &dyn Evaluator) -> NtResult<OptimizationOutcome> {
        let space = self.core.prepare()?;
        if self.steps_per_dimension == 0 {
            return Err(self.core.invalid_config("steps_per_dimension must be positive").into());
        }
        let batch_size = self.core.config().population_size.max(1);

        let points = self.build_grid(space.constraints())?;
        info!("Grid search over {} points", points.len());

        let mut run = self.core.start_run(&space, FailurePolicy::Discard);

        let seeds = &self.core.config().seeds;
        if !seeds.is_empty() {
            let fitness = self.core.evaluate_batch(evaluator, seeds);
            run.record_batch(seeds, &fitness)?;
        }

        for batch in points.chunks(batch_size) {
            let fitness = self.core.evaluate_batch(evaluator, batch);
            run.record_batch(batch, &fitness)?;
            run.end_generation();
        }
        debug!(
            "grid finished: {} failures skipped",
            run.tracker().failures()
        );

        Ok(run.finish())
    }
}
