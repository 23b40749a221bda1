//! Independent uniform sampling across the bound space.

use std::sync::Arc;
use tracing::debug;

use nt_types::{Candidate, NtResult};

use crate::algorithm::{Algorithm, AlgorithmConfig, AlgorithmCore};
use crate::evaluator::Evaluator;
use crate::tracker::{FailurePolicy, OptimizationOutcome};

/// Evaluates the seeds, then `population_size` fresh uniform samples per
/// generation.
#[derive(Debug)]
pub struct RandomSearch {
    core: AlgorithmCore,
    generations: usize,
}

impl RandomSearch {
    pub const NAME: &'static str = "random";

    pub fn new(config: AlgorithmConfig) -> Self {
        Self {
            core: AlgorithmCore::new(Self::NAME, config),
            generations: 10,
        }
    }

    pub fn with_evaluator(config: AlgorithmConfig, evaluator: Arc<dyn Evaluator>) -> Self {
        Self {
            core: AlgorithmCore::with_evaluator(Self::NAME, config, evaluator),
            generations: 10,
        }
    }

    pub fn with_generations(mut self, n: usize) -> Self {
        self.generations = n;
        self
    }

    pub fn generations(&self) -> usize {
        self.generations
    }
}

impl Algorithm for RandomSearch {
    fn core(&self) -> &AlgorithmCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AlgorithmCore {
        &mut self.core
    }

    fn optimize(&mut self, evaluator: &dyn Evaluator) -> NtResult<OptimizationOutcome> {
        let space = self.core.prepare()?;
        let population_size = self.core.config().population_size;
        if population_size == 0 && self.generations > 0 {
            return Err(self.core.invalid_config("population_size must be positive").into());
        }

        let mut rng = self.core.rng();
        let mut run = self.core.start_run(&space, FailurePolicy::Penalize);

        let seeds = &self.core.config().seeds;
        if !seeds.is_empty() {
            let fitness = self.core.evaluate_batch(evaluator, seeds);
            run.record_batch(seeds, &fitness)?;
        }

        for generation in 0..self.generations {
            let batch: Vec<Candidate> = (0..population_size)
                .map(|_| space.constraints().sample_uniform(&mut rng))
                .collect();
            let fitness = self.core.evaluate_batch(evaluator, &batch);
            run.record_batch(&batch, &fitness)?;
            run.end_generation();
            debug!(
                "random generation {}: best {:?}",
                generation,
                run.tracker().best().map(|b| b.fitness)
            );
        }

        Ok(run.finish())
    }
}
