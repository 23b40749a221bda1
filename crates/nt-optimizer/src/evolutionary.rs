//! Generational evolutionary search with elitism.

use rand::Rng;
use std::sync::Arc;
use tracing::debug;

use nt_types::{internal_error, AlgorithmError, Candidate, NtResult, ScoredCandidate};

use crate::algorithm::{Algorithm, AlgorithmConfig, AlgorithmCore};
use crate::evaluator::Evaluator;
use crate::operators::{blend_crossover, gaussian_mutation, tournament_select};
use crate::tracker::{FailurePolicy, OptimizationOutcome};

/// Real-coded evolutionary algorithm.
///
/// The first generation is the seeds topped up with uniform samples to
/// `population_size`. Each following generation keeps the `elite_count`
/// best individuals and fills the rest with offspring from tournament
/// selection, blend crossover and Gaussian mutation. Candidates scored with
/// the sentinel stay in the population as its worst members.
#[derive(Debug)]
pub struct EvolutionaryAlgorithm {
    core: AlgorithmCore,
    generations: usize,
    tournament_size: usize,
    crossover_rate: f64,
    blend_alpha: f64,
    /// Mutation standard deviation as a fraction of each dimension's width.
    mutation_scale: f64,
    elite_count: usize,
}

impl EvolutionaryAlgorithm {
    pub const NAME: &'static str = "evolutionary";

    pub fn new(config: AlgorithmConfig) -> Self {
        Self::from_core(AlgorithmCore::new(Self::NAME, config))
    }

    pub fn with_evaluator(config: AlgorithmConfig, evaluator: Arc<dyn Evaluator>) -> Self {
        Self::from_core(AlgorithmCore::with_evaluator(Self::NAME, config, evaluator))
    }

    fn from_core(core: AlgorithmCore) -> Self {
        Self {
            core,
            generations: 50,
            tournament_size: 2,
            crossover_rate: 0.9,
            blend_alpha: 0.5,
            mutation_scale: 0.1,
            elite_count: 1,
        }
    }

    pub fn with_generations(mut self, n: usize) -> Self {
        self.generations = n;
        self
    }

    pub fn with_tournament_size(mut self, n: usize) -> Self {
        self.tournament_size = n;
        self
    }

    pub fn with_crossover_rate(mut self, rate: f64) -> Self {
        self.crossover_rate = rate;
        self
    }

    pub fn with_blend_alpha(mut self, alpha: f64) -> Self {
        self.blend_alpha = alpha;
        self
    }

    pub fn with_mutation_scale(mut self, scale: f64) -> Self {
        self.mutation_scale = scale;
        self
    }

    pub fn with_elite_count(mut self, n: usize) -> Self {
        self.elite_count = n;
        self
    }

    fn validate(&self) -> NtResult<()> {
        let config = self.core.config();
        if config.population_size < config.seeds.len() {
            return Err(AlgorithmError::PopulationTooSmall {
                population_size: config.population_size,
                seeds: config.seeds.len(),
            }
            .into());
        }
        let problem = if config.population_size < 2 {
            Some("population_size must be at least 2".to_string())
        } else if !(0.0..=1.0).contains(&config.mutation_rate) {
            Some(format!("mutation_rate {} is outside [0, 1]", config.mutation_rate))
        } else if !(0.0..=1.0).contains(&self.crossover_rate) {
            Some(format!("crossover_rate {} is outside [0, 1]", self.crossover_rate))
        } else if self.tournament_size == 0 {
            Some("tournament_size must be positive".to_string())
        } else if self.elite_count >= config.population_size {
            Some(format!(
                "elite_count {} leaves no room for offspring in a population of {}",
                self.elite_count, config.population_size
            ))
        } else if !(self.mutation_scale.is_finite() && self.mutation_scale >= 0.0) {
            Some(format!("mutation_scale {} must be finite and non-negative", self.mutation_scale))
        } else if !(self.blend_alpha.is_finite() && self.blend_alpha >= 0.0) {
            Some(format!("blend_alpha {} must be finite and non-negative", self.blend_alpha))
        } else {
            None
        };
        match problem {
            Some(message) => Err(self.core.invalid_config(message).into()),
            None => Ok(()),
        }
    }
}

impl Algorithm for EvolutionaryAlgorithm {
    fn core(&self) -> &AlgorithmCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AlgorithmCore {
        &mut self.core
    }

    fn optimize(&mut self, evaluator: &dyn Evaluator) -> NtResult<OptimizationOutcome> {
        let space = self.core.prepare()?;
        self.validate()?;

        let config = self.core.config();
        let constraints = space.constraints();
        let ordering = self.core.ordering();
        let population_size = config.population_size;
        let mut rng = self.core.rng();
        let mut run = self.core.start_run(&space, FailurePolicy::Penalize);

        let mut initial: Vec<Candidate> = config.seeds.clone();
        while initial.len() < population_size {
            initial.push(constraints.sample_uniform(&mut rng));
        }
        let fitness = self.core.evaluate_batch(evaluator, &initial);
        run.record_batch(&initial, &fitness)?;
        let mut population: Vec<ScoredCandidate> = initial
            .into_iter()
            .zip(fitness)
            .map(|(candidate, f)| ScoredCandidate::new(candidate, f, &ordering))
            .collect();

        for generation in 0..self.generations {
            // Best first; the sort is stable so ties keep their order.
            population.sort_by(|a, b| ordering.compare(b.fitness, a.fitness));

            let mut offspring: Vec<Candidate> =
                Vec::with_capacity(population_size - self.elite_count);
            while offspring.len() < population_size - self.elite_count {
                let first = tournament_select(&population, self.tournament_size, &ordering, &mut rng)
                    .ok_or_else(|| internal_error!("tournament on an empty population"))?;
                let mut child = if rng.random::<f64>() < self.crossover_rate {
                    let second =
                        tournament_select(&population, self.tournament_size, &ordering, &mut rng)
                            .ok_or_else(|| internal_error!("tournament on an empty population"))?;
                    blend_crossover(
                        &first.candidate,
                        &second.candidate,
                        self.blend_alpha,
                        constraints,
                        &mut rng,
                    )
                } else {
                    first.candidate.clone()
                };
                gaussian_mutation(
                    &mut child,
                    config.mutation_rate,
                    self.mutation_scale,
                    constraints,
                    &mut rng,
                )?;
                offspring.push(child);
            }

            let fitness = self.core.evaluate_batch(evaluator, &offspring);
            run.record_batch(&offspring, &fitness)?;

            population.truncate(self.elite_count);
            population.extend(
                offspring
                    .into_iter()
                    .zip(fitness)
                    .map(|(candidate, f)| ScoredCandidate::new(candidate, f, &ordering)),
            );
            run.end_generation();

            debug!(
                "evolutionary generation {}: best {:?}",
                generation,
                run.tracker().best().map(|b| b.fitness)
            );
        }

        Ok(run.finish())
    }
}
