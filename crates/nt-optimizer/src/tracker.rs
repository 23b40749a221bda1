//! Best-candidate tracking and optimization run bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use nt_types::{
    validation_error, Candidate, ConstraintSet, FitnessOrdering, NtResult, ObjectiveDirection,
    ScoredCandidate,
};

use crate::tuner::TunerLink;

/// Unique optimization run identifier.
pub type RunId = Uuid;

/// What the tracker does with a candidate scored as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Keep it as a (worst possible) contender; it is the best only while
    /// nothing has been evaluated successfully.
    Penalize,
    /// Count it and otherwise ignore it.
    Discard,
}

/// Keeps the best candidate seen so far under a [`FitnessOrdering`].
///
/// Every offered candidate is checked against the constraint set first, so a
/// vector produced out-of-band is reported as an error instead of being
/// ranked.
#[derive(Debug, Clone)]
pub struct BestTracker {
    constraints: ConstraintSet,
    ordering: FitnessOrdering,
    policy: FailurePolicy,
    best: Option<ScoredCandidate>,
    evaluations: usize,
    failures: usize,
}

impl BestTracker {
    pub fn new(constraints: ConstraintSet, ordering: FitnessOrdering, policy: FailurePolicy) -> Self {
        Self {
            constraints,
            ordering,
            policy,
            best: None,
            evaluations: 0,
            failures: 0,
        }
    }

    /// Record one evaluation. Returns whether it became the new best.
    pub fn offer(&mut self, candidate: &Candidate, fitness: f64) -> NtResult<bool> {
        self.constraints.check(candidate)?;
        self.evaluations += 1;

        let failed = self.ordering.is_failure(fitness);
        if failed {
            self.failures += 1;
            if self.policy == FailurePolicy::Discard {
                return Ok(false);
            }
        }

        let improves = match &self.best {
            None => true,
            Some(current_best) => self.ordering.is_better(fitness, current_best.fitness),
        };
        if improves {
            self.best = Some(ScoredCandidate::new(candidate.clone(), fitness, &self.ordering));
        }
        Ok(improves)
    }

    pub fn best(&self) -> Option<&ScoredCandidate> {
        self.best.as_ref()
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn ordering(&self) -> &FitnessOrdering {
        &self.ordering
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }
}

/// Final report of one `optimize` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    pub run_id: RunId,
    pub algorithm: String,
    pub direction: ObjectiveDirection,
    pub bad_fitness_value: f64,
    pub best: Option<ScoredCandidate>,
    pub evaluations: usize,
    pub failures: usize,
    pub generations: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl OptimizationOutcome {
    pub fn best_candidate(&self) -> Option<&Candidate> {
        self.best.as_ref().map(|b| &b.candidate)
    }

    pub fn best_fitness(&self) -> Option<f64> {
        self.best.as_ref().map(|b| b.fitness)
    }

    /// The `(best_candidate, best_fitness)` pair.
    pub fn optimum(&self) -> Option<(Candidate, f64)> {
        self.best.as_ref().map(|b| (b.candidate.clone(), b.fitness))
    }

    /// True when no candidate was evaluated successfully.
    pub fn all_failed(&self) -> bool {
        self.best.as_ref().map_or(true, |b| b.failed)
    }
}

/// In-flight state of an optimization run: the tracker plus the metadata and
/// tuner notifications around it.
#[derive(Debug)]
pub struct OptimizationRun {
    run_id: RunId,
    algorithm: String,
    tracker: BestTracker,
    tuner: Option<TunerLink>,
    generations: usize,
    started_at: DateTime<Utc>,
}

impl OptimizationRun {
    pub fn new(algorithm: impl Into<String>, tracker: BestTracker, tuner: Option<TunerLink>) -> Self {
        let algorithm = algorithm.into();
        let run_id = Uuid::new_v4();
        info!(
            "Starting optimization run {} ({}, genome size {}, {:?})",
            run_id,
            algorithm,
            tracker.constraints.genome_size(),
            tracker.ordering.direction
        );
        if let Some(link) = &tuner {
            if !link.is_alive() {
                warn!("Tuner {} is gone; run {} will not report progress", link.tuner_id(), run_id);
            }
        }
        Self {
            run_id,
            algorithm,
            tracker,
            tuner,
            generations: 0,
            started_at: Utc::now(),
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn tracker(&self) -> &BestTracker {
        &self.tracker
    }

    pub fn generations(&self) -> usize {
        self.generations
    }

    pub fn record(&mut self, candidate: &Candidate, fitness: f64) -> NtResult<bool> {
        let improved = self.tracker.offer(candidate, fitness)?;
        if let Some(link) = &self.tuner {
            let scored = ScoredCandidate::new(candidate.clone(), fitness, &self.tracker.ordering);
            link.notify_evaluation(self.run_id, &scored);
        }
        Ok(improved)
    }

    /// Record a batch of evaluations, pairing `fitness[i]` with
    /// `candidates[i]`.
    pub fn record_batch(&mut self, candidates: &[Candidate], fitness: &[f64]) -> NtResult<()> {
        if candidates.len() != fitness.len() {
            return Err(validation_error!(
                "{} candidates but {} fitness values",
                candidates.len(),
                fitness.len()
            ));
        }
        for (candidate, value) in candidates.iter().zip(fitness) {
            self.record(candidate, *value)?;
        }
        Ok(())
    }

    pub fn end_generation(&mut self) {
        self.generations += 1;
        if let Some(link) = &self.tuner {
            link.notify_generation(self.run_id, self.generations, self.tracker.best());
        }
    }

    pub fn finish(self) -> OptimizationOutcome {
        let outcome = OptimizationOutcome {
            run_id: self.run_id,
            algorithm: self.algorithm,
            direction: self.tracker.ordering.direction,
            bad_fitness_value: self.tracker.ordering.bad_fitness_value,
            best: self.tracker.best,
            evaluations: self.tracker.evaluations,
            failures: self.tracker.failures,
            generations: self.generations,
            started_at: self.started_at,
            finished_at: Utc::now(),
        };

        if outcome.all_failed() && outcome.evaluations > 0 {
            warn!(
                "Run {} finished without a single successful evaluation ({} attempted)",
                outcome.run_id, outcome.evaluations
            );
        }
        info!(
            "Optimization run {} completed: {} evaluations, {} failures, best fitness {:?}",
            outcome.run_id,
            outcome.evaluations,
            outcome.failures,
            outcome.best_fitness()
        );
        outcome
    }
}
