//! The link back to the driving tuner, and a minimal tuner that drives an
//! algorithm through bind, optimize and progress reporting.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use tracing::{debug, info};
use uuid::Uuid;

use nt_types::{NtResult, ScoredCandidate, TuneParameter};

use crate::algorithm::Algorithm;
use crate::evaluator::Evaluator;
use crate::tracker::{OptimizationOutcome, RunId};

/// Receives progress from the algorithms a tuner drives.
///
/// Calls arrive on the thread running `optimize`.
pub trait TuneObserver: Send + Sync {
    fn on_evaluation(&self, run_id: RunId, scored: &ScoredCandidate);

    fn on_generation(&self, _run_id: RunId, _generation: usize, _best: Option<&ScoredCandidate>) {}
}

/// Non-owning handle from an algorithm to the tuner driving it.
///
/// Notifications are dropped once the tuner has gone away.
#[derive(Clone)]
pub struct TunerLink {
    tuner_id: Uuid,
    observer: Weak<dyn TuneObserver>,
}

impl TunerLink {
    pub fn new<O: TuneObserver + 'static>(tuner_id: Uuid, observer: &Arc<O>) -> Self {
        let observer: Weak<O> = Arc::downgrade(observer);
        Self { tuner_id, observer }
    }

    pub fn tuner_id(&self) -> Uuid {
        self.tuner_id
    }

    pub fn is_alive(&self) -> bool {
        self.observer.strong_count() > 0
    }

    pub fn notify_evaluation(&self, run_id: RunId, scored: &ScoredCandidate) {
        if let Some(observer) = self.observer.upgrade() {
            observer.on_evaluation(run_id, scored);
        }
    }

    pub fn notify_generation(&self, run_id: RunId, generation: usize, best: Option<&ScoredCandidate>) {
        match self.observer.upgrade() {
            Some(observer) => observer.on_generation(run_id, generation, best),
            None => debug!("Dropping generation {} report for departed tuner {}", generation, self.tuner_id),
        }
    }
}

impl std::fmt::Debug for TunerLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunerLink")
            .field("tuner_id", &self.tuner_id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Point-in-time view of [`TuneProgress`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub last_run: Option<RunId>,
    pub evaluations: usize,
    pub failures: usize,
    pub generations: usize,
    pub best_fitness: Option<f64>,
}

/// Observer that accumulates counters for every run it is attached to.
#[derive(Debug, Default)]
pub struct TuneProgress {
    state: RwLock<ProgressSnapshot>,
}

impl TuneProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state.read().clone()
    }
}

impl TuneObserver for TuneProgress {
    fn on_evaluation(&self, run_id: RunId, scored: &ScoredCandidate) {
        let mut state = self.state.write();
        state.last_run = Some(run_id);
        state.evaluations += 1;
        if scored.failed {
            state.failures += 1;
        }
    }

    fn on_generation(&self, run_id: RunId, generation: usize, best: Option<&ScoredCandidate>) {
        let mut state = self.state.write();
        state.last_run = Some(run_id);
        state.generations += 1;
        state.best_fitness = best.map(|b| b.fitness);
        debug!("Run {} generation {}: best {:?}", run_id, generation, state.best_fitness);
    }
}

/// Drives an algorithm over a fixed list of tunable parameters.
#[derive(Debug)]
pub struct Tuner {
    id: Uuid,
    parameters: Vec<TuneParameter>,
    progress: Arc<TuneProgress>,
}

impl Tuner {
    pub fn new(parameters: Vec<TuneParameter>) -> NtResult<Self> {
        for param in &parameters {
            param.validate()?;
        }
        Ok(Self {
            id: Uuid::new_v4(),
            parameters,
            progress: Arc::new(TuneProgress::new()),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn parameters(&self) -> &[TuneParameter] {
        &self.parameters
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Bind the parameters, attach this tuner, run the search and detach
    /// again, whether or not the search succeeded.
    pub fn tune(
        &self,
        algorithm: &mut dyn Algorithm,
        evaluator: &dyn Evaluator,
    ) -> NtResult<OptimizationOutcome> {
        info!(
            "Tuner {} running '{}' over {} parameters",
            self.id,
            algorithm.name(),
            self.parameters.len()
        );
        algorithm.bind_parameters(&self.parameters)?;
        algorithm.attach_tuner(TunerLink::new(self.id, &self.progress));
        let outcome = algorithm.optimize(evaluator);
        algorithm.detach_tuner();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nt_types::{FitnessOrdering, BAD_FITNESS_VALUE};

    fn scored(fitness: f64) -> ScoredCandidate {
        ScoredCandidate::new(
            vec![0.5].into(),
            fitness,
            &FitnessOrdering::minimize(BAD_FITNESS_VALUE),
        )
    }

    #[test]
    fn link_forwards_while_tuner_alive() {
        let progress = Arc::new(TuneProgress::new());
        let link = TunerLink::new(Uuid::new_v4(), &progress);
        let run = Uuid::new_v4();

        link.notify_evaluation(run, &scored(1.0));
        link.notify_evaluation(run, &scored(BAD_FITNESS_VALUE));
        link.notify_generation(run, 1, Some(&scored(1.0)));

        let snap = progress.snapshot();
        assert_eq!(snap.evaluations, 2);
        assert_eq!(snap.failures, 1);
        assert_eq!(snap.generations, 1);
        assert_eq!(snap.best_fitness, Some(1.0));
        assert_eq!(snap.last_run, Some(run));
    }

    #[test]
    fn link_does_not_keep_tuner_alive() {
        let progress = Arc::new(TuneProgress::new());
        let link = TunerLink::new(Uuid::new_v4(), &progress);
        assert!(link.is_alive());

        drop(progress);
        assert!(!link.is_alive());
        // Must be a silent no-op.
        link.notify_evaluation(Uuid::new_v4(), &scored(2.0));
        link.notify_generation(Uuid::new_v4(), 3, None);
    }

    #[test]
    fn link_accepts_custom_observers() {
        struct Counter(RwLock<usize>);

        impl TuneObserver for Counter {
            fn on_evaluation(&self, _run_id: RunId, _scored: &ScoredCandidate) {
                *self.0.write() += 1;
            }
        }

        let counter = Arc::new(Counter(RwLock::new(0)));
        let link = TunerLink::new(Uuid::new_v4(), &counter);
        link.notify_evaluation(Uuid::new_v4(), &scored(1.0));
        link.notify_generation(Uuid::new_v4(), 1, None);
        assert_eq!(*counter.0.read(), 1);
        assert_eq!(Arc::weak_count(&counter), 1);
    }

    #[test]
    fn tuner_rejects_invalid_parameters() {
        let bad = TuneParameter {
            name: "g".into(),
            lower_bound: 1.0,
            upper_bound: 0.0,
        };
        assert!(Tuner::new(vec![bad]).is_err());
    }

    #[test]
    fn progress_snapshot_round_trip() {
        let snap = ProgressSnapshot {
            last_run: Some(Uuid::new_v4()),
            evaluations: 10,
            failures: 2,
            generations: 1,
            best_fitness: Some(0.5),
        };
        let json = serde_json::to_string(&snap).unwrap();
        let back: ProgressSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snap, back);
    }
}
