//! Fitness direction and the bad-fitness sentinel protocol.
//!
//! Evaluators never raise on numerical failure. They return a sentinel value
//! instead, and every comparison in the search loop goes through
//! [`FitnessOrdering`], which ranks failures below every real result no
//! matter which direction is being optimized.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::candidate::Candidate;

/// Fitness assigned to candidates that could not be evaluated (diverging
/// simulations, infeasible inputs and the like).
pub const BAD_FITNESS_VALUE: f64 = 1e20;

/// Whether we are maximizing or minimizing the objective.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveDirection {
    Maximize,
    #[default]
    Minimize,
}

impl ObjectiveDirection {
    pub fn from_maximize(maximize: bool) -> Self {
        if maximize {
            Self::Maximize
        } else {
            Self::Minimize
        }
    }

    pub fn is_maximize(self) -> bool {
        self == Self::Maximize
    }
}

/// Direction-aware fitness comparison with sentinel handling.
///
/// A fitness is a failure when it equals the configured sentinel or is not
/// finite. Failures are dominated by every non-failure in both directions,
/// and compare equal to each other.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessOrdering {
    pub direction: ObjectiveDirection,
    pub bad_fitness_value: f64,
}

impl FitnessOrdering {
    pub fn new(direction: ObjectiveDirection, bad_fitness_value: f64) -> Self {
        Self {
            direction,
            bad_fitness_value,
        }
    }

    pub fn maximize(bad_fitness_value: f64) -> Self {
        Self::new(ObjectiveDirection::Maximize, bad_fitness_value)
    }

    pub fn minimize(bad_fitness_value: f64) -> Self {
        Self::new(ObjectiveDirection::Minimize, bad_fitness_value)
    }

    pub fn is_failure(&self, fitness: f64) -> bool {
        fitness == self.bad_fitness_value || !fitness.is_finite()
    }

    /// `Greater` means `a` is the better fitness.
    pub fn compare(&self, a: f64, b: f64) -> Ordering {
        match (self.is_failure(a), self.is_failure(b)) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => {
                // Both finite, so partial_cmp always succeeds.
                let raw = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
                match self.direction {
                    ObjectiveDirection::Maximize => raw,
                    ObjectiveDirection::Minimize => raw.reverse(),
                }
            }
        }
    }

    pub fn is_better(&self, a: f64, b: f64) -> bool {
        self.compare(a, b) == Ordering::Greater
    }

    /// Index of the best fitness in `values`; the first one wins ties.
    pub fn best_index(&self, values: &[f64]) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, &value) in values.iter().enumerate() {
            match best {
                Some(b) if !self.is_better(value, values[b]) => {}
                _ => best = Some(i),
            }
        }
        best
    }
}

impl Default for FitnessOrdering {
    fn default() -> Self {
        Self::minimize(BAD_FITNESS_VALUE)
    }
}

/// A candidate together with the fitness it was scored with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub fitness: f64,
    /// Set when `fitness` is a failure under the ordering that scored it.
    pub failed: bool,
}

impl ScoredCandidate {
    pub fn new(candidate: Candidate, fitness: f64, ordering: &FitnessOrdering) -> Self {
        Self {
            failed: ordering.is_failure(fitness),
            candidate,
            fitness,
        }
    }
}
