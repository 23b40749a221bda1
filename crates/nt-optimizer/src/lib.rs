//! # nt-optimizer
//!
//! The seam between black-box search algorithms and the tuner that drives
//! them.
//!
//! Provides the [`Algorithm`] contract and the [`AlgorithmCore`] state every
//! strategy shares, the [`Evaluator`] boundary with its bad-fitness sentinel
//! protocol, best-candidate tracking, the non-owning link back to a
//! [`Tuner`], variation operators, and three strategies (random, grid,
//! evolutionary) built on top of them.

mod algorithm;
mod evaluator;
mod evolutionary;
mod grid;
pub mod operators;
mod random;
mod tracker;
mod tuner;

pub use algorithm::{Algorithm, AlgorithmConfig, AlgorithmCore, EvaluationMode, ParameterSpace};
pub use evaluator::{CacheStats, CachedEvaluator, Evaluator};
pub use evolutionary::EvolutionaryAlgorithm;
pub use grid::GridAlgorithm;
pub use random::RandomSearch;
pub use tracker::{BestTracker, FailurePolicy, OptimizationOutcome, OptimizationRun, RunId};
pub use tuner::{ProgressSnapshot, TuneObserver, TuneProgress, Tuner, TunerLink};
