//! The contract every search strategy implements, and the configuration and
//! bound parameter space they all share.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use nt_types::{
    AlgorithmError, Candidate, ConstraintSet, FitnessOrdering, NtError, NtResult,
    ObjectiveDirection, TuneParameter, BAD_FITNESS_VALUE,
};

use crate::evaluator::Evaluator;
use crate::tracker::{BestTracker, FailurePolicy, OptimizationOutcome, OptimizationRun};
use crate::tuner::TunerLink;

/// How a batch of candidates is scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationMode {
    #[default]
    Sequential,
    /// Score on the rayon pool; results keep their input order.
    Parallel,
}

/// Search configuration shared by every algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmConfig {
    /// Per-gene mutation probability; the valid range is up to each strategy.
    pub mutation_rate: f64,
    pub maximize: bool,
    /// Candidates evaluated before any sampled ones. Each must match the
    /// genome size and bounds once parameters are bound.
    pub seeds: Vec<Candidate>,
    pub population_size: usize,
    /// Overrides [`BAD_FITNESS_VALUE`] for this instance.
    pub bad_fitness_value: Option<f64>,
    /// Fixed seed for a reproducible run; `None` draws one from the thread rng.
    pub rng_seed: Option<u64>,
    pub evaluation_mode: EvaluationMode,
}

impl AlgorithmConfig {
    pub fn new(maximize: bool) -> Self {
        Self {
            mutation_rate: 0.1,
            maximize,
            seeds: Vec::new(),
            population_size: 50,
            bad_fitness_value: None,
            rng_seed: None,
            evaluation_mode: EvaluationMode::Sequential,
        }
    }

    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate;
        self
    }

    pub fn with_seeds(mut self, seeds: Vec<Candidate>) -> Self {
        self.seeds = seeds;
        self
    }

    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    pub fn with_bad_fitness_value(mut self, value: f64) -> Self {
        self.bad_fitness_value = Some(value);
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_evaluation_mode(mut self, mode: EvaluationMode) -> Self {
        self.evaluation_mode = mode;
        self
    }

    pub fn direction(&self) -> ObjectiveDirection {
        ObjectiveDirection::from_maximize(self.maximize)
    }
}

/// Tunable parameters together with the constraint set derived from them.
///
/// Only the parameters are read back on deserialization; the constraint set
/// is derived again so it cannot disagree with them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawParameterSpace")]
pub struct ParameterSpace {
    parameters: Vec<TuneParameter>,
    constraints: ConstraintSet,
}

#[derive(Deserialize)]
struct RawParameterSpace {
    parameters: Vec<TuneParameter>,
}

impl TryFrom<RawParameterSpace> for ParameterSpace {
    type Error = NtError;

    fn try_from(raw: RawParameterSpace) -> Result<Self, Self::Error> {
        Self::new(raw.parameters)
    }
}

impl ParameterSpace {
    pub fn new(parameters: Vec<TuneParameter>) -> NtResult<Self> {
        let constraints = ConstraintSet::from_parameters(&parameters)?;
        Ok(Self {
            parameters,
            constraints,
        })
    }

    pub fn parameters(&self) -> &[TuneParameter] {
        &self.parameters
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn genome_size(&self) -> usize {
        self.constraints.genome_size()
    }
}

/// State every concrete algorithm embeds: configuration, the bound space and
/// the optional tuner link.
///
/// The space sits behind an `Arc` and is replaced wholesale on every bind, so
/// a run holding the previous one keeps reading a consistent set of bounds.
pub struct AlgorithmCore {
    name: &'static str,
    config: AlgorithmConfig,
    evaluator: Option<Arc<dyn Evaluator>>,
    space: Option<Arc<ParameterSpace>>,
    tuner: Option<TunerLink>,
}

impl AlgorithmCore {
    pub fn new(name: &'static str, config: AlgorithmConfig) -> Self {
        Self {
            name,
            config,
            evaluator: None,
            space: None,
            tuner: None,
        }
    }

    /// Construct with a default evaluator, used by [`Algorithm::run`].
    pub fn with_evaluator(
        name: &'static str,
        config: AlgorithmConfig,
        evaluator: Arc<dyn Evaluator>,
    ) -> Self {
        let mut core = Self::new(name, config);
        core.evaluator = Some(evaluator);
        core
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    pub fn evaluator(&self) -> Option<Arc<dyn Evaluator>> {
        self.evaluator.clone()
    }

    pub fn bad_fitness_value(&self) -> f64 {
        self.config.bad_fitness_value.unwrap_or(BAD_FITNESS_VALUE)
    }

    pub fn ordering(&self) -> FitnessOrdering {
        FitnessOrdering::new(self.config.direction(), self.bad_fitness_value())
    }

    /// Derive the constraint set from `parameters` and replace any previous
    /// binding. On error the previous binding is left untouched.
    pub fn bind_parameters(&mut self, parameters: &[TuneParameter]) -> NtResult<()> {
        let space = ParameterSpace::new(parameters.to_vec())?;
        validate_seeds(&self.config.seeds, space.constraints())?;
        debug!(
            "Bound {} parameters to '{}' (replacing: {})",
            space.genome_size(),
            self.name,
            self.space.is_some()
        );
        self.space = Some(Arc::new(space));
        Ok(())
    }

    pub fn space(&self) -> Option<&ParameterSpace> {
        self.space.as_deref()
    }

    pub fn genome_size(&self) -> Option<usize> {
        self.space.as_ref().map(|s| s.genome_size())
    }

    pub fn constraints(&self) -> NtResult<&ConstraintSet> {
        self.space
            .as_deref()
            .map(ParameterSpace::constraints)
            .ok_or_else(|| self.unconfigured())
    }

    pub fn sample_uniform(&self, rng: &mut dyn RngCore) -> NtResult<Candidate> {
        Ok(self.constraints()?.sample_uniform(rng))
    }

    /// Entry check for `optimize`: the space must be bound and the seeds must
    /// fit it. Returns the space the run should use throughout.
    pub fn prepare(&self) -> NtResult<Arc<ParameterSpace>> {
        let space = self.space.clone().ok_or_else(|| self.unconfigured())?;
        validate_seeds(&self.config.seeds, space.constraints())?;
        Ok(space)
    }

    /// Random source for one run.
    pub fn rng(&self) -> ChaCha8Rng {
        match self.config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        }
    }

    /// Begin a run over `space` with this core's ordering and tuner link.
    pub fn start_run(&self, space: &ParameterSpace, policy: FailurePolicy) -> OptimizationRun {
        let tracker = BestTracker::new(space.constraints().clone(), self.ordering(), policy);
        OptimizationRun::new(self.name, tracker, self.tuner.clone())
    }

    /// Score `candidates` in order. Each call hands the evaluator a distinct
    /// candidate, so parallel workers never share a gene vector.
    pub fn evaluate_batch(&self, evaluator: &dyn Evaluator, candidates: &[Candidate]) -> Vec<f64> {
        match self.config.evaluation_mode {
            EvaluationMode::Sequential => candidates
                .iter()
                .map(|c| evaluator.evaluate(c.genes()))
                .collect(),
            EvaluationMode::Parallel => candidates
                .par_iter()
                .map(|c| evaluator.evaluate(c.genes()))
                .collect(),
        }
    }

    pub fn attach_tuner(&mut self, link: TunerLink) {
        self.tuner = Some(link);
    }

    pub fn detach_tuner(&mut self) {
        self.tuner = None;
    }

    pub fn tuner(&self) -> Option<&TunerLink> {
        self.tuner.as_ref()
    }

    pub fn invalid_config(&self, message: impl Into<String>) -> AlgorithmError {
        AlgorithmError::InvalidConfig {
            algorithm: self.name.to_string(),
            message: message.into(),
        }
    }

    fn unconfigured(&self) -> NtError {
        AlgorithmError::UnconfiguredParameterSpace {
            algorithm: self.name.to_string(),
        }
        .into()
    }
}

impl std::fmt::Debug for AlgorithmCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgorithmCore")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("has_evaluator", &self.evaluator.is_some())
            .field("space", &self.space)
            .field("tuner", &self.tuner)
            .finish()
    }
}

fn validate_seeds(seeds: &[Candidate], constraints: &ConstraintSet) -> NtResult<()> {
    for (index, seed) in seeds.iter().enumerate() {
        if seed.len() != constraints.genome_size() {
            return Err(AlgorithmError::SeedLengthMismatch {
                index,
                expected: constraints.genome_size(),
                actual: seed.len(),
            }
            .into());
        }
        for (dimension, (value, bound)) in seed.iter().zip(constraints.iter()).enumerate() {
            if !bound.contains(*value) {
                return Err(AlgorithmError::SeedOutOfBounds {
                    index,
                    dimension,
                    value: *value,
                    lower: bound.lower,
                    upper: bound.upper,
                }
                .into());
            }
        }
    }
    Ok(())
}

/// A black-box search strategy.
///
/// Concrete strategies embed an [`AlgorithmCore`] and supply `optimize`.
/// There is no fallback body, so a strategy that forgets it is rejected at
/// compile time:
///
/// ```compile_fail
/// use nt_optimizer::{Algorithm, AlgorithmCore};
///
/// struct Forgetful {
///     core: AlgorithmCore,
/// }
///
/// impl Algorithm for Forgetful {
///     fn core(&self) -> &AlgorithmCore {
///         &self.core
///     }
///
///     fn core_mut(&mut self) -> &mut AlgorithmCore {
///         &mut self.core
///     }
/// }
/// ```
pub trait Algorithm: Send + Sync {
    fn core(&self) -> &AlgorithmCore;

    fn core_mut(&mut self) -> &mut AlgorithmCore;

    /// Search the bound space with `evaluator` and report the best candidate
    /// under the configured direction. Failures returned by the evaluator
    /// never win over a real fitness.
    fn optimize(&mut self, evaluator: &dyn Evaluator) -> NtResult<OptimizationOutcome>;

    fn name(&self) -> &str {
        self.core().name()
    }

    fn bind_parameters(&mut self, parameters: &[TuneParameter]) -> NtResult<()> {
        self.core_mut().bind_parameters(parameters)
    }

    fn genome_size(&self) -> Option<usize> {
        self.core().genome_size()
    }

    fn constraints(&self) -> NtResult<&ConstraintSet> {
        self.core().constraints()
    }

    fn sample_uniform(&self, rng: &mut dyn RngCore) -> NtResult<Candidate> {
        self.core().sample_uniform(rng)
    }

    fn bad_fitness_value(&self) -> f64 {
        self.core().bad_fitness_value()
    }

    fn ordering(&self) -> FitnessOrdering {
        self.core().ordering()
    }

    fn attach_tuner(&mut self, link: TunerLink) {
        self.core_mut().attach_tuner(link);
    }

    fn detach_tuner(&mut self) {
        self.core_mut().detach_tuner();
    }

    /// Optimize with the evaluator supplied at construction.
    fn run(&mut self) -> NtResult<OptimizationOutcome> {
        let evaluator = self.core().evaluator().ok_or_else(|| AlgorithmError::MissingEvaluator {
            algorithm: self.name().to_string(),
        })?;
        self.optimize(evaluator.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nt_types::ParameterError;
    use rand::rngs::StdRng;

    fn params(pairs: &[(f64, f64)]) -> Vec<TuneParameter> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, &(lo, hi))| TuneParameter::new(format!("p{i}"), lo, hi).unwrap())
            .collect()
    }

    /// Minimal strategy: evaluates the seeds and nothing else.
    struct SeedsOnly {
        core: AlgorithmCore,
    }

    impl Algorithm for SeedsOnly {
        fn core(&self) -> &AlgorithmCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut AlgorithmCore {
            &mut self.core
        }

        fn optimize(&mut self, evaluator: &dyn Evaluator) -> NtResult<OptimizationOutcome> {
            let space = self.core.prepare()?;
            let mut run = self.core.start_run(&space, FailurePolicy::Penalize);
            let seeds = self.core.config().seeds.clone();
            let fitness = self.core.evaluate_batch(evaluator, &seeds);
            run.record_batch(&seeds, &fitness)?;
            Ok(run.finish())
        }
    }

    #[test]
    fn bind_sets_genome_size_and_constraints() {
        let mut core = AlgorithmCore::new("test", AlgorithmConfig::new(true));
        assert_eq!(core.genome_size(), None);

        core.bind_parameters(&params(&[(0.0, 1.0), (10.0, 20.0)])).unwrap();
        assert_eq!(core.genome_size(), Some(2));
        let bounds = core.constraints().unwrap().bounds().to_vec();
        assert_eq!(bounds[0].lower, 0.0);
        assert_eq!(bounds[1].upper, 20.0);
    }

    #[test]
    fn rebinding_replaces_previous_space() {
        let mut core = AlgorithmCore::new("test", AlgorithmConfig::new(false));
        core.bind_parameters(&params(&[(0.0, 1.0), (10.0, 20.0)])).unwrap();
        core.bind_parameters(&params(&[(-5.0, 5.0)])).unwrap();
        assert_eq!(core.genome_size(), Some(1));
        assert_eq!(core.space().unwrap().parameters()[0].name, "p0");
        assert_eq!(core.constraints().unwrap().bounds()[0].lower, -5.0);
    }

    #[test]
    fn failed_bind_keeps_previous_space() {
        let config = AlgorithmConfig::new(true).with_seeds(vec![vec![0.5, 15.0].into()]);
        let mut core = AlgorithmCore::new("test", config);
        core.bind_parameters(&params(&[(0.0, 1.0), (10.0, 20.0)])).unwrap();

        // Seed no longer fits a one-dimensional space.
        let err = core.bind_parameters(&params(&[(0.0, 1.0)])).unwrap_err();
        assert!(matches!(
            err,
            NtError::Algorithm(AlgorithmError::SeedLengthMismatch { index: 0, expected: 1, actual: 2 })
        ));
        assert_eq!(core.genome_size(), Some(2));
    }

    #[test]
    fn sampling_before_bind_is_an_error() {
        let core = AlgorithmCore::new("lonely", AlgorithmConfig::new(true));
        let mut rng = StdRng::seed_from_u64(1);
        match core.sample_uniform(&mut rng) {
            Err(NtError::Algorithm(AlgorithmError::UnconfiguredParameterSpace { algorithm })) => {
                assert_eq!(algorithm, "lonely");
            }
            other => panic!("expected unconfigured error, got {other:?}"),
        }
        assert!(core.prepare().is_err());
    }

    #[test]
    fn sampling_through_trait_respects_bounds() {
        let mut algo = SeedsOnly {
            core: AlgorithmCore::new("seeds", AlgorithmConfig::new(true)),
        };
        algo.bind_parameters(&params(&[(0.0, 1.0), (10.0, 20.0), (3.0, 3.0)])).unwrap();

        for seed in 0..10u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..1_000 {
                let c = algo.sample_uniform(&mut rng).unwrap();
                assert!((0.0..=1.0).contains(&c[0]));
                assert!((10.0..=20.0).contains(&c[1]));
                assert_eq!(c[2], 3.0);
            }
        }
    }

    #[test]
    fn seeded_sources_sample_identically() {
        let mut algo = SeedsOnly {
            core: AlgorithmCore::new("seeds", AlgorithmConfig::new(true)),
        };
        algo.bind_parameters(&params(&[(0.0, 1.0), (10.0, 20.0)])).unwrap();
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        assert_eq!(
            algo.sample_uniform(&mut a).unwrap(),
            algo.sample_uniform(&mut b).unwrap()
        );
    }

    #[test]
    fn out_of_bounds_seed_fails_fast() {
        let config = AlgorithmConfig::new(true).with_seeds(vec![vec![1.01, 17.3].into()]);
        let mut core = AlgorithmCore::new("test", config);
        let err = core.bind_parameters(&params(&[(0.0, 1.0), (10.0, 20.0)])).unwrap_err();
        assert!(matches!(
            err,
            NtError::Algorithm(AlgorithmError::SeedOutOfBounds { index: 0, dimension: 0, .. })
        ));
    }

    #[test]
    fn bad_fitness_value_is_per_instance() {
        let default = AlgorithmCore::new("a", AlgorithmConfig::new(true));
        let custom = AlgorithmCore::new("b", AlgorithmConfig::new(true).with_bad_fitness_value(-1.0));
        assert_eq!(default.bad_fitness_value(), BAD_FITNESS_VALUE);
        assert_eq!(custom.bad_fitness_value(), -1.0);
        assert!(custom.ordering().is_failure(-1.0));
        assert!(!default.ordering().is_failure(-1.0));
    }

    #[test]
    fn run_without_evaluator_is_an_error() {
        let mut algo = SeedsOnly {
            core: AlgorithmCore::new("seeds", AlgorithmConfig::new(true)),
        };
        algo.bind_parameters(&params(&[(0.0, 1.0)])).unwrap();
        assert!(matches!(
            algo.run(),
            Err(NtError::Algorithm(AlgorithmError::MissingEvaluator { .. }))
        ));
    }

    #[test]
    fn run_uses_construction_evaluator() {
        let config = AlgorithmConfig::new(true)
            .with_seeds(vec![vec![0.2].into(), vec![0.8].into()]);
        let evaluator: Arc<dyn Evaluator> = Arc::new(|g: &[f64]| g[0] * 10.0);
        let mut algo = SeedsOnly {
            core: AlgorithmCore::with_evaluator("seeds", config, evaluator),
        };
        algo.bind_parameters(&params(&[(0.0, 1.0)])).unwrap();

        let outcome = algo.run().unwrap();
        assert_eq!(outcome.optimum(), Some((vec![0.8].into(), 8.0)));
    }

    #[test]
    fn sentinel_scored_seed_never_wins() {
        let seeds: Vec<Candidate> = vec![vec![0.42, 17.3].into(), vec![0.5, 15.0].into()];
        let evaluator = |g: &[f64]| {
            if g[0] == 0.42 {
                BAD_FITNESS_VALUE
            } else {
                5.0
            }
        };

        for maximize in [true, false] {
            let config = AlgorithmConfig::new(maximize).with_seeds(seeds.clone());
            let mut algo = SeedsOnly {
                core: AlgorithmCore::new("seeds", config),
            };
            algo.bind_parameters(&params(&[(0.0, 1.0), (10.0, 20.0)])).unwrap();
            let outcome = algo.optimize(&evaluator).unwrap();
            assert_eq!(outcome.best_candidate(), Some(&seeds[1]));
            assert_eq!(outcome.best_fitness(), Some(5.0));
            assert_eq!(outcome.failures, 1);
        }
    }

    #[test]
    fn parallel_batch_matches_sequential_order() {
        let candidates: Vec<Candidate> = (0..200).map(|i| vec![i as f64 / 200.0].into()).collect();
        let evaluator = |g: &[f64]| g[0] * 3.0 + 1.0;

        let seq = AlgorithmCore::new("seq", AlgorithmConfig::new(true));
        let par = AlgorithmCore::new(
            "par",
            AlgorithmConfig::new(true).with_evaluation_mode(EvaluationMode::Parallel),
        );
        assert_eq!(
            seq.evaluate_batch(&evaluator, &candidates),
            par.evaluate_batch(&evaluator, &candidates)
        );
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        use rand::Rng;
        let core = AlgorithmCore::new("r", AlgorithmConfig::new(true).with_rng_seed(5));
        let a: u64 = core.rng().random();
        let b: u64 = core.rng().random();
        assert_eq!(a, b);
    }

    #[test]
    fn config_serialization() {
        let config = AlgorithmConfig::new(true)
            .with_mutation_rate(0.25)
            .with_population_size(12)
            .with_seeds(vec![vec![0.1, 0.2].into()])
            .with_rng_seed(42)
            .with_evaluation_mode(EvaluationMode::Parallel);
        let json = serde_json::to_string(&config).unwrap();
        let back: AlgorithmConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
        assert_eq!(back.direction(), ObjectiveDirection::Maximize);
    }

    #[test]
    fn parameter_space_deserialization_rederives_constraints() {
        let space = ParameterSpace::new(params(&[(0.0, 1.0), (10.0, 20.0)])).unwrap();
        let json = serde_json::to_string(&space).unwrap();
        let back: ParameterSpace = serde_json::from_str(&json).unwrap();
        assert_eq!(space, back);

        let inverted = r#"{"parameters":[{"name":"g","lower_bound":5.0,"upper_bound":1.0}]}"#;
        assert!(serde_json::from_str::<ParameterSpace>(inverted).is_err());

        let err = ParameterSpace::try_from(RawParameterSpace {
            parameters: vec![TuneParameter {
                name: "g".into(),
                lower_bound: 5.0,
                upper_bound: 1.0,
            }],
        })
        .unwrap_err();
        assert!(matches!(
            err,
            NtError::Parameter(ParameterError::InvertedBounds { .. })
        ));
    }
}
