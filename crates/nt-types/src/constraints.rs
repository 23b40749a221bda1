//! The bounded real-valued search space derived from tunable parameters.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::candidate::Candidate;
use crate::errors::{AlgorithmError, NtError, NtResult};
use crate::parameter::TuneParameter;

/// Closed interval `[lower, upper]` for one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub lower: f64,
    pub upper: f64,
}

impl Bound {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// NaN is never contained.
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.lower;
        }
        value.max(self.lower).min(self.upper)
    }

    /// Uniform draw on the closed interval.
    ///
    /// Interpolates from a unit draw instead of handing the interval to
    /// `random_range`, whose float scale overflows for widths near `f64::MAX`.
    pub fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        if self.lower == self.upper {
            return self.lower;
        }
        let t: f64 = rng.random_range(0.0..=1.0);
        self.clamp(self.lower + t * self.width())
    }
}

/// Ordered bounds, one per tunable parameter. Index `i` of every candidate
/// refers to `bounds[i]`.
///
/// Deserialization re-checks every bound the same way [`TuneParameter`] does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawConstraintSet")]
pub struct ConstraintSet {
    bounds: Vec<Bound>,
}

#[derive(Deserialize)]
struct RawConstraintSet {
    bounds: Vec<Bound>,
}

impl TryFrom<RawConstraintSet> for ConstraintSet {
    type Error = NtError;

    fn try_from(raw: RawConstraintSet) -> Result<Self, Self::Error> {
        let pairs: Vec<(f64, f64)> = raw.bounds.iter().map(|b| (b.lower, b.upper)).collect();
        Self::from_pairs(&pairs)
    }
}

impl ConstraintSet {
    /// Derive the constraint set from the parameter declarations, preserving
    /// their order.
    pub fn from_parameters(parameters: &[TuneParameter]) -> NtResult<Self> {
        let mut bounds = Vec::with_capacity(parameters.len());
        for param in parameters {
            param.validate()?;
            bounds.push(Bound {
                lower: param.lower_bound,
                upper: param.upper_bound,
            });
        }
        Ok(Self { bounds })
    }

    /// Build from bare `(lower, upper)` pairs; dimensions are named `x0`, `x1`, ...
    pub fn from_pairs(pairs: &[(f64, f64)]) -> NtResult<Self> {
        let parameters = pairs
            .iter()
            .enumerate()
            .map(|(i, &(lower, upper))| TuneParameter::new(format!("x{i}"), lower, upper))
            .collect::<NtResult<Vec<_>>>()?;
        Self::from_parameters(&parameters)
    }

    pub fn genome_size(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn get(&self, dimension: usize) -> Option<&Bound> {
        self.bounds.get(dimension)
    }

    pub fn bounds(&self) -> &[Bound] {
        &self.bounds
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bound> {
        self.bounds.iter()
    }

    /// Reject genes that do not fit this space. Reports the first offending
    /// dimension.
    pub fn check(&self, genes: &[f64]) -> NtResult<()> {
        if genes.len() != self.bounds.len() {
            return Err(AlgorithmError::CandidateLength {
                expected: self.bounds.len(),
                actual: genes.len(),
            }
            .into());
        }
        for (dimension, (value, bound)) in genes.iter().zip(&self.bounds).enumerate() {
            if !bound.contains(*value) {
                return Err(AlgorithmError::CandidateOutOfBounds {
                    dimension,
                    value: *value,
                    lower: bound.lower,
                    upper: bound.upper,
                }
                .into());
            }
        }
        Ok(())
    }

    pub fn contains(&self, genes: &[f64]) -> bool {
        self.check(genes).is_ok()
    }

    /// Project genes back into the box after a variation operator moved them.
    pub fn clamp(&self, genes: &mut [f64]) {
        for (gene, bound) in genes.iter_mut().zip(&self.bounds) {
            *gene = bound.clamp(*gene);
        }
    }

    /// Draw a fresh candidate, each gene uniform on its closed interval.
    pub fn sample_uniform(&self, rng: &mut dyn RngCore) -> Candidate {
        self.bounds.iter().map(|bound| bound.sample(rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ParameterError;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn example_space() -> ConstraintSet {
        ConstraintSet::from_pairs(&[(0.0, 1.0), (10.0, 20.0)]).unwrap()
    }

    #[test]
    fn derivation_preserves_length_and_order() {
        let params = vec![
            TuneParameter::new("c", 5.0, 6.0).unwrap(),
            TuneParameter::new("a", -1.0, 1.0).unwrap(),
            TuneParameter::new("b", 0.0, 0.0).unwrap(),
        ];
        let space = ConstraintSet::from_parameters(&params).unwrap();
        assert_eq!(space.genome_size(), params.len());
        for (bound, param) in space.iter().zip(&params) {
            assert_eq!(bound.lower, param.lower_bound);
            assert_eq!(bound.upper, param.upper_bound);
        }
    }

    #[test]
    fn derivation_revalidates_parameters() {
        let bad = TuneParameter {
            name: "inverted".into(),
            lower_bound: 3.0,
            upper_bound: 1.0,
        };
        assert!(ConstraintSet::from_parameters(&[bad]).is_err());
    }

    #[test]
    fn samples_stay_in_bounds_across_many_seeds() {
        let space = ConstraintSet::from_pairs(&[
            (0.0, 1.0),
            (10.0, 20.0),
            (-1e-9, 1e-9),
            (-350.0, -349.5),
        ])
        .unwrap();
        for seed in 0..100u64 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            for _ in 0..100 {
                let c = space.sample_uniform(&mut rng);
                assert_eq!(c.len(), 4);
                space.check(&c).unwrap();
            }
        }
    }

    #[test]
    fn widest_finite_range_samples_without_overflow() {
        let space = ConstraintSet::from_pairs(&[(0.0, f64::MAX), (-f64::MAX, 0.0)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..1_000 {
            let c = space.sample_uniform(&mut rng);
            assert!(c.iter().all(|v| v.is_finite()));
            space.check(&c).unwrap();
        }
    }

    #[test]
    fn equal_bounds_hit_the_exact_value() {
        let space = ConstraintSet::from_pairs(&[(2.5, 2.5), (0.0, 1.0), (-7.0, -7.0)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..10_000 {
            let c = space.sample_uniform(&mut rng);
            assert_eq!(c[0], 2.5);
            assert_eq!(c[2], -7.0);
        }
    }

    #[test]
    fn seeded_sampling_is_deterministic() {
        let space = example_space();
        let mut a = ChaCha8Rng::seed_from_u64(1234);
        let mut b = ChaCha8Rng::seed_from_u64(1234);
        for _ in 0..50 {
            assert_eq!(space.sample_uniform(&mut a), space.sample_uniform(&mut b));
        }
    }

    #[test]
    fn check_flags_out_of_range_and_length() {
        let space = example_space();
        assert!(space.check(&[0.42, 17.3]).is_ok());

        match space.check(&[1.01, 17.3]) {
            Err(NtError::Algorithm(AlgorithmError::CandidateOutOfBounds {
                dimension, value, ..
            })) => {
                assert_eq!(dimension, 0);
                assert_eq!(value, 1.01);
            }
            other => panic!("expected out-of-bounds error, got {other:?}"),
        }

        assert!(matches!(
            space.check(&[0.5]),
            Err(NtError::Algorithm(AlgorithmError::CandidateLength {
                expected: 2,
                actual: 1
            }))
        ));
        assert!(!space.contains(&[f64::NAN, 15.0]));
    }

    #[test]
    fn clamp_projects_into_box() {
        let space = example_space();
        let mut genes = vec![1.7, 3.0];
        space.clamp(&mut genes);
        assert_eq!(genes, vec![1.0, 10.0]);

        let mut genes = vec![f64::NAN, 25.0];
        space.clamp(&mut genes);
        assert_eq!(genes, vec![0.0, 20.0]);
    }

    #[test]
    fn deserialization_revalidates_bounds() {
        let json = serde_json::to_string(&example_space()).unwrap();
        let back: ConstraintSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, example_space());

        let inverted = r#"{"bounds":[{"lower":5.0,"upper":1.0}]}"#;
        assert!(serde_json::from_str::<ConstraintSet>(inverted).is_err());

        let err = ConstraintSet::try_from(RawConstraintSet {
            bounds: vec![Bound { lower: 5.0, upper: 1.0 }],
        })
        .unwrap_err();
        assert!(matches!(
            err,
            NtError::Parameter(ParameterError::InvertedBounds { .. })
        ));
    }
}
