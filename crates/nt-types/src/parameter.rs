//! Tunable parameter declarations.

use serde::{Deserialize, Serialize};

use crate::errors::{NtResult, ParameterError};

/// One tunable dimension of the search space.
///
/// Dimensions are identified by their position in the parameter list; the
/// name is carried for reporting only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuneParameter {
    pub name: String,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl TuneParameter {
    pub fn new(name: impl Into<String>, lower_bound: f64, upper_bound: f64) -> NtResult<Self> {
        let param = Self {
            name: name.into(),
            lower_bound,
            upper_bound,
        };
        param.validate()?;
        Ok(param)
    }

    /// Check the bound invariants. Needed after deserialization, which
    /// bypasses [`TuneParameter::new`].
    pub fn validate(&self) -> NtResult<()> {
        let (lower, upper) = (self.lower_bound, self.upper_bound);
        if !lower.is_finite() || !upper.is_finite() {
            return Err(ParameterError::NonFiniteBounds {
                name: self.name.clone(),
                lower,
                upper,
            }
            .into());
        }
        if lower > upper {
            return Err(ParameterError::InvertedBounds {
                name: self.name.clone(),
                lower,
                upper,
            }
            .into());
        }
        if !(upper - lower).is_finite() {
            return Err(ParameterError::UnsampleableRange {
                name: self.name.clone(),
                lower,
                upper,
            }
            .into());
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.upper_bound - self.lower_bound
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower_bound <= value && value <= self.upper_bound
    }
}
