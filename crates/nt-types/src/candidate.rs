//! Chromosome representation.

use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

/// One point in the search space: one real value per tunable dimension, in
/// parameter order.
///
/// A candidate always owns its genes, so two candidates never alias even
/// when they are evaluated concurrently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Candidate(Vec<f64>);

impl Candidate {
    pub fn new(genes: Vec<f64>) -> Self {
        Self(genes)
    }

    pub fn genes(&self) -> &[f64] {
        &self.0
    }

    pub fn into_genes(self) -> Vec<f64> {
        self.0
    }
}

impl Deref for Candidate {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut [f64] {
        &mut self.0
    }
}

impl From<Vec<f64>> for Candidate {
    fn from(genes: Vec<f64>) -> Self {
        Self(genes)
    }
}

impl From<&[f64]> for Candidate {
    fn from(genes: &[f64]) -> Self {
        Self(genes.to_vec())
    }
}

impl FromIterator<f64> for Candidate {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, gene) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{gene}")?;
        }
        write!(f, "]")
    }
}
