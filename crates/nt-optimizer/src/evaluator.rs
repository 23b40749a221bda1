//! The boundary between an algorithm and whatever computes fitness.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Scores one candidate.
///
/// Implementations must be callable from several workers at once and must
/// not touch algorithm state. When the evaluated system fails numerically
/// the evaluator returns the algorithm's bad-fitness sentinel instead of
/// panicking; retries, if any, are its own business.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, genes: &[f64]) -> f64;
}

impl<F> Evaluator for F
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    fn evaluate(&self, genes: &[f64]) -> f64 {
        self(genes)
    }
}

/// Hit/miss counters for [`CachedEvaluator`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Memoising wrapper around a deterministic evaluator.
///
/// Candidates are keyed on the exact bit pattern of their genes. Wrapping a
/// stochastic evaluator pins the first draw for every point, so algorithms
/// never apply this on their own.
#[derive(Debug)]
pub struct CachedEvaluator<E> {
    inner: E,
    cache: DashMap<Vec<u64>, f64>,
    stats: RwLock<CacheStats>,
}

impl<E: Evaluator> CachedEvaluator<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&self) {
        self.cache.clear();
        *self.stats.write() = CacheStats::default();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }

    pub fn into_inner(self) -> E {
        self.inner
    }

    fn key(genes: &[f64]) -> Vec<u64> {
        genes.iter().map(|g| g.to_bits()).collect()
    }
}

impl<E: Evaluator> Evaluator for CachedEvaluator<E> {
    fn evaluate(&self, genes: &[f64]) -> f64 {
        let key = Self::key(genes);
        if let Some(hit) = self.cache.get(&key) {
            self.stats.write().hits += 1;
            return *hit;
        }

        // Two workers racing on the same point may both evaluate it; the
        // later insert wins, which is harmless for a deterministic inner.
        let fitness = self.inner.evaluate(genes);
        self.cache.insert(key, fitness);
        self.stats.write().misses += 1;
        fitness
    }
}
