use crate::stats::mean::Mean;
use crate::Result;
use crate::SimError;
use serde::Deserialize;
use serde::Serialize;
use std::ops::AddAssign;

/// Welford mean plus the M2 accumulator of squared deviations.
/// The variance estimate is the unbiased M2 / (n - 1), defined once
/// two samples have arrived.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Variance {
    mean: Mean,
    m2: f64,
}

impl Variance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, x: f64) {
        let before = x - self.mean.mean();
        self.mean.add(x);
        let after = x - self.mean.mean();
        self.m2 += before * after;
    }

    pub fn count(&self) -> u64 {
        self.mean.count()
    }

    pub fn mean(&self) -> f64 {
        self.mean.mean()
    }

    pub fn min(&self) -> Option<f64> {
        self.mean.min()
    }

    pub fn max(&self) -> Option<f64> {
        self.mean.max()
    }

    pub fn variance(&self) -> Result<f64> {
        if self.count() < 2 {
            return Err(SimError::NotYetDefined {
                what: format!("variance of {} samples", self.count()),
            });
        }
        Ok(self.m2 / (self.count() - 1) as f64)
    }

    pub fn stddev(&self) -> Result<f64> {
        self.variance().map(f64::sqrt)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl AddAssign<f64> for Variance {
    fn add_assign(&mut self, x: f64) {
        self.add(x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    #[test]
    fn undefined_below_two_samples() {
        let mut v = Variance::new();
        assert!(v.variance().is_err());
        v += 1.0;
        assert!(v.variance().is_err());
        v += 3.0;
        assert!((v.variance().unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn matches_two_pass_computation() {
        let xs = (0..1_000).map(|i| (i as f64).sin() * 100.0).collect::<Vec<_>>();
        let mut v = Variance::new();
        for &x in &xs {
            v += x;
        }
        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        let m2 = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
        let reference = m2 / (xs.len() - 1) as f64;
        assert!((v.variance().unwrap() - reference).abs() < 1e-6 * reference);
    }

    #[test]
    fn insensitive_to_sample_permutation() {
        let mut xs = (0..500).map(|i| (i as f64).cos() * 10.0 + 3.0).collect::<Vec<_>>();
        let mut a = Variance::new();
        for &x in &xs {
            a += x;
        }
        let mut rng = rand::rngs::SmallRng::seed_from_u64(0x5EED);
        xs.shuffle(&mut rng);
        let mut b = Variance::new();
        for &x in &xs {
            b += x;
        }
        assert!((a.mean() - b.mean()).abs() < 1e-9);
        assert!((a.variance().unwrap() - b.variance().unwrap()).abs() < 1e-9);
    }
}
