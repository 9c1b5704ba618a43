use serde::Deserialize;
use serde::Serialize;
use std::ops::AddAssign;

/// Welford running mean with sample extrema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mean {
    count: u64,
    mean: f64,
    sum: f64,
    min: f64,
    max: f64,
}

impl Mean {
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn add(&mut self, x: f64) {
        self.count += 1;
        self.sum += x;
        self.mean += (x - self.mean) / self.count as f64;
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Mean {
    fn default() -> Self {
        Self::new()
    }
}

impl AddAssign<f64> for Mean {
    fn add_assign(&mut self, x: f64) {
        self.add(x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_mean_and_extrema() {
        let mut m = Mean::new();
        for x in [4.0, 2.0, 6.0] {
            m += x;
        }
        assert_eq!(m.count(), 3);
        assert!((m.mean() - 4.0).abs() < 1e-12);
        assert_eq!(m.sum(), 12.0);
        assert_eq!(m.min(), Some(2.0));
        assert_eq!(m.max(), Some(6.0));
    }

    #[test]
    fn empty_has_no_extrema() {
        let m = Mean::new();
        assert_eq!(m.count(), 0);
        assert_eq!(m.mean(), 0.0);
        assert_eq!(m.min(), None);
        assert_eq!(m.max(), None);
    }

    #[test]
    fn reset_clears_everything() {
        let mut m = Mean::new();
        m += 3.5;
        m.reset();
        assert_eq!(m.count(), 0);
        assert_eq!(m.max(), None);
    }
}
