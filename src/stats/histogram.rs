use crate::stats::variance::Variance;
use crate::Result;
use crate::SimError;
use serde::Deserialize;
use serde::Serialize;
use std::ops::AddAssign;

/// Bucketed counts over a fixed, strictly increasing set of upper
/// bounds. A sample lands in the first bucket whose bound is at least
/// the sample; anything beyond the last bound lands in the overflow
/// bucket. Moments of the raw samples ride along underneath.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Histogram {
    bounds: Vec<f64>,
    counts: Vec<u64>,
    overflow: u64,
    stats: Variance,
}

impl Histogram {
    pub fn new(bounds: Vec<f64>) -> Result<Self> {
        if bounds.is_empty() {
            return Err(SimError::param("histogram with no buckets", 0.0));
        }
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(SimError::param("histogram bound not finite", 0.0));
        }
        if bounds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SimError::param("histogram bounds not strictly increasing", 0.0));
        }
        let counts = vec![0; bounds.len()];
        Ok(Self {
            bounds,
            counts,
            overflow: 0,
            stats: Variance::new(),
        })
    }

    pub fn add(&mut self, x: f64) {
        self.stats.add(x);
        match self.bounds.iter().position(|&b| b >= x) {
            Some(i) => self.counts[i] += 1,
            None => self.overflow += 1,
        }
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    pub fn total(&self) -> u64 {
        self.stats.count()
    }

    pub fn mean(&self) -> f64 {
        self.stats.mean()
    }

    pub fn variance(&self) -> Result<f64> {
        self.stats.variance()
    }
}

impl AddAssign<f64> for Histogram {
    fn add_assign(&mut self, x: f64) {
        self.add(x);
    }
}

/// Exact-value buckets grown on demand: every distinct sample value
/// owns a `(bound, count)` pair, kept sorted by bound. Memory is
/// proportional to the number of distinct values, which is what the
/// quantile estimator needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrecisionHistogram {
    buckets: Vec<(f64, u64)>,
    total: u64,
}

impl PrecisionHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, x: f64) {
        self.total += 1;
        match self.buckets.binary_search_by(|(b, _)| b.total_cmp(&x)) {
            Ok(i) => self.buckets[i].1 += 1,
            Err(i) => self.buckets.insert(i, (x, 1)),
        }
    }

    pub fn buckets(&self) -> &[(f64, u64)] {
        &self.buckets
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Upper bound of the bucket holding the rank-th sample (1-based),
    /// scanning counts in bound order.
    pub fn bound_of_rank(&self, rank: u64) -> Result<f64> {
        if rank == 0 || rank > self.total {
            return Err(SimError::NotYetDefined {
                what: format!("rank {rank} of {} samples", self.total),
            });
        }
        let mut seen = 0;
        for &(bound, count) in &self.buckets {
            seen += count;
            if seen >= rank {
                return Ok(bound);
            }
        }
        unreachable!("total covers every bucket")
    }
}

impl AddAssign<f64> for PrecisionHistogram {
    fn add_assign(&mut self, x: f64) {
        self.add(x);
    }
}

/// Fixed-width buckets starting at zero, with a cap on the bucket
/// count; samples past the cap land in the overflow bucket and
/// negative samples in the first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleHistogram {
    width: f64,
    counts: Vec<u64>,
    overflow: u64,
    stats: Variance,
}

impl SimpleHistogram {
    pub fn new(width: f64, buckets: usize) -> Result<Self> {
        if !(width > 0.0) {
            return Err(SimError::param(format!("bucket width {width}"), 0.0));
        }
        if buckets == 0 {
            return Err(SimError::param("histogram with no buckets", 0.0));
        }
        Ok(Self {
            width,
            counts: vec![0; buckets],
            overflow: 0,
            stats: Variance::new(),
        })
    }

    pub fn add(&mut self, x: f64) {
        self.stats.add(x);
        let index = (x / self.width).floor().max(0.0) as usize;
        match self.counts.get_mut(index) {
            Some(count) => *count += 1,
            None => self.overflow += 1,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    pub fn total(&self) -> u64 {
        self.stats.count()
    }

    pub fn mean(&self) -> f64 {
        self.stats.mean()
    }

    pub fn variance(&self) -> Result<f64> {
        self.stats.variance()
    }
}

impl AddAssign<f64> for SimpleHistogram {
    fn add_assign(&mut self, x: f64) {
        self.add(x);
    }
}
