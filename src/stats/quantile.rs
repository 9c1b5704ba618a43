use crate::stats::histogram::PrecisionHistogram;
use crate::Result;
use crate::SimError;
use serde::Deserialize;
use serde::Serialize;
use std::ops::AddAssign;

/// Online q-quantile over exact-value buckets: the estimate is the
/// bound of the bucket holding the ceil(q * n)-th sample. No in-bucket
/// interpolation; the bound is itself an observed value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quantile {
    q: f64,
    samples: PrecisionHistogram,
}

impl Quantile {
    pub fn new(q: f64) -> Result<Self> {
        if !(q > 0.0) || !(q < 1.0) {
            return Err(SimError::param(format!("quantile {q}"), 0.0));
        }
        Ok(Self {
            q,
            samples: PrecisionHistogram::new(),
        })
    }

    pub fn add(&mut self, x: f64) {
        self.samples.add(x);
    }

    pub fn q(&self) -> f64 {
        self.q
    }

    pub fn count(&self) -> u64 {
        self.samples.total()
    }

    pub fn value(&self) -> Result<f64> {
        let n = self.samples.total();
        if n == 0 {
            return Err(SimError::NotYetDefined {
                what: "quantile of no samples".into(),
            });
        }
        let rank = (self.q * n as f64).ceil().max(1.0) as u64;
        self.samples.bound_of_rank(rank)
    }
}

impl AddAssign<f64> for Quantile {
    fn add_assign(&mut self, x: f64) {
        self.add(x);
    }
}
