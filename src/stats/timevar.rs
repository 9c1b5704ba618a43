use crate::Result;
use crate::SimError;
use crate::Time;
use serde::Deserialize;
use serde::Serialize;
use std::ops::AddAssign;

/// Variance of a piecewise-constant signal weighted by the time spent
/// at each value. Every update carries the virtual time at which the
/// signal changed; the previous value is credited with the elapsed
/// interval. Estimates are defined once a positive span has elapsed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeVariance {
    start: Option<Time>,
    last_time: Time,
    last_value: f64,
    area: f64,
    area2: f64,
}

impl TimeVariance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64, time: Time) -> Result<()> {
        match self.start {
            None => self.start = Some(time),
            Some(_) => {
                if !(time >= self.last_time) {
                    return Err(SimError::param(
                        format!("observation at t={time} behind t={}", self.last_time),
                        time,
                    ));
                }
                let dt = time - self.last_time;
                self.area += self.last_value * dt;
                self.area2 += self.last_value * self.last_value * dt;
            }
        }
        self.last_time = time;
        self.last_value = value;
        Ok(())
    }

    pub fn span(&self) -> Time {
        match self.start {
            Some(start) => self.last_time - start,
            None => 0.0,
        }
    }

    pub fn mean(&self) -> Result<f64> {
        let span = self.span();
        if !(span > 0.0) {
            return Err(SimError::NotYetDefined {
                what: "time-weighted mean over an empty span".into(),
            });
        }
        Ok(self.area / span)
    }

    pub fn variance(&self) -> Result<f64> {
        let mean = self.mean()?;
        Ok((self.area2 / self.span() - mean * mean).max(0.0))
    }

    pub fn stddev(&self) -> Result<f64> {
        self.variance().map(f64::sqrt)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// `+=` ingestion of a (value, time) observation. A time regression is
/// dropped here; use `add` when the error matters.
impl AddAssign<(f64, Time)> for TimeVariance {
    fn add_assign(&mut self, (value, time): (f64, Time)) {
        let _ = self.add(value, time);
    }
}
