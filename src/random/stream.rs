use crate::random::prng::Seeds;
use crate::random::prng::WichmannHill;
use crate::Result;
use crate::SimError;

/// A stateful random-variate stream. Each draw advances the stream's
/// private seed triple; streams never share state.
pub trait Variate {
    fn sample(&mut self) -> f64;
}

/// Uniform variates on [lo, hi).
#[derive(Debug, Clone)]
pub struct Uniform {
    lo: f64,
    span: f64,
    rng: WichmannHill,
}

impl Uniform {
    pub fn new(lo: f64, hi: f64) -> Result<Self> {
        Self::seeded(lo, hi, super::prng::cached_seeds())
    }

    pub fn seeded(lo: f64, hi: f64, seeds: Seeds) -> Result<Self> {
        if !(lo <= hi) {
            return Err(SimError::param(format!("uniform bounds {lo}..{hi}"), 0.0));
        }
        Ok(Self {
            lo,
            span: hi - lo,
            rng: WichmannHill::new(seeds),
        })
    }
}

impl Variate for Uniform {
    fn sample(&mut self) -> f64 {
        self.lo + self.span * self.rng.uniform()
    }
}

/// Exponential variates by inversion, `-mean * ln(1 - U)`.
#[derive(Debug, Clone)]
pub struct Exponential {
    mean: f64,
    rng: WichmannHill,
}

impl Exponential {
    pub fn new(mean: f64) -> Result<Self> {
        Self::seeded(mean, super::prng::cached_seeds())
    }

    pub fn seeded(mean: f64, seeds: Seeds) -> Result<Self> {
        if !(mean > 0.0) {
            return Err(SimError::param(format!("exponential mean {mean}"), 0.0));
        }
        Ok(Self {
            mean,
            rng: WichmannHill::new(seeds),
        })
    }
}

impl Variate for Exponential {
    fn sample(&mut self) -> f64 {
        // redraw on U == 1, where ln(1 - U) blows up
        let u = loop {
            let u = self.rng.uniform();
            if u < 1.0 {
                break u;
            }
        };
        -self.mean * (1.0 - u).ln()
    }
}

/// Normal variates via polar Box-Muller. The rejection loop yields a
/// pair per accepted point; the second sample is cached for the next
/// call.
#[derive(Debug, Clone)]
pub struct Normal {
    mean: f64,
    stddev: f64,
    spare: Option<f64>,
    rng: WichmannHill,
}

impl Normal {
    pub fn new(mean: f64, stddev: f64) -> Result<Self> {
        Self::seeded(mean, stddev, super::prng::cached_seeds())
    }

    pub fn seeded(mean: f64, stddev: f64, seeds: Seeds) -> Result<Self> {
        if !(stddev >= 0.0) {
            return Err(SimError::param(format!("normal stddev {stddev}"), 0.0));
        }
        Ok(Self {
            mean,
            stddev,
            spare: None,
            rng: WichmannHill::new(seeds),
        })
    }
}

impl Variate for Normal {
    fn sample(&mut self) -> f64 {
        if let Some(z) = self.spare.take() {
            return self.mean + self.stddev * z;
        }
        loop {
            let v1 = 2.0 * self.rng.uniform() - 1.0;
            let v2 = 2.0 * self.rng.uniform() - 1.0;
            let s = v1 * v1 + v2 * v2;
            if s > 0.0 && s < 1.0 {
                let f = (-2.0 * s.ln() / s).sqrt();
                self.spare = Some(v2 * f);
                return self.mean + self.stddev * v1 * f;
            }
        }
    }
}

/// Erlang-k variates as the log of a product of k uniforms, with
/// k chosen from the coefficient of variation.
#[derive(Debug, Clone)]
pub struct Erlang {
    k: u32,
    scale: f64,
    rng: WichmannHill,
}

impl Erlang {
    pub fn new(mean: f64, stddev: f64) -> Result<Self> {
        Self::seeded(mean, stddev, super::prng::cached_seeds())
    }

    pub fn seeded(mean: f64, stddev: f64, seeds: Seeds) -> Result<Self> {
        if !(mean > 0.0) || !(stddev > 0.0) || stddev > mean {
            return Err(SimError::param(
                format!("erlang mean {mean} stddev {stddev}"),
                0.0,
            ));
        }
        let k = (mean / stddev).powi(2).ceil() as u32;
        Ok(Self {
            k,
            scale: mean / k as f64,
            rng: WichmannHill::new(seeds),
        })
    }
}

impl Variate for Erlang {
    fn sample(&mut self) -> f64 {
        let mut product = 1.0;
        for _ in 0..self.k {
            let u = loop {
                let u = self.rng.uniform();
                if u > 0.0 {
                    break u;
                }
            };
            product *= u;
        }
        -self.scale * product.ln()
    }
}

/// Hyperexponential variates: a two-stage exponential mixture for
/// distributions with coefficient of variation above one.
#[derive(Debug, Clone)]
pub struct HyperExponential {
    mean: f64,
    p: f64,
    rng: WichmannHill,
}

impl HyperExponential {
    pub fn new(mean: f64, stddev: f64) -> Result<Self> {
        Self::seeded(mean, stddev, super::prng::cached_seeds())
    }

    pub fn seeded(mean: f64, stddev: f64, seeds: Seeds) -> Result<Self> {
        if !(mean > 0.0) || !(stddev > mean) {
            return Err(SimError::param(
                format!("hyperexponential mean {mean} stddev {stddev}"),
                0.0,
            ));
        }
        let cv2 = (stddev / mean).powi(2);
        let p = 0.5 * (1.0 - ((cv2 - 1.0) / (cv2 + 1.0)).sqrt());
        Ok(Self {
            mean,
            p,
            rng: WichmannHill::new(seeds),
        })
    }
}

impl Variate for HyperExponential {
    fn sample(&mut self) -> f64 {
        let stage = if self.rng.uniform() > self.p {
            self.mean / (2.0 * (1.0 - self.p))
        } else {
            self.mean / (2.0 * self.p)
        };
        let u = loop {
            let u = self.rng.uniform();
            if u > 0.0 {
                break u;
            }
        };
        -stage * u.ln()
    }
}

/// Triangular variates on [a, b] with mode c, by piecewise inversion.
#[derive(Debug, Clone)]
pub struct Triangular {
    a: f64,
    b: f64,
    c: f64,
    rng: WichmannHill,
}

impl Triangular {
    pub fn new(a: f64, b: f64, c: f64) -> Result<Self> {
        Self::seeded(a, b, c, super::prng::cached_seeds())
    }

    pub fn seeded(a: f64, b: f64, c: f64, seeds: Seeds) -> Result<Self> {
        if !(a < b) || !(a <= c) || !(c <= b) {
            return Err(SimError::param(format!("triangular {a} {b} {c}"), 0.0));
        }
        Ok(Self {
            a,
            b,
            c,
            rng: WichmannHill::new(seeds),
        })
    }
}

impl Variate for Triangular {
    fn sample(&mut self) -> f64 {
        let u = self.rng.uniform();
        let cut = (self.c - self.a) / (self.b - self.a);
        if u < cut {
            self.a + (u * (self.b - self.a) * (self.c - self.a)).sqrt()
        } else {
            self.b - ((1.0 - u) * (self.b - self.a) * (self.b - self.c)).sqrt()
        }
    }
}

/// Bernoulli draws: true with probability p.
#[derive(Debug, Clone)]
pub struct Draw {
    p: f64,
    rng: WichmannHill,
}

impl Draw {
    pub fn new(p: f64) -> Result<Self> {
        Self::seeded(p, super::prng::cached_seeds())
    }

    pub fn seeded(p: f64, seeds: Seeds) -> Result<Self> {
        if !(0.0..=1.0).contains(&p) {
            return Err(SimError::param(format!("draw probability {p}"), 0.0));
        }
        Ok(Self {
            p,
            rng: WichmannHill::new(seeds),
        })
    }

    pub fn sample(&mut self) -> bool {
        self.rng.uniform() < self.p
    }
}

macro_rules! iterate {
    ($($stream:ty),*) => {
        $(impl Iterator for $stream {
            type Item = f64;
            fn next(&mut self) -> Option<f64> {
                Some(self.sample())
            }
        })*
    };
}

iterate!(Uniform, Exponential, Normal, Erlang, HyperExponential, Triangular);

impl Iterator for Draw {
    type Item = bool;
    fn next(&mut self) -> Option<bool> {
        Some(self.sample())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::prng::DEFAULT_SEEDS;

    #[test]
    fn uniform_respects_bounds() {
        let stream = Uniform::seeded(2.0, 5.0, DEFAULT_SEEDS).unwrap();
        assert!(stream.take(10_000).all(|x| (2.0..5.0).contains(&x)));
    }

    #[test]
    fn uniform_rejects_inverted_bounds() {
        assert!(Uniform::new(5.0, 2.0).is_err());
    }

    #[test]
    fn exponential_mean_converges() {
        let stream = Exponential::seeded(5.0, DEFAULT_SEEDS).unwrap();
        let n = 100_000;
        let mean = stream.take(n).sum::<f64>() / n as f64;
        assert!((mean - 5.0).abs() < 0.1, "sample mean {mean}");
    }

    #[test]
    fn exponential_repeats_bit_for_bit() {
        let a = Exponential::seeded(5.0, DEFAULT_SEEDS).unwrap();
        let b = a.clone();
        let xs = a.take(10_000).map(f64::to_bits).collect::<Vec<_>>();
        let ys = b.take(10_000).map(f64::to_bits).collect::<Vec<_>>();
        assert_eq!(xs, ys);
    }

    #[test]
    fn exponential_rejects_nonpositive_mean() {
        assert!(Exponential::new(0.0).is_err());
        assert!(Exponential::new(-1.0).is_err());
    }

    #[test]
    fn normal_moments_converge() {
        let stream = Normal::seeded(10.0, 2.0, DEFAULT_SEEDS).unwrap();
        let xs = stream.take(100_000).collect::<Vec<_>>();
        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
        assert!((mean - 10.0).abs() < 0.05, "sample mean {mean}");
        assert!((var.sqrt() - 2.0).abs() < 0.05, "sample stddev {}", var.sqrt());
    }

    #[test]
    fn erlang_picks_shape_from_cv() {
        // mean/stddev = 2 exactly, so k = 4
        let stream = Erlang::seeded(8.0, 4.0, DEFAULT_SEEDS).unwrap();
        assert_eq!(stream.k, 4);
        let mean = stream.take(100_000).sum::<f64>() / 100_000.0;
        assert!((mean - 8.0).abs() < 0.1, "sample mean {mean}");
    }

    #[test]
    fn erlang_rejects_bad_spread() {
        assert!(Erlang::new(4.0, 0.0).is_err());
        assert!(Erlang::new(4.0, -1.0).is_err());
        assert!(Erlang::new(4.0, 5.0).is_err());
    }

    #[test]
    fn hyperexponential_mean_converges() {
        let stream = HyperExponential::seeded(5.0, 10.0, DEFAULT_SEEDS).unwrap();
        let mean = stream.take(200_000).sum::<f64>() / 200_000.0;
        assert!((mean - 5.0).abs() < 0.2, "sample mean {mean}");
    }

    #[test]
    fn hyperexponential_requires_high_variation() {
        assert!(HyperExponential::new(5.0, 5.0).is_err());
        assert!(HyperExponential::new(5.0, 2.0).is_err());
    }

    #[test]
    fn triangular_respects_support() {
        let stream = Triangular::seeded(1.0, 4.0, 2.0, DEFAULT_SEEDS).unwrap();
        let xs = stream.take(50_000).collect::<Vec<_>>();
        assert!(xs.iter().all(|x| (1.0..=4.0).contains(x)));
        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        // triangular mean is (a + b + c) / 3
        assert!((mean - 7.0 / 3.0).abs() < 0.05, "sample mean {mean}");
    }

    #[test]
    fn triangular_rejects_mode_outside_support() {
        assert!(Triangular::new(1.0, 4.0, 5.0).is_err());
        assert!(Triangular::new(4.0, 1.0, 2.0).is_err());
    }

    #[test]
    fn draw_frequency_tracks_probability() {
        let stream = Draw::seeded(0.3, DEFAULT_SEEDS).unwrap();
        let hits = stream.take(100_000).filter(|&b| b).count();
        let freq = hits as f64 / 100_000.0;
        assert!((freq - 0.3).abs() < 0.01, "hit frequency {freq}");
    }

    #[test]
    fn draw_rejects_probability_outside_unit() {
        assert!(Draw::new(-0.1).is_err());
        assert!(Draw::new(1.1).is_err());
    }

    #[test]
    fn seeded_streams_are_independent_of_the_cache() {
        let mut a = Uniform::seeded(0.0, 1.0, [3, 5, 7]).unwrap();
        let mut b = Uniform::seeded(0.0, 1.0, [3, 5, 7]).unwrap();
        for _ in 0..1_000 {
            assert_eq!(a.sample().to_bits(), b.sample().to_bits());
        }
    }
}
