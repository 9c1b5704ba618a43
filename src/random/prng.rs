use std::sync::Mutex;

/// Seed triple driving the three congruential series.
pub type Seeds = [u32; 3];

/// Seeds every run starts from unless told otherwise.
pub const DEFAULT_SEEDS: Seeds = [1, 10_000, 3_000];

const M0: u32 = 30_269;
const M1: u32 = 30_307;
const M2: u32 = 30_323;

static CACHE: Mutex<Seeds> = Mutex::new(DEFAULT_SEEDS);

/// Restore the process-wide seed cache to the default triple.
///
/// Streams constructed without explicit seeds copy the cache at
/// construction, so calling this between runs makes their draw
/// sequences repeat exactly.
pub fn reset_prng_cache() {
    *CACHE.lock().unwrap_or_else(|e| e.into_inner()) = DEFAULT_SEEDS;
}

pub(crate) fn cached_seeds() -> Seeds {
    *CACHE.lock().unwrap_or_else(|e| e.into_inner())
}

/// Wichmann-Hill combined multiplicative congruential generator.
///
/// Three short congruential series advance on every draw; the draw is
/// the fractional part of the sum of their normalized states. All seed
/// arithmetic stays in `u32` (the largest intermediate is 30322 * 172),
/// which keeps the sequence bit-identical across platforms. Seeds
/// should lie in `1..modulus` for full period; a zero component pins
/// its series at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WichmannHill {
    seeds: Seeds,
}

impl WichmannHill {
    pub fn new(seeds: Seeds) -> Self {
        Self { seeds }
    }

    /// A generator seeded from the process-wide cache.
    pub fn from_cache() -> Self {
        Self::new(cached_seeds())
    }

    pub fn seeds(&self) -> Seeds {
        self.seeds
    }

    /// Next uniform variate in [0, 1).
    pub fn uniform(&mut self) -> f64 {
        self.seeds[0] = (self.seeds[0] * 171) % M0;
        self.seeds[1] = (self.seeds[1] * 172) % M1;
        self.seeds[2] = (self.seeds[2] * 170) % M2;
        let u = self.seeds[0] as f64 / M0 as f64
            + self.seeds[1] as f64 / M1 as f64
            + self.seeds[2] as f64 / M2 as f64;
        u.fract()
    }
}

impl Default for WichmannHill {
    fn default() -> Self {
        Self::new(DEFAULT_SEEDS)
    }
}

impl Iterator for WichmannHill {
    type Item = f64;
    fn next(&mut self) -> Option<f64> {
        Some(self.uniform())
    }
}
