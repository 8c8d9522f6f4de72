//! Additive White Gaussian Noise generator
//!
//! Uses Box-Muller transform for Gaussian samples. Noise power follows the
//! unit-energy BPSK convention: `sigma^2 = 10^(-snr_db / 10)`.

use ndarray::Array2;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::f64::consts::PI;

/// Noise variance for a unit-power BPSK constellation at the given SNR (dB)
#[inline]
pub fn noise_variance(snr_db: f64) -> f64 {
    10.0_f64.powf(-snr_db / 10.0)
}

/// AWGN generator with configurable power
pub struct NoiseGenerator {
    /// Standard deviation (sqrt of noise power)
    std_dev: f64,

    /// Internal RNG
    rng: ChaCha8Rng,

    /// Cached second sample from Box-Muller
    cached: Option<f64>,
}

impl NoiseGenerator {
    pub fn new(noise_power: f64, seed_rng: &mut ChaCha8Rng) -> Self {
        let std_dev = noise_power.sqrt();

        // Derive an independent stream so callers keep their own sequence
        let seed: u64 = seed_rng.gen();
        let rng = ChaCha8Rng::seed_from_u64(seed);

        Self {
            std_dev,
            rng,
            cached: None,
        }
    }

    /// Generator calibrated for a BPSK link at `snr_db`
    pub fn from_snr(snr_db: f64, seed_rng: &mut ChaCha8Rng) -> Self {
        Self::new(noise_variance(snr_db), seed_rng)
    }

    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// Generate next Gaussian noise sample using Box-Muller transform
    pub fn next_sample(&mut self) -> f64 {
        if let Some(cached) = self.cached.take() {
            return cached * self.std_dev;
        }
        let (z0, z1) = standard_normal_pair(&mut self.rng);
        self.cached = Some(z1);
        z0 * self.std_dev
    }

    /// Add noise in place to every entry of a received word
    pub fn corrupt(&mut self, samples: &mut Array2<f64>) {
        for s in samples.iter_mut() {
            *s += self.next_sample();
        }
    }
}

/// Two independent N(0, 1) samples drawn with Box-Muller
pub fn standard_normal_pair<R: Rng + ?Sized>(rng: &mut R) -> (f64, f64) {
    // Avoid log(0)
    let u1: f64 = rng.gen::<f64>().max(1e-10);
    let u2: f64 = rng.gen();

    let r = (-2.0 * u1.ln()).sqrt();
    let theta = 2.0 * PI * u2;

    (r * theta.cos(), r * theta.sin())
}
