//! Block fading of channel coefficients
//!
//! Coefficients are held constant within a block and vary between blocks.
//! Three profiles are supported:
//!
//! - `Static`: coefficients never change
//! - `Cosine`: deterministic per-tap gain `0.8 + 0.2 cos(2π b / T_k)` with
//!   periods `T = [51, 39, 33, 21]` cycled over the taps
//! - `Rayleigh`: each tap is scaled by the magnitude of an independent
//!   Gaussian-weighted sum-of-sinusoids process sampled once per block
//!
//! ## Method: Gaussian-Weighted Sum of Sinusoids (GWSOS)
//!
//!   g(b) = (1/√(2N)) Σ A_n · exp(j(2π f_n b + φ_n))
//!
//! where A_n = a_n + j·b_n with a_n, b_n ~ N(0, 1) and `f_n` is the Doppler
//! rate in cycles per block. This gives unit mean power and a Rayleigh
//! magnitude.

use ndarray::Array2;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::noise::standard_normal_pair;

const NUM_SINUSOIDS: usize = 64;

/// Per-tap cosine fading periods, in blocks
pub const COSINE_PERIODS: [f64; 4] = [51.0, 39.0, 33.0, 21.0];

/// How channel coefficients evolve across blocks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadingProfile {
    Static,
    Cosine,
    Rayleigh {
        /// Doppler rate in cycles per block
        doppler_per_block: f64,
    },
}

impl Default for FadingProfile {
    fn default() -> Self {
        FadingProfile::Static
    }
}

/// Single Rayleigh fading tap using Gaussian-weighted sum of sinusoids
pub struct FadingTap {
    amp_real: [f64; NUM_SINUSOIDS],
    amp_imag: [f64; NUM_SINUSOIDS],
    freq: [f64; NUM_SINUSOIDS],
    phase: [f64; NUM_SINUSOIDS],
    scale: f64,
}

impl FadingTap {
    pub fn new(doppler_per_block: f64, rng: &mut ChaCha8Rng) -> Self {
        let mut amp_real = [0.0; NUM_SINUSOIDS];
        let mut amp_imag = [0.0; NUM_SINUSOIDS];
        let mut freq = [0.0; NUM_SINUSOIDS];
        let mut phase = [0.0; NUM_SINUSOIDS];

        // Create independent RNG for this tap
        let tap_seed: u64 = rng.gen();
        let mut tap_rng = ChaCha8Rng::seed_from_u64(tap_seed);

        for n in 0..NUM_SINUSOIDS {
            let (a, b) = standard_normal_pair(&mut tap_rng);
            amp_real[n] = a;
            amp_imag[n] = b;

            // Doppler frequency from angle of arrival
            let alpha = tap_rng.gen::<f64>() * 2.0 * PI - PI;
            freq[n] = doppler_per_block * alpha.cos();

            phase[n] = tap_rng.gen::<f64>() * 2.0 * PI;
        }

        // E[|A_n|²] = 2, so 1/√(2N) gives E[|g|²] = 1
        let scale = (1.0 / (2.0 * NUM_SINUSOIDS as f64)).sqrt();

        Self {
            amp_real,
            amp_imag,
            freq,
            phase,
            scale,
        }
    }

    /// Complex gain at block index `block`
    pub fn gain_complex(&self, block: usize) -> (f64, f64) {
        let t = block as f64;
        let mut x = 0.0;
        let mut y = 0.0;

        for n in 0..NUM_SINUSOIDS {
            let psi = 2.0 * PI * self.freq[n] * t + self.phase[n];
            let (sin_psi, cos_psi) = psi.sin_cos();
            x += self.amp_real[n] * cos_psi - self.amp_imag[n] * sin_psi;
            y += self.amp_real[n] * sin_psi + self.amp_imag[n] * cos_psi;
        }

        (x * self.scale, y * self.scale)
    }

    /// Rayleigh-distributed magnitude at block index `block`
    pub fn gain(&self, block: usize) -> f64 {
        let (i, q) = self.gain_complex(block);
        (i * i + q * q).sqrt()
    }
}

/// Applies a fading profile to a base coefficient matrix, one tap per column
pub struct BlockFading {
    profile: FadingProfile,
    taps: Vec<FadingTap>,
}

impl BlockFading {
    pub fn new(profile: FadingProfile, n_taps: usize, rng: &mut ChaCha8Rng) -> Self {
        let taps = match profile {
            FadingProfile::Rayleigh { doppler_per_block } => (0..n_taps)
                .map(|_| FadingTap::new(doppler_per_block, rng))
                .collect(),
            _ => Vec::new(),
        };
        Self { profile, taps }
    }

    pub fn profile(&self) -> FadingProfile {
        self.profile
    }

    /// Multiplicative gain of tap `tap` during block `block`
    pub fn tap_gain(&self, tap: usize, block: usize) -> f64 {
        match self.profile {
            FadingProfile::Static => 1.0,
            FadingProfile::Cosine => {
                let period = COSINE_PERIODS[tap % COSINE_PERIODS.len()];
                0.8 + 0.2 * (2.0 * PI * block as f64 / period).cos()
            }
            FadingProfile::Rayleigh { .. } => self.taps[tap].gain(block),
        }
    }

    /// Coefficients in effect during `block`
    pub fn apply(&self, base: &Array2<f64>, block: usize) -> Array2<f64> {
        let mut h = base.clone();
        for (tap, mut column) in h.columns_mut().into_iter().enumerate() {
            let g = self.tap_gain(tap, block);
            column.mapv_inplace(|c| c * g);
        }
        h
    }
}
