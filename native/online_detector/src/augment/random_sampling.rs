//! Uniform resampling of observed pilots

use ndarray::{Array1, Array2};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use super::pool::PilotPool;
use crate::error::{DetectError, DetectResult};
use crate::traits::Sampler;

/// Draws a pilot row uniformly, with replacement, ignoring the requested state
#[derive(Debug, Clone, Copy)]
pub struct RandomSampler<'a> {
    pool: &'a PilotPool,
}

impl<'a> RandomSampler<'a> {
    pub fn new(pool: &'a PilotPool) -> Self {
        Self { pool }
    }
}

impl Sampler for RandomSampler<'_> {
    fn sample(
        &self,
        _state: usize,
        _channel: &Array2<f64>,
        _snr: f64,
        rng: &mut ChaCha8Rng,
    ) -> DetectResult<(Array1<f64>, Array1<u8>)> {
        if self.pool.is_empty() {
            return Err(DetectError::InsufficientPilots { available: 0, required: 1 });
        }
        let index = rng.gen_range(0..self.pool.len());
        let (rx, tx, _) = self.pool.row(index);
        Ok((rx.to_owned(), tx.to_owned()))
    }
}
