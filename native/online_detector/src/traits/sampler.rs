//! Sampler trait - synthetic pilot generation

use ndarray::{Array1, Array2};
use rand_chacha::ChaCha8Rng;

use crate::error::DetectResult;

/// Draws one synthetic `(received_row, transmitted_row)` pair
///
/// `state` is the trellis state the caller wants represented; samplers may
/// ignore it. `channel` and `snr` describe the block the pilots came from.
pub trait Sampler {
    fn sample(
        &self,
        state: usize,
        channel: &Array2<f64>,
        snr: f64,
        rng: &mut ChaCha8Rng,
    ) -> DetectResult<(Array1<f64>, Array1<u8>)>;
}
