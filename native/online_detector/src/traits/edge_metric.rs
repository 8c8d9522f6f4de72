//! EdgeMetric trait - per-state branch costs for trellis decoding

use ndarray::{Array2, ArrayView2};

use crate::error::DetectResult;

/// Cost of every trellis state for every received row
///
/// Lower is better. Returns `[rows, n_states]`.
pub trait EdgeMetric: Send {
    fn costs(&self, rx: ArrayView2<f64>, n_states: usize) -> DetectResult<Array2<f64>>;

    /// Replace the channel coefficients, for metrics that use them
    fn set_channel(&mut self, _h: &Array2<f64>) {}
}
