//! Small numeric helpers shared by the networks and detectors

use ndarray::{Array2, ArrayView2, Axis};

#[inline]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[inline]
pub fn relu(x: f64) -> f64 {
    x.max(0.0)
}

/// Row-wise log-softmax, max-shifted
pub fn log_softmax(logits: ArrayView2<f64>) -> Array2<f64> {
    let mut out = logits.to_owned();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let max = row.fold(f64::NEG_INFINITY, |acc, &x| acc.max(x));
        let lse = max + row.iter().map(|&x| (x - max).exp()).sum::<f64>().ln();
        row.mapv_inplace(|x| x - lse);
    }
    out
}

/// Row-wise softmax
pub fn softmax(logits: ArrayView2<f64>) -> Array2<f64> {
    log_softmax(logits).mapv(f64::exp)
}
