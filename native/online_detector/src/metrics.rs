//! Detection error rates

use ndarray::{s, ArrayView2};

use crate::error::{DetectError, DetectResult};

/// `(ser, fer, error_indices)` of `estimate` against `ground_truth`
///
/// SER counts mismatched symbols over all symbols. FER counts rows (frames)
/// with at least one mismatch over all rows; `error_indices` lists those rows.
pub fn error_rates(
    estimate: ArrayView2<u8>,
    ground_truth: ArrayView2<u8>,
) -> DetectResult<(f64, f64, Vec<usize>)> {
    if estimate.dim() != ground_truth.dim() {
        return Err(DetectError::shape("error rate inputs", ground_truth.shape(), estimate.shape()));
    }
    let (rows, cols) = estimate.dim();
    if rows == 0 || cols == 0 {
        return Ok((0.0, 0.0, Vec::new()));
    }

    let mut errors = 0usize;
    let mut error_indices = Vec::new();
    for (r, (est, gt)) in estimate.rows().into_iter().zip(ground_truth.rows()).enumerate() {
        let row_errors = est.iter().zip(gt.iter()).filter(|(a, b)| a != b).count();
        if row_errors > 0 {
            errors += row_errors;
            error_indices.push(r);
        }
    }

    let ser = errors as f64 / (rows * cols) as f64;
    let fer = error_indices.len() as f64 / rows as f64;
    Ok((ser, fer, error_indices))
}

/// Error rates over the columns both words have
///
/// Rows must agree; extra columns on either side are ignored.
pub fn error_rates_common(
    estimate: ArrayView2<u8>,
    ground_truth: ArrayView2<u8>,
) -> DetectResult<(f64, f64, Vec<usize>)> {
    let cols = estimate.ncols().min(ground_truth.ncols());
    error_rates(
        estimate.slice(s![.., ..cols]),
        ground_truth.slice(s![.., ..cols]),
    )
}
