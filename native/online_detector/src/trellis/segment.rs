//! Memory-window segmentation
//!
//! Turns a batch of words `[B, L]` into one sliding window per time step,
//! `[B * L, m]`, where row `t` of word `b` is `[x[t], x[t+1], .., x[t+m-1]]`.
//! Each word is padded with `m` trailing neutral elements before slicing, so
//! windows that run past the end see the pad value.

use ndarray::{Array2, ArrayView2};

/// Element types that can be segmented, with their padding value
pub trait Symbol: Copy {
    const PAD: Self;
}

impl Symbol for u8 {
    const PAD: Self = 1;
}

impl Symbol for f64 {
    const PAD: Self = 1.0;
}

/// Sliding windows of length `memory_length` over every row of `words`
pub fn segment<T: Symbol>(memory_length: usize, words: ArrayView2<T>) -> Array2<T> {
    let (batch, len) = words.dim();
    let m = memory_length;
    Array2::from_shape_fn((batch * len, m), |(row, i)| {
        let (b, t) = (row / len, row % len);
        if t + i < len {
            words[[b, t + i]]
        } else {
            T::PAD
        }
    })
}

/// Windows of a single `[L, 1]` column word
pub fn segment_column<T: Symbol>(memory_length: usize, column: ArrayView2<T>) -> Array2<T> {
    segment(memory_length, column.t())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_windows_and_padding() {
        let words = array![[0u8, 1, 1, 0]];
        let out = segment(3, words.view());

        assert_eq!(out.dim(), (4, 3));
        assert_eq!(
            out,
            array![[0, 1, 1], [1, 1, 0], [1, 0, 1], [0, 1, 1]]
        );
    }

    #[test]
    fn test_first_column_is_input() {
        let words = array![[0.5, -0.25, 2.0, 7.0, -1.0]];
        for m in 1..5 {
            let out = segment(m, words.view());
            assert_eq!(out.dim(), (5, m));
            for t in 0..5 {
                assert!((out[[t, 0]] - words[[0, t]]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_batch_rows_are_independent() {
        let words = array![[0u8, 0], [1, 0]];
        let out = segment(2, words.view());

        // word 0 pads into 1, not into word 1
        assert_eq!(out, array![[0, 0], [0, 1], [1, 0], [0, 1]]);
    }

    #[test]
    fn test_column_layout() {
        let column = array![[1u8], [0], [0]];
        assert_eq!(
            segment_column(2, column.view()),
            array![[1, 0], [0, 0], [0, 1]]
        );
    }

    #[test]
    fn test_memory_one_is_identity() {
        let words = array![[3.0, 4.0, 5.0]];
        let out = segment(1, words.view());
        assert_eq!(out, array![[3.0], [4.0], [5.0]]);
    }
}
