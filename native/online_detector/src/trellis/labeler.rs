//! Symbol window → state labelling
//!
//! A state is the positional binary sum of a window of bits, bit `i`
//! weighted `2^i`. SISO windows run over channel memory; MIMO windows run
//! over simultaneous users. Labels are always in `[0, 2^window_size)`.
//!
//! Non-binary input is rejected: the weighted sum would alias to a wrong
//! state without any visible symptom.

use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::error::{DetectError, DetectResult};

/// Precomputed weighting vector `[2^0, 2^1, .., 2^(w-1)]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLabeler {
    weights: Array1<usize>,
}

impl StateLabeler {
    pub fn new(window_size: usize) -> Self {
        Self {
            weights: Array1::from_shape_fn(window_size, |i| 1usize << i),
        }
    }

    pub fn window_size(&self) -> usize {
        self.weights.len()
    }

    pub fn n_states(&self) -> usize {
        1 << self.window_size()
    }

    /// State of a single window
    pub fn label_row(&self, row: ArrayView1<u8>) -> DetectResult<usize> {
        if row.len() != self.window_size() {
            return Err(DetectError::shape("state window", &[self.window_size()], &[row.len()]));
        }
        let mut state = 0;
        for (col, (&bit, &w)) in row.iter().zip(self.weights.iter()).enumerate() {
            if bit > 1 {
                return Err(DetectError::NonBinarySymbol { row: 0, col, value: bit as f64 });
            }
            state += bit as usize * w;
        }
        Ok(state)
    }

    /// States of a `[batch, window]` matrix, one per row
    pub fn label_rows(&self, rows: ArrayView2<u8>) -> DetectResult<Vec<usize>> {
        rows.rows()
            .into_iter()
            .enumerate()
            .map(|(r, row)| {
                self.label_row(row).map_err(|e| match e {
                    DetectError::NonBinarySymbol { col, value, .. } => {
                        DetectError::NonBinarySymbol { row: r, col, value }
                    }
                    other => other,
                })
            })
            .collect()
    }

    /// Bit pattern of `state` (inverse of `label_row`)
    pub fn bits(&self, state: usize) -> Array1<u8> {
        state_bits(state, self.window_size())
    }
}

/// Bits of `state`, least significant first
pub fn state_bits(state: usize, width: usize) -> Array1<u8> {
    Array1::from_shape_fn(width, |i| ((state >> i) & 1) as u8)
}

/// SISO states of `[batch, memory_length]` windows
pub fn siso_states(memory_length: usize, windows: ArrayView2<u8>) -> DetectResult<Vec<usize>> {
    StateLabeler::new(memory_length).label_rows(windows)
}

/// MIMO states, numeric-array layout: `[n_user, batch]`, users on axis 0
pub fn mimo_states_array(n_user: usize, words: ArrayView2<u8>) -> DetectResult<Vec<usize>> {
    if words.nrows() != n_user {
        return Err(DetectError::shape("mimo words (users x batch)", &[n_user, words.ncols()], &[words.nrows(), words.ncols()]));
    }
    let labeler = StateLabeler::new(n_user);
    words
        .columns()
        .into_iter()
        .enumerate()
        .map(|(c, column)| {
            labeler.label_row(column).map_err(|e| match e {
                DetectError::NonBinarySymbol { col, value, .. } => {
                    DetectError::NonBinarySymbol { row: col, col: c, value }
                }
                other => other,
            })
        })
        .collect()
}

/// MIMO states, training-tensor layout: `[batch, n_user]` of `f64`
pub fn mimo_states(n_user: usize, words: ArrayView2<f64>) -> DetectResult<Vec<usize>> {
    if words.ncols() != n_user {
        return Err(DetectError::shape("mimo words (batch x users)", &[words.nrows(), n_user], &[words.nrows(), words.ncols()]));
    }
    let enumerator = Array1::from_shape_fn(n_user, |i| (1u64 << i) as f64);
    for ((row, col), &value) in words.indexed_iter() {
        if value != 0.0 && value != 1.0 {
            return Err(DetectError::NonBinarySymbol { row, col, value });
        }
    }
    Ok(words.dot(&enumerator).iter().map(|&s| s as usize).collect())
}
