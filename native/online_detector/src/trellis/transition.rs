//! Trellis transition table
//!
//! For a binary-input trellis with `n` states, row `i` lists the states of
//! the previous stage that lead into state `i`: column `b` is the predecessor
//! reached through input bit `b`. The table is the row-major `[n, 2]` reshape
//! of `[0, 1, .., n-1, 0, 1, .., n-1]`, i.e. `table[i][b] = (2i + b) mod n`.
//!
//! With states labelled `s_t = Σ_i x[t+i] · 2^i`, the predecessor relation is
//! `s_t = (2 s_{t+1} + x[t]) mod n`, so column `b` is exactly the stage-`t`
//! state whose current bit is `b`.

use ndarray::Array2;

/// Immutable `[n_states, 2]` predecessor lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    n_states: usize,
    table: Array2<usize>,
}

impl TransitionTable {
    /// Build the table for `n_states` states (must be at least 1)
    pub fn new(n_states: usize) -> Self {
        assert!(n_states >= 1, "trellis needs at least one state");
        let table = Array2::from_shape_fn((n_states, 2), |(i, b)| (2 * i + b) % n_states);
        Self { n_states, table }
    }

    #[inline]
    pub fn n_states(&self) -> usize {
        self.n_states
    }

    /// Previous-stage state feeding `state` through input bit `bit`
    #[inline]
    pub fn predecessor(&self, state: usize, bit: usize) -> usize {
        self.table[[state, bit]]
    }

    pub fn as_array(&self) -> &Array2<usize> {
        &self.table
    }
}
