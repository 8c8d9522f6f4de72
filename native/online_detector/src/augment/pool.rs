//! Labelled pilot rows
//!
//! A pool holds `(received_row, transmitted_row, state)` triples. SISO
//! transmitted rows are memory windows of the pilot bits, so row `t` carries
//! `[x[t], .., x[t+m-1]]` and the scalar sample `y[t]`. MIMO rows are the
//! users' simultaneous bits next to the antenna samples.

use channel_dataset::{ChannelParams, ChannelType};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{DetectError, DetectResult};
use crate::trellis::{mimo_states, segment_column, siso_states};

#[derive(Debug, Clone, PartialEq)]
pub struct PilotPool {
    rx: Array2<f64>,
    tx: Array2<u8>,
    states: Vec<usize>,
    n_states: usize,
}

impl PilotPool {
    pub fn new(rx: Array2<f64>, tx: Array2<u8>, states: Vec<usize>, n_states: usize) -> DetectResult<Self> {
        if rx.nrows() != tx.nrows() || states.len() != tx.nrows() {
            return Err(DetectError::shape(
                "pilot pool rows",
                &[tx.nrows(), tx.nrows(), tx.nrows()],
                &[rx.nrows(), tx.nrows(), states.len()],
            ));
        }
        if let Some(&bad) = states.iter().find(|&&s| s >= n_states) {
            return Err(DetectError::shape("pilot state", &[n_states], &[bad + 1]));
        }
        Ok(Self { rx, tx, states, n_states })
    }

    /// Label the pilot part of a block
    pub fn from_block(
        params: &ChannelParams,
        tx: ArrayView2<u8>,
        rx: ArrayView2<f64>,
    ) -> DetectResult<Self> {
        match params.channel_type {
            ChannelType::Siso => {
                let windows = segment_column(params.memory_length, tx);
                let states = siso_states(params.memory_length, windows.view())?;
                Self::new(rx.to_owned(), windows, states, params.n_states())
            }
            ChannelType::Mimo => {
                let states = mimo_states(params.n_user, tx.mapv(f64::from).view())?;
                Self::new(rx.to_owned(), tx.to_owned(), states, params.n_states())
            }
        }
    }

    /// Empty pool with the given row widths
    pub fn empty(rx_width: usize, tx_width: usize, n_states: usize) -> Self {
        Self {
            rx: Array2::zeros((0, rx_width)),
            tx: Array2::zeros((0, tx_width)),
            states: Vec::new(),
            n_states,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn rx(&self) -> &Array2<f64> {
        &self.rx
    }

    pub fn tx(&self) -> &Array2<u8> {
        &self.tx
    }

    pub fn states(&self) -> &[usize] {
        &self.states
    }

    pub fn row(&self, index: usize) -> (ArrayView1<f64>, ArrayView1<u8>, usize) {
        (self.rx.row(index), self.tx.row(index), self.states[index])
    }

    /// First `n` rows
    pub fn head(&self, n: usize) -> Self {
        let n = n.min(self.len());
        Self {
            rx: self.rx.slice(s![..n, ..]).to_owned(),
            tx: self.tx.slice(s![..n, ..]).to_owned(),
            states: self.states[..n].to_vec(),
            n_states: self.n_states,
        }
    }

    pub(crate) fn push_row(&mut self, rx: Array1<f64>, tx: Array1<u8>, state: usize) -> DetectResult<()> {
        if rx.len() != self.rx.ncols() || tx.len() != self.tx.ncols() {
            return Err(DetectError::shape(
                "pilot row",
                &[self.rx.ncols(), self.tx.ncols()],
                &[rx.len(), tx.len()],
            ));
        }
        self.rx
            .push(Axis(0), rx.view())
            .map_err(|_| DetectError::shape("pilot row", &[self.rx.ncols()], &[rx.len()]))?;
        self.tx
            .push(Axis(0), tx.view())
            .map_err(|_| DetectError::shape("pilot row", &[self.tx.ncols()], &[tx.len()]))?;
        self.states.push(state);
        Ok(())
    }
}
