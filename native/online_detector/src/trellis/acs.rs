//! Add-compare-select trellis step and the Viterbi recursion built on it
//!
//! Metrics are costs: smaller is better, and `select` takes the minimum over
//! the two branches entering each state.

use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis};
use tracing::trace;

use super::transition::TransitionTable;
use crate::error::{DetectError, DetectResult};

/// One ACS step
///
/// `in_prob` is `[batch, n_states]`, `llrs` is `[batch, 1]` or
/// `[batch, n_states]` and broadcasts onto it. Returns `[batch, n_states]`
/// where entry `(b, i)` is the minimum accumulated cost over the two
/// predecessors of state `i`.
pub fn acs_step(
    in_prob: ArrayView2<f64>,
    llrs: ArrayView2<f64>,
    table: &TransitionTable,
) -> DetectResult<Array2<f64>> {
    let (batch, n_states) = in_prob.dim();
    if n_states != table.n_states() {
        return Err(DetectError::shape("acs metric", &[batch, table.n_states()], &[batch, n_states]));
    }
    let llrs = llrs
        .broadcast(in_prob.raw_dim())
        .ok_or_else(|| DetectError::shape("acs branch costs", &[batch, n_states], llrs.shape()))?;

    // add
    let trellis = &in_prob + &llrs;

    // gather through flattened (batch, predecessor) indices
    let flat_table: Vec<usize> = table.as_array().iter().copied().collect();
    let per_batch = flat_table.len();
    let transition_ind = flat_table.iter().cycle().take(batch * per_batch);
    let batches_ind = (0..batch).flat_map(|b| std::iter::repeat(b).take(per_batch));
    let gathered: Vec<f64> = batches_ind
        .zip(transition_ind)
        .map(|(b, &p)| trellis[[b, p]])
        .collect();

    let branches = Array3::from_shape_vec((batch, n_states, 2), gathered)
        .map_err(|_| DetectError::shape("acs gather", &[batch, n_states, 2], &[batch * per_batch]))?;

    // compare / select
    Ok(branches.fold_axis(Axis(2), f64::INFINITY, |&acc, &x| acc.min(x)))
}

/// Index of the smallest entry; the first one wins on ties
pub fn argmin(values: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v < values[best] {
            best = i;
        }
    }
    best
}

/// Hard-decision Viterbi decoder over a binary trellis
///
/// At every step the decision is the current bit (least significant bit) of
/// the state with the lowest `metric + cost_t`. The metric is then advanced
/// with [`acs_step`] and renormalised so its minimum is zero.
#[derive(Debug, Clone)]
pub struct ViterbiDecoder {
    table: TransitionTable,
}

impl ViterbiDecoder {
    pub fn new(n_states: usize) -> Self {
        Self {
            table: TransitionTable::new(n_states),
        }
    }

    pub fn n_states(&self) -> usize {
        self.table.n_states()
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// Decode `[T, n_states]` per-step state costs into `T` bits
    pub fn decode(&self, costs: ArrayView2<f64>) -> DetectResult<Array1<u8>> {
        let n = self.n_states();
        if costs.ncols() != n {
            return Err(DetectError::shape("state costs", &[costs.nrows(), n], &[costs.nrows(), costs.ncols()]));
        }

        let mut metric = Array2::<f64>::zeros((1, n));
        let mut bits = Array1::<u8>::zeros(costs.nrows());

        for (t, cost) in costs.rows().into_iter().enumerate() {
            let total = &metric.row(0) + &cost;
            let state = argmin(total.view());
            bits[t] = (state & 1) as u8;

            let step = cost.insert_axis(Axis(0));
            metric = acs_step(metric.view(), step, &self.table)?;
            let floor = metric.fold(f64::INFINITY, |acc, &x| acc.min(x));
            if floor.is_finite() {
                metric.mapv_inplace(|x| x - floor);
            }
        }
        trace!(steps = costs.nrows(), n_states = n, "viterbi decode");

        Ok(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_acs_single_state() {
        let table = TransitionTable::new(1);
        let in_prob = array![[1.5], [-2.0]];
        let llrs = array![[0.5], [3.0]];
        let out = acs_step(in_prob.view(), llrs.view(), &table).unwrap();
        assert_eq!(out, array![[2.0], [1.0]]);
    }

    #[test]
    fn test_acs_two_states_hand_computed() {
        let table = TransitionTable::new(2); // [[0,1],[0,1]]
        let in_prob = array![[1.0, 4.0]];
        let llrs = array![[0.5, 0.25]];
        let out = acs_step(in_prob.view(), llrs.view(), &table).unwrap();

        // trellis = [1.5, 4.25], both states pick min(1.5, 4.25)
        assert!((out[[0, 0]] - 1.5).abs() < 1e-12);
        assert!((out[[0, 1]] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_acs_four_states_broadcast_column() {
        let table = TransitionTable::new(4); // [[0,1],[2,3],[0,1],[2,3]]
        let in_prob = array![[3.0, 1.0, 2.0, 0.5], [0.0, 0.0, 0.0, 0.0]];
        let llrs = array![[1.0], [2.0]];
        let out = acs_step(in_prob.view(), llrs.view(), &table).unwrap();

        assert_eq!(out.dim(), (2, 4));
        assert_eq!(out.row(0).to_vec(), vec![2.0, 1.5, 2.0, 1.5]);
        assert_eq!(out.row(1).to_vec(), vec![2.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_acs_output_shape_matches_input() {
        for k in 0..5 {
            let n = 1 << k;
            let table = TransitionTable::new(n);
            let in_prob = Array2::from_shape_fn((3, n), |(b, i)| (b * n + i) as f64);
            let llrs = Array2::from_elem((3, n), 0.1);
            let out = acs_step(in_prob.view(), llrs.view(), &table).unwrap();
            assert_eq!(out.dim(), in_prob.dim());
        }
    }

    #[test]
    fn test_acs_rejects_bad_shapes() {
        let table = TransitionTable::new(4);
        let in_prob = Array2::zeros((2, 4));
        let llrs = Array2::zeros((2, 3));
        assert!(matches!(
            acs_step(in_prob.view(), llrs.view(), &table),
            Err(DetectError::ShapeMismatch { .. })
        ));

        let wrong_states = Array2::zeros((2, 8));
        let llrs = Array2::zeros((2, 1));
        assert!(acs_step(wrong_states.view(), llrs.view(), &table).is_err());
    }

    #[test]
    fn test_argmin_first_on_ties() {
        assert_eq!(argmin(array![3.0, 1.0, 1.0, 2.0].view()), 1);
        assert_eq!(argmin(array![0.0].view()), 0);
    }

    #[test]
    fn test_decoder_follows_cheapest_states() {
        let decoder = ViterbiDecoder::new(4);
        // Each step makes exactly one state of a valid state path free
        let path = [2usize, 1, 0, 2, 1, 2];
        let costs = Array2::from_shape_fn((path.len(), 4), |(t, s)| if s == path[t] { 0.0 } else { 5.0 });
        let bits = decoder.decode(costs.view()).unwrap();

        let expected: Vec<u8> = path.iter().map(|&s| (s & 1) as u8).collect();
        assert_eq!(bits.to_vec(), expected);
    }

    #[test]
    fn test_decoder_metric_stays_bounded() {
        let decoder = ViterbiDecoder::new(2);
        let costs = Array2::from_elem((10_000, 2), 1e6);
        let bits = decoder.decode(costs.view()).unwrap();
        assert_eq!(bits.len(), 10_000);
    }
}
