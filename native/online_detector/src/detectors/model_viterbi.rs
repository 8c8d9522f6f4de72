//! Model-based Viterbi baseline with pluggable edge metrics

use channel_dataset::respond;
use ndarray::{Array2, ArrayView2, Axis};

use crate::augment::PilotPool;
use crate::error::{DetectError, DetectResult};
use crate::nn::LossType;
use crate::traits::{Detector, EdgeMetric, TrainSettings, TrainingSummary};
use crate::trellis::{state_bits, ViterbiDecoder};

/// Squared distance to the noiseless response of each state
///
/// Needs the true channel coefficients of the block, `[rx_cols, state_bits]`.
#[derive(Debug, Clone)]
pub struct GaussianMetric {
    h: Array2<f64>,
}

impl GaussianMetric {
    pub fn new(h: Array2<f64>) -> Self {
        Self { h }
    }

    /// Noiseless received row of every state, `[n_states, rx_cols]`
    fn templates(&self, n_states: usize) -> DetectResult<Array2<f64>> {
        let width = self.h.ncols();
        if n_states != 1 << width {
            return Err(DetectError::shape("gaussian metric states", &[1 << width], &[n_states]));
        }
        let mut templates = Array2::zeros((n_states, self.h.nrows()));
        for (state, mut row) in templates.axis_iter_mut(Axis(0)).enumerate() {
            row.assign(&respond(&self.h, state_bits(state, width).view()));
        }
        Ok(templates)
    }
}

impl EdgeMetric for GaussianMetric {
    fn costs(&self, rx: ArrayView2<f64>, n_states: usize) -> DetectResult<Array2<f64>> {
        if rx.ncols() != self.h.nrows() {
            return Err(DetectError::shape(
                "gaussian metric input",
                &[rx.nrows(), self.h.nrows()],
                &[rx.nrows(), rx.ncols()],
            ));
        }
        let templates = self.templates(n_states)?;
        Ok(Array2::from_shape_fn((rx.nrows(), n_states), |(t, s)| {
            rx.row(t)
                .iter()
                .zip(templates.row(s).iter())
                .map(|(y, m)| (y - m).powi(2))
                .sum()
        }))
    }

    fn set_channel(&mut self, h: &Array2<f64>) {
        self.h = h.clone();
    }
}

/// 0 when a state's current bit matches the hard-sliced sample, else 1
///
/// Samples are sliced as bit 1 when `y >= 0.5`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitCostMetric;

impl EdgeMetric for UnitCostMetric {
    fn costs(&self, rx: ArrayView2<f64>, n_states: usize) -> DetectResult<Array2<f64>> {
        if rx.ncols() != 1 {
            return Err(DetectError::shape("unit metric input", &[rx.nrows(), 1], &[rx.nrows(), rx.ncols()]));
        }
        Ok(Array2::from_shape_fn((rx.nrows(), n_states), |(t, s)| {
            let bit = usize::from(rx[[t, 0]] >= 0.5);
            if s & 1 == bit {
                0.0
            } else {
                1.0
            }
        }))
    }
}

/// Non-trainable SISO detector: fixed metric plus ACS decoding
#[derive(Debug, Clone)]
pub struct ModelViterbiDetector<M> {
    metric: M,
    decoder: ViterbiDecoder,
}

impl<M: EdgeMetric> ModelViterbiDetector<M> {
    pub fn new(memory_length: usize, metric: M) -> Self {
        Self {
            metric,
            decoder: ViterbiDecoder::new(1 << memory_length),
        }
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }
}

impl<M: EdgeMetric> Detector for ModelViterbiDetector<M> {
    fn name(&self) -> &str {
        "ModelViterbi"
    }

    fn init_priors(&mut self) {}

    fn set_channel(&mut self, h: &Array2<f64>) {
        self.metric.set_channel(h);
    }

    fn online_training(&mut self, _pilots: &PilotPool, _settings: &TrainSettings) -> DetectResult<TrainingSummary> {
        Ok(TrainingSummary::default())
    }

    fn forward(&mut self, rx: &Array2<f64>) -> DetectResult<Array2<u8>> {
        let costs = self.metric.costs(rx.view(), self.decoder.n_states())?;
        let bits = self.decoder.decode(costs.view())?;
        Ok(bits.insert_axis(Axis(1)))
    }

    /// Negative costs act as logits
    fn calc_loss(&self, pilots: &PilotPool, loss: LossType) -> DetectResult<f64> {
        let costs = self.metric.costs(pilots.rx().view(), self.decoder.n_states())?;
        Ok(loss.loss_and_grad((-costs).view(), pilots.states())?.0)
    }
}
