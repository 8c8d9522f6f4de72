//! Detector trait - trainable symbol detection
//!
//! A detector maps received samples to hard symbol decisions. Trainable
//! parameters persist across blocks; priors are per-block state and are
//! reset through [`Detector::init_priors`].

use ndarray::Array2;

use crate::augment::PilotPool;
use crate::error::DetectResult;
use crate::nn::{LossType, StepOutcome};

/// Hyperparameters of one online training call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainSettings {
    pub loss: LossType,
    pub lr: f64,
    pub epochs: usize,
}

/// What happened during one online training call
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrainingSummary {
    pub applied_steps: usize,
    /// Steps whose loss was NaN and were not applied
    pub skipped_steps: usize,
    pub last_loss: Option<f64>,
}

impl TrainingSummary {
    pub(crate) fn record(&mut self, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Applied(loss) => {
                self.applied_steps += 1;
                self.last_loss = Some(loss);
            }
            StepOutcome::SkippedNan => self.skipped_steps += 1,
        }
    }

    pub(crate) fn merge(&mut self, other: TrainingSummary) {
        self.applied_steps += other.applied_steps;
        self.skipped_steps += other.skipped_steps;
        if other.last_loss.is_some() {
            self.last_loss = other.last_loss;
        }
    }
}

/// Online-trainable symbol detector
pub trait Detector: Send {
    fn name(&self) -> &str;

    /// Reset per-block priors
    fn init_priors(&mut self);

    /// Channel coefficients of the block about to be detected
    ///
    /// Only model-based detectors use this; learned detectors ignore it.
    fn set_channel(&mut self, _h: &Array2<f64>) {}

    /// Full-batch training on labelled pilots
    fn online_training(&mut self, pilots: &PilotPool, settings: &TrainSettings) -> DetectResult<TrainingSummary>;

    /// Hard decisions for received rows `[L, rx_cols]`, shaped `[L, tx_cols]`
    fn forward(&mut self, rx: &Array2<f64>) -> DetectResult<Array2<u8>>;

    /// Loss of the current model on `pilots`, without updating anything
    fn calc_loss(&self, pilots: &PilotPool, loss: LossType) -> DetectResult<f64>;
}
