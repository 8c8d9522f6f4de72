//! Concrete detectors and the config-driven factory

mod deepsic;
mod model_viterbi;
mod viterbinet;

pub use deepsic::DeepSicDetector;
pub use model_viterbi::{GaussianMetric, ModelViterbiDetector, UnitCostMetric};
pub use viterbinet::ViterbiNetDetector;

use rand_chacha::ChaCha8Rng;

use crate::config::{DetectorType, RunConfig};
use crate::error::DetectResult;
use crate::traits::Detector;

/// Detector named by `config`, parameters drawn from `rng`
pub fn build_detector(config: &RunConfig, rng: &mut ChaCha8Rng) -> DetectResult<Box<dyn Detector>> {
    config.validate()?;
    let detector: Box<dyn Detector> = match config.detector_type {
        DetectorType::ViterbiNet => Box::new(ViterbiNetDetector::new(
            config.memory_length,
            config.optimizer_type,
            rng,
        )),
        DetectorType::DeepSic => Box::new(DeepSicDetector::new(
            config.n_user,
            config.n_ant,
            config.deepsic_iterations,
            config.optimizer_type,
            rng,
        )),
        DetectorType::ModelViterbi => {
            let metric = GaussianMetric::new(config.channel_params().base_coefficients());
            Box::new(ModelViterbiDetector::new(config.memory_length, metric))
        }
    };
    Ok(detector)
}
