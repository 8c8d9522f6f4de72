//! Online detector - online-trained trellis and DeepSIC symbol detectors
//!
//! This crate evaluates how pilot augmentation affects adaptive detectors
//! over simulated SISO and MIMO channels. Blocks come from
//! `channel_dataset`; each block's pilot prefix trains the detector online
//! and its data suffix is detected and scored.

pub mod augment;
pub mod cache;
pub mod config;
pub mod detectors;
pub mod error;
pub mod metrics;
pub mod nn;
pub mod observe;
pub mod traits;
pub mod trainer;
pub mod trellis;
pub mod trials;
mod utils;

// Re-export core types for convenience
pub use augment::{augment_pilots, AugmentationType, PilotPool, RandomSampler, SamplerType, SmoothedStatisticsSampler};
pub use cache::ResultsCache;
pub use config::{DetectorType, ModulationType, RunConfig};
pub use detectors::{build_detector, DeepSicDetector, GaussianMetric, ModelViterbiDetector, UnitCostMetric, ViterbiNetDetector};
pub use error::{DetectError, DetectResult};
pub use metrics::error_rates;
pub use nn::{LossType, OptimizerType, StepOutcome};
pub use traits::{Detector, EdgeMetric, Sampler, TrainSettings, TrainingSummary};
pub use trainer::{EvaluationReport, Trainer};
pub use trellis::{acs_step, segment, TransitionTable, ViterbiDecoder};
pub use trials::run_trials;
