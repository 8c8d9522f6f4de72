//! Core traits of the detection pipeline
//!
//! Each trait is one seam of the online loop: what detects, what invents
//! extra pilots, and what scores trellis states.

mod detector;
mod edge_metric;
mod sampler;

pub use detector::{Detector, TrainSettings, TrainingSummary};
pub use edge_metric::EdgeMetric;
pub use sampler::Sampler;
