//! Minimal neural-network layer: dense MLPs, losses and optimizers

pub mod dense;
pub mod loss;
pub mod optimizer;

pub use dense::{Activation, Dense, Mlp, StepOutcome, TrainingModel};
pub use loss::LossType;
pub use optimizer::{OptimizerState, OptimizerType};
