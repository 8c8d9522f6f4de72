//! Gradient-descent optimizers
//!
//! Each trainable tensor owns an [`OptimizerState`] carrying whatever moment
//! estimates its optimizer needs, so layers step their weights and biases
//! independently.

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{DetectError, DetectResult};

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const RMSPROP_ALPHA: f64 = 0.99;
const EPS: f64 = 1e-8;

/// Optimizer selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerType {
    Adam,
    #[serde(rename = "RMSprop")]
    RmsProp,
    #[serde(rename = "SGD")]
    Sgd,
}

impl OptimizerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizerType::Adam => "Adam",
            OptimizerType::RmsProp => "RMSprop",
            OptimizerType::Sgd => "SGD",
        }
    }
}

impl fmt::Display for OptimizerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizerType {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Adam" => Ok(OptimizerType::Adam),
            "RMSprop" => Ok(OptimizerType::RmsProp),
            "SGD" => Ok(OptimizerType::Sgd),
            other => Err(DetectError::Config(format!("unknown optimizer type '{}'", other))),
        }
    }
}

/// Per-tensor optimizer state
#[derive(Debug, Clone)]
pub struct OptimizerState {
    kind: OptimizerType,
    step: usize,
    m: Array2<f64>,
    v: Array2<f64>,
}

impl OptimizerState {
    pub fn new(kind: OptimizerType, shape: (usize, usize)) -> Self {
        Self {
            kind,
            step: 0,
            m: Array2::zeros(shape),
            v: Array2::zeros(shape),
        }
    }

    pub fn kind(&self) -> OptimizerType {
        self.kind
    }

    /// Apply one update to `params` in place
    pub fn step(&mut self, params: &mut Array2<f64>, grads: &Array2<f64>, lr: f64) -> DetectResult<()> {
        if params.raw_dim() != grads.raw_dim() {
            return Err(DetectError::shape("optimizer gradient", params.shape(), grads.shape()));
        }
        self.step += 1;

        match self.kind {
            OptimizerType::Sgd => {
                params.scaled_add(-lr, grads);
            }
            OptimizerType::RmsProp => {
                // v = a*v + (1-a)*g^2
                self.v = &self.v * RMSPROP_ALPHA + &grads.mapv(|g| g * g) * (1.0 - RMSPROP_ALPHA);
                let update = grads / &self.v.mapv(|x| x.sqrt() + EPS);
                params.scaled_add(-lr, &update);
            }
            OptimizerType::Adam => {
                self.m = &self.m * ADAM_BETA1 + grads * (1.0 - ADAM_BETA1);
                self.v = &self.v * ADAM_BETA2 + &grads.mapv(|g| g * g) * (1.0 - ADAM_BETA2);

                let t = self.step as f64;
                let m_hat = self.m.mapv(|x| x / (1.0 - ADAM_BETA1.powf(t)));
                let v_hat = self.v.mapv(|x| x / (1.0 - ADAM_BETA2.powf(t)));
                let update = m_hat / v_hat.mapv(|x| x.sqrt() + EPS);
                params.scaled_add(-lr, &update);
            }
        }
        Ok(())
    }
}
