//! Classification losses over logits
//!
//! Both losses take raw logits `[batch, classes]` and integer class targets,
//! and return the batch-mean loss together with its gradient w.r.t. the
//! logits.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{DetectError, DetectResult};
use crate::utils::{log_softmax, softmax};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossType {
    CrossEntropy,
    #[serde(rename = "MSE")]
    Mse,
}

impl LossType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LossType::CrossEntropy => "CrossEntropy",
            LossType::Mse => "MSE",
        }
    }

    /// Mean loss and `d loss / d logits`
    pub fn loss_and_grad(
        &self,
        logits: ArrayView2<f64>,
        targets: &[usize],
    ) -> DetectResult<(f64, Array2<f64>)> {
        let (batch, classes) = logits.dim();
        if targets.len() != batch {
            return Err(DetectError::shape("loss targets", &[batch], &[targets.len()]));
        }
        if let Some(&bad) = targets.iter().find(|&&t| t >= classes) {
            return Err(DetectError::shape("loss target class", &[classes], &[bad + 1]));
        }
        let n = batch.max(1) as f64;

        match self {
            LossType::CrossEntropy => {
                let log_p = log_softmax(logits);
                let loss = -targets
                    .iter()
                    .enumerate()
                    .map(|(r, &t)| log_p[[r, t]])
                    .sum::<f64>()
                    / n;

                let mut grad = log_p.mapv(f64::exp);
                for (r, &t) in targets.iter().enumerate() {
                    grad[[r, t]] -= 1.0;
                }
                grad /= n;
                Ok((loss, grad))
            }
            LossType::Mse => {
                let p = softmax(logits);
                let mut diff = p.clone();
                for (r, &t) in targets.iter().enumerate() {
                    diff[[r, t]] -= 1.0;
                }
                let count = n * classes as f64;
                let loss = diff.mapv(|d| d * d).sum() / count;

                // back through softmax: dz_j = p_j * (g_j - Σ_k g_k p_k)
                let g = diff * (2.0 / count);
                let dot = (&g * &p).sum_axis(Axis(1)).insert_axis(Axis(1));
                let grad = &p * &(&g - &dot);
                Ok((loss, grad))
            }
        }
    }
}

impl fmt::Display for LossType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LossType {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CrossEntropy" => Ok(LossType::CrossEntropy),
            "MSE" => Ok(LossType::Mse),
            other => Err(DetectError::Config(format!("unknown loss type '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn numeric_grad(loss: LossType, logits: &Array2<f64>, targets: &[usize]) -> Array2<f64> {
        let h = 1e-6;
        Array2::from_shape_fn(logits.dim(), |idx| {
            let mut plus = logits.clone();
            let mut minus = logits.clone();
            plus[idx] += h;
            minus[idx] -= h;
            let (lp, _) = loss.loss_and_grad(plus.view(), targets).unwrap();
            let (lm, _) = loss.loss_and_grad(minus.view(), targets).unwrap();
            (lp - lm) / (2.0 * h)
        })
    }

    #[test]
    fn test_cross_entropy_uniform_logits() {
        let logits = Array2::zeros((2, 4));
        let (loss, _) = LossType::CrossEntropy.loss_and_grad(logits.view(), &[0, 3]).unwrap();
        assert!((loss - 4.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        let logits = array![[0.2, -1.0, 0.7], [1.5, 0.1, -0.3]];
        let targets = [2, 0];
        for loss in [LossType::CrossEntropy, LossType::Mse] {
            let (_, grad) = loss.loss_and_grad(logits.view(), &targets).unwrap();
            let numeric = numeric_grad(loss, &logits, &targets);
            for (a, b) in grad.iter().zip(numeric.iter()) {
                assert!((a - b).abs() < 1e-6, "{}: {} vs {}", loss, a, b);
            }
        }
    }

    #[test]
    fn test_nan_logits_give_nan_loss() {
        let logits = array![[f64::NAN, 0.0]];
        let (loss, _) = LossType::CrossEntropy.loss_and_grad(logits.view(), &[0]).unwrap();
        assert!(loss.is_nan());
    }

    #[test]
    fn test_bad_targets() {
        let logits = Array2::zeros((2, 2));
        assert!(LossType::Mse.loss_and_grad(logits.view(), &[0]).is_err());
        assert!(LossType::Mse.loss_and_grad(logits.view(), &[0, 2]).is_err());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("MSE".parse::<LossType>().unwrap(), LossType::Mse);
        assert_eq!("CrossEntropy".parse::<LossType>().unwrap(), LossType::CrossEntropy);
        assert!("Hinge".parse::<LossType>().is_err());
    }
}
