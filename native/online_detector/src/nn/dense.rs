//! Dense layers and multilayer perceptrons with manual backprop

use ndarray::{Array2, Axis};
use rand::Rng;

use super::loss::LossType;
use super::optimizer::{OptimizerState, OptimizerType};
use crate::error::DetectResult;
use crate::utils::{relu, sigmoid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Identity,
    Sigmoid,
    Relu,
}

impl Activation {
    fn apply(&self, x: f64) -> f64 {
        match self {
            Activation::Identity => x,
            Activation::Sigmoid => sigmoid(x),
            Activation::Relu => relu(x),
        }
    }

    /// Derivative expressed through the activation's output
    fn derivative(&self, out: f64) -> f64 {
        match self {
            Activation::Identity => 1.0,
            Activation::Sigmoid => out * (1.0 - out),
            Activation::Relu => {
                if out > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Result of one training step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    Applied(f64),
    /// Loss was NaN, parameters left untouched
    SkippedNan,
}

impl StepOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, StepOutcome::SkippedNan)
    }
}

/// Something that can take a full-batch gradient step on labelled data
pub trait TrainingModel {
    fn train_step(
        &mut self,
        input: &Array2<f64>,
        targets: &[usize],
        loss: LossType,
        lr: f64,
    ) -> DetectResult<StepOutcome>;
}

/// Fully connected layer `y = act(x W + b)`
#[derive(Debug, Clone)]
pub struct Dense {
    w: Array2<f64>,
    b: Array2<f64>,
    activation: Activation,

    cached_input: Option<Array2<f64>>,
    cached_output: Option<Array2<f64>>,

    opt_w: OptimizerState,
    opt_b: OptimizerState,
}

impl Dense {
    /// Uniform `±1/sqrt(fan_in)` initialisation
    pub fn new<R: Rng + ?Sized>(
        fan_in: usize,
        fan_out: usize,
        activation: Activation,
        optimizer: OptimizerType,
        rng: &mut R,
    ) -> Self {
        let bound = 1.0 / (fan_in.max(1) as f64).sqrt();
        Self {
            w: Array2::from_shape_simple_fn((fan_in, fan_out), || rng.gen_range(-bound..=bound)),
            b: Array2::from_shape_simple_fn((1, fan_out), || rng.gen_range(-bound..=bound)),
            activation,
            cached_input: None,
            cached_output: None,
            opt_w: OptimizerState::new(optimizer, (fan_in, fan_out)),
            opt_b: OptimizerState::new(optimizer, (1, fan_out)),
        }
    }

    pub fn fan_in(&self) -> usize {
        self.w.nrows()
    }

    pub fn fan_out(&self) -> usize {
        self.w.ncols()
    }

    /// Inference without caching
    pub fn predict(&self, input: &Array2<f64>) -> Array2<f64> {
        let act = self.activation;
        (input.dot(&self.w) + &self.b).mapv(|x| act.apply(x))
    }

    pub fn forward(&mut self, input: &Array2<f64>) -> Array2<f64> {
        let out = self.predict(input);
        self.cached_input = Some(input.clone());
        self.cached_output = Some(out.clone());
        out
    }

    /// Gradients of the last `forward`: `(d input, d W, d b)`
    fn gradients(&self, grads: &Array2<f64>) -> Option<(Array2<f64>, Array2<f64>, Array2<f64>)> {
        let input = self.cached_input.as_ref()?;
        let output = self.cached_output.as_ref()?;
        let act = self.activation;

        let grad_pre = grads * &output.mapv(|y| act.derivative(y));
        let grad_w = input.t().dot(&grad_pre);
        let grad_b = grad_pre.sum_axis(Axis(0)).insert_axis(Axis(0));
        let grad_input = grad_pre.dot(&self.w.t());
        Some((grad_input, grad_w, grad_b))
    }

    fn apply(&mut self, grad_w: &Array2<f64>, grad_b: &Array2<f64>, lr: f64) -> DetectResult<()> {
        self.opt_w.step(&mut self.w, grad_w, lr)?;
        self.opt_b.step(&mut self.b, grad_b, lr)
    }

    fn parameter_count(&self) -> usize {
        self.w.len() + self.b.len()
    }
}

/// Stack of dense layers
#[derive(Debug, Clone)]
pub struct Mlp {
    layers: Vec<Dense>,
}

impl Mlp {
    /// Build from layer widths; `activations[i]` follows layer `i`
    pub fn new<R: Rng + ?Sized>(
        widths: &[usize],
        activations: &[Activation],
        optimizer: OptimizerType,
        rng: &mut R,
    ) -> Self {
        assert!(widths.len() >= 2, "mlp needs input and output widths");
        assert_eq!(activations.len(), widths.len() - 1, "one activation per layer");

        let layers = widths
            .windows(2)
            .zip(activations)
            .map(|(w, &act)| Dense::new(w[0], w[1], act, optimizer, rng))
            .collect();
        Self { layers }
    }

    pub fn input_width(&self) -> usize {
        self.layers.first().map_or(0, Dense::fan_in)
    }

    pub fn output_width(&self) -> usize {
        self.layers.last().map_or(0, Dense::fan_out)
    }

    pub fn predict(&self, input: &Array2<f64>) -> Array2<f64> {
        self.layers
            .iter()
            .fold(input.clone(), |x, layer| layer.predict(&x))
    }

    fn forward(&mut self, input: &Array2<f64>) -> Array2<f64> {
        let mut x = input.clone();
        for layer in self.layers.iter_mut() {
            x = layer.forward(&x);
        }
        x
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(Dense::parameter_count).sum()
    }

    /// All weights and biases, layer by layer
    pub fn parameters_flat(&self) -> Vec<f64> {
        let mut v = Vec::with_capacity(self.parameter_count());
        for layer in &self.layers {
            v.extend(layer.w.iter().copied());
            v.extend(layer.b.iter().copied());
        }
        v
    }
}

impl TrainingModel for Mlp {
    fn train_step(
        &mut self,
        input: &Array2<f64>,
        targets: &[usize],
        loss: LossType,
        lr: f64,
    ) -> DetectResult<StepOutcome> {
        let logits = self.forward(input);
        let (value, grad_logits) = loss.loss_and_grad(logits.view(), targets)?;
        if value.is_nan() {
            return Ok(StepOutcome::SkippedNan);
        }

        // All gradients first, then every update
        let mut updates = Vec::with_capacity(self.layers.len());
        let mut grad = grad_logits;
        for layer in self.layers.iter().rev() {
            if let Some((grad_input, grad_w, grad_b)) = layer.gradients(&grad) {
                updates.push((grad_w, grad_b));
                grad = grad_input;
            }
        }
        for (layer, (grad_w, grad_b)) in self.layers.iter_mut().rev().zip(&updates) {
            layer.apply(grad_w, grad_b, lr)?;
        }

        Ok(StepOutcome::Applied(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn small_net(optimizer: OptimizerType) -> Mlp {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        Mlp::new(&[1, 8, 2], &[Activation::Sigmoid, Activation::Identity], optimizer, &mut rng)
    }

    #[test]
    fn test_shapes() {
        let net = small_net(OptimizerType::Adam);
        assert_eq!(net.input_width(), 1);
        assert_eq!(net.output_width(), 2);
        assert_eq!(net.parameter_count(), 8 + 8 + 16 + 2);
        assert_eq!(net.predict(&Array2::zeros((5, 1))).dim(), (5, 2));
    }

    #[test]
    fn test_same_seed_same_weights() {
        assert_eq!(
            small_net(OptimizerType::Sgd).parameters_flat(),
            small_net(OptimizerType::Sgd).parameters_flat()
        );
    }

    #[test]
    fn test_learns_sign_classifier() {
        let mut net = small_net(OptimizerType::Adam);
        let input = array![[1.0], [-1.0], [0.8], [-0.9], [1.2], [-1.1]];
        let targets = [0, 1, 0, 1, 0, 1];

        let first = match net.train_step(&input, &targets, LossType::CrossEntropy, 0.05).unwrap() {
            StepOutcome::Applied(l) => l,
            StepOutcome::SkippedNan => panic!("unexpected NaN"),
        };
        let mut last = first;
        for _ in 0..300 {
            if let StepOutcome::Applied(l) = net.train_step(&input, &targets, LossType::CrossEntropy, 0.05).unwrap() {
                last = l;
            }
        }
        assert!(last < first);
        assert!(last < 0.2);

        let out = net.predict(&array![[1.0], [-1.0]]);
        assert!(out[[0, 0]] > out[[0, 1]]);
        assert!(out[[1, 1]] > out[[1, 0]]);
    }

    #[test]
    fn test_nan_step_leaves_parameters() {
        let mut net = small_net(OptimizerType::Adam);
        let before = net.parameters_flat();

        let input = array![[f64::NAN], [1.0]];
        let outcome = net.train_step(&input, &[0, 1], LossType::CrossEntropy, 0.1).unwrap();

        assert!(outcome.is_skipped());
        assert_eq!(net.parameters_flat(), before);
    }

    #[test]
    fn test_small_sgd_step_reduces_loss() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut net = Mlp::new(&[2, 3, 2], &[Activation::Relu, Activation::Identity], OptimizerType::Sgd, &mut rng);
        let input = array![[0.3, -0.7], [1.1, 0.4]];
        let targets = [1, 0];

        let loss_at = |net: &Mlp| {
            let logits = net.predict(&input);
            LossType::CrossEntropy.loss_and_grad(logits.view(), &targets).unwrap().0
        };

        let before = loss_at(&net);
        net.train_step(&input, &targets, LossType::CrossEntropy, 1e-3).unwrap();
        let after = loss_at(&net);
        assert!(after < before);
    }
}
