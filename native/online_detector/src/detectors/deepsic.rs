//! DeepSIC: iterative soft interference cancellation for MIMO
//!
//! One small classifier per user per iteration. The classifier for user `k`
//! sees the received antenna row together with the other users' current
//! soft estimates `p(bit = 1)`, and outputs logits over `{0, 1}`. Iteration
//! `i` consumes the soft estimates produced by iteration `i - 1`; the first
//! iteration starts from the uniform prior 0.5.

use ndarray::{s, Array1, Array2, ArrayView2};
use rand::Rng;
use tracing::debug;

use crate::augment::PilotPool;
use crate::error::{DetectError, DetectResult};
use crate::nn::{Activation, LossType, Mlp, OptimizerType, TrainingModel};
use crate::traits::{Detector, TrainSettings, TrainingSummary};
use crate::utils::softmax;

const HIDDEN_SIZE: usize = 60;
const CLASSES: usize = 2;
const PRIOR: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct DeepSicDetector {
    n_user: usize,
    n_ant: usize,
    /// `nets[iteration][user]`
    nets: Vec<Vec<Mlp>>,
    soft_output: Option<Array2<f64>>,
}

impl DeepSicDetector {
    pub fn new<R: Rng + ?Sized>(
        n_user: usize,
        n_ant: usize,
        iterations: usize,
        optimizer: OptimizerType,
        rng: &mut R,
    ) -> Self {
        let input = n_ant + n_user - 1;
        let nets = (0..iterations)
            .map(|_| {
                (0..n_user)
                    .map(|_| {
                        Mlp::new(
                            &[input, HIDDEN_SIZE, HIDDEN_SIZE / 2, CLASSES],
                            &[Activation::Sigmoid, Activation::Relu, Activation::Identity],
                            optimizer,
                            rng,
                        )
                    })
                    .collect()
            })
            .collect();

        Self {
            n_user,
            n_ant,
            nets,
            soft_output: None,
        }
    }

    pub fn iterations(&self) -> usize {
        self.nets.len()
    }

    /// `p(bit = 1)` per symbol and user from the last `forward`
    pub fn soft_output(&self) -> Option<&Array2<f64>> {
        self.soft_output.as_ref()
    }

    pub fn parameters_flat(&self) -> Vec<f64> {
        self.nets
            .iter()
            .flatten()
            .flat_map(|net| net.parameters_flat())
            .collect()
    }

    fn check_rx(&self, rx: &Array2<f64>) -> DetectResult<()> {
        if rx.ncols() != self.n_ant {
            return Err(DetectError::shape(
                "mimo received word",
                &[rx.nrows(), self.n_ant],
                &[rx.nrows(), rx.ncols()],
            ));
        }
        Ok(())
    }

    /// Received row plus every other user's soft estimate
    fn user_input(&self, rx: ArrayView2<f64>, probs: &Array2<f64>, user: usize) -> Array2<f64> {
        let rows = rx.nrows();
        let mut input = Array2::zeros((rows, self.n_ant + self.n_user - 1));
        input.slice_mut(s![.., ..self.n_ant]).assign(&rx);
        let mut col = self.n_ant;
        for other in (0..self.n_user).filter(|&u| u != user) {
            input.column_mut(col).assign(&probs.column(other));
            col += 1;
        }
        input
    }

    /// Soft estimates after running iteration `iteration` on `probs`
    fn iterate(&self, iteration: usize, rx: ArrayView2<f64>, probs: &Array2<f64>) -> Array2<f64> {
        let mut next = Array2::zeros(probs.raw_dim());
        for user in 0..self.n_user {
            let input = self.user_input(rx, probs, user);
            let p = softmax(self.nets[iteration][user].predict(&input).view());
            next.column_mut(user).assign(&p.column(1));
        }
        next
    }

    fn user_targets(pilots: &PilotPool, user: usize) -> Vec<usize> {
        pilots.tx().column(user).iter().map(|&b| b as usize).collect()
    }
}

impl Detector for DeepSicDetector {
    fn name(&self) -> &str {
        "DeepSIC"
    }

    fn init_priors(&mut self) {
        self.soft_output = None;
    }

    fn online_training(&mut self, pilots: &PilotPool, settings: &TrainSettings) -> DetectResult<TrainingSummary> {
        self.check_rx(pilots.rx())?;
        if pilots.tx().ncols() != self.n_user {
            return Err(DetectError::shape(
                "mimo pilot bits",
                &[pilots.len(), self.n_user],
                &[pilots.len(), pilots.tx().ncols()],
            ));
        }

        let rx = pilots.rx().view();
        let mut probs = Array2::from_elem((pilots.len(), self.n_user), PRIOR);
        let mut summary = TrainingSummary::default();

        for iteration in 0..self.iterations() {
            for user in 0..self.n_user {
                let input = self.user_input(rx, &probs, user);
                let targets = Self::user_targets(pilots, user);
                let net = &mut self.nets[iteration][user];
                let mut user_summary = TrainingSummary::default();
                for _ in 0..settings.epochs {
                    user_summary.record(net.train_step(&input, &targets, settings.loss, settings.lr)?);
                }
                debug!(
                    iteration,
                    user,
                    loss = ?user_summary.last_loss,
                    "deepsic user trained"
                );
                summary.merge(user_summary);
            }
            probs = self.iterate(iteration, rx, &probs);
        }

        Ok(summary)
    }

    fn forward(&mut self, rx: &Array2<f64>) -> DetectResult<Array2<u8>> {
        self.check_rx(rx)?;
        let mut probs = Array2::from_elem((rx.nrows(), self.n_user), PRIOR);
        for iteration in 0..self.iterations() {
            probs = self.iterate(iteration, rx.view(), &probs);
        }
        let bits = probs.mapv(|p| u8::from(p > 0.5));
        self.soft_output = Some(probs);
        Ok(bits)
    }

    /// Mean loss over every iteration/user classifier, with soft estimates
    /// propagated the same way as in training
    fn calc_loss(&self, pilots: &PilotPool, loss: LossType) -> DetectResult<f64> {
        self.check_rx(pilots.rx())?;
        let rx = pilots.rx().view();
        let mut probs = Array2::from_elem((pilots.len(), self.n_user), PRIOR);
        let mut losses = Array1::<f64>::zeros(self.iterations() * self.n_user);

        for iteration in 0..self.iterations() {
            for user in 0..self.n_user {
                let input = self.user_input(rx, &probs, user);
                let logits = self.nets[iteration][user].predict(&input);
                let targets = Self::user_targets(pilots, user);
                losses[iteration * self.n_user + user] = loss.loss_and_grad(logits.view(), &targets)?.0;
            }
            probs = self.iterate(iteration, rx, &probs);
        }
        Ok(losses.mean().unwrap_or(0.0))
    }
}
