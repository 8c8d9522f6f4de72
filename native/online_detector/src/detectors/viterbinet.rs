//! ViterbiNet: learned state likelihoods with ACS decoding
//!
//! A small MLP maps each received sample to per-state logits. Costs are the
//! negative log-softmax of those logits and the word is decoded with the
//! hard-decision Viterbi recursion.

use ndarray::Array2;
use rand::Rng;
use tracing::debug;

use crate::augment::PilotPool;
use crate::error::{DetectError, DetectResult};
use crate::nn::{Activation, LossType, Mlp, OptimizerType, TrainingModel};
use crate::traits::{Detector, TrainSettings, TrainingSummary};
use crate::trellis::ViterbiDecoder;
use crate::utils::log_softmax;

const HIDDEN1: usize = 100;
const HIDDEN2: usize = 50;

#[derive(Debug, Clone)]
pub struct ViterbiNetDetector {
    memory_length: usize,
    net: Mlp,
    decoder: ViterbiDecoder,
}

impl ViterbiNetDetector {
    pub fn new<R: Rng + ?Sized>(memory_length: usize, optimizer: OptimizerType, rng: &mut R) -> Self {
        let n_states = 1 << memory_length;
        let net = Mlp::new(
            &[1, HIDDEN1, HIDDEN2, n_states],
            &[Activation::Sigmoid, Activation::Relu, Activation::Identity],
            optimizer,
            rng,
        );
        Self {
            memory_length,
            net,
            decoder: ViterbiDecoder::new(n_states),
        }
    }

    pub fn memory_length(&self) -> usize {
        self.memory_length
    }

    pub fn n_states(&self) -> usize {
        self.decoder.n_states()
    }

    pub fn parameters_flat(&self) -> Vec<f64> {
        self.net.parameters_flat()
    }

    /// Per-state costs `[L, n_states]` of received samples `[L, 1]`
    pub fn state_costs(&self, rx: &Array2<f64>) -> DetectResult<Array2<f64>> {
        check_single_column(rx)?;
        Ok(-log_softmax(self.net.predict(rx).view()))
    }
}

fn check_single_column(rx: &Array2<f64>) -> DetectResult<()> {
    if rx.ncols() != 1 {
        return Err(DetectError::shape("siso received word", &[rx.nrows(), 1], &[rx.nrows(), rx.ncols()]));
    }
    Ok(())
}

impl Detector for ViterbiNetDetector {
    fn name(&self) -> &str {
        "ViterbiNet"
    }

    /// Decoding starts from a uniform metric every call; nothing to reset
    fn init_priors(&mut self) {}

    fn online_training(&mut self, pilots: &PilotPool, settings: &TrainSettings) -> DetectResult<TrainingSummary> {
        check_single_column(pilots.rx())?;
        let mut summary = TrainingSummary::default();
        for _ in 0..settings.epochs {
            let outcome = self
                .net
                .train_step(pilots.rx(), pilots.states(), settings.loss, settings.lr)?;
            summary.record(outcome);
        }
        debug!(
            detector = self.name(),
            pilots = pilots.len(),
            steps = summary.applied_steps,
            loss = ?summary.last_loss,
            "online training done"
        );
        Ok(summary)
    }

    fn forward(&mut self, rx: &Array2<f64>) -> DetectResult<Array2<u8>> {
        let costs = self.state_costs(rx)?;
        let bits = self.decoder.decode(costs.view())?;
        Ok(bits.insert_axis(ndarray::Axis(1)))
    }

    fn calc_loss(&self, pilots: &PilotPool, loss: LossType) -> DetectResult<f64> {
        check_single_column(pilots.rx())?;
        let logits = self.net.predict(pilots.rx());
        Ok(loss.loss_and_grad(logits.view(), pilots.states())?.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use channel_dataset::{transmit, ChannelParams};
    use ndarray::{s, Array2};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn settings(epochs: usize) -> TrainSettings {
        TrainSettings {
            loss: LossType::CrossEntropy,
            lr: 0.01,
            epochs,
        }
    }

    #[test]
    fn test_forward_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut det = ViterbiNetDetector::new(3, OptimizerType::Adam, &mut rng);
        let out = det.forward(&Array2::zeros((25, 1))).unwrap();
        assert_eq!(out.dim(), (25, 1));
        assert!(out.iter().all(|&b| b <= 1));
        assert_eq!(det.state_costs(&Array2::zeros((4, 1))).unwrap().dim(), (4, 8));
    }

    #[test]
    fn test_rejects_multi_column_input() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut det = ViterbiNetDetector::new(2, OptimizerType::Adam, &mut rng);
        assert!(det.forward(&Array2::zeros((4, 2))).is_err());
    }

    #[test]
    fn test_training_reduces_loss_and_detects_noiseless_block() {
        let params = ChannelParams::siso(2, 1.0);
        let h = params.base_coefficients();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let tx = Array2::from_shape_simple_fn((400, 1), || rng.gen_range(0..=1u8));
        let rx = transmit(&params, &h, &tx).unwrap();

        let pool = PilotPool::from_block(&params, tx.slice(s![..300, ..]), rx.slice(s![..300, ..])).unwrap();
        let mut det = ViterbiNetDetector::new(2, OptimizerType::Adam, &mut rng);

        let before = det.calc_loss(&pool, LossType::CrossEntropy).unwrap();
        let summary = det.online_training(&pool, &settings(400)).unwrap();
        let after = det.calc_loss(&pool, LossType::CrossEntropy).unwrap();
        assert_eq!(summary.applied_steps, 400);
        assert!(after < before);

        let detected = det.forward(&rx.slice(s![300.., ..]).to_owned()).unwrap();
        let errors = detected
            .iter()
            .zip(tx.slice(s![300.., ..]).iter())
            .filter(|(a, b)| a != b)
            .count();
        assert!(errors <= 5, "{} errors", errors);
    }
}
