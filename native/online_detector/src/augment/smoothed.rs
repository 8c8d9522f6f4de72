//! Per-state smoothed statistics sampler
//!
//! Estimates a centre and a variance for every state seen in the pilots with
//! an exponential running mean (`alpha = 0.3`), then draws Gaussian samples
//! around them. Asking for a state with no pilot is an error unless the
//! model fallback is enabled, in which case the noiseless channel response
//! of the state's bit pattern and the nominal noise variance stand in.

use channel_dataset::{noise_variance, respond};
use channel_dataset::noise::standard_normal_pair;
use ndarray::{Array1, Array2, ArrayView1};
use rand_chacha::ChaCha8Rng;

use super::pool::PilotPool;
use crate::error::{DetectError, DetectResult};
use crate::trellis::state_bits;
use crate::traits::Sampler;

pub const SMOOTHING_ALPHA: f64 = 0.3;

#[derive(Debug, Clone, PartialEq)]
struct StateStats {
    centre: Array1<f64>,
    variance: Array1<f64>,
}

#[derive(Debug, Clone)]
pub struct SmoothedStatisticsSampler {
    stats: Vec<Option<StateStats>>,
    tx_width: usize,
    model_fallback: bool,
}

impl SmoothedStatisticsSampler {
    /// Fit per-state statistics over `pool` in row order
    pub fn fit(pool: &PilotPool, snr: f64) -> DetectResult<Self> {
        if pool.is_empty() {
            return Err(DetectError::InsufficientPilots { available: 0, required: 1 });
        }
        let initial_variance = noise_variance(snr);
        let mut stats: Vec<Option<StateStats>> = vec![None; pool.n_states()];

        for (rx, state) in pool.rx().rows().into_iter().zip(pool.states()) {
            if let Some(s) = stats[*state].as_mut() {
                update(s, rx);
                continue;
            }
            stats[*state] = Some(StateStats {
                centre: rx.to_owned(),
                variance: Array1::from_elem(rx.len(), initial_variance),
            });
        }

        Ok(Self {
            stats,
            tx_width: pool.tx().ncols(),
            model_fallback: false,
        })
    }

    /// Sample unseen states around `H·bpsk(bits)` instead of failing
    pub fn with_model_fallback(mut self, enabled: bool) -> Self {
        self.model_fallback = enabled;
        self
    }

    /// States that appeared in the pilots
    pub fn seen_states(&self) -> usize {
        self.stats.iter().filter(|s| s.is_some()).count()
    }

    /// Smoothed centre of `state`, if it appeared in the pilots
    pub fn centre(&self, state: usize) -> Option<ArrayView1<f64>> {
        self.stats.get(state)?.as_ref().map(|s| s.centre.view())
    }

    pub fn variance(&self, state: usize) -> Option<ArrayView1<f64>> {
        self.stats.get(state)?.as_ref().map(|s| s.variance.view())
    }
}

fn update(stats: &mut StateStats, rx: ArrayView1<f64>) {
    for ((c, v), &y) in stats.centre.iter_mut().zip(stats.variance.iter_mut()).zip(rx.iter()) {
        let d = y - *c;
        *v = (1.0 - SMOOTHING_ALPHA) * *v + SMOOTHING_ALPHA * d * d;
        *c = (1.0 - SMOOTHING_ALPHA) * *c + SMOOTHING_ALPHA * y;
    }
}

impl Sampler for SmoothedStatisticsSampler {
    fn sample(
        &self,
        state: usize,
        channel: &Array2<f64>,
        snr: f64,
        rng: &mut ChaCha8Rng,
    ) -> DetectResult<(Array1<f64>, Array1<u8>)> {
        if state >= self.stats.len() {
            return Err(DetectError::shape("sampler state", &[self.stats.len()], &[state + 1]));
        }
        let bits = state_bits(state, self.tx_width);

        let (centre, variance) = match &self.stats[state] {
            Some(s) => (s.centre.clone(), s.variance.clone()),
            None if !self.model_fallback => {
                return Err(DetectError::InsufficientPilots { available: 0, required: 1 });
            }
            None => {
                if channel.ncols() != self.tx_width {
                    return Err(DetectError::shape(
                        "sampler channel",
                        &[channel.nrows(), self.tx_width],
                        &[channel.nrows(), channel.ncols()],
                    ));
                }
                let centre = respond(channel, bits.view());
                let variance = Array1::from_elem(centre.len(), noise_variance(snr));
                (centre, variance)
            }
        };

        let rx = Array1::from_shape_fn(centre.len(), |i| {
            let (z, _) = standard_normal_pair(rng);
            centre[i] + variance[i].sqrt() * z
        });
        Ok((rx, bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn test_running_statistics() {
        let pool = PilotPool::new(
            array![[1.0], [2.0], [-1.0]],
            array![[0, 0], [0, 0], [1, 0]],
            vec![0, 0, 1],
            4,
        )
        .unwrap();
        let sampler = SmoothedStatisticsSampler::fit(&pool, 10.0).unwrap();

        // state 0: centre 0.7*1 + 0.3*2, variance 0.7*0.1 + 0.3*1
        assert!((sampler.centre(0).unwrap()[0] - 1.3).abs() < 1e-12);
        assert!((sampler.variance(0).unwrap()[0] - 0.37).abs() < 1e-12);
        assert!((sampler.centre(1).unwrap()[0] + 1.0).abs() < 1e-12);
        assert!((sampler.variance(1).unwrap()[0] - 0.1).abs() < 1e-12);
        assert!(sampler.centre(2).is_none());
    }

    #[test]
    fn test_unseen_state_uses_channel_response() {
        let pool = PilotPool::new(array![[0.9]], array![[0, 0]], vec![0], 4).unwrap();
        let sampler = SmoothedStatisticsSampler::fit(&pool, 60.0)
            .unwrap()
            .with_model_fallback(true);
        let h = array![[1.0, 0.5]];
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        // state 3 = bits [1, 1] -> -1 - 0.5
        let (rx, tx) = sampler.sample(3, &h, 60.0, &mut rng).unwrap();
        assert_eq!(tx.to_vec(), vec![1, 1]);
        assert!((rx[0] + 1.5).abs() < 1e-2);
    }

    #[test]
    fn test_unseen_state_without_fallback_fails() {
        let pool = PilotPool::new(array![[0.9]], array![[0, 0]], vec![0], 4).unwrap();
        let sampler = SmoothedStatisticsSampler::fit(&pool, 10.0).unwrap();
        let h = array![[1.0, 0.5]];
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        assert_eq!(sampler.seen_states(), 1);
        assert!(matches!(
            sampler.sample(3, &h, 10.0, &mut rng),
            Err(DetectError::InsufficientPilots { available: 0, required: 1 })
        ));
        assert!(sampler.sample(0, &h, 10.0, &mut rng).is_ok());
    }

    #[test]
    fn test_seen_state_spread_matches_variance() {
        let pool = PilotPool::new(array![[2.0, -2.0]], array![[1, 0]], vec![1], 4).unwrap();
        let sampler = SmoothedStatisticsSampler::fit(&pool, 0.0).unwrap();
        let h = Array2::eye(2);
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        let n = 4000;
        let draws: Vec<f64> = (0..n)
            .map(|_| sampler.sample(1, &h, 0.0, &mut rng).unwrap().0[0])
            .collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;

        assert!((mean - 2.0).abs() < 0.1);
        assert!((var - 1.0).abs() < 0.1);
    }

    #[test]
    fn test_empty_pool() {
        let pool = PilotPool::empty(1, 2, 4);
        assert!(matches!(
            SmoothedStatisticsSampler::fit(&pool, 10.0),
            Err(DetectError::InsufficientPilots { .. })
        ));
    }
}
