//! Pilot augmentation
//!
//! Expands a scarce pilot pool into `n_repeats` labelled rows. The real
//! pilots come first, verbatim and in order; the remaining rows are drawn
//! from a [`Sampler`], cycling through the states so every state is asked
//! for in turn.

mod pool;
mod random_sampling;
mod smoothed;

pub use pool::PilotPool;
pub use random_sampling::RandomSampler;
pub use smoothed::{SmoothedStatisticsSampler, SMOOTHING_ALPHA};

use std::fmt;

use ndarray::Array2;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DetectError, DetectResult};
use crate::trellis::StateLabeler;
use crate::traits::Sampler;

/// Whether pilots are augmented before online training
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AugmentationType {
    /// Train on the real pilots only
    #[default]
    None,
    Sampling,
}

/// Which sampler fills the augmented rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerType {
    #[default]
    RandomSampling,
    SmoothedStatistics,
}

impl fmt::Display for SamplerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SamplerType::RandomSampling => "random_sampling",
            SamplerType::SmoothedStatistics => "smoothed_statistics",
        })
    }
}

/// Grow `pool` to `n_repeats` rows
pub fn augment_pilots(
    pool: &PilotPool,
    sampler: &dyn Sampler,
    n_repeats: usize,
    channel: &Array2<f64>,
    snr: f64,
    rng: &mut ChaCha8Rng,
) -> DetectResult<PilotPool> {
    if pool.is_empty() {
        return Err(DetectError::InsufficientPilots { available: 0, required: 1 });
    }

    let copied = n_repeats.min(pool.len());
    let mut augmented = pool.head(copied);
    let labeler = StateLabeler::new(pool.tx().ncols());

    for i in copied..n_repeats {
        let requested = i % pool.n_states();
        let (rx, tx) = sampler.sample(requested, channel, snr, rng)?;
        let state = labeler.label_row(tx.view())?;
        augmented.push_row(rx, tx, state)?;
    }

    debug!(
        pilots = pool.len(),
        augmented = augmented.len() - copied,
        total = augmented.len(),
        "augmented pilot pool"
    );
    Ok(augmented)
}

/// Build the configured sampler over `pool` and augment it
///
/// `model_fallback` lets the smoothed sampler cover states missing from the
/// pilots with the channel model; without it such states are an error.
pub fn augment_with(
    sampler_type: SamplerType,
    model_fallback: bool,
    pool: &PilotPool,
    n_repeats: usize,
    channel: &Array2<f64>,
    snr: f64,
    rng: &mut ChaCha8Rng,
) -> DetectResult<PilotPool> {
    match sampler_type {
        SamplerType::RandomSampling => {
            augment_pilots(pool, &RandomSampler::new(pool), n_repeats, channel, snr, rng)
        }
        SamplerType::SmoothedStatistics => {
            let sampler = SmoothedStatisticsSampler::fit(pool, snr)?.with_model_fallback(model_fallback);
            augment_pilots(pool, &sampler, n_repeats, channel, snr, rng)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, s, Array1};
    use rand::SeedableRng;

    /// Always returns the requested state's bits with a marker sample
    struct EchoSampler;

    impl Sampler for EchoSampler {
        fn sample(
            &self,
            state: usize,
            _channel: &Array2<f64>,
            _snr: f64,
            _rng: &mut ChaCha8Rng,
        ) -> DetectResult<(Array1<f64>, Array1<u8>)> {
            Ok((array![state as f64 + 100.0], crate::trellis::state_bits(state, 2)))
        }
    }

    fn pool() -> PilotPool {
        PilotPool::new(array![[0.5], [-0.5]], array![[1, 1], [0, 1]], vec![3, 2], 4).unwrap()
    }

    #[test]
    fn test_cycled_states_follow_real_pilots() {
        let pool = pool();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let h = array![[1.0, 0.5]];
        let out = augment_pilots(&pool, &EchoSampler, 7, &h, 10.0, &mut rng).unwrap();

        assert_eq!(out.len(), 7);
        // rows 2..7 request states 2, 3, 0, 1, 2
        assert_eq!(out.states(), &[3, 2, 2, 3, 0, 1, 2]);
        assert_eq!(out.rx()[[4, 0]], 100.0);
    }

    #[test]
    fn test_real_pilots_are_copied_verbatim() {
        let pool = PilotPool::new(
            array![[0.31, -1.2], [-0.77, 0.05], [1.4, 0.9]],
            array![[1, 0], [0, 1], [1, 1]],
            vec![1, 2, 3],
            4,
        )
        .unwrap();
        let sampler = RandomSampler::new(&pool);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let out = augment_pilots(&pool, &sampler, 12, &Array2::eye(2), 10.0, &mut rng).unwrap();

        assert_eq!(out.len(), 12);
        assert_eq!(out.rx().slice(s![..3, ..]), pool.rx().view());
        assert_eq!(out.tx().slice(s![..3, ..]), pool.tx().view());
        assert_eq!(&out.states()[..3], pool.states());
    }

    #[test]
    fn test_fewer_repeats_than_pilots_truncates() {
        let pool = pool();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let out = augment_pilots(&pool, &EchoSampler, 1, &Array2::zeros((1, 2)), 0.0, &mut rng).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.states(), &[3]);
    }

    #[test]
    fn test_empty_pool_rejected() {
        let pool = PilotPool::empty(1, 2, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = augment_pilots(&pool, &EchoSampler, 4, &Array2::zeros((1, 2)), 0.0, &mut rng);
        assert!(matches!(err, Err(DetectError::InsufficientPilots { .. })));
    }

    #[test]
    fn test_smoothed_without_fallback_needs_every_state() {
        let pool = pool();
        let h = array![[1.0, 0.5]];
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let err = augment_with(SamplerType::SmoothedStatistics, false, &pool, 20, &h, 10.0, &mut rng);
        assert!(matches!(err, Err(DetectError::InsufficientPilots { .. })));
    }

    #[test]
    fn test_configured_samplers_keep_labels_consistent() {
        let pool = pool();
        let h = array![[1.0, 0.5]];
        for kind in [SamplerType::RandomSampling, SamplerType::SmoothedStatistics] {
            let mut rng = ChaCha8Rng::seed_from_u64(5);
            let out = augment_with(kind, true, &pool, 20, &h, 10.0, &mut rng).unwrap();
            let labeler = StateLabeler::new(2);
            for (row, &state) in out.tx().rows().into_iter().zip(out.states()) {
                assert_eq!(labeler.label_row(row).unwrap(), state);
            }
        }
    }
}
