//! Online evaluation loop
//!
//! Blocks are processed strictly in order. For every block the pilot prefix
//! is labelled (and optionally augmented), the detector trains on it, the
//! data suffix is detected and scored, and the detector's priors are reset.
//! Trainable parameters carry over from block to block.

use channel_dataset::{BlockSource, ChannelModelDataset, ChannelType};
use ndarray::s;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::augment::{augment_with, AugmentationType, PilotPool};
use crate::config::RunConfig;
use crate::detectors::build_detector;
use crate::error::{DetectError, DetectResult};
use crate::metrics::error_rates_common;
use crate::traits::Detector;

/// Outcome of one evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub method: String,
    pub channel_type: ChannelType,
    pub snr: f64,
    pub ser_by_block: Vec<f64>,
    pub fer_by_block: Vec<f64>,
    /// Mean of `ser_by_block`
    pub total_ser: f64,
    /// Training steps dropped because their loss was NaN
    pub skipped_steps: usize,
}

pub struct Trainer<'a> {
    config: &'a RunConfig,
}

impl<'a> Trainer<'a> {
    pub fn new(config: &'a RunConfig) -> DetectResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RunConfig {
        self.config
    }

    /// Build the dataset and detector from the config and evaluate
    pub fn run(&self) -> DetectResult<EvaluationReport> {
        let config = self.config;
        let (dataset_seed, mut rng) = split_seed(config.seed);
        let mut dataset = ChannelModelDataset::new(
            config.channel_params(),
            config.val_block_length,
            config.blocks_num,
            dataset_seed,
        )?;
        let mut detector = build_detector(config, &mut rng)?;
        self.evaluate(detector.as_mut(), &mut dataset, &mut rng)
    }

    /// Run the online loop over every block `source` produces at `val_snr`
    pub fn evaluate(
        &self,
        detector: &mut dyn Detector,
        source: &mut dyn BlockSource,
        rng: &mut ChaCha8Rng,
    ) -> DetectResult<EvaluationReport> {
        let config = self.config;
        let params = config.channel_params();
        let settings = config.train_settings();
        let pilots = config.pilot_size;

        let blocks = source.get_blocks(&[config.val_snr])?;
        let n_blocks = blocks.len().min(config.blocks_num);
        if n_blocks == 0 {
            return Err(DetectError::shape("evaluation blocks", &[config.blocks_num], &[0]));
        }

        info!(
            method = %config.method_name(),
            detector = detector.name(),
            aug = ?config.aug_type,
            sampler = %config.sampler_type,
            snr = config.val_snr,
            blocks = n_blocks,
            "starting online evaluation"
        );

        detector.init_priors();
        let mut ser_by_block = Vec::with_capacity(n_blocks);
        let mut fer_by_block = Vec::with_capacity(n_blocks);
        let mut skipped_steps = 0;

        for index in 0..n_blocks {
            let tx = &blocks.transmitted[index];
            let rx = &blocks.received[index];
            let h = &blocks.channels[index];
            if tx.nrows() <= pilots || rx.nrows() != tx.nrows() {
                return Err(DetectError::shape("block rows", &[pilots + 1, tx.nrows()], &[tx.nrows(), rx.nrows()]));
            }

            detector.set_channel(h);

            if config.is_online_training {
                let pool = PilotPool::from_block(&params, tx.slice(s![..pilots, ..]), rx.slice(s![..pilots, ..]))?;
                let pool = match config.aug_type {
                    AugmentationType::None => pool,
                    AugmentationType::Sampling => augment_with(
                        config.sampler_type,
                        config.sampler_model_fallback,
                        &pool,
                        config.online_repeats_n,
                        h,
                        config.val_snr,
                        rng,
                    )?,
                };
                let summary = detector.online_training(&pool, &settings)?;
                if summary.skipped_steps > 0 {
                    warn!(
                        block = index,
                        skipped = summary.skipped_steps,
                        "NaN loss, training steps skipped"
                    );
                }
                debug!(block = index, loss = ?summary.last_loss, pool = pool.len(), "block trained");
                skipped_steps += summary.skipped_steps;
            }

            let detected = detector.forward(&rx.slice(s![pilots.., ..]).to_owned())?;
            let (ser, fer, _) = error_rates_common(detected.view(), tx.slice(s![pilots.., ..]))?;
            info!(block = index, ser, "block detected");

            ser_by_block.push(ser);
            fer_by_block.push(fer);
            detector.init_priors();
        }

        let total_ser = ser_by_block.iter().sum::<f64>() / n_blocks as f64;
        info!(method = %config.method_name(), total_ser, skipped_steps, "final ser");

        Ok(EvaluationReport {
            method: config.method_name(),
            channel_type: config.channel_type,
            snr: config.val_snr,
            ser_by_block,
            fer_by_block,
            total_ser,
            skipped_steps,
        })
    }
}

/// Dataset seed drawn from the run's root generator, plus that generator
///
/// Detector initialisation and sampling continue on the root stream, so
/// they never replay the words that generated the data.
fn split_seed(seed: u64) -> (u64, ChaCha8Rng) {
    let mut root = ChaCha8Rng::seed_from_u64(seed);
    let dataset_seed = root.gen::<u64>();
    (dataset_seed, root)
}
