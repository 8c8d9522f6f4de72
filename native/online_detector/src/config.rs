//! Run configuration
//!
//! One immutable [`RunConfig`] value describes an evaluation run. It is
//! loaded from YAML, validated once, and passed by reference to every
//! component. Sweeps clone it and change fields on the clone.
//!
//! ## Example
//!
//! ```yaml
//! channel_type: SISO
//! detector_type: ViterbiNet
//! memory_length: 4
//! channel_gamma: 0.2
//! fading: cosine
//! pilot_size: 200
//! val_block_length: 1200
//! blocks_num: 50
//! val_snr: 10.0
//! optimizer_type: Adam
//! loss_type: CrossEntropy
//! lr: 0.005
//! aug_type: sampling
//! sampler_type: smoothed_statistics
//! online_repeats_n: 500
//! ```
//!
//! Unknown keys and unknown enum names (optimizer, loss, ...) fail parsing.

use std::fmt;
use std::path::{Path, PathBuf};

use channel_dataset::{ChannelParams, ChannelType, FadingProfile};
use serde::{Deserialize, Serialize};

use crate::augment::{AugmentationType, SamplerType};
use crate::error::{DetectError, DetectResult};
use crate::nn::{LossType, OptimizerType};
use crate::traits::TrainSettings;

/// Symbol modulation; only BPSK is supported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModulationType {
    #[default]
    #[serde(rename = "BPSK")]
    Bpsk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorType {
    ViterbiNet,
    #[serde(rename = "DeepSIC")]
    DeepSic,
    ModelViterbi,
}

impl DetectorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorType::ViterbiNet => "ViterbiNet",
            DetectorType::DeepSic => "DeepSIC",
            DetectorType::ModelViterbi => "ModelViterbi",
        }
    }

    /// Channel topology the detector works on
    pub fn channel_type(&self) -> ChannelType {
        match self {
            DetectorType::ViterbiNet | DetectorType::ModelViterbi => ChannelType::Siso,
            DetectorType::DeepSic => ChannelType::Mimo,
        }
    }
}

impl fmt::Display for DetectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub modulation_type: ModulationType,
    pub channel_type: ChannelType,
    pub detector_type: DetectorType,

    /// SISO channel memory
    pub memory_length: usize,
    pub n_user: usize,
    pub n_ant: usize,
    /// SISO tap decay
    pub channel_gamma: f64,
    pub fading: FadingProfile,

    pub pilot_size: usize,
    pub blocks_num: usize,
    pub val_block_length: usize,
    pub val_snr: f64,

    pub optimizer_type: OptimizerType,
    pub loss_type: LossType,
    pub lr: f64,

    pub aug_type: AugmentationType,
    pub sampler_type: SamplerType,
    /// Let the smoothed sampler fill states absent from the pilots from the
    /// channel model instead of failing
    pub sampler_model_fallback: bool,
    /// Pool size after augmentation
    pub online_repeats_n: usize,
    /// Full-batch steps per block
    pub online_epochs: usize,
    pub deepsic_iterations: usize,
    pub is_online_training: bool,

    pub seed: u64,
    /// Name used for cache entries; derived from the detector when absent
    pub method_name: Option<String>,
    pub cache_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            modulation_type: ModulationType::Bpsk,
            channel_type: ChannelType::Siso,
            detector_type: DetectorType::ViterbiNet,
            memory_length: 4,
            n_user: 4,
            n_ant: 4,
            channel_gamma: 0.2,
            fading: FadingProfile::Static,
            pilot_size: 200,
            blocks_num: 50,
            val_block_length: 1200,
            val_snr: 10.0,
            optimizer_type: OptimizerType::Adam,
            loss_type: LossType::CrossEntropy,
            lr: 5e-3,
            aug_type: AugmentationType::None,
            sampler_type: SamplerType::RandomSampling,
            sampler_model_fallback: false,
            online_repeats_n: 500,
            online_epochs: 100,
            deepsic_iterations: 3,
            is_online_training: true,
            seed: 0,
            method_name: None,
            cache_dir: PathBuf::from("results"),
        }
    }
}

impl RunConfig {
    /// Load, parse and validate a YAML file
    pub fn load_from(path: &Path) -> DetectResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate YAML text
    pub fn parse(yaml: &str) -> DetectResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> DetectResult<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> DetectResult<()> {
        let invalid = |msg: String| Err(DetectError::Config(msg));

        if self.pilot_size == 0 {
            return invalid("pilot_size must be > 0".to_string());
        }
        if self.val_block_length == 0 || self.blocks_num == 0 {
            return invalid("val_block_length and blocks_num must be > 0".to_string());
        }
        if self.pilot_size >= self.val_block_length {
            return invalid(format!(
                "pilot_size ({}) must be smaller than val_block_length ({})",
                self.pilot_size, self.val_block_length
            ));
        }
        if !self.lr.is_finite() || self.lr <= 0.0 {
            return invalid(format!("lr must be a positive finite number, got {}", self.lr));
        }
        if !self.val_snr.is_finite() {
            return invalid(format!("val_snr must be finite, got {}", self.val_snr));
        }
        if self.detector_type.channel_type() != self.channel_type {
            return invalid(format!(
                "{} detector needs a {} channel, configured {}",
                self.detector_type,
                self.detector_type.channel_type(),
                self.channel_type
            ));
        }
        if self.detector_type == DetectorType::DeepSic && self.deepsic_iterations == 0 {
            return invalid("deepsic_iterations must be > 0".to_string());
        }
        if self.is_online_training && self.online_epochs == 0 {
            return invalid("online_epochs must be > 0 when training online".to_string());
        }
        if self.aug_type == AugmentationType::Sampling && self.online_repeats_n == 0 {
            return invalid("online_repeats_n must be > 0 when augmenting".to_string());
        }

        self.channel_params()
            .validate()
            .map_err(|e| DetectError::Config(e.to_string()))
    }

    pub fn channel_params(&self) -> ChannelParams {
        let params = match self.channel_type {
            ChannelType::Siso => ChannelParams::siso(self.memory_length, self.channel_gamma),
            ChannelType::Mimo => ChannelParams::mimo(self.n_user, self.n_ant),
        };
        params.with_fading(self.fading)
    }

    pub fn train_settings(&self) -> TrainSettings {
        TrainSettings {
            loss: self.loss_type,
            lr: self.lr,
            epochs: self.online_epochs,
        }
    }

    /// Cache / report name of this run
    pub fn method_name(&self) -> String {
        match &self.method_name {
            Some(name) => name.clone(),
            None => match self.aug_type {
                AugmentationType::None => self.detector_type.to_string(),
                AugmentationType::Sampling => format!("{}_{}", self.detector_type, self.sampler_type),
            },
        }
    }

    /// Copy of this config for trial `trial` of a sweep
    pub fn for_trial(&self, trial: usize) -> Self {
        let mut config = self.clone();
        config.seed = self.seed.wrapping_add(trial as u64);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
modulation_type: BPSK
channel_type: MIMO
detector_type: DeepSIC
n_user: 2
n_ant: 3
pilot_size: 50
val_block_length: 100
blocks_num: 3
val_snr: 12.0
optimizer_type: RMSprop
loss_type: MSE
lr: 0.001
aug_type: sampling
sampler_type: smoothed_statistics
online_repeats_n: 80
fading: cosine
seed: 9
"#;
        let config = RunConfig::parse(yaml).unwrap();
        assert_eq!(config.channel_type, ChannelType::Mimo);
        assert_eq!(config.detector_type, DetectorType::DeepSic);
        assert_eq!(config.optimizer_type, OptimizerType::RmsProp);
        assert_eq!(config.loss_type, LossType::Mse);
        assert_eq!(config.sampler_type, SamplerType::SmoothedStatistics);
        assert_eq!(config.fading, FadingProfile::Cosine);
        assert_eq!(config.method_name(), "DeepSIC_smoothed_statistics");
        assert_eq!(config.channel_params().n_ant, 3);
    }

    #[test]
    fn test_unknown_optimizer_is_fatal() {
        let err = RunConfig::parse("optimizer_type: Adagrad\n").unwrap_err();
        assert!(err.is_fatal());

        let err = RunConfig::parse("loss_type: Hinge\n").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_pilot_size_must_be_below_block_length() {
        let config = RunConfig {
            pilot_size: 100,
            val_block_length: 100,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DetectError::Config(_))));
    }

    #[test]
    fn test_detector_channel_mismatch() {
        let config = RunConfig {
            detector_type: DetectorType::DeepSic,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_lr_rejected() {
        for lr in [0.0, -1.0, f64::NAN] {
            let config = RunConfig { lr, ..Default::default() };
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_trial_copies_differ_only_in_seed() {
        let base = RunConfig { seed: 10, ..Default::default() };
        let trial = base.for_trial(3);
        assert_eq!(trial.seed, 13);
        assert_eq!(RunConfig { seed: 10, ..trial }, base);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.yaml");
        let config = RunConfig {
            method_name: Some("baseline".to_string()),
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(RunConfig::load_from(&path).unwrap(), config);
    }
}
