//! Detector error types

use channel_dataset::ChannelError;
use thiserror::Error;

/// Result type for detector operations
pub type DetectResult<T> = Result<T, DetectError>;

/// Errors that can occur while configuring, training or evaluating detectors
#[derive(Error, Debug)]
pub enum DetectError {
    /// Unsupported or inconsistent run configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Sampler asked to augment from an empty pilot pool
    #[error("Insufficient pilots: {available} available, {required} required")]
    InsufficientPilots { available: usize, required: usize },

    /// A state labeler received a symbol other than 0 or 1
    #[error("Non-binary symbol {value} at row {row}, column {col}")]
    NonBinarySymbol { row: usize, col: usize, value: f64 },

    /// Array dimensions disagree with what an operation requires
    #[error("Shape mismatch in {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A trial thread panicked
    #[error("Trial {0} panicked")]
    TrialPanicked(usize),

    /// Channel or dataset failure
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Filesystem failure (config or cache)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed YAML configuration
    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Cache blob could not be encoded or decoded
    #[error("Results cache error: {0}")]
    Cache(#[from] bincode::Error),
}

impl DetectError {
    /// Fatal errors stop a run before it starts; everything else is per-call
    pub fn is_fatal(&self) -> bool {
        matches!(self, DetectError::Config(_) | DetectError::Yaml(_))
    }

    pub(crate) fn shape(what: &'static str, expected: &[usize], actual: &[usize]) -> Self {
        DetectError::ShapeMismatch {
            what,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}
