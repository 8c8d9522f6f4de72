//! Channel dataset for online detector experiments
//!
//! Generates seeded transmission blocks over either a SISO intersymbol
//! interference channel or a MIMO spatial-decay channel, with optional block
//! fading and AWGN at a requested SNR.

pub mod channel;
pub mod dataset;
pub mod fading;
pub mod noise;

use thiserror::Error;

pub use channel::{bpsk, respond, transmit, ChannelParams, ChannelType, PAD_BIT};
pub use dataset::{BlockSource, Blocks, ChannelModelDataset, FixedBlocks};
pub use fading::{BlockFading, FadingProfile};
pub use noise::{noise_variance, NoiseGenerator};

/// Errors raised while building channels or generating blocks
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    #[error("invalid {name}: {value}")]
    InvalidDimension { name: &'static str, value: usize },

    #[error("{what} has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("invalid channel parameter: {0}")]
    InvalidParameter(String),
}
