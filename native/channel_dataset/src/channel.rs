//! SISO and MIMO linear channel models
//!
//! Both channels are expressed as a coefficient matrix `H` applied to the
//! BPSK image of a transmitted row:
//!
//! - SISO: `H` is `[1, memory_length]` ISI taps `h_i = exp(-gamma * i)`.
//!   The row for time `t` is the memory window `x[t..t+m]`, so
//!   `y[t] = Σ_i h_i · bpsk(x[t+i])`. Positions past the end of the word are
//!   padded with bit 1.
//! - MIMO: `H` is `[n_ant, n_user]` with `H[i][j] = exp(-|i - j|)` (spatial
//!   exponential decay), applied to the users' simultaneous bits.
//!
//! BPSK maps bit 0 to +1 and bit 1 to -1.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::fading::FadingProfile;
use crate::ChannelError;

/// Bit value used to pad SISO windows past the end of a word
pub const PAD_BIT: u8 = 1;

/// Largest supported SISO memory / MIMO user count (state space 2^16)
pub const MAX_STATE_BITS: usize = 16;

/// Channel topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    #[serde(rename = "SISO")]
    Siso,
    #[serde(rename = "MIMO")]
    Mimo,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Siso => "SISO",
            ChannelType::Mimo => "MIMO",
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// BPSK symbol for a bit
#[inline]
pub fn bpsk(bit: u8) -> f64 {
    if bit & 1 == 0 { 1.0 } else { -1.0 }
}

/// Channel parameters shared by the dataset and model-based detectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelParams {
    pub channel_type: ChannelType,
    /// SISO channel memory (number of ISI taps)
    pub memory_length: usize,
    /// MIMO transmitting users
    pub n_user: usize,
    /// MIMO receiving antennas
    pub n_ant: usize,
    /// SISO tap decay rate
    pub gamma: f64,
    pub fading: FadingProfile,
}

impl ChannelParams {
    pub fn siso(memory_length: usize, gamma: f64) -> Self {
        Self {
            channel_type: ChannelType::Siso,
            memory_length,
            n_user: 1,
            n_ant: 1,
            gamma,
            fading: FadingProfile::Static,
        }
    }

    pub fn mimo(n_user: usize, n_ant: usize) -> Self {
        Self {
            channel_type: ChannelType::Mimo,
            memory_length: 1,
            n_user,
            n_ant,
            gamma: 0.0,
            fading: FadingProfile::Static,
        }
    }

    pub fn with_fading(mut self, fading: FadingProfile) -> Self {
        self.fading = fading;
        self
    }

    pub fn validate(&self) -> Result<(), ChannelError> {
        match self.channel_type {
            ChannelType::Siso => {
                if self.memory_length == 0 || self.memory_length > MAX_STATE_BITS {
                    return Err(ChannelError::InvalidDimension {
                        name: "memory_length",
                        value: self.memory_length,
                    });
                }
                if !self.gamma.is_finite() {
                    return Err(ChannelError::InvalidParameter(format!(
                        "gamma must be finite, got {}",
                        self.gamma
                    )));
                }
            }
            ChannelType::Mimo => {
                if self.n_user == 0 || self.n_user > MAX_STATE_BITS {
                    return Err(ChannelError::InvalidDimension {
                        name: "n_user",
                        value: self.n_user,
                    });
                }
                if self.n_ant == 0 {
                    return Err(ChannelError::InvalidDimension {
                        name: "n_ant",
                        value: self.n_ant,
                    });
                }
            }
        }
        Ok(())
    }

    /// Columns of a transmitted word
    pub fn tx_cols(&self) -> usize {
        match self.channel_type {
            ChannelType::Siso => 1,
            ChannelType::Mimo => self.n_user,
        }
    }

    /// Columns of a received word
    pub fn rx_cols(&self) -> usize {
        match self.channel_type {
            ChannelType::Siso => 1,
            ChannelType::Mimo => self.n_ant,
        }
    }

    /// Bits per channel state (SISO memory or MIMO users)
    pub fn state_bits(&self) -> usize {
        match self.channel_type {
            ChannelType::Siso => self.memory_length,
            ChannelType::Mimo => self.n_user,
        }
    }

    pub fn n_states(&self) -> usize {
        1 << self.state_bits()
    }

    /// Unfaded coefficient matrix
    pub fn base_coefficients(&self) -> Array2<f64> {
        match self.channel_type {
            ChannelType::Siso => Array2::from_shape_fn((1, self.memory_length), |(_, i)| {
                (-self.gamma * i as f64).exp()
            }),
            ChannelType::Mimo => Array2::from_shape_fn((self.n_ant, self.n_user), |(i, j)| {
                (-(i as f64 - j as f64).abs()).exp()
            }),
        }
    }
}

/// Noiseless channel output for one state row (window bits or user bits)
pub fn respond(h: &Array2<f64>, bits: ArrayView1<u8>) -> Array1<f64> {
    let symbols = bits.mapv(bpsk);
    h.dot(&symbols)
}

/// Noiseless channel output for a whole transmitted word
///
/// SISO words are `[L, 1]` and each output sample sees the padded memory
/// window; MIMO words are `[L, n_user]` and produce `[L, n_ant]`.
pub fn transmit(
    params: &ChannelParams,
    h: &Array2<f64>,
    tx: &Array2<u8>,
) -> Result<Array2<f64>, ChannelError> {
    let expected = (params.rx_cols(), params.state_bits());
    if h.dim() != expected {
        return Err(ChannelError::ShapeMismatch {
            what: "channel coefficients",
            expected,
            actual: h.dim(),
        });
    }
    if tx.ncols() != params.tx_cols() {
        return Err(ChannelError::ShapeMismatch {
            what: "transmitted word",
            expected: (tx.nrows(), params.tx_cols()),
            actual: tx.dim(),
        });
    }

    let len = tx.nrows();
    let mut rx = Array2::zeros((len, params.rx_cols()));
    match params.channel_type {
        ChannelType::Siso => {
            let m = params.memory_length;
            let mut window = Array1::<u8>::zeros(m);
            for t in 0..len {
                for i in 0..m {
                    window[i] = if t + i < len { tx[[t + i, 0]] } else { PAD_BIT };
                }
                rx.row_mut(t).assign(&respond(h, window.view()));
            }
        }
        ChannelType::Mimo => {
            for (t, row) in tx.rows().into_iter().enumerate() {
                rx.row_mut(t).assign(&respond(h, row));
            }
        }
    }
    Ok(rx)
}
