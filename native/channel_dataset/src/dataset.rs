//! Block dataset
//!
//! Produces `(transmitted, received, channel)` triples, `blocks_num` per
//! requested SNR. All randomness comes from one seeded `ChaCha8Rng`, so two
//! datasets built with the same seed yield identical blocks.

use ndarray::Array2;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::channel::{transmit, ChannelParams};
use crate::fading::BlockFading;
use crate::noise::NoiseGenerator;
use crate::ChannelError;

/// Parallel per-block arrays, one entry per block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Blocks {
    pub transmitted: Vec<Array2<u8>>,
    pub received: Vec<Array2<f64>>,
    pub channels: Vec<Array2<f64>>,
}

impl Blocks {
    pub fn len(&self) -> usize {
        self.transmitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transmitted.is_empty()
    }

    pub fn push(&mut self, tx: Array2<u8>, rx: Array2<f64>, h: Array2<f64>) {
        self.transmitted.push(tx);
        self.received.push(rx);
        self.channels.push(h);
    }
}

/// Anything that can hand out evaluation blocks
pub trait BlockSource {
    /// Blocks for every SNR in `snr_list`, concatenated in list order
    fn get_blocks(&mut self, snr_list: &[f64]) -> Result<Blocks, ChannelError>;
}

/// Synthetic dataset driven by a channel model
pub struct ChannelModelDataset {
    params: ChannelParams,
    block_length: usize,
    blocks_num: usize,
    base: Array2<f64>,
    fading: BlockFading,
    rng: ChaCha8Rng,
}

impl ChannelModelDataset {
    pub fn new(
        params: ChannelParams,
        block_length: usize,
        blocks_num: usize,
        seed: u64,
    ) -> Result<Self, ChannelError> {
        params.validate()?;
        if block_length == 0 {
            return Err(ChannelError::InvalidDimension {
                name: "block_length",
                value: block_length,
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let base = params.base_coefficients();
        let fading = BlockFading::new(params.fading, base.ncols(), &mut rng);

        Ok(Self {
            params,
            block_length,
            blocks_num,
            base,
            fading,
            rng,
        })
    }

    pub fn params(&self) -> &ChannelParams {
        &self.params
    }

    pub fn block_length(&self) -> usize {
        self.block_length
    }

    pub fn blocks_num(&self) -> usize {
        self.blocks_num
    }

    /// Coefficients in effect during block `index`
    pub fn channel_at(&self, index: usize) -> Array2<f64> {
        self.fading.apply(&self.base, index)
    }

    fn random_word(&mut self) -> Array2<u8> {
        let cols = self.params.tx_cols();
        let rng = &mut self.rng;
        Array2::from_shape_simple_fn((self.block_length, cols), || rng.gen_range(0..=1u8))
    }
}

impl BlockSource for ChannelModelDataset {
    fn get_blocks(&mut self, snr_list: &[f64]) -> Result<Blocks, ChannelError> {
        let mut blocks = Blocks::default();

        for &snr in snr_list {
            if !snr.is_finite() {
                return Err(ChannelError::InvalidParameter(format!("snr must be finite, got {}", snr)));
            }
            let mut noise = NoiseGenerator::from_snr(snr, &mut self.rng);

            for index in 0..self.blocks_num {
                let h = self.channel_at(index);
                let tx = self.random_word();
                let mut rx = transmit(&self.params, &h, &tx)?;
                noise.corrupt(&mut rx);
                blocks.push(tx, rx, h);
            }
            debug!(
                snr,
                blocks = self.blocks_num,
                channel = %self.params.channel_type,
                "generated channel blocks"
            );
        }

        Ok(blocks)
    }
}

/// Pre-built blocks replayed verbatim, ignoring the SNR
#[derive(Debug, Clone)]
pub struct FixedBlocks {
    blocks: Blocks,
}

impl FixedBlocks {
    pub fn new(blocks: Blocks) -> Result<Self, ChannelError> {
        let n = blocks.transmitted.len();
        if blocks.received.len() != n || blocks.channels.len() != n {
            return Err(ChannelError::InvalidParameter(
                "transmitted, received and channel arrays differ in length".to_string(),
            ));
        }
        for (tx, rx) in blocks.transmitted.iter().zip(&blocks.received) {
            if tx.nrows() != rx.nrows() {
                return Err(ChannelError::ShapeMismatch {
                    what: "received word",
                    expected: (tx.nrows(), rx.ncols()),
                    actual: rx.dim(),
                });
            }
        }
        Ok(Self { blocks })
    }
}

impl BlockSource for FixedBlocks {
    fn get_blocks(&mut self, _snr_list: &[f64]) -> Result<Blocks, ChannelError> {
        Ok(self.blocks.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fading::FadingProfile;
    use ndarray::array;

    #[test]
    fn test_block_shapes_siso() {
        let mut ds = ChannelModelDataset::new(ChannelParams::siso(4, 1.0), 50, 3, 0).unwrap();
        let blocks = ds.get_blocks(&[10.0]).unwrap();

        assert_eq!(blocks.len(), 3);
        for i in 0..3 {
            assert_eq!(blocks.transmitted[i].dim(), (50, 1));
            assert_eq!(blocks.received[i].dim(), (50, 1));
            assert_eq!(blocks.channels[i].dim(), (1, 4));
            assert!(blocks.transmitted[i].iter().all(|&b| b <= 1));
        }
    }

    #[test]
    fn test_block_shapes_mimo() {
        let mut ds = ChannelModelDataset::new(ChannelParams::mimo(4, 6), 20, 2, 0).unwrap();
        let blocks = ds.get_blocks(&[10.0, 12.0]).unwrap();

        // blocks_num per requested SNR
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks.transmitted[0].dim(), (20, 4));
        assert_eq!(blocks.received[0].dim(), (20, 6));
        assert_eq!(blocks.channels[0].dim(), (6, 4));
    }

    #[test]
    fn test_same_seed_same_blocks() {
        let params = ChannelParams::siso(3, 0.5).with_fading(FadingProfile::Cosine);
        let mut a = ChannelModelDataset::new(params.clone(), 30, 4, 11).unwrap();
        let mut b = ChannelModelDataset::new(params, 30, 4, 11).unwrap();

        assert_eq!(a.get_blocks(&[8.0]).unwrap(), b.get_blocks(&[8.0]).unwrap());
    }

    #[test]
    fn test_high_snr_received_close_to_noiseless() {
        let params = ChannelParams::siso(2, 1.0);
        let mut ds = ChannelModelDataset::new(params.clone(), 40, 1, 5).unwrap();
        let blocks = ds.get_blocks(&[80.0]).unwrap();

        let clean = transmit(&params, &blocks.channels[0], &blocks.transmitted[0]).unwrap();
        for (y, c) in blocks.received[0].iter().zip(clean.iter()) {
            assert!((y - c).abs() < 1e-2);
        }
    }

    #[test]
    fn test_cosine_fading_changes_channel_between_blocks() {
        let params = ChannelParams::siso(2, 0.0).with_fading(FadingProfile::Cosine);
        let mut ds = ChannelModelDataset::new(params, 10, 5, 0).unwrap();
        let blocks = ds.get_blocks(&[10.0]).unwrap();

        assert!((blocks.channels[0][[0, 0]] - 1.0).abs() < 1e-12);
        assert!(blocks.channels[3][[0, 1]] < blocks.channels[0][[0, 1]]);
    }

    #[test]
    fn test_fixed_blocks_replay() {
        let mut blocks = Blocks::default();
        blocks.push(array![[0u8], [1]], array![[0.0], [1.0]], array![[1.0]]);
        let mut src = FixedBlocks::new(blocks.clone()).unwrap();

        assert_eq!(src.get_blocks(&[0.0]).unwrap(), blocks);
        assert_eq!(src.get_blocks(&[30.0]).unwrap(), blocks);
    }

    #[test]
    fn test_fixed_blocks_rejects_misaligned_words() {
        let mut blocks = Blocks::default();
        blocks.push(array![[0u8], [1]], array![[0.0]], array![[1.0]]);
        assert!(FixedBlocks::new(blocks).is_err());
    }
}
