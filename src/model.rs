use burn::prelude::*;

use crate::decoder::{Decoder, DecoderConfig, SegnetOutput};
use crate::encoder::{Encoder, EncoderConfig};
use crate::error::SegnetError;

/// The full encoder-decoder network.
///
/// A forward pass is pure: parameters are only read, so one model value can
/// serve concurrent passes, and the same input always produces the same maps.
#[derive(Module, Debug)]
pub struct Segnet<B: Backend> {
    pub encoder: Encoder<B>,
    pub decoder: Decoder<B>,
}

impl<B: Backend> Segnet<B> {
    /// Maps `[batch, in_channels, height, width]` images to logits and
    /// probabilities of the same spatial size.
    pub fn forward(&self, input: Tensor<B, 4>) -> Result<SegnetOutput<B>, SegnetError> {
        let features = self.encoder.forward(input)?;
        self.decoder.forward(features)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SegnetConfig {
    encoder: EncoderConfig,
    decoder: DecoderConfig,
}

impl SegnetConfig {
    /// Builds matching encoder and decoder configs around one shared
    /// `base_channels`.
    pub fn new(in_channels: usize, base_channels: usize, out_channels: usize) -> SegnetConfig {
        SegnetConfig {
            encoder: EncoderConfig::new(in_channels, base_channels),
            decoder: DecoderConfig::new(base_channels, out_channels),
        }
    }

    /// Initialize the network.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Segnet<B>, SegnetError> {
        Ok(Segnet {
            encoder: self.encoder.init(device)?,
            decoder: self.decoder.init(device)?,
        })
    }
}
