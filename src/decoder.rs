use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::sigmoid,
};

use crate::conv_block::{ConvBlock, ConvBlockConfig, UpConvBlock, UpConvBlockConfig};
use crate::encoder::{EncoderFeatures, NUM_STAGES, STAGE_DEPTHS, STAGE_WIDTHS};
use crate::error::SegnetError;

/// Per-pixel maps produced by the decoder: raw logits and their sigmoid.
#[derive(Debug, Clone)]
pub struct SegnetOutput<B: Backend> {
    /// Unbounded class scores, `[batch, out_channels, height, width]`.
    pub logits: Tensor<B, 4>,
    /// `sigmoid(logits)`, same shape.
    pub probabilities: Tensor<B, 4>,
}

/// One decoder stage: upsample the incoming tensor, concatenate the matching
/// skip tensor, then convolve back to the stage width.
#[derive(Module, Debug)]
pub struct DecoderStage<B: Backend> {
    up: UpConvBlock<B>,
    convs: Vec<ConvBlock<B>>,
    skip_channels: usize,
}

impl<B: Backend> DecoderStage<B> {
    /// `stage` is only used to name the stage in shape errors.
    pub fn forward(
        &self,
        stage: usize,
        x: Tensor<B, 4>,
        skip: Tensor<B, 4>,
    ) -> Result<Tensor<B, 4>, SegnetError> {
        let upsampled = self.up.forward(x);

        let [batch, _, height, width] = upsampled.dims();
        if skip.dims() != [batch, self.skip_channels, height, width] {
            return Err(SegnetError::SkipMismatch {
                stage,
                upsampled: upsampled.dims(),
                skip: skip.dims(),
            });
        }

        // Upsampled channels come first; the first conv's kernel layout
        // depends on this order.
        let mut x = Tensor::cat(vec![upsampled, skip], 1);
        for conv in &self.convs {
            x = conv.forward(x);
        }
        Ok(x)
    }
}

#[derive(Config, Debug)]
pub struct DecoderStageConfig {
    in_channels: usize,
    skip_channels: usize,
    out_channels: usize,
    depth: usize,
}

impl DecoderStageConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DecoderStage<B> {
        let up_channels = self.in_channels / 2;

        let mut convs = Vec::with_capacity(self.depth);
        let mut in_channels = up_channels + self.skip_channels;
        for _ in 0..self.depth {
            convs.push(ConvBlockConfig::new(in_channels, self.out_channels).init(device));
            in_channels = self.out_channels;
        }

        DecoderStage {
            up: UpConvBlockConfig::new(self.in_channels, up_channels).init(device),
            convs,
            skip_channels: self.skip_channels,
        }
    }
}

/// Five-stage convolutional decoder mirroring [`crate::encoder::Encoder`],
/// ending in a 3x3 logit head and sigmoid probabilities.
#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    /// Indexed like the skips: stage 0 runs at full resolution. Forward
    /// walks them innermost-first.
    stages: Vec<DecoderStage<B>>,
    out_conv: Conv2d<B>,
    bottleneck_channels: usize,
}

#[derive(Config, Debug)]
pub struct DecoderConfig {
    /// Must match the encoder's `base_channels`.
    pub base_channels: usize,
    /// Channels of the produced maps, one per predicted class.
    pub out_channels: usize,
}

impl DecoderConfig {
    /// Initialize a decoder.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Decoder<B>, SegnetError> {
        if self.base_channels == 0 {
            return Err(SegnetError::ZeroChannels {
                name: "base_channels",
            });
        }
        if self.out_channels == 0 {
            return Err(SegnetError::ZeroChannels {
                name: "out_channels",
            });
        }

        let mut stages = Vec::with_capacity(NUM_STAGES);
        for (stage, (width, depth)) in STAGE_WIDTHS.iter().zip(STAGE_DEPTHS).enumerate() {
            let skip_channels = width * self.base_channels;
            // Stage 4 consumes the bottleneck, which shares its width.
            let in_channels = STAGE_WIDTHS[(stage + 1).min(NUM_STAGES - 1)] * self.base_channels;
            stages.push(
                DecoderStageConfig::new(in_channels, skip_channels, skip_channels, depth)
                    .init(device),
            );
        }

        Ok(Decoder {
            stages,
            out_conv: Conv2dConfig::new([self.base_channels, self.out_channels], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device),
            bottleneck_channels: STAGE_WIDTHS[NUM_STAGES - 1] * self.base_channels,
        })
    }
}

impl<B: Backend> Decoder<B> {
    /// Consumes an encoder bundle and produces the output maps.
    ///
    /// Every tensor in the bundle is checked against what its stage expects,
    /// so a bundle from an encoder with a different `base_channels` (or a
    /// hand-altered one) fails with a shape error instead of deep inside a
    /// convolution.
    pub fn forward(&self, features: EncoderFeatures<B>) -> Result<SegnetOutput<B>, SegnetError> {
        let EncoderFeatures { skips, bottleneck } = features;

        let shape = bottleneck.dims();
        if shape[1] != self.bottleneck_channels {
            return Err(SegnetError::BottleneckChannels {
                shape,
                expected: self.bottleneck_channels,
            });
        }

        let mut x = bottleneck;
        for (stage, (block, skip)) in self.stages.iter().zip(skips).enumerate().rev() {
            x = block.forward(stage, x, skip)?;
        }

        let logits = self.out_conv.forward(x);
        let probabilities = sigmoid(logits.clone());
        Ok(SegnetOutput {
            logits,
            probabilities,
        })
    }
}
