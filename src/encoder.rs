use burn::prelude::*;

use crate::blur_pool::{BlurPool2d, BlurPool2dConfig};
use crate::conv_block::{ConvBlock, ConvBlockConfig};
use crate::error::SegnetError;

/// Number of resolution stages.
pub const NUM_STAGES: usize = 5;

/// Factor the input's height and width must be divisible by: each stage
/// halves the resolution once.
pub const SPATIAL_DIVISOR: usize = 1 << NUM_STAGES;

/// Channel width of each stage, as a multiple of `base_channels`.
pub(crate) const STAGE_WIDTHS: [usize; NUM_STAGES] = [1, 2, 4, 8, 8];

/// Number of ConvBlocks in each stage. The decoder mirrors these.
pub(crate) const STAGE_DEPTHS: [usize; NUM_STAGES] = [2, 2, 3, 3, 3];

/// One encoder stage: a run of ConvBlocks whose output doubles as the skip
/// tensor, then a blur-pooled descent to the next resolution.
#[derive(Module, Debug)]
pub struct EncoderStage<B: Backend> {
    convs: Vec<ConvBlock<B>>,
    downsample: BlurPool2d<B>,
}

impl<B: Backend> EncoderStage<B> {
    /// Returns the stage features (the skip tensor, at the incoming
    /// resolution) and their blur-pooled half-resolution version.
    pub fn forward(&self, mut x: Tensor<B, 4>) -> (Tensor<B, 4>, Tensor<B, 4>) {
        for conv in &self.convs {
            x = conv.forward(x);
        }
        let pooled = self.downsample.forward(x.clone());
        (x, pooled)
    }
}

#[derive(Config, Debug)]
pub struct EncoderStageConfig {
    in_channels: usize,
    out_channels: usize,
    depth: usize,
}

impl EncoderStageConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> EncoderStage<B> {
        let mut convs = Vec::with_capacity(self.depth);
        let mut in_channels = self.in_channels;
        for _ in 0..self.depth {
            convs.push(ConvBlockConfig::new(in_channels, self.out_channels).init(device));
            in_channels = self.out_channels;
        }

        EncoderStage {
            convs,
            downsample: BlurPool2dConfig::new(self.out_channels).init(device),
        }
    }
}

/// Everything the encoder hands to the decoder: one skip tensor per stage
/// plus the bottleneck. Tensors are reference-counted handles, so moving the
/// bundle moves no pixel data, and the decoder only reads it.
#[derive(Debug, Clone)]
pub struct EncoderFeatures<B: Backend> {
    /// Skip tensor captured at the end of stage `i`, before its blur-pool:
    /// width `base_channels * STAGE_WIDTHS[i]`, resolution `1/2^i` of the
    /// input.
    pub skips: [Tensor<B, 4>; NUM_STAGES],
    /// Bottleneck features at `1/32` of the input resolution, width
    /// `base_channels * 8`.
    pub bottleneck: Tensor<B, 4>,
}

/// Five-stage convolutional encoder with anti-aliased downsampling.
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    stages: Vec<EncoderStage<B>>,
    center: ConvBlock<B>,
    in_channels: usize,
}

#[derive(Config, Debug)]
pub struct EncoderConfig {
    /// Channels of the input image.
    pub in_channels: usize,
    /// Width of the first stage; deeper stages are fixed multiples of it.
    pub base_channels: usize,
}

impl EncoderConfig {
    /// Initialize an encoder.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Encoder<B>, SegnetError> {
        if self.in_channels == 0 {
            return Err(SegnetError::ZeroChannels {
                name: "in_channels",
            });
        }
        if self.base_channels == 0 {
            return Err(SegnetError::ZeroChannels {
                name: "base_channels",
            });
        }

        let mut stages = Vec::with_capacity(NUM_STAGES);
        let mut in_channels = self.in_channels;
        for (width, depth) in STAGE_WIDTHS.iter().zip(STAGE_DEPTHS) {
            let out_channels = width * self.base_channels;
            stages.push(EncoderStageConfig::new(in_channels, out_channels, depth).init(device));
            in_channels = out_channels;
        }

        Ok(Encoder {
            stages,
            // in_channels is now the deepest stage width; the bottleneck
            // keeps it.
            center: ConvBlockConfig::new(in_channels, in_channels).init(device),
            in_channels: self.in_channels,
        })
    }
}

impl<B: Backend> Encoder<B> {
    /// Runs the five stages and the bottleneck block.
    ///
    /// The input must be `[batch, in_channels, height, width]` with height
    /// and width divisible by [`SPATIAL_DIVISOR`]; anything else is rejected
    /// before the first convolution runs.
    pub fn forward(&self, input: Tensor<B, 4>) -> Result<EncoderFeatures<B>, SegnetError> {
        let shape = input.dims();
        let [_, channels, height, width] = shape;
        if channels != self.in_channels {
            return Err(SegnetError::InputChannels {
                shape,
                expected: self.in_channels,
            });
        }
        if height == 0
            || width == 0
            || height % SPATIAL_DIVISOR != 0
            || width % SPATIAL_DIVISOR != 0
        {
            return Err(SegnetError::IndivisibleInput {
                shape,
                divisor: SPATIAL_DIVISOR,
            });
        }

        let mut x = input;
        let mut skips = Vec::with_capacity(NUM_STAGES);
        for stage in &self.stages {
            let (skip, pooled) = stage.forward(x);
            skips.push(skip);
            x = pooled;
        }
        let bottleneck = self.center.forward(x);

        let Ok(skips) = <[Tensor<B, 4>; NUM_STAGES]>::try_from(skips) else {
            unreachable!("one skip tensor per encoder stage");
        };

        Ok(EncoderFeatures { skips, bottleneck })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn skip_widths_and_resolutions_follow_the_stage_schedule() {
        let device = Default::default();
        let encoder = EncoderConfig::new(3, 4)
            .init::<TestBackend>(&device)
            .unwrap();

        let input = Tensor::<TestBackend, 4>::ones([1, 3, 64, 64], &device);
        let features = encoder.forward(input).unwrap();

        for (stage, skip) in features.skips.iter().enumerate() {
            let width = STAGE_WIDTHS[stage] * 4;
            let size = 64 >> stage;
            assert_eq!(skip.dims(), [1, width, size, size], "stage {stage}");
        }
        assert_eq!(features.bottleneck.dims(), [1, 32, 2, 2]);
    }

    #[test]
    fn rejects_input_not_divisible_by_32() {
        let device = Default::default();
        let encoder = EncoderConfig::new(1, 2)
            .init::<TestBackend>(&device)
            .unwrap();

        let input = Tensor::<TestBackend, 4>::ones([1, 1, 48, 64], &device);
        let err = encoder.forward(input).unwrap_err();
        assert!(matches!(err, SegnetError::IndivisibleInput { .. }), "{err}");
    }

    #[test]
    fn rejects_wrong_input_channels() {
        let device = Default::default();
        let encoder = EncoderConfig::new(3, 2)
            .init::<TestBackend>(&device)
            .unwrap();

        let input = Tensor::<TestBackend, 4>::ones([1, 4, 32, 32], &device);
        let err = encoder.forward(input).unwrap_err();
        assert!(matches!(err, SegnetError::InputChannels { .. }), "{err}");
    }

    #[test]
    fn rejects_zero_channel_configs() {
        let device = Default::default();
        assert!(EncoderConfig::new(0, 4).init::<TestBackend>(&device).is_err());
        assert!(EncoderConfig::new(3, 0).init::<TestBackend>(&device).is_err());
    }
}
