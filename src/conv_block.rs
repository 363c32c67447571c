use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        PaddingConfig2d,
    },
    prelude::*,
};

use crate::activation::{Tlu, TluConfig};
use crate::norm::{FilterResponseNorm, FilterResponseNormConfig};

/// 3x3 stride-1 convolution with SAME padding, followed by FRN and TLU.
/// Spatial size is preserved.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    norm: FilterResponseNorm<B>,
    tlu: Tlu<B>,
}

impl<B: Backend> ConvBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.norm.forward(x);
        self.tlu.forward(x)
    }
}

#[derive(Config, Debug)]
pub struct ConvBlockConfig {
    in_channels: usize,
    out_channels: usize,
}

impl ConvBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvBlock<B> {
        ConvBlock {
            conv: Conv2dConfig::new([self.in_channels, self.out_channels], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device),
            norm: FilterResponseNormConfig::new(self.out_channels).init(device),
            tlu: TluConfig::new(self.out_channels).init(device),
        }
    }
}

/// 3x3 stride-2 transposed convolution followed by FRN and TLU. Padding and
/// output padding are fixed so the output spatial size is exactly twice the
/// input's.
#[derive(Module, Debug)]
pub struct UpConvBlock<B: Backend> {
    conv: ConvTranspose2d<B>,
    norm: FilterResponseNorm<B>,
    tlu: Tlu<B>,
}

impl<B: Backend> UpConvBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.norm.forward(x);
        self.tlu.forward(x)
    }
}

#[derive(Config, Debug)]
pub struct UpConvBlockConfig {
    in_channels: usize,
    out_channels: usize,
}

impl UpConvBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> UpConvBlock<B> {
        UpConvBlock {
            // (h - 1) * 2 - 2 * 1 + 3 + 1 = 2h
            conv: ConvTranspose2dConfig::new([self.in_channels, self.out_channels], [3, 3])
                .with_stride([2, 2])
                .with_padding([1, 1])
                .with_padding_out([1, 1])
                .init(device),
            norm: FilterResponseNormConfig::new(self.out_channels).init(device),
            tlu: TluConfig::new(self.out_channels).init(device),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn conv_block_keeps_spatial_size() {
        let device = Default::default();
        let block = ConvBlockConfig::new(3, 5).init::<TestBackend>(&device);
        let input = Tensor::<TestBackend, 4>::ones([2, 3, 8, 6], &device);
        assert_eq!(block.forward(input).dims(), [2, 5, 8, 6]);
    }

    #[test]
    fn up_conv_block_doubles_spatial_size() {
        let device = Default::default();
        let block = UpConvBlockConfig::new(4, 2).init::<TestBackend>(&device);
        let input = Tensor::<TestBackend, 4>::ones([1, 4, 5, 7], &device);
        assert_eq!(block.forward(input).dims(), [1, 2, 10, 14]);
    }
}
