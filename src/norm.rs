//! Filter Response Normalization (FRN).
//!
//! FRN normalizes each channel of a feature map by its own second moment,
//! computed over the spatial dimensions of each sample independently:
//!
//!   nu2 = mean(x^2) over (height, width)
//!   y   = gamma * x / sqrt(nu2 + |eps|) + beta
//!
//! There is no mean-centering and no running statistic, so the layer behaves
//! identically in training and inference and is independent of batch size.
//! `eps` is itself learned (initialized small) which keeps the denominator
//! well behaved when the spatial extent collapses to 1x1.
//!
//! Reference: Singh & Krishnan, "Filter Response Normalization Layer:
//! Eliminating Batch Dependence in the Training of Deep Neural Networks"
//! (CVPR 2020).

use burn::config::Config;
use burn::module::{Module, Param};
use burn::nn::Initializer;
use burn::prelude::*;

/// Configuration for [`FilterResponseNorm`].
#[derive(Config, Debug)]
pub struct FilterResponseNormConfig {
    /// Number of channels.
    pub channels: usize,
    /// Initial value of the learned epsilon.
    #[config(default = 1e-6)]
    pub epsilon: f64,
}

/// Filter Response Normalization over a `[batch, channels, height, width]`
/// tensor.
#[derive(Module, Debug)]
pub struct FilterResponseNorm<B: Backend> {
    /// Per-channel scale, shape [channels], starts at one.
    weight: Param<Tensor<B, 1>>,
    /// Per-channel bias, shape [channels], starts at zero.
    bias: Param<Tensor<B, 1>>,
    /// Learned epsilon, shape [1], used through `abs()`.
    epsilon: Param<Tensor<B, 1>>,
}

impl FilterResponseNormConfig {
    /// Initialize an FRN module.
    pub fn init<B: Backend>(&self, device: &B::Device) -> FilterResponseNorm<B> {
        FilterResponseNorm {
            weight: Initializer::Ones.init([self.channels], device),
            bias: Initializer::Zeros.init([self.channels], device),
            epsilon: Initializer::Constant {
                value: self.epsilon,
            }
            .init([1], device),
        }
    }
}

impl<B: Backend> FilterResponseNorm<B> {
    /// Forward pass.
    ///
    /// Input shape: [batch, channels, height, width]
    /// Output shape: same as input.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_batch, channels, _height, _width] = x.dims();

        // Second moment per sample and channel, kept as [B, C, 1, 1] so it
        // broadcasts against [B, C, H, W].
        let nu2 = (x.clone() * x.clone()).mean_dim(2).mean_dim(3);
        let epsilon = self.epsilon.val().abs().reshape([1, 1, 1, 1]);
        let x = x / (nu2 + epsilon).sqrt();

        let weight = self.weight.val().reshape([1, channels, 1, 1]);
        let bias = self.bias.val().reshape([1, channels, 1, 1]);
        x * weight + bias
    }
}
