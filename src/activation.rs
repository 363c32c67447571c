use burn::config::Config;
use burn::module::{Module, Param};
use burn::nn::Initializer;
use burn::prelude::*;
use burn::tensor::activation::relu;

/// Configuration for [`Tlu`].
#[derive(Config, Debug)]
pub struct TluConfig {
    /// Number of channels.
    pub channels: usize,
}

/// Thresholded Linear Unit: `max(x, tau)` with a learned per-channel
/// threshold. The natural companion of filter response normalization, which
/// removes the mean shift a plain ReLU relies on.
#[derive(Module, Debug)]
pub struct Tlu<B: Backend> {
    /// Per-channel threshold, shape [channels], starts at zero.
    tau: Param<Tensor<B, 1>>,
}

impl TluConfig {
    /// Initialize a TLU module.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Tlu<B> {
        Tlu {
            tau: Initializer::Zeros.init([self.channels], device),
        }
    }
}

impl<B: Backend> Tlu<B> {
    /// Applies `max(x, tau)`, with `tau` broadcast per channel.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_batch, channels, _height, _width] = x.dims();
        let tau = self.tau.val().reshape([1, channels, 1, 1]);
        relu(x - tau.clone()) + tau
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn zero_tau_acts_like_relu() {
        let device = Default::default();
        let tlu = TluConfig::new(2).init::<TestBackend>(&device);

        let input =
            Tensor::<TestBackend, 1>::from_floats([-1.5, 2.0], &device).reshape([1, 2, 1, 1]);
        let output: Vec<f32> = tlu.forward(input).into_data().to_vec().unwrap();

        assert_eq!(output, vec![0.0, 2.0]);
    }
}
