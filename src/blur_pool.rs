//! Anti-aliased downsampling.
//!
//! A strided convolution or max-pool aliases: shifting the input by one pixel
//! can change which samples survive. BlurPool low-pass filters first, with a
//! fixed binomial kernel applied depthwise, then subsamples with stride 2.
//!
//! Reference: Zhang, "Making Convolutional Networks Shift-Invariant Again"
//! (ICML 2019).

use burn::config::Config;
use burn::module::Module;
use burn::prelude::*;
use burn::tensor::module::conv2d;
use burn::tensor::ops::ConvOptions;

/// Configuration for [`BlurPool2d`].
#[derive(Config, Debug)]
pub struct BlurPool2dConfig {
    /// Number of channels. The kernel is depthwise, so channels never mix.
    pub channels: usize,
    /// Side length of the binomial kernel. Must be odd and within 1..=7;
    /// even sizes would need asymmetric padding.
    #[config(default = 3)]
    pub filt_size: usize,
    /// Subsampling stride.
    #[config(default = 2)]
    pub stride: usize,
}

/// Fixed binomial low-pass filter followed by subsampling.
#[derive(Module, Debug)]
pub struct BlurPool2d<B: Backend> {
    /// Non-trainable depthwise kernel of shape [channels, 1, filt, filt];
    /// entries sum to one per channel.
    kernel: Tensor<B, 4>,
    channels: usize,
    stride: usize,
    padding: usize,
}

impl BlurPool2dConfig {
    /// Initialize a BlurPool2d module.
    pub fn init<B: Backend>(&self, device: &B::Device) -> BlurPool2d<B> {
        assert!(
            self.filt_size % 2 == 1 && (1..=7).contains(&self.filt_size),
            "blur filter size must be odd and within 1..=7, got {}",
            self.filt_size
        );

        let plane = binomial_plane(self.filt_size);
        let mut weights = Vec::with_capacity(self.channels * plane.len());
        for _ in 0..self.channels {
            weights.extend_from_slice(&plane);
        }

        BlurPool2d {
            kernel: Tensor::<B, 1>::from_floats(weights.as_slice(), device).reshape([
                self.channels,
                1,
                self.filt_size,
                self.filt_size,
            ]),
            channels: self.channels,
            stride: self.stride,
            padding: (self.filt_size - 1) / 2,
        }
    }
}

impl<B: Backend> BlurPool2d<B> {
    /// Forward pass.
    ///
    /// Input shape: [batch, channels, height, width]
    /// Output shape: [batch, channels, ceil(height / stride), ceil(width / stride)]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        conv2d(
            x,
            self.kernel.clone(),
            None,
            ConvOptions::new(
                [self.stride, self.stride],
                [self.padding, self.padding],
                [1, 1],
                self.channels,
            ),
        )
    }
}

/// Normalized 2d binomial kernel as a flat row-major plane, e.g.
/// `[1 2 1] x [1 2 1] / 16` for size 3.
fn binomial_plane(filt_size: usize) -> Vec<f32> {
    let mut row = vec![1.0f32];
    for _ in 1..filt_size {
        let mut next = Vec::with_capacity(row.len() + 1);
        next.push(1.0);
        for pair in row.windows(2) {
            next.push(pair[0] + pair[1]);
        }
        next.push(1.0);
        row = next;
    }

    let sum: f32 = row.iter().sum();
    let mut plane = Vec::with_capacity(filt_size * filt_size);
    for a in &row {
        for b in &row {
            plane.push(a * b / (sum * sum));
        }
    }
    plane
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn halves_even_sizes_and_rounds_odd_sizes_up() {
        let device = Default::default();
        let pool = BlurPool2dConfig::new(3).init::<TestBackend>(&device);

        let even = Tensor::<TestBackend, 4>::ones([1, 3, 8, 6], &device);
        assert_eq!(pool.forward(even).dims(), [1, 3, 4, 3]);

        let odd = Tensor::<TestBackend, 4>::ones([1, 3, 7, 7], &device);
        assert_eq!(pool.forward(odd).dims(), [1, 3, 4, 4]);
    }

    #[test]
    fn preserves_constant_signal_inside_the_support() {
        let device = Default::default();
        let pool = BlurPool2dConfig::new(1).init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::ones([1, 1, 6, 6], &device);
        let output: Vec<f32> = pool.forward(input).into_data().to_vec().unwrap();

        // 3x3 output. The center tap sees only real samples, so the
        // normalized kernel reproduces the constant; the corner tap hangs
        // one row and one column into the zero padding and keeps 9/16.
        assert_eq!(output.len(), 9);
        assert!((output[4] - 1.0).abs() < 1e-6, "center {}", output[4]);
        assert!((output[0] - 9.0 / 16.0).abs() < 1e-6, "corner {}", output[0]);
    }

    #[test]
    fn channels_do_not_mix() {
        let device = Default::default();
        let pool = BlurPool2dConfig::new(2).init::<TestBackend>(&device);

        let ones = Tensor::<TestBackend, 4>::ones([1, 1, 4, 4], &device);
        let zeros = Tensor::<TestBackend, 4>::zeros([1, 1, 4, 4], &device);
        let output = pool.forward(Tensor::cat(vec![ones, zeros], 1));

        let values: Vec<f32> = output.into_data().to_vec().unwrap();
        let (first, second) = values.split_at(4);
        assert!(first.iter().all(|v| *v > 0.0));
        assert!(second.iter().all(|v| *v == 0.0));
    }

    #[test]
    #[should_panic(expected = "blur filter size")]
    fn rejects_even_filter_sizes() {
        let device = Default::default();
        let _ = BlurPool2dConfig::new(3)
            .with_filt_size(4)
            .init::<TestBackend>(&device);
    }
}
