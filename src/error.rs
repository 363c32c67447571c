use thiserror::Error;

/// Structural failures raised while building the network or running a
/// forward pass. None of these are retryable; they point at a caller defect
/// in either the configuration or the shape of a supplied tensor.
#[derive(Debug, Error)]
pub enum SegnetError {
    /// A channel count in a config was zero.
    #[error("{name} must be a positive channel count")]
    ZeroChannels { name: &'static str },

    /// Input height or width cannot survive the five downsampling stages.
    #[error("input shape {shape:?} has spatial dimensions not divisible by {divisor}")]
    IndivisibleInput { shape: [usize; 4], divisor: usize },

    /// Input channel count differs from the one the encoder was built for.
    #[error("input shape {shape:?} does not carry the {expected} channels the encoder expects")]
    InputChannels { shape: [usize; 4], expected: usize },

    /// Bottleneck width differs from the one the decoder was built for.
    #[error("bottleneck shape {shape:?} does not carry the {expected} channels the decoder expects")]
    BottleneckChannels { shape: [usize; 4], expected: usize },

    /// A skip tensor cannot be concatenated with the upsampled tensor at the
    /// named decoder stage.
    #[error(
        "decoder stage {stage}: skip tensor of shape {skip:?} does not match \
         upsampled tensor of shape {upsampled:?}"
    )]
    SkipMismatch {
        stage: usize,
        upsampled: [usize; 4],
        skip: [usize; 4],
    },
}
