//! Segnet-style encoder-decoder network for dense segmentation, built on
//! [burn](https://burn.dev).
//!
//! The encoder walks an image down five blur-pooled resolution stages,
//! capturing a skip tensor per stage; the decoder mirrors the stages with
//! transposed convolutions, concatenating each skip back in, and ends in a
//! per-pixel logit map plus its sigmoid. Every learned convolution is
//! followed by filter response normalization and a thresholded linear unit,
//! so the network carries no batch statistics.

mod error;
pub use error::SegnetError;

pub mod activation;
pub mod blur_pool;
pub mod conv_block;
pub mod norm;

pub mod decoder;
pub mod encoder;

mod model;
pub use model::*;
