//! # ViewBody-Model
//!
//! Disentangles motion from body/view in sequences of pose features and
//! recombines them for cross-reconstruction and identity transfer.
//!
//! ## Architecture Overview
//!
//! 1. **Motion Encoder**: strided 1D convolutions, keeps a short time axis
//! 2. **Body Encoder**: convolution + max-pool blocks, then a global max-pool
//!    down to one descriptor per sample
//! 3. **Decoder**: nearest upsample + convolution blocks over the
//!    concatenation of the motion latent and the time-broadcast body latent
//!
//! Inputs and outputs are `(batch, channel, time)` tensors. Training, losses
//! and data loading belong to the caller; parameters are exposed through
//! `candle_nn::VarMap`.

pub mod activation;
pub mod decoder;
pub mod encoder;
pub mod inference;
pub mod model;
pub mod ops;

pub use activation::*;
pub use decoder::*;
pub use encoder::*;
pub use inference::*;
pub use model::*;
