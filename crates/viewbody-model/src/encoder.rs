//! Temporal convolutional encoders for the motion and body branches.
//!
//! Both branches reduce a `(batch, channel, time)` sequence by a factor of
//! two per block, in one of two ways:
//! - Strided: reflect pad `(k - 2) / 2`, convolution with stride 2
//! - Pooled: reflect pad `(k - 1) / 2`, stride-1 convolution, max-pool of 2
//!
//! The body branch additionally max-pools the remaining time axis down to a
//! single descriptor per sample.

use candle_core::{Module, Result, Tensor};
use candle_nn::{conv1d, Conv1d, Conv1dConfig, VarBuilder};
use viewbody_core::Error;

use crate::activation::Activation;
use crate::ops::{global_max_pool1d, max_pool1d, reflect_pad1d};

/// Configuration for a temporal encoder
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Channel widths at each block boundary, input first
    pub channels: Vec<usize>,
    /// Convolution kernel size
    pub kernel_size: usize,
    /// Activation name (lrelu, relu, tanh)
    pub activation: String,
    /// Collapse the output time axis to length 1
    pub global_maxpool: bool,
    /// Downsample with max-pooling instead of strided convolution
    pub convpool: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            kernel_size: 8,
            activation: "lrelu".to_string(),
            global_maxpool: false,
            convpool: false,
        }
    }
}

impl EncoderConfig {
    /// Strided, time-resolved encoder used for the motion branch
    pub fn motion(channels: Vec<usize>) -> Self {
        Self {
            channels,
            ..Default::default()
        }
    }

    /// Pooled encoder with global max-pool used for the body branch
    pub fn body(channels: Vec<usize>) -> Self {
        Self {
            channels,
            kernel_size: 7,
            global_maxpool: true,
            convpool: true,
            ..Default::default()
        }
    }

    pub fn with_kernel_size(mut self, kernel_size: usize) -> Self {
        self.kernel_size = kernel_size;
        self
    }

    pub fn with_activation(mut self, activation: impl Into<String>) -> Self {
        self.activation = activation.into();
        self
    }

    fn padding(&self) -> usize {
        if self.convpool {
            (self.kernel_size - 1) / 2
        } else {
            self.kernel_size.saturating_sub(2) / 2
        }
    }
}

/// Reflect pad + convolution + activation, optionally followed by max-pool
struct DownBlock {
    conv: Conv1d,
    pad: usize,
    pool: bool,
}

impl DownBlock {
    fn forward(&self, x: &Tensor, activation: &Activation) -> Result<Tensor> {
        let x = reflect_pad1d(x, self.pad)?;
        let x = self.conv.forward(&x)?;
        let x = activation.forward(&x)?;
        if self.pool {
            max_pool1d(&x)
        } else {
            Ok(x)
        }
    }
}

/// Stack of downsampling blocks
pub struct Encoder {
    blocks: Vec<DownBlock>,
    activation: Activation,
    config: EncoderConfig,
}

impl Encoder {
    pub fn new(config: EncoderConfig, vb: VarBuilder) -> viewbody_core::Result<Self> {
        let activation: Activation = config.activation.parse()?;

        if config.channels.len() < 2 {
            return Err(Error::Config(format!(
                "encoder needs at least two channel widths, got {:?}",
                config.channels
            )));
        }
        if config.kernel_size == 0 {
            return Err(Error::Config("encoder kernel_size must be positive".into()));
        }

        let pad = config.padding();
        let conv_config = Conv1dConfig {
            padding: 0,
            stride: if config.convpool { 1 } else { 2 },
            ..Default::default()
        };

        let mut blocks = Vec::with_capacity(config.channels.len() - 1);
        for (i, pair) in config.channels.windows(2).enumerate() {
            let conv = conv1d(
                pair[0],
                pair[1],
                config.kernel_size,
                conv_config,
                vb.pp(format!("conv_{}", i)),
            )?;
            blocks.push(DownBlock {
                conv,
                pad,
                pool: config.convpool,
            });
        }

        tracing::debug!(
            channels = ?config.channels,
            kernel_size = config.kernel_size,
            convpool = config.convpool,
            global_maxpool = config.global_maxpool,
            "built encoder"
        );

        Ok(Self {
            blocks,
            activation,
            config,
        })
    }

    /// Encode a `(batch, in_channels, time)` sequence.
    ///
    /// Returns `(batch, out_channels, time / 2^L)`, or `(batch, out_channels, 1)`
    /// when global max-pooling is enabled.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let mut x = x.clone();
        for block in &self.blocks {
            x = block.forward(&x, &self.activation)?;
        }

        if self.config.global_maxpool {
            global_max_pool1d(&x)
        } else {
            Ok(x)
        }
    }

    /// Output time length for an input of `input_len` samples, or `None` if
    /// the stack would run out of samples.
    pub fn output_len(&self, input_len: usize) -> Option<usize> {
        let k = self.config.kernel_size;
        let pad = self.config.padding();
        let mut t = input_len;
        for _ in &self.blocks {
            if pad >= t && pad > 0 {
                return None;
            }
            t = if self.config.convpool {
                (t + 2 * pad + 1).checked_sub(k)? / 2
            } else {
                (t + 2 * pad).checked_sub(k)? / 2 + 1
            };
            if t == 0 {
                return None;
            }
        }
        if self.config.global_maxpool {
            Some(1)
        } else {
            Some(t)
        }
    }

    pub fn num_layers(&self) -> usize {
        self.blocks.len()
    }

    pub fn in_channels(&self) -> usize {
        self.config.channels[0]
    }

    pub fn out_channels(&self) -> usize {
        self.config.channels[self.config.channels.len() - 1]
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }
}
