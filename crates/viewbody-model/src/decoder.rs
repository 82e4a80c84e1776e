//! Upsampling decoder shared by every reconstruction path.

use candle_core::{Module, Result, Tensor};
use candle_nn::{conv1d, Conv1d, Conv1dConfig, VarBuilder};
use viewbody_core::Error;

use crate::activation::Activation;
use crate::ops::reflect_pad1d;

/// Configuration for the decoder
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Channel widths at each block boundary, latent first
    pub channels: Vec<usize>,
    /// Convolution kernel size
    pub kernel_size: usize,
    /// Activation name (lrelu, relu, tanh)
    pub activation: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            kernel_size: 7,
            activation: "lrelu".to_string(),
        }
    }
}

impl DecoderConfig {
    pub fn new(channels: Vec<usize>) -> Self {
        Self {
            channels,
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
}

/// Stack of nearest-neighbour x2 upsample + reflect pad + convolution blocks.
///
/// Every block but the last is followed by the activation; the last
/// convolution is the raw output.
pub struct Decoder {
    convs: Vec<Conv1d>,
    pad: usize,
    activation: Activation,
    config: DecoderConfig,
}

impl Decoder {
    pub fn new(config: DecoderConfig, vb: VarBuilder) -> viewbody_core::Result<Self> {
        let activation: Activation = config.activation.parse()?;

        if config.channels.len() < 2 {
            return Err(Error::Config(format!(
                "decoder needs at least two channel widths, got {:?}",
                config.channels
            )));
        }
        if config.kernel_size == 0 {
            return Err(Error::Config("decoder kernel_size must be positive".into()));
        }

        let conv_config = Conv1dConfig {
            padding: 0,
            stride: 1,
            ..Default::default()
        };

        let mut convs = Vec::with_capacity(config.channels.len() - 1);
        for (i, pair) in config.channels.windows(2).enumerate() {
            convs.push(conv1d(
                pair[0],
                pair[1],
                config.kernel_size,
                conv_config,
                vb.pp(format!("conv_{}", i)),
            )?);
        }

        tracing::debug!(
            channels = ?config.channels,
            kernel_size = config.kernel_size,
            "built decoder"
        );

        Ok(Self {
            convs,
            pad: (config.kernel_size - 1) / 2,
            activation,
            config,
        })
    }

    /// Decode a `(batch, latent_channels, time)` tensor into
    /// `(batch, out_channels, time * 2^L)`.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let last = self.convs.len() - 1;
        let mut x = x.clone();
        for (i, conv) in self.convs.iter().enumerate() {
            let (_, _, t) = x.dims3()?;
            x = x.upsample_nearest1d(t * 2)?;
            x = reflect_pad1d(&x, self.pad)?;
            x = conv.forward(&x)?;
            if i != last {
                x = self.activation.forward(&x)?;
            }
        }
        Ok(x)
    }

    /// Output time length for a latent of `input_len` samples
    pub fn output_len(&self, input_len: usize) -> usize {
        let k = self.config.kernel_size;
        let mut t = input_len;
        for _ in &self.convs {
            t = t * 2 + 2 * self.pad + 1 - k;
        }
        t
    }

    pub fn num_layers(&self) -> usize {
        self.convs.len()
    }

    pub fn in_channels(&self) -> usize {
        self.config.channels[0]
    }

    pub fn out_channels(&self) -> usize {
        self.config.channels[self.config.channels.len() - 1]
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    fn build(config: DecoderConfig, varmap: &VarMap) -> Result<Decoder> {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, &Device::Cpu);
        Decoder::new(config, vb).map_err(|e| candle_core::Error::Msg(e.to_string()))
    }

    #[test]
    fn test_decoder_shapes() -> Result<()> {
        let varmap = VarMap::new();
        let decoder = build(DecoderConfig::new(vec![256, 128, 64, 32]), &varmap)?;

        for t in [2, 8, 13] {
            let x = Tensor::randn(0f32, 1f32, (2, 256, t), &Device::Cpu)?;
            let out = decoder.forward(&x)?;
            assert_eq!(out.dims(), &[2, 32, t * 8]);
            assert_eq!(decoder.output_len(t), t * 8);
        }
        Ok(())
    }

    #[test]
    fn test_last_block_has_no_activation() -> Result<()> {
        // A relu after the last block would clamp every output to >= 0.
        let varmap = VarMap::new();
        let decoder = build(
            DecoderConfig::new(vec![8, 8, 4]).with_activation("relu"),
            &varmap,
        )?;

        let x = Tensor::randn(0f32, 1f32, (4, 8, 8), &Device::Cpu)?;
        let out = decoder.forward(&x)?;
        let min = out.flatten_all()?.min(0)?.to_scalar::<f32>()?;
        assert!(min < 0.0);
        Ok(())
    }

    #[test]
    fn test_unknown_activation() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let config = DecoderConfig::new(vec![16, 8]).with_activation("sigmoid");

        assert!(matches!(
            Decoder::new(config, vb),
            Err(Error::UnknownActivation(_))
        ));
    }
}
