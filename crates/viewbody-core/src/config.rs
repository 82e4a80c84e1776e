//! Model configuration.
//!
//! Channel widths are listed per layer boundary, so a list of length `n`
//! describes `n - 1` convolutional blocks. The two encoders read the same
//! input sequence and the decoder rebuilds it, which ties the three lists
//! together (see [`ModelConfig::validate`]).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Channel layout and layer hyperparameters for the autoencoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Motion encoder widths, input first
    pub motion_channels: Vec<usize>,

    /// Body encoder widths, input first
    pub body_channels: Vec<usize>,

    /// Decoder widths, latent first
    pub decoder_channels: Vec<usize>,

    /// Expected input time length. Documents the data layout only; it does
    /// not change the layer structure.
    pub input_size: usize,

    /// Kernel size of the strided motion encoder
    pub motion_kernel_size: usize,

    /// Kernel size of the pooled body encoder
    pub body_kernel_size: usize,

    /// Kernel size of the decoder
    pub decoder_kernel_size: usize,

    /// Activation name shared by all blocks (lrelu, relu, tanh)
    pub activation: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            motion_channels: vec![32, 48, 96, 128],
            body_channels: vec![30, 48, 96, 128],
            decoder_channels: vec![256, 128, 64, 32],
            input_size: 64,
            motion_kernel_size: 8,
            body_kernel_size: 7,
            decoder_kernel_size: 7,
            activation: "lrelu".to_string(),
        }
    }
}

impl ModelConfig {
    /// Create a configuration from the three channel lists, keeping default
    /// kernel sizes and activation
    pub fn new(
        motion_channels: Vec<usize>,
        body_channels: Vec<usize>,
        decoder_channels: Vec<usize>,
        input_size: usize,
    ) -> Self {
        Self {
            motion_channels,
            body_channels,
            decoder_channels,
            input_size,
            ..Default::default()
        }
    }

    /// Set the activation name
    pub fn with_activation(mut self, activation: impl Into<String>) -> Self {
        self.activation = activation.into();
        self
    }

    /// Check the channel-compatibility invariant.
    ///
    /// * every list has at least two positive widths
    /// * `motion_channels[0] == decoder_channels[last]`
    /// * `body_channels[0] <= motion_channels[0]`; the difference is the
    ///   number of trailing motion-only channels
    /// * `motion_channels[last] + body_channels[last] == decoder_channels[0]`
    pub fn validate(&self) -> Result<()> {
        check_widths("motion_channels", &self.motion_channels)?;
        check_widths("body_channels", &self.body_channels)?;
        check_widths("decoder_channels", &self.decoder_channels)?;

        let mot_in = self.motion_channels[0];
        let body_in = self.body_channels[0];
        let mot_out = self.motion_channels[self.motion_channels.len() - 1];
        let body_out = self.body_channels[self.body_channels.len() - 1];
        let de_in = self.decoder_channels[0];
        let de_out = self.decoder_channels[self.decoder_channels.len() - 1];

        if mot_in != de_out {
            return Err(Error::ChannelMismatch(format!(
                "motion encoder reads {} channels but decoder produces {}",
                mot_in, de_out
            )));
        }

        if body_in > mot_in {
            return Err(Error::ChannelMismatch(format!(
                "body encoder reads {} channels, more than the {}-channel input",
                body_in, mot_in
            )));
        }

        if mot_out + body_out != de_in {
            return Err(Error::ChannelMismatch(format!(
                "motion latent ({}) + body latent ({}) = {} but decoder expects {}",
                mot_out,
                body_out,
                mot_out + body_out,
                de_in
            )));
        }

        for (name, k) in [
            ("motion_kernel_size", self.motion_kernel_size),
            ("body_kernel_size", self.body_kernel_size),
            ("decoder_kernel_size", self.decoder_kernel_size),
        ] {
            if k == 0 {
                return Err(Error::Config(format!("{} must be positive", name)));
            }
        }

        Ok(())
    }

    /// Number of trailing input channels seen only by the motion branch
    pub fn aux_channels(&self) -> usize {
        match (self.motion_channels.first(), self.body_channels.first()) {
            (Some(m), Some(b)) => m.saturating_sub(*b),
            _ => 0,
        }
    }

    /// Input channel width shared by the motion encoder and decoder output
    pub fn input_channels(&self) -> usize {
        self.motion_channels.first().copied().unwrap_or(0)
    }

    /// Load configuration from file, with `VIEWBODY_*` environment overrides
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(environment())
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load from environment variables, defaults filling unset fields
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(environment())
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("VIEWBODY")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("motion_channels")
        .with_list_parse_key("body_channels")
        .with_list_parse_key("decoder_channels")
}

fn check_widths(name: &str, channels: &[usize]) -> Result<()> {
    if channels.len() < 2 {
        return Err(Error::Config(format!(
            "{} needs at least two widths, got {}",
            name,
            channels.len()
        )));
    }
    if channels.contains(&0) {
        return Err(Error::Config(format!("{} contains a zero width", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ModelConfig::default();
        assert_eq!(config.input_channels(), 32);
        assert_eq!(config.aux_channels(), 2);
        assert_eq!(config.activation, "lrelu");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_latent_width_mismatch() {
        let config = ModelConfig::new(
            vec![32, 48, 96, 128],
            vec![30, 48, 96, 64],
            vec![256, 128, 64, 32],
            64,
        );
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::ChannelMismatch(_)));
        assert!(err.to_string().contains("decoder expects 256"));
    }

    #[test]
    fn test_decoder_output_mismatch() {
        let config = ModelConfig::new(
            vec![32, 48, 96, 128],
            vec![32, 48, 96, 128],
            vec![256, 128, 64, 16],
            64,
        );
        assert!(matches!(config.validate(), Err(Error::ChannelMismatch(_))));
    }

    #[test]
    fn test_body_wider_than_input() {
        let config = ModelConfig::new(
            vec![32, 64],
            vec![40, 64],
            vec![128, 32],
            16,
        );
        assert!(matches!(config.validate(), Err(Error::ChannelMismatch(_))));
    }

    #[test]
    fn test_short_channel_list() {
        let config = ModelConfig::new(vec![32], vec![32, 64], vec![96, 32], 16);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ModelConfig =
            serde_json::from_str(r#"{ "activation": "tanh", "input_size": 128 }"#).unwrap();
        assert_eq!(config.activation, "tanh");
        assert_eq!(config.input_size, 128);
        assert_eq!(config.decoder_channels, vec![256, 128, 64, 32]);
    }

    #[test]
    fn test_from_file() -> Result<()> {
        let path = std::env::temp_dir().join("viewbody_model_config_test.json");
        std::fs::write(
            &path,
            r#"{
                "motion_channels": [16, 32],
                "body_channels": [16, 32],
                "decoder_channels": [64, 16],
                "input_size": 32,
                "activation": "relu"
            }"#,
        )
        .unwrap();

        let config = ModelConfig::from_file(path.to_str().unwrap())?;
        std::fs::remove_file(&path).ok();

        assert_eq!(config.motion_channels, vec![16, 32]);
        assert_eq!(config.aux_channels(), 0);
        assert_eq!(config.motion_kernel_size, 8);
        config.validate()
    }
}
