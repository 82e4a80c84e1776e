//! Error types for the ViewBody autoencoder.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown activation '{0}': expected one of lrelu, relu, tanh")]
    UnknownActivation(String),

    #[error("Channel mismatch: {0}")]
    ChannelMismatch(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model loading error: {0}")]
    ModelLoad(String),

    #[error("Tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}
