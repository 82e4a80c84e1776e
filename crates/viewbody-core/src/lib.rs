//! # ViewBody-Core
//!
//! Shared error and configuration types for the motion/body disentangling
//! autoencoder.

pub mod config;
pub mod error;

pub use config::ModelConfig;
pub use error::{Error, Result};
