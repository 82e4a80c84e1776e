//! Element-wise nonlinearities selectable by name.

use std::str::FromStr;

use candle_core::{Module, Result, Tensor};
use viewbody_core::Error;

/// Negative slope used for the `lrelu` activation
pub const LEAKY_RELU_SLOPE: f64 = 0.2;

/// Nonlinearity applied after each convolutional block
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation {
    LeakyRelu(f64),
    Relu,
    Tanh,
}

impl FromStr for Activation {
    type Err = Error;

    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        match name {
            "lrelu" => Ok(Activation::LeakyRelu(LEAKY_RELU_SLOPE)),
            "relu" => Ok(Activation::Relu),
            "tanh" => Ok(Activation::Tanh),
            other => Err(Error::UnknownActivation(other.to_string())),
        }
    }
}

impl Module for Activation {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        match self {
            Activation::LeakyRelu(slope) => candle_nn::ops::leaky_relu(xs, *slope),
            Activation::Relu => xs.relu(),
            Activation::Tanh => xs.tanh(),
        }
    }
}
