//! Inference engine owning the device, parameters and model.

use std::path::Path;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use serde::{Deserialize, Serialize};
use viewbody_core::{Error, ModelConfig, Result};

use crate::model::{AutoEncoder, CrossReconstruction};

/// Inference engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Model configuration
    pub model: ModelConfig,
    /// Device to run inference on
    pub device: DeviceType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    #[default]
    Cpu,
    Cuda(usize),
    Metal,
}

/// Autoencoder bound to a device and its parameter store
pub struct InferenceEngine {
    model: AutoEncoder,
    device: Device,
    varmap: Option<VarMap>,
    config: InferenceConfig,
}

impl InferenceEngine {
    /// Create an engine with freshly initialized weights.
    ///
    /// The parameters stay reachable through [`InferenceEngine::varmap`] so an
    /// external trainer can optimize them.
    pub fn new_random(config: InferenceConfig) -> Result<Self> {
        let device = Self::get_device(config.device)?;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let model = AutoEncoder::new(config.model.clone(), vb)?;
        tracing::info!(
            device = ?config.device,
            parameters = varmap.all_vars().len(),
            "initialized autoencoder with random weights"
        );

        Ok(Self {
            model,
            device,
            varmap: Some(varmap),
            config,
        })
    }

    /// Load model weights from safetensors files
    pub fn load<P: AsRef<Path>>(paths: &[P], config: InferenceConfig) -> Result<Self> {
        let device = Self::get_device(config.device)?;

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(paths, DType::F32, &device) }
            .map_err(|e| Error::ModelLoad(e.to_string()))?;

        let model = AutoEncoder::new(config.model.clone(), vb)?;
        tracing::info!(
            device = ?config.device,
            files = paths.len(),
            "loaded autoencoder weights"
        );

        Ok(Self {
            model,
            device,
            varmap: None,
            config,
        })
    }

    fn get_device(device_type: DeviceType) -> Result<Device> {
        let device = match device_type {
            DeviceType::Cpu => Device::Cpu,
            DeviceType::Cuda(ordinal) => Device::new_cuda(ordinal)?,
            DeviceType::Metal => Device::new_metal(0)?,
        };
        Ok(device)
    }

    /// Wrap a row-major `(batch, channels, time)` buffer as an input tensor
    pub fn input_from_vec(&self, data: Vec<f32>, batch: usize, time: usize) -> Result<Tensor> {
        let channels = self.config.model.input_channels();
        let expected = batch * channels * time;
        if data.len() != expected {
            return Err(Error::InvalidInput(format!(
                "buffer of {} values does not fill ({}, {}, {})",
                data.len(),
                batch,
                channels,
                time
            )));
        }
        Ok(Tensor::from_vec(data, (batch, channels, time), &self.device)?)
    }

    /// Self-reconstruction of `x`
    pub fn reconstruct(&self, x: &Tensor) -> Result<Tensor> {
        let start = Instant::now();
        let out = self.model.forward(x)?;
        tracing::debug!(
            shape = ?x.dims(),
            latency_ms = start.elapsed().as_secs_f64() * 1e3,
            "reconstruct"
        );
        Ok(out)
    }

    /// Self- and cross-reconstructions of a pair
    pub fn cross(&self, x1: &Tensor, x2: &Tensor) -> Result<CrossReconstruction> {
        let start = Instant::now();
        let out = self.model.cross(x1, x2)?;
        tracing::debug!(
            shape = ?x1.dims(),
            latency_ms = start.elapsed().as_secs_f64() * 1e3,
            "cross"
        );
        Ok(out)
    }

    /// Motion of `x1` with the body of `x2`
    pub fn transfer(&self, x1: &Tensor, x2: &Tensor) -> Result<Tensor> {
        let start = Instant::now();
        let out = self.model.transfer(x1, x2)?;
        tracing::debug!(
            shape = ?x1.dims(),
            latency_ms = start.elapsed().as_secs_f64() * 1e3,
            "transfer"
        );
        Ok(out)
    }

    /// Trainable parameters, when the engine was created with random weights
    pub fn varmap(&self) -> Option<&VarMap> {
        self.varmap.as_ref()
    }

    pub fn model(&self) -> &AutoEncoder {
        &self.model
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }
}
