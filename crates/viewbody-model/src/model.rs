//! Motion/body autoencoder with cross-reconstruction and transfer.
//!
//! ```text
//! x ──► mot_encoder ──► m (batch, Cm, T / 2^L) ─────────────┐
//!                                                            ├─ cat(dim=1) ─► decoder ─► x'
//! x ──► body_encoder ─► b (batch, Cb, 1) ─► repeat(T / 2^L) ─┘
//! ```
//!
//! Swapping `b` between two samples gives cross-reconstructions: one
//! sample's motion rendered with the other sample's body and view.

use candle_core::{Result, Tensor};
use candle_nn::VarBuilder;
use viewbody_core::ModelConfig;

use crate::decoder::{Decoder, DecoderConfig};
use crate::encoder::{Encoder, EncoderConfig};
use crate::ops::repeat_time;

/// The four decodings produced by [`AutoEncoder::cross`]
#[derive(Debug, Clone)]
pub struct CrossReconstruction {
    /// Motion of x1, body of x1
    pub out1: Tensor,
    /// Motion of x2, body of x2
    pub out2: Tensor,
    /// Motion of x1, body of x2
    pub out12: Tensor,
    /// Motion of x2, body of x1
    pub out21: Tensor,
}

impl CrossReconstruction {
    /// `(out1, out2, out12, out21)`
    pub fn into_tuple(self) -> (Tensor, Tensor, Tensor, Tensor) {
        (self.out1, self.out2, self.out12, self.out21)
    }
}

/// Reconstructions plus flattened latents for triplet supervision
#[derive(Debug, Clone)]
pub struct TripletOutput {
    /// `[out1, out2, out12, out21]`
    pub outputs: [Tensor; 4],
    /// `[m1, m2, m12, m21]`, each `(batch, Cm * T')`
    pub motion_vecs: [Tensor; 4],
    /// `[b1, b2, b21, b12]`, each `(batch, Cb)`.
    ///
    /// Slot 2 holds the body latent of `x21` and slot 3 that of `x12`, so each
    /// cross sample's body latent lines up with the source body it should
    /// match: `x21` carries x1's body, `x12` carries x2's.
    pub body_vecs: [Tensor; 4],
}

/// Motion encoder, body encoder and shared decoder
pub struct AutoEncoder {
    mot_encoder: Encoder,
    body_encoder: Encoder,
    decoder: Decoder,
    aux_channels: usize,
    config: ModelConfig,
}

impl AutoEncoder {
    /// Validate the channel layout, then build the three sub-networks under
    /// the `mot_encoder`, `body_encoder` and `decoder` prefixes.
    pub fn new(config: ModelConfig, vb: VarBuilder) -> viewbody_core::Result<Self> {
        config.validate()?;

        let mot_encoder = Encoder::new(
            EncoderConfig::motion(config.motion_channels.clone())
                .with_kernel_size(config.motion_kernel_size)
                .with_activation(config.activation.clone()),
            vb.pp("mot_encoder"),
        )?;
        let body_encoder = Encoder::new(
            EncoderConfig::body(config.body_channels.clone())
                .with_kernel_size(config.body_kernel_size)
                .with_activation(config.activation.clone()),
            vb.pp("body_encoder"),
        )?;
        let decoder = Decoder::new(
            DecoderConfig::new(config.decoder_channels.clone())
                .with_kernel_size(config.decoder_kernel_size)
                .with_activation(config.activation.clone()),
            vb.pp("decoder"),
        )?;

        let aux_channels = config.aux_channels();
        tracing::debug!(
            motion_layers = mot_encoder.num_layers(),
            body_layers = body_encoder.num_layers(),
            decoder_layers = decoder.num_layers(),
            aux_channels,
            input_size = config.input_size,
            "built autoencoder"
        );

        Ok(Self {
            mot_encoder,
            body_encoder,
            decoder,
            aux_channels,
            config,
        })
    }

    /// Reconstruct `x` from its own motion and body latents.
    ///
    /// The trailing auxiliary channels are dropped before the body encoder;
    /// they carry motion-only signal.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let m = self.encode_motion(x)?;
        let (_, c, _) = x.dims3()?;
        let body_input = x.narrow(1, 0, c.saturating_sub(self.aux_channels))?;
        let b = self.body_encoder.forward(&body_input)?;
        self.decode_latents(&m, &b)
    }

    /// Self- and cross-reconstructions of a pair of sequences
    pub fn cross(&self, x1: &Tensor, x2: &Tensor) -> Result<CrossReconstruction> {
        let m1 = self.encode_motion(x1)?;
        let b1 = self.encode_body(x1)?;
        let m2 = self.encode_motion(x2)?;
        let b2 = self.encode_body(x2)?;

        Ok(CrossReconstruction {
            out1: self.decode_latents(&m1, &b1)?,
            out2: self.decode_latents(&m2, &b2)?,
            out12: self.decode_latents(&m1, &b2)?,
            out21: self.decode_latents(&m2, &b1)?,
        })
    }

    /// As [`AutoEncoder::cross`], additionally encoding the externally
    /// supplied cross samples `x12` and `x21` as triplet targets.
    pub fn cross_with_triplet(
        &self,
        x1: &Tensor,
        x2: &Tensor,
        x12: &Tensor,
        x21: &Tensor,
    ) -> Result<TripletOutput> {
        let m1 = self.encode_motion(x1)?;
        let b1 = self.encode_body(x1)?;
        let m2 = self.encode_motion(x2)?;
        let b2 = self.encode_body(x2)?;

        let outputs = [
            self.decode_latents(&m1, &b1)?,
            self.decode_latents(&m2, &b2)?,
            self.decode_latents(&m1, &b2)?,
            self.decode_latents(&m2, &b1)?,
        ];

        let m12 = self.encode_motion(x12)?;
        let b12 = self.encode_body(x12)?;
        let m21 = self.encode_motion(x21)?;
        let b21 = self.encode_body(x21)?;

        let motion_vecs = [
            m1.flatten_from(1)?,
            m2.flatten_from(1)?,
            m12.flatten_from(1)?,
            m21.flatten_from(1)?,
        ];
        let body_vecs = [
            b1.flatten_from(1)?,
            b2.flatten_from(1)?,
            b21.flatten_from(1)?,
            b12.flatten_from(1)?,
        ];

        Ok(TripletOutput {
            outputs,
            motion_vecs,
            body_vecs,
        })
    }

    /// Motion of `x1` rendered with the body and view of `x2`
    pub fn transfer(&self, x1: &Tensor, x2: &Tensor) -> Result<Tensor> {
        let m1 = self.encode_motion(x1)?;
        let b2 = self.encode_body(x2)?;
        self.decode_latents(&m1, &b2)
    }

    /// Motion latent `(batch, Cm, T / 2^L)`
    pub fn encode_motion(&self, x: &Tensor) -> Result<Tensor> {
        self.mot_encoder.forward(x)
    }

    /// Body latent `(batch, Cb, 1)`.
    ///
    /// When the body branch is narrower than the input, only its leading
    /// channels are read.
    pub fn encode_body(&self, x: &Tensor) -> Result<Tensor> {
        let (_, c, _) = x.dims3()?;
        let body_in = self.body_encoder.in_channels();
        if c > body_in {
            self.body_encoder.forward(&x.narrow(1, 0, body_in)?)
        } else {
            self.body_encoder.forward(x)
        }
    }

    /// Repeat a body latent along time to `len` samples
    pub fn broadcast_body(&self, b: &Tensor, len: usize) -> Result<Tensor> {
        repeat_time(b, len)
    }

    /// Decode a motion latent together with a body latent broadcast to the
    /// motion latent's time length
    pub fn decode_latents(&self, m: &Tensor, b: &Tensor) -> Result<Tensor> {
        let (_, _, t) = m.dims3()?;
        let b = self.broadcast_body(b, t)?;
        let z = Tensor::cat(&[m, &b], 1)?;
        self.decoder.forward(&z)
    }

    /// Expected input time length, as given at construction
    pub fn input_size(&self) -> usize {
        self.config.input_size
    }

    pub fn aux_channels(&self) -> usize {
        self.aux_channels
    }

    pub fn mot_encoder(&self) -> &Encoder {
        &self.mot_encoder
    }

    pub fn body_encoder(&self) -> &Encoder {
        &self.body_encoder
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}
