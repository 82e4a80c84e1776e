//! Time-axis helpers for `(batch, channel, time)` tensors that candle does not
//! ship as layers.

use candle_core::{bail, Result, Tensor};

/// Reflect-pad the time axis by `pad` samples on both sides.
///
/// The mirror excludes the edge sample itself, so `[a, b, c, d]` padded by 2
/// becomes `[c, b, a, b, c, d, c, b]`. The result is always contiguous.
pub fn reflect_pad1d(x: &Tensor, pad: usize) -> Result<Tensor> {
    let x = x.contiguous()?;
    if pad == 0 {
        return Ok(x);
    }
    let (_, _, t) = x.dims3()?;
    if pad >= t {
        bail!("reflect padding {} requires time length > {}, got {}", pad, pad, t);
    }

    let mut idx: Vec<u32> = Vec::with_capacity(t + 2 * pad);
    idx.extend((1..=pad).rev().map(|i| i as u32));
    idx.extend((0..t).map(|i| i as u32));
    idx.extend((t - 1 - pad..t - 1).rev().map(|i| i as u32));

    let len = idx.len();
    let idx = Tensor::from_vec(idx, len, x.device())?;
    x.index_select(&idx, 2)
}

/// Non-overlapping max-pool over time with window and stride 2. A trailing
/// odd sample is dropped.
pub fn max_pool1d(x: &Tensor) -> Result<Tensor> {
    let (_, _, t) = x.dims3()?;
    if t < 2 {
        bail!("max-pool of window 2 requires time length >= 2, got {}", t);
    }
    x.unsqueeze(2)?
        .max_pool2d_with_stride((1, 2), (1, 2))?
        .squeeze(2)
}

/// Collapse the whole time axis to a single sample per channel.
pub fn global_max_pool1d(x: &Tensor) -> Result<Tensor> {
    x.max_keepdim(2)
}

/// Repeat a length-1 time axis `len` times.
pub fn repeat_time(x: &Tensor, len: usize) -> Result<Tensor> {
    let (_, _, t) = x.dims3()?;
    if t != 1 {
        bail!("only a length-1 time axis can be repeated, got length {}", t);
    }
    x.repeat((1, 1, len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn ramp(t: usize) -> Result<Tensor> {
        Tensor::arange(0f32, t as f32, &Device::Cpu)?.reshape((1, 1, t))
    }

    #[test]
    fn test_reflect_pad_values() -> Result<()> {
        let x = ramp(4)?;
        let padded = reflect_pad1d(&x, 2)?;

        assert_eq!(padded.dims(), &[1, 1, 8]);
        assert_eq!(
            padded.flatten_all()?.to_vec1::<f32>()?,
            vec![2.0, 1.0, 0.0, 1.0, 2.0, 3.0, 2.0, 1.0]
        );
        Ok(())
    }

    #[test]
    fn test_reflect_pad_zero_is_identity() -> Result<()> {
        let x = ramp(5)?;
        let padded = reflect_pad1d(&x, 0)?;
        assert_eq!(padded.flatten_all()?.to_vec1::<f32>()?, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        Ok(())
    }

    #[test]
    fn test_reflect_pad_too_short() -> Result<()> {
        let x = ramp(3)?;
        assert!(reflect_pad1d(&x, 3).is_err());
        Ok(())
    }

    #[test]
    fn test_max_pool_halves_time() -> Result<()> {
        let x = ramp(5)?;
        let pooled = max_pool1d(&x)?;

        assert_eq!(pooled.dims(), &[1, 1, 2]);
        assert_eq!(pooled.flatten_all()?.to_vec1::<f32>()?, vec![1.0, 3.0]);
        Ok(())
    }

    #[test]
    fn test_global_max_pool_and_repeat() -> Result<()> {
        let x = Tensor::new(&[[[1f32, 5.0, 2.0], [-3.0, -1.0, -2.0]]], &Device::Cpu)?;
        let pooled = global_max_pool1d(&x)?;
        assert_eq!(pooled.dims(), &[1, 2, 1]);

        let repeated = repeat_time(&pooled, 4)?;
        assert_eq!(
            repeated.to_vec3::<f32>()?,
            vec![vec![vec![5.0; 4], vec![-1.0; 4]]]
        );
        Ok(())
    }
}
