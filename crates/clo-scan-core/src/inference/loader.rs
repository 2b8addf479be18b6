//! Safetensors weight loading.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use safetensors::SafeTensors;
use tracing::debug;

/// Reads a safetensors file into a `VarBuilder` on the given device.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the safetensors payload is
/// invalid, or a tensor uses an unsupported dtype.
pub fn load_weights(path: impl AsRef<Path>, device: &Device) -> Result<VarBuilder<'static>> {
    let path = path.as_ref();
    debug!("Loading weights from {}", path.display());

    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read weights file: {}", path.display()))?;

    let tensors = SafeTensors::deserialize(&data)
        .with_context(|| format!("Failed to parse safetensors: {}", path.display()))?;

    let mut tensor_map: HashMap<String, Tensor> = HashMap::with_capacity(tensors.len());
    for (name, view) in tensors.tensors() {
        let tensor = Tensor::from_raw_buffer(
            view.data(),
            candle_dtype(view.dtype())?,
            view.shape(),
            device,
        )
        .with_context(|| format!("Failed to create tensor '{name}'"))?;
        tensor_map.insert(name, tensor);
    }

    Ok(VarBuilder::from_tensors(tensor_map, DType::F32, device))
}

/// Maps a safetensors dtype onto the candle equivalent.
fn candle_dtype(dtype: safetensors::Dtype) -> Result<DType> {
    use safetensors::Dtype as S;
    match dtype {
        S::F32 => Ok(DType::F32),
        S::F64 => Ok(DType::F64),
        S::F16 => Ok(DType::F16),
        S::BF16 => Ok(DType::BF16),
        S::I64 => Ok(DType::I64),
        S::U8 => Ok(DType::U8),
        S::U32 => Ok(DType::U32),
        other => anyhow::bail!("Unsupported dtype: {other:?}"),
    }
}
