//! Model loading utilities for safetensors format.

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use safetensors::SafeTensors;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use super::ClassifierConfig;

/// Loads a safetensors file and creates a `VarBuilder` for the model.
///
/// # Arguments
///
/// * `path` - Path to the safetensors file
/// * `device` - Device to load tensors onto
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The safetensors data is invalid
pub fn load_safetensors(path: impl AsRef<Path>, device: &Device) -> Result<VarBuilder<'static>> {
    let path = path.as_ref();
    debug!("Loading safetensors from {}", path.display());

    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read model file: {}", path.display()))?;

    let tensors = SafeTensors::deserialize(&data)
        .with_context(|| format!("Failed to parse safetensors: {}", path.display()))?;

    // Convert to HashMap<String, Tensor> for VarBuilder
    let mut tensor_map: HashMap<String, Tensor> = HashMap::new();

    for name in tensors.names() {
        let tensor_view = tensors
            .tensor(name)
            .with_context(|| format!("Failed to get tensor '{name}'"))?;

        let dtype = safetensors_dtype_to_candle(tensor_view.dtype())?;
        let shape: Vec<usize> = tensor_view.shape().to_vec();

        let tensor = Tensor::from_raw_buffer(tensor_view.data(), dtype, &shape, device)
            .with_context(|| format!("Failed to create tensor '{name}'"))?;

        tensor_map.insert(name.to_string(), tensor);
    }

    // VarBuilder::from_tensors takes ownership
    Ok(VarBuilder::from_tensors(tensor_map, DType::F32, device))
}

/// Loads the classifier configuration for a model artifact.
///
/// Looks for a sidecar JSON file next to the weights (same stem, `.json`
/// extension). Falls back to [`ClassifierConfig::default`] when no sidecar
/// exists, which matches models produced by `crackscan train` with default
/// flags.
///
/// # Errors
///
/// Returns an error if a sidecar file exists but cannot be read or parsed.
pub fn load_classifier_config(model_path: impl AsRef<Path>) -> Result<ClassifierConfig> {
    let config_path = model_path.as_ref().with_extension("json");
    if !config_path.exists() {
        debug!(
            "No sidecar config at {}, using default architecture",
            config_path.display()
        );
        return Ok(ClassifierConfig::default());
    }

    let data = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read model config: {}", config_path.display()))?;
    let config: ClassifierConfig = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse model config: {}", config_path.display()))?;
    Ok(config)
}

/// Converts safetensors dtype to candle dtype.
fn safetensors_dtype_to_candle(dtype: safetensors::Dtype) -> Result<DType> {
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
