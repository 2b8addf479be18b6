//! Device selection for inference.

use anyhow::{Context, Result};
use candle_core::Device;
use tracing::info;

/// Resolves a device specification to a Candle device.
///
/// Accepted specs: `cpu`, `cuda`, `cuda:<n>`, `metal`, `metal:<n>`. With no
/// spec, picks the best available device: Metal on macOS, CUDA elsewhere when
/// compiled in, CPU otherwise.
///
/// # Errors
///
/// Returns an error if the spec is unknown or the requested accelerator
/// cannot be initialized.
pub fn select_device(spec: Option<&str>) -> Result<Device> {
    let spec = spec.map(str::trim).filter(|s| !s.is_empty());

    match spec {
        None => Ok(auto_device()),
        Some("cpu") => Ok(Device::Cpu),
        Some(s) if s == "cuda" || s.starts_with("cuda:") => {
            let ordinal = device_ordinal(s)?;
            Device::new_cuda(ordinal).with_context(|| format!("Failed to initialize {s}"))
        }
        Some(s) if s == "metal" || s.starts_with("metal:") => {
            let ordinal = device_ordinal(s)?;
            Device::new_metal(ordinal).with_context(|| format!("Failed to initialize {s}"))
        }
        Some(other) => {
            anyhow::bail!("unknown device spec '{other}' (expected cpu, cuda[:n] or metal[:n])")
        }
    }
}

/// Parses the ordinal suffix of a `name:<n>` spec, defaulting to 0.
fn device_ordinal(spec: &str) -> Result<usize> {
    match spec.split_once(':') {
        None => Ok(0),
        Some((_, ordinal)) => ordinal
            .parse()
            .with_context(|| format!("invalid device ordinal in '{spec}'")),
    }
}

/// Returns the best available device without an explicit spec.
fn auto_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            info!("Using Metal device for inference");
            return device;
        }
    }

    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            info!("Using CUDA device for inference");
            return device;
        }
    }

    info!("Using CPU for inference");
    Device::Cpu
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_spec_selects_a_device() {
        let device = select_device(None);
        assert!(device.is_ok());
    }

    #[test]
    fn test_cpu_spec() {
        let device = select_device(Some("cpu")).expect("cpu is always available");
        assert!(matches!(device, Device::Cpu));
    }

    #[test]
    fn test_blank_spec_is_auto() {
        let device = select_device(Some("  "));
        assert!(device.is_ok());
    }

    #[test]
    fn test_unknown_spec_rejected() {
        let result = select_device(Some("tpu"));
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_ordinal_rejected() {
        let result = select_device(Some("cuda:banana"));
        assert!(result.is_err());
    }
}
