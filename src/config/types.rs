//! Configuration type definitions.

use crate::constants::{
    DEFAULT_HOST, DEFAULT_MAX_TOP_K, DEFAULT_PORT, DEFAULT_TOP_K, DEFAULT_WORKERS, detector,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Model and data file locations.
    pub models: ModelsConfig,

    /// Inference settings.
    pub inference: InferenceConfig,

    /// `/recognize` request defaults.
    pub recognize: RecognizeConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Listening port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Model and data file locations.
///
/// Any path left unset is resolved inside `model_dir` using the default
/// file name for that artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Directory holding the model artifacts.
    pub model_dir: Option<PathBuf>,
    /// Classifier ONNX model.
    pub classifier: Option<PathBuf>,
    /// Species table (JSON).
    pub species_info: Option<PathBuf>,
    /// YOLO detector ONNX model.
    pub detector: Option<PathBuf>,
    /// Knowledge base (CSV).
    pub knowledge_base: Option<PathBuf>,
    /// Offline eBird species list directory.
    pub region_data: Option<PathBuf>,
}

/// Inference device configuration.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum InferenceDevice {
    /// Automatically select (GPU if available, else CPU).
    #[default]
    Auto,
    /// Force CPU inference.
    Cpu,
    /// NVIDIA CUDA.
    Cuda,
    /// Apple `CoreML`.
    #[value(name = "coreml")]
    CoreMl,
    /// Windows `DirectML`.
    #[value(name = "directml")]
    DirectMl,
}

impl std::fmt::Display for InferenceDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
            Self::CoreMl => write!(f, "coreml"),
            Self::DirectMl => write!(f, "directml"),
        }
    }
}

/// Inference settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Device to use for inference.
    pub device: InferenceDevice,
    /// Sessions kept per model; bounds concurrent inference.
    pub workers: usize,
    /// Minimum detector confidence (0.0-1.0).
    pub detector_confidence: f32,
    /// Padding in pixels around a detected subject.
    pub detector_padding: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            device: InferenceDevice::Auto,
            workers: DEFAULT_WORKERS,
            detector_confidence: detector::DEFAULT_CONFIDENCE,
            detector_padding: detector::DEFAULT_PADDING,
        }
    }
}

/// Defaults applied to `/recognize` requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizeConfig {
    /// `top_k` used when a request omits it.
    pub top_k: usize,
    /// Largest `top_k` a request may ask for.
    pub max_top_k: usize,
}

impl Default for RecognizeConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_top_k: DEFAULT_MAX_TOP_K,
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "127.0.0.1");
        assert_eq!(server.port, 5156);
    }

    #[test]
    fn test_inference_defaults() {
        let inference = InferenceConfig::default();
        assert_eq!(inference.device, InferenceDevice::Auto);
        assert_eq!(inference.detector_confidence, 0.25);
        assert_eq!(inference.detector_padding, 20);
        assert!(inference.workers >= 1);
    }

    #[test]
    fn test_device_display_matches_serde_name() {
        for device in [
            InferenceDevice::Auto,
            InferenceDevice::Cpu,
            InferenceDevice::Cuda,
            InferenceDevice::CoreMl,
            InferenceDevice::DirectMl,
        ] {
            let serialized = serde_json::to_string(&device).ok();
            assert_eq!(serialized, Some(format!("\"{device}\"")));
        }
    }
}
