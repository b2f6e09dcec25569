//! Settings resolution from CLI args and config file.

use crate::cli::ServeArgs;
use crate::config::paths::default_model_dir;
use crate::config::types::{Config, ModelsConfig};
use crate::constants::files;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Concrete artifact locations after applying defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    /// Classifier ONNX model (required).
    pub classifier: PathBuf,
    /// Species table (required).
    pub species_info: PathBuf,
    /// Detector ONNX model, if configured or present.
    pub detector: Option<PathBuf>,
    /// Knowledge base CSV, if configured or present.
    pub knowledge_base: Option<PathBuf>,
    /// Offline region data directory, if configured or present.
    pub region_data: Option<PathBuf>,
}

impl ModelPaths {
    /// Fail with `ModelFileNotFound` if a required artifact is missing.
    pub fn ensure_required(&self) -> Result<()> {
        for path in [&self.classifier, &self.species_info] {
            if !path.is_file() {
                return Err(Error::ModelFileNotFound { path: path.clone() });
            }
        }
        Ok(())
    }
}

/// Apply CLI overrides on top of the loaded configuration.
///
/// CLI flags (and their environment variables) take precedence over the
/// config file.
pub fn apply_cli_overrides(mut config: Config, args: &ServeArgs) -> Config {
    if let Some(host) = &args.host {
        config.server.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let models = &mut config.models;
    override_path(&mut models.model_dir, args.model_dir.as_ref());
    override_path(&mut models.classifier, args.classifier.as_ref());
    override_path(&mut models.species_info, args.species_info.as_ref());
    override_path(&mut models.detector, args.detector.as_ref());
    override_path(&mut models.knowledge_base, args.knowledge_base.as_ref());
    override_path(&mut models.region_data, args.region_data.as_ref());

    if let Some(workers) = args.workers {
        config.inference.workers = usize::from(workers);
    }
    if let Some(confidence) = args.detector_confidence {
        config.inference.detector_confidence = confidence;
    }
    if let Some(device) = args.requested_device() {
        config.inference.device = device;
    }

    config
}

fn override_path(target: &mut Option<PathBuf>, value: Option<&PathBuf>) {
    if let Some(value) = value {
        *target = Some(value.clone());
    }
}

/// Resolve artifact paths, falling back to the default model directory.
pub fn resolve_model_paths(models: &ModelsConfig) -> Result<ModelPaths> {
    let model_dir = match &models.model_dir {
        Some(dir) => dir.clone(),
        None => default_model_dir()?,
    };
    Ok(resolve_in_dir(models, &model_dir))
}

/// Resolve artifact paths against an explicit model directory.
///
/// Required artifacts always get a path (existence is checked at load time).
/// Optional artifacts only get a default path when that file exists.
pub fn resolve_in_dir(models: &ModelsConfig, model_dir: &Path) -> ModelPaths {
    let required = |explicit: &Option<PathBuf>, name: &str| {
        explicit.clone().unwrap_or_else(|| model_dir.join(name))
    };
    let optional = |explicit: &Option<PathBuf>, name: &str| {
        explicit.clone().or_else(|| {
            let candidate = model_dir.join(name);
            candidate.exists().then_some(candidate)
        })
    };

    ModelPaths {
        classifier: required(&models.classifier, files::CLASSIFIER),
        species_info: required(&models.species_info, files::SPECIES_INFO),
        detector: optional(&models.detector, files::DETECTOR),
        knowledge_base: optional(&models.knowledge_base, files::KNOWLEDGE_BASE),
        region_data: optional(&models.region_data, files::REGION_DATA),
    }
}
