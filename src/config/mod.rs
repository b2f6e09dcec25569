//! Configuration loading and management.

mod file;
mod paths;
mod resolve;
mod types;
mod validate;

pub use file::{load_config_file, load_default_config, save_config, save_default_config};
pub use paths::{config_dir, config_file_path, default_model_dir};
pub use resolve::{ModelPaths, apply_cli_overrides, resolve_in_dir, resolve_model_paths};
pub use types::{
    Config, InferenceConfig, InferenceDevice, ModelsConfig, RecognizeConfig, ServerConfig,
};
pub use validate::validate_config;
