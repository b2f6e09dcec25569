//! Configuration validation.

use crate::config::Config;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server(config)?;
    validate_inference(config)?;
    validate_recognize(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<()> {
    if config.server.host.trim().is_empty() {
        return Err(Error::ConfigValidation {
            message: "server.host must not be empty".to_string(),
        });
    }

    if config.server.port == 0 {
        return Err(Error::ConfigValidation {
            message: "server.port must be between 1 and 65535".to_string(),
        });
    }

    Ok(())
}

fn validate_inference(config: &Config) -> Result<()> {
    let inference = &config.inference;

    if inference.workers == 0 {
        return Err(Error::ConfigValidation {
            message: "inference.workers must be at least 1".to_string(),
        });
    }

    if !(0.0..=1.0).contains(&inference.detector_confidence) {
        return Err(Error::ConfigValidation {
            message: format!(
                "inference.detector_confidence must be between 0.0 and 1.0, got {}",
                inference.detector_confidence
            ),
        });
    }

    Ok(())
}

fn validate_recognize(config: &Config) -> Result<()> {
    let recognize = &config.recognize;

    if recognize.top_k == 0 {
        return Err(Error::ConfigValidation {
            message: "recognize.top_k must be at least 1".to_string(),
        });
    }

    if recognize.top_k > recognize.max_top_k {
        return Err(Error::ConfigValidation {
            message: format!(
                "recognize.top_k ({}) exceeds recognize.max_top_k ({})",
                recognize.top_k, recognize.max_top_k
            ),
        });
    }

    Ok(())
}
