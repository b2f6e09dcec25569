//! Request bodies and their validation.

use crate::context::RecognizeSettings;
use crate::error::{Error, Result};
use crate::imaging::ImageSource;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// `/recognize` request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecognizeRequest {
    /// Path of an image on the local filesystem.
    #[serde(default)]
    pub image_path: Option<String>,
    /// Base64-encoded image file (plain or `data:` URL).
    #[serde(default)]
    pub image_base64: Option<String>,
    /// Crop large images around the detected bird (default: true).
    #[serde(default, deserialize_with = "null_as_false")]
    pub use_yolo: Option<bool>,
    /// Read GPS metadata for region matching (default: true).
    #[serde(default, deserialize_with = "null_as_false")]
    pub use_gps: Option<bool>,
    /// Number of predictions to return.
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl RecognizeRequest {
    /// The image source; exactly one of path or base64 must be given.
    pub fn source(&self) -> Result<ImageSource> {
        match (non_empty(self.image_path.as_deref()), non_empty(self.image_base64.as_deref())) {
            (Some(path), None) => Ok(ImageSource::Path(PathBuf::from(path))),
            (None, Some(payload)) => Ok(ImageSource::Base64(payload.to_string())),
            (Some(_), Some(_)) => Err(Error::InvalidRequest {
                reason: "provide either image_path or image_base64, not both".to_string(),
            }),
            (None, None) => Err(Error::MissingField {
                name: "image_path or image_base64",
            }),
        }
    }

    /// Whether subject detection was requested.
    pub fn use_yolo(&self) -> bool {
        self.use_yolo.unwrap_or(true)
    }

    /// Whether GPS lookup was requested.
    pub fn use_gps(&self) -> bool {
        self.use_gps.unwrap_or(true)
    }

    /// Requested `top_k`, defaulted and bounded by `settings`.
    pub fn top_k(&self, settings: &RecognizeSettings) -> Result<usize> {
        match self.top_k {
            None => Ok(settings.default_top_k),
            Some(0) => Err(Error::InvalidRequest {
                reason: "top_k must be at least 1".to_string(),
            }),
            Some(k) if k > settings.max_top_k => Err(Error::InvalidRequest {
                reason: format!("top_k must be at most {}", settings.max_top_k),
            }),
            Some(k) => Ok(k),
        }
    }
}

/// `/exif/write-title` request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WriteTitleRequest {
    /// Image to modify.
    #[serde(default)]
    pub image_path: Option<String>,
    /// Species name to write.
    #[serde(default)]
    pub bird_name: Option<String>,
}

impl WriteTitleRequest {
    /// Both fields, or `MissingField` for the first one absent.
    pub fn fields(&self) -> Result<(PathBuf, &str)> {
        required_pair(
            self.image_path.as_deref(),
            "image_path",
            self.bird_name.as_deref(),
            "bird_name",
        )
    }
}

/// `/exif/write-caption` request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WriteCaptionRequest {
    /// Image to modify.
    #[serde(default)]
    pub image_path: Option<String>,
    /// Caption text to write.
    #[serde(default)]
    pub caption: Option<String>,
}

impl WriteCaptionRequest {
    /// Both fields, or `MissingField` for the first one absent.
    pub fn fields(&self) -> Result<(PathBuf, &str)> {
        required_pair(
            self.image_path.as_deref(),
            "image_path",
            self.caption.as_deref(),
            "caption",
        )
    }
}

/// `/bird/info` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BirdInfoQuery {
    /// Chinese name to look up.
    #[serde(default)]
    pub cn_name: Option<String>,
}

impl BirdInfoQuery {
    /// The name, or `MissingField`.
    pub fn cn_name(&self) -> Result<&str> {
        non_empty(self.cn_name.as_deref()).ok_or(Error::MissingField { name: "cn_name" })
    }
}

/// Parse a JSON body, mapping failures to `InvalidRequest`.
pub fn parse_json<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::InvalidRequest {
            reason: "request body is empty".to_string(),
        });
    }
    serde_json::from_slice(body).map_err(|e| Error::InvalidRequest {
        reason: e.to_string(),
    })
}

/// A present flag set to `null` turns the step off; an absent one stays `None`.
fn null_as_false<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(Option::<bool>::deserialize(deserializer)?.unwrap_or(false)))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn required_pair<'a>(
    path: Option<&str>,
    path_name: &'static str,
    value: Option<&'a str>,
    value_name: &'static str,
) -> Result<(PathBuf, &'a str)> {
    let path = non_empty(path).ok_or(Error::MissingField { name: path_name })?;
    let value = value
        .filter(|v| !v.trim().is_empty())
        .ok_or(Error::MissingField { name: value_name })?;
    Ok((PathBuf::from(path), value))
}
