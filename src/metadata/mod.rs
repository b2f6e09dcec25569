//! Writing species names into image metadata.

mod exiftool;

pub use exiftool::ExifToolWriter;

use serde::Serialize;
use std::path::Path;

/// Result of a metadata write; failures are reported, not raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    /// Whether the write succeeded.
    pub success: bool,
    /// Human-readable detail.
    pub message: String,
}

impl WriteOutcome {
    /// Successful write.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Failed write.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Persists text into an image file's metadata.
pub trait MetadataWriter: Send + Sync {
    /// Write the species name as the image title.
    fn write_title(&self, path: &Path, title: &str) -> WriteOutcome;

    /// Write a description as the image caption.
    fn write_caption(&self, path: &Path, caption: &str) -> WriteOutcome;
}
