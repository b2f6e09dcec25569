//! Image acquisition from filesystem paths and base64 payloads.

use crate::constants::files::RAW_EXTENSIONS;
use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageReader, RgbImage};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Where a request's image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Image file on the local filesystem.
    Path(PathBuf),
    /// Base64-encoded file contents, optionally as a `data:` URL.
    Base64(String),
}

/// A decoded image plus the file it was read from.
///
/// For base64 input the file is a temporary copy of the raw payload; it is
/// removed when this value is dropped.
#[derive(Debug)]
pub struct LoadedImage {
    /// Decoded bitmap.
    pub image: DynamicImage,
    path: PathBuf,
    temp: Option<NamedTempFile>,
}

impl LoadedImage {
    /// File backing this image (used for metadata reads).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the backing file is a request-scoped temporary.
    pub fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }

    /// Image dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

impl Drop for LoadedImage {
    fn drop(&mut self) {
        if let Some(temp) = self.temp.take() {
            let path = temp.path().to_path_buf();
            if let Err(e) = temp.close() {
                warn!("Failed to remove temporary image {}: {e}", path.display());
            }
        }
    }
}

/// Load an image from the given source.
pub fn load_image(source: &ImageSource) -> Result<LoadedImage> {
    match source {
        ImageSource::Path(path) => load_from_path(path),
        ImageSource::Base64(payload) => load_from_base64(payload),
    }
}

/// Load an image file, sniffing the format from its contents.
pub fn load_from_path(path: &Path) -> Result<LoadedImage> {
    if !path.is_file() {
        return Err(Error::ImageNotFound {
            path: path.to_path_buf(),
        });
    }

    let image = decode_file(path, &path.display().to_string())?;
    debug!(
        "Loaded {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );

    Ok(LoadedImage {
        image,
        path: path.to_path_buf(),
        temp: None,
    })
}

/// Decode a base64 payload and materialize it as a temporary file.
///
/// The raw bytes are written unchanged so embedded EXIF survives.
pub fn load_from_base64(payload: &str) -> Result<LoadedImage> {
    let bytes = decode_base64(payload)?;

    let mut temp = tempfile::Builder::new()
        .prefix("birdid-")
        .suffix(".img")
        .tempfile()?;
    temp.write_all(&bytes)?;
    temp.flush()?;

    let image = decode_file(temp.path(), "base64 payload")?;
    debug!(
        "Decoded base64 image ({} bytes, {}x{})",
        bytes.len(),
        image.width(),
        image.height()
    );

    Ok(LoadedImage {
        image,
        path: temp.path().to_path_buf(),
        temp: Some(temp),
    })
}

/// Decode base64 text, accepting a `data:<mime>;base64,` prefix.
pub fn decode_base64(payload: &str) -> Result<Vec<u8>> {
    let trimmed = payload.trim();
    let data = match trimmed.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => trimmed,
    };

    STANDARD
        .decode(data)
        .map_err(|source| Error::InvalidBase64 { source })
}

fn decode_file(path: &Path, origin: &str) -> Result<DynamicImage> {
    if is_raw_file(path) {
        return decode_raw(path, origin);
    }

    let decode_error = |source| Error::ImageDecode {
        origin: origin.to_string(),
        source,
    };

    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(decode_error)
}

/// Whether the file extension names a camera RAW format.
fn is_raw_file(path: &Path) -> bool {
    use std::ffi::OsStr;

    path.extension().is_some_and(|ext| {
        RAW_EXTENSIONS
            .iter()
            .any(|raw| ext.eq_ignore_ascii_case(OsStr::new(raw)))
    })
}

/// Develop a RAW file to 8-bit sRGB with the camera's white balance.
fn decode_raw(path: &Path, origin: &str) -> Result<DynamicImage> {
    let raw_error = |reason: String| Error::RawDecode {
        origin: origin.to_string(),
        reason,
    };

    let developed = imagepipe::simple_decode_8bit(path, 0, 0).map_err(raw_error)?;
    let dimension =
        |v: usize| u32::try_from(v).map_err(|_| raw_error(format!("dimension {v} too large")));
    let (width, height) = (dimension(developed.width)?, dimension(developed.height)?);
    debug!("Developed RAW image {width}x{height} from {origin}");

    RgbImage::from_raw(width, height, developed.data)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| raw_error("developed buffer does not match its dimensions".to_string()))
}
