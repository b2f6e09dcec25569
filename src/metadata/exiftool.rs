//! Metadata writer backed by the `exiftool` command.

use super::{MetadataWriter, WriteOutcome};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

const TITLE_TAGS: [&str; 3] = ["XMP-dc:Title", "IPTC:ObjectName", "EXIF:XPTitle"];
const CAPTION_TAGS: [&str; 3] = [
    "XMP-dc:Description",
    "IPTC:Caption-Abstract",
    "EXIF:ImageDescription",
];

/// Writes tags by running `exiftool -overwrite_original`.
///
/// Requires exiftool on `PATH` (or an explicit program path).
#[derive(Debug, Clone)]
pub struct ExifToolWriter {
    program: PathBuf,
}

impl Default for ExifToolWriter {
    fn default() -> Self {
        Self::new("exiftool")
    }
}

impl ExifToolWriter {
    /// Use a specific exiftool executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn write_tags(&self, path: &Path, tags: &[&str], value: &str, what: &str) -> WriteOutcome {
        if !path.is_file() {
            return WriteOutcome::failure(format!("File not found: {}", path.display()));
        }

        let mut command = Command::new(&self.program);
        command.arg("-overwrite_original").arg("-charset").arg("utf8");
        for tag in tags {
            command.arg(format!("-{tag}={value}"));
        }
        command.arg(path);

        debug!("Writing {what} to {}", path.display());
        let output = match command.output() {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to run {}: {e}", self.program.display());
                return WriteOutcome::failure(format!(
                    "Failed to run {}: {e}",
                    self.program.display()
                ));
            }
        };

        if output.status.success() {
            WriteOutcome::success(format!("{what} written to {}", path.display()))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("exiftool failed for {}: {}", path.display(), stderr.trim());
            WriteOutcome::failure(format!("exiftool failed: {}", stderr.trim()))
        }
    }
}

impl MetadataWriter for ExifToolWriter {
    fn write_title(&self, path: &Path, title: &str) -> WriteOutcome {
        self.write_tags(path, &TITLE_TAGS, title, "Title")
    }

    fn write_caption(&self, path: &Path, caption: &str) -> WriteOutcome {
        self.write_tags(path, &CAPTION_TAGS, caption, "Caption")
    }
}
