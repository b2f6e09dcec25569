//! Error types for birdid.

use std::any::Any;
use std::path::PathBuf;

/// Result type alias for birdid operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error classification used to pick an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing request fields.
    BadInput,
    /// Missing file or unmatched lookup.
    NotFound,
    /// A required model or data source is not loaded.
    ModelUnavailable,
    /// Anything unexpected, including failures in external libraries.
    Internal,
}

/// Top-level error type for birdid.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Data directory could not be determined.
    #[error("could not determine data directory for this platform")]
    DataDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Model file does not exist.
    #[error("model file does not exist: {path}")]
    ModelFileNotFound {
        /// Path to the missing model file.
        path: PathBuf,
    },

    /// Failed to initialize ONNX runtime.
    #[error("failed to initialize ONNX runtime: {reason}")]
    RuntimeInitialization {
        /// Description of the initialization failure.
        reason: String,
    },

    /// Failed to build an ONNX session.
    #[error("failed to load model '{path}': {reason}")]
    ClassifierBuild {
        /// Model path.
        path: PathBuf,
        /// Description of the build failure.
        reason: String,
    },

    /// Inference failed.
    #[error("inference failed: {reason}")]
    Inference {
        /// Description of the inference failure.
        reason: String,
    },

    /// A required component is not loaded.
    #[error("{component} is not available")]
    ModelUnavailable {
        /// Name of the missing component.
        component: &'static str,
    },

    /// Failed to read the species table.
    #[error("failed to read species table '{path}'")]
    SpeciesTableRead {
        /// Path to the species table.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the species table.
    #[error("failed to parse species table '{path}'")]
    SpeciesTableParse {
        /// Path to the species table.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to read the knowledge base.
    #[error("failed to read knowledge base '{path}'")]
    KnowledgeBaseRead {
        /// Path to the knowledge base file.
        path: PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// Failed to read region data.
    #[error("failed to read region data '{path}'")]
    RegionDataRead {
        /// Path to the offending file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse region data.
    #[error("failed to parse region data '{path}'")]
    RegionDataParse {
        /// Path to the offending file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Image file does not exist.
    #[error("file not found: {path}")]
    ImageNotFound {
        /// Requested path.
        path: PathBuf,
    },

    /// Image could not be decoded.
    #[error("failed to decode image from {origin}")]
    ImageDecode {
        /// Where the bytes came from (path or "base64 payload").
        origin: String,
        /// Underlying decode error.
        #[source]
        source: image::ImageError,
    },

    /// Camera RAW file could not be decoded.
    #[error("failed to decode RAW image from {origin}: {reason}")]
    RawDecode {
        /// Where the bytes came from.
        origin: String,
        /// Description reported by the RAW decoder.
        reason: String,
    },

    /// Base64 payload could not be decoded.
    #[error("base64 decoding failed")]
    InvalidBase64 {
        /// Underlying decode error.
        #[source]
        source: base64::DecodeError,
    },

    /// Request body was not valid JSON for the endpoint.
    #[error("invalid request body: {reason}")]
    InvalidRequest {
        /// Description of the problem.
        reason: String,
    },

    /// A required request field or parameter is missing.
    #[error("missing required parameter: {name}")]
    MissingField {
        /// Name of the missing field.
        name: &'static str,
    },

    /// No species matched a lookup.
    #[error("no information found for '{name}'")]
    SpeciesNotFound {
        /// Name that was looked up.
        name: String,
    },

    /// Tensor construction failed.
    #[error("failed to build tensor: {reason}")]
    Tensor {
        /// Description of the failure.
        reason: String,
    },

    /// Failed to bind the listening socket.
    #[error("failed to bind {address}")]
    ServerBind {
        /// Requested `host:port`.
        address: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Classify this error for status-code mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidBase64 { .. }
            | Self::ImageDecode { .. }
            | Self::RawDecode { .. }
            | Self::InvalidRequest { .. }
            | Self::MissingField { .. } => ErrorKind::BadInput,
            Self::ImageNotFound { .. } | Self::SpeciesNotFound { .. } => ErrorKind::NotFound,
            Self::ModelUnavailable { .. } => ErrorKind::ModelUnavailable,
            _ => ErrorKind::Internal,
        }
    }

    /// Render the chain of underlying causes, one per line.
    pub fn trace(&self) -> String {
        use std::fmt::Write;

        let mut trace = format!("{self}");
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            let _ = write!(trace, "\ncaused by: {cause}");
            source = cause.source();
        }
        trace
    }
}

/// Text of a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
