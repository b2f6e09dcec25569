//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track. The preprocessing and inference values are
//! tied to the training regime of the shipped classifier and must not be
//! tuned independently of it.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "birdid";

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "SuperBirdID API";

/// Version string reported by the health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default bind address.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default listening port.
pub const DEFAULT_PORT: u16 = 5156;

/// Largest accepted request body, in bytes.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Default number of predictions returned by `/recognize`.
pub const DEFAULT_TOP_K: usize = 3;

/// Upper bound accepted for `top_k` in a request.
pub const DEFAULT_MAX_TOP_K: usize = 100;

/// Default number of ONNX sessions kept per model.
pub const DEFAULT_WORKERS: usize = 2;

/// Classifier preprocessing constants.
pub mod preprocess {
    /// Square input resolution expected by the classifier.
    pub const INPUT_SIZE: u32 = 224;

    /// Per-channel mean in B, G, R order.
    pub const MEAN_BGR: [f32; 3] = [0.406, 0.456, 0.485];

    /// Per-channel standard deviation in B, G, R order.
    pub const STD_BGR: [f32; 3] = [0.225, 0.224, 0.229];
}

/// Classifier inference constants.
pub mod inference {
    /// Softmax temperature applied to logits (values below 1 sharpen).
    pub const TEMPERATURE: f32 = 0.6;
}

/// Subject detector constants.
pub mod detector {
    /// Images whose longer side does not exceed this are never cropped.
    pub const MIN_DIMENSION_FOR_DETECTION: u32 = 640;

    /// Square input resolution of the YOLO detector.
    pub const INPUT_SIZE: u32 = 640;

    /// COCO class index for "bird".
    pub const BIRD_CLASS_ID: usize = 14;

    /// Default minimum detection confidence.
    pub const DEFAULT_CONFIDENCE: f32 = 0.25;

    /// Default padding in pixels added around the detected box.
    pub const DEFAULT_PADDING: u32 = 20;
}

/// Default file names inside the model directory.
pub mod files {
    /// Classifier ONNX model.
    pub const CLASSIFIER: &str = "birdid2024.onnx";
    /// Species table indexed by class id.
    pub const SPECIES_INFO: &str = "birdinfo.json";
    /// YOLO detector ONNX model.
    pub const DETECTOR: &str = "yolo11x.onnx";
    /// Knowledge base CSV export.
    pub const KNOWLEDGE_BASE: &str = "bird_reference.csv";
    /// Directory with offline eBird species lists.
    pub const REGION_DATA: &str = "offline_ebird_data";
    /// Index file inside the region data directory.
    pub const REGION_INDEX: &str = "offline_index.json";
    /// Camera RAW extensions decoded through imagepipe.
    pub const RAW_EXTENSIONS: &[&str] = &[
        "3fr", "arw", "cr2", "crw", "dcr", "dcs", "dng", "erf", "iiq", "kdc", "mef", "mos", "mrw",
        "nef", "nrw", "orf", "pef", "raf", "rw2", "srf", "sr2", "srw",
    ];
}

/// Species table fallbacks for incomplete entries.
pub mod species {
    /// Placeholder Chinese name.
    pub const UNKNOWN_CN_NAME: &str = "未知";
    /// Placeholder English name.
    pub const UNKNOWN_EN_NAME: &str = "Unknown";
}
