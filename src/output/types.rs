//! JSON response bodies.

use crate::constants::{SERVICE_NAME, VERSION};
use crate::geo::GeoContext;
use serde::{Deserialize, Serialize};

/// One ranked species in a `/recognize` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    /// 1-based position in the result list.
    pub rank: usize,
    /// Chinese common name.
    pub cn_name: String,
    /// English common name.
    pub en_name: String,
    /// Scientific name.
    pub scientific_name: String,
    /// Confidence as a percentage.
    pub confidence: f32,
    /// Whether the species is recorded for the photo's region.
    pub ebird_match: bool,
    /// Short description, when the knowledge base has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Location block of a `/recognize` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsInfo {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Region name, or null outside every known region.
    pub region: Option<String>,
    /// Display text, e.g. `GPS: 39.907500, 116.397222`.
    pub info: String,
    /// eBird country code for the region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl From<&GeoContext> for GpsInfo {
    fn from(geo: &GeoContext) -> Self {
        Self {
            latitude: geo.coordinates.latitude,
            longitude: geo.coordinates.longitude,
            region: geo.region.map(|r| r.name.to_string()),
            info: geo.coordinates.info(),
            country: geo.region.map(|r| r.country.to_string()),
        }
    }
}

/// `/recognize` success body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizeResponse {
    /// Always `true`.
    pub success: bool,
    /// Ranked predictions.
    pub results: Vec<RecognitionResult>,
    /// Detector summary when the image was cropped.
    pub yolo_info: Option<String>,
    /// Location read from the image, if requested and present.
    pub gps_info: Option<GpsInfo>,
}

/// `/health` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Whether the subject detector is loaded.
    pub yolo_available: bool,
    /// Whether offline eBird species lists are loaded.
    pub ebird_available: bool,
}

impl HealthResponse {
    /// Health body for the given capabilities.
    pub fn new(yolo_available: bool, ebird_available: bool) -> Self {
        Self {
            status: "ok".to_string(),
            service: SERVICE_NAME.to_string(),
            version: VERSION.to_string(),
            yolo_available,
            ebird_available,
        }
    }
}

/// Species details returned by `/bird/info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirdInfo {
    /// Chinese common name.
    pub cn_name: String,
    /// English common name.
    pub en_name: String,
    /// Scientific name.
    pub scientific_name: String,
    /// Short description.
    pub short_description: String,
    /// Full description.
    pub full_description: String,
    /// eBird species code.
    pub ebird_code: String,
}

/// `/bird/info` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirdInfoResponse {
    /// Always `true`.
    pub success: bool,
    /// Species details.
    pub info: BirdInfo,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Error message.
    pub error: String,
    /// Cause chain, only for internal errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}
