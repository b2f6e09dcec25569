//! HTTP response bodies.

mod types;

pub use types::{
    BirdInfo, BirdInfoResponse, ErrorResponse, GpsInfo, HealthResponse, RecognitionResult,
    RecognizeResponse,
};
