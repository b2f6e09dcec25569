//! Request validation and the recognition pipeline.

mod processor;
mod request;

pub use processor::{bird_info, recognize};
pub use request::{
    BirdInfoQuery, RecognizeRequest, WriteCaptionRequest, WriteTitleRequest, parse_json,
};
