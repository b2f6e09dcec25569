//! Recognition and lookup pipelines behind the HTTP endpoints.

use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::geo::{self, GeoContext};
use crate::imaging::load_image;
use crate::inference::{Crop, Prediction, crop_to_detection, needs_detection};
use crate::output::{BirdInfo, GpsInfo, RecognitionResult, RecognizeResponse};
use crate::pipeline::RecognizeRequest;
use crate::species::SpeciesNames;
use image::DynamicImage;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Run the full recognition chain for one request.
///
/// Loads the image, optionally crops it around the detected bird, resolves
/// GPS context, classifies and enriches the predictions. A temporary file
/// created for base64 input is removed before this returns.
pub fn recognize(context: &AppContext, request: &RecognizeRequest) -> Result<RecognizeResponse> {
    let start = Instant::now();
    let source = request.source()?;
    let top_k = request.top_k(context.settings())?;
    let classifier = context.classifier()?;

    let loaded = load_image(&source)?;
    let (width, height) = loaded.dimensions();
    if loaded.is_temporary() {
        debug!("Base64 image staged at {}", loaded.path().display());
    }

    let crop = if request.use_yolo() {
        detect_subject(context, &loaded.image)
    } else {
        None
    };
    let gps = if request.use_gps() {
        geo::resolve(loaded.path())
    } else {
        None
    };

    let image = crop.as_ref().map_or(&loaded.image, |c| &c.image);
    let predictions = classifier.predict(image, top_k)?;
    let results = enrich(context, &predictions, gps.as_ref());

    info!(
        "Recognized {width}x{height} image: {} result(s) in {:.2}s{}",
        results.len(),
        start.elapsed().as_secs_f64(),
        if crop.is_some() { " (cropped)" } else { "" }
    );

    Ok(RecognizeResponse {
        success: true,
        results,
        yolo_info: crop.map(|c| c.message),
        gps_info: gps.as_ref().map(GpsInfo::from),
    })
}

/// Crop around the bird when a detector is loaded and the image is large.
///
/// Detector errors are logged and the full image is used instead.
fn detect_subject(context: &AppContext, image: &DynamicImage) -> Option<Crop> {
    let detector = context.detector()?;
    if !needs_detection(image.width(), image.height()) {
        return None;
    }

    match detector.detect(image) {
        Ok(Some(detection)) => {
            crop_to_detection(image, &detection, context.settings().detector_padding)
        }
        Ok(None) => {
            debug!("No bird detected, using full image");
            None
        }
        Err(e) => {
            warn!("Subject detection failed, using full image: {e}");
            None
        }
    }
}

/// Attach names, region match and description to each prediction.
///
/// Predictions outside the species table are dropped; ranks follow the
/// remaining order.
fn enrich(
    context: &AppContext,
    predictions: &[Prediction],
    gps: Option<&GeoContext>,
) -> Vec<RecognitionResult> {
    predictions
        .iter()
        .filter_map(|prediction| {
            let names = context.species().get(prediction.class_index);
            if names.is_none() {
                debug!("Class {} not in species table", prediction.class_index);
            }
            names.map(|names| (prediction, names))
        })
        .enumerate()
        .map(|(position, (prediction, names))| RecognitionResult {
            rank: position + 1,
            cn_name: names.cn_name.clone(),
            en_name: names.en_name.clone(),
            scientific_name: names.scientific_name.clone(),
            confidence: prediction.confidence,
            ebird_match: ebird_match(context, prediction.class_index, names, gps),
            description: context
                .knowledge()
                .and_then(|kb| kb.by_class_id(prediction.class_index))
                .and_then(|record| record.short_description())
                .map(str::to_string),
        })
        .collect()
}

/// Whether the species is recorded for the photo's region.
///
/// Uses the offline eBird list for the region's country when available,
/// otherwise the knowledge base `regions` column. False without GPS context
/// or a knowledge base record.
fn ebird_match(
    context: &AppContext,
    class_index: usize,
    names: &SpeciesNames,
    gps: Option<&GeoContext>,
) -> bool {
    let (Some(gps), Some(kb)) = (gps, context.knowledge()) else {
        return false;
    };
    let Some(region) = gps.region else {
        return false;
    };
    let Some(record) = kb
        .by_class_id(class_index)
        .or_else(|| kb.by_scientific_name(&names.scientific_name))
    else {
        return false;
    };

    let listed = context
        .region_filter()
        .zip(record.ebird_code())
        .and_then(|(filter, code)| filter.contains(region.country, code));
    listed.unwrap_or_else(|| record.occurs_in(region.name))
}

/// Look up species details by Chinese name.
///
/// Searches the knowledge base, falling back to the species table.
pub fn bird_info(context: &AppContext, cn_name: &str) -> Result<BirdInfo> {
    if let Some(record) = context.knowledge().and_then(|kb| kb.by_cn_name(cn_name)) {
        return Ok(BirdInfo {
            cn_name: if record.chinese_simplified.is_empty() {
                cn_name.to_string()
            } else {
                record.chinese_simplified.clone()
            },
            en_name: record.english_name.clone(),
            scientific_name: record.scientific_name.clone(),
            short_description: record.short_description_zh.clone(),
            full_description: record.full_description_zh.clone(),
            ebird_code: record.ebird_code.clone(),
        });
    }

    context
        .species()
        .find_by_cn_name(cn_name)
        .map(|names| BirdInfo {
            cn_name: names.cn_name.clone(),
            en_name: names.en_name.clone(),
            scientific_name: names.scientific_name.clone(),
            short_description: String::new(),
            full_description: String::new(),
            ebird_code: String::new(),
        })
        .ok_or_else(|| Error::SpeciesNotFound {
            name: cn_name.to_string(),
        })
}
