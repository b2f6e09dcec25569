//! YOLO subject detector used to crop large photos around the bird.

use crate::config::InferenceDevice;
use crate::constants::detector::{BIRD_CLASS_ID, INPUT_SIZE, MIN_DIMENSION_FOR_DETECTION};
use crate::error::{Error, Result};
use crate::inference::session::{SessionPool, run_single};
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use std::path::Path;
use tracing::debug;

/// Grey used by YOLO for letterbox padding.
const LETTERBOX_FILL: u8 = 114;

/// Best bird box in original image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Left edge.
    pub x1: f32,
    /// Top edge.
    pub y1: f32,
    /// Right edge.
    pub x2: f32,
    /// Bottom edge.
    pub y2: f32,
    /// Detector confidence (0.0-1.0).
    pub confidence: f32,
}

/// Locates the main subject of a photo.
pub trait SubjectDetector: Send + Sync {
    /// Return the most confident bird box, or `None` if nothing passed the
    /// confidence threshold.
    fn detect(&self, image: &DynamicImage) -> Result<Option<Detection>>;
}

/// Whether an image is large enough to be worth cropping.
pub fn needs_detection(width: u32, height: u32) -> bool {
    width.max(height) > MIN_DIMENSION_FOR_DETECTION
}

/// Cropped image plus a human-readable summary.
#[derive(Debug, Clone)]
pub struct Crop {
    /// The cropped region.
    pub image: DynamicImage,
    /// `YOLO detection: confidence 0.873, crop size 512x384`.
    pub message: String,
}

/// Crop `image` to `detection`, expanded by `padding` pixels and clamped to
/// the image bounds. Returns `None` for a degenerate box.
pub fn crop_to_detection(
    image: &DynamicImage,
    detection: &Detection,
    padding: u32,
) -> Option<Crop> {
    let (width, height) = (image.width(), image.height());
    let pad = padding as f32;

    let x1 = clamp_coord(detection.x1 - pad, width);
    let y1 = clamp_coord(detection.y1 - pad, height);
    let x2 = clamp_coord(detection.x2 + pad, width);
    let y2 = clamp_coord(detection.y2 + pad, height);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    let cropped = image.crop_imm(x1, y1, x2 - x1, y2 - y1);
    let message = format!(
        "YOLO detection: confidence {:.3}, crop size {}x{}",
        detection.confidence,
        cropped.width(),
        cropped.height()
    );
    Some(Crop {
        image: cropped,
        message,
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_coord(value: f32, limit: u32) -> u32 {
    if value <= 0.0 {
        0
    } else {
        (value as u32).min(limit)
    }
}

/// ONNX YOLO model (COCO classes, `[1, 4 + classes, anchors]` output).
#[derive(Debug)]
pub struct YoloDetector {
    pool: SessionPool,
    confidence: f32,
}

impl YoloDetector {
    /// Load the detector with `workers` parallel sessions.
    pub fn load(
        path: &Path,
        device: InferenceDevice,
        workers: usize,
        confidence: f32,
    ) -> Result<Self> {
        Ok(Self {
            pool: SessionPool::load(path, device, workers)?,
            confidence,
        })
    }
}

impl SubjectDetector for YoloDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Option<Detection>> {
        let letterbox = Letterbox::new(image.width(), image.height());
        let input = letterbox.tensor(image);
        let size = INPUT_SIZE as usize;

        let (shape, output) = self
            .pool
            .with_session(|session| run_single(session, [1, 3, size, size], input))?;

        let best = best_bird_box(&shape, &output, self.confidence)?;
        debug!("Detector best bird box: {best:?}");
        Ok(best.map(|raw| letterbox.to_original(raw)))
    }
}

/// Scale and offset between an image and the square detector input.
#[derive(Debug, Clone, Copy)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
    width: u32,
    height: u32,
}

impl Letterbox {
    #[allow(clippy::cast_precision_loss)]
    fn new(width: u32, height: u32) -> Self {
        let target = INPUT_SIZE as f32;
        let scale = (target / width as f32).min(target / height as f32);
        let scaled_w = (width as f32 * scale).round();
        let scaled_h = (height as f32 * scale).round();
        Self {
            scale,
            pad_x: ((target - scaled_w) / 2.0).floor(),
            pad_y: ((target - scaled_h) / 2.0).floor(),
            width,
            height,
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn tensor(&self, image: &DynamicImage) -> Vec<f32> {
        let scaled_w = ((self.width as f32 * self.scale).round() as u32).clamp(1, INPUT_SIZE);
        let scaled_h = ((self.height as f32 * self.scale).round() as u32).clamp(1, INPUT_SIZE);
        let resized =
            image::imageops::resize(&image.to_rgb8(), scaled_w, scaled_h, FilterType::Triangle);

        let mut canvas = RgbImage::from_pixel(INPUT_SIZE, INPUT_SIZE, Rgb([LETTERBOX_FILL; 3]));
        image::imageops::overlay(
            &mut canvas,
            &resized,
            i64::from(self.pad_x as u32),
            i64::from(self.pad_y as u32),
        );

        let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
        let mut data = vec![0.0_f32; plane * 3];
        for (x, y, pixel) in canvas.enumerate_pixels() {
            let offset = (y * INPUT_SIZE + x) as usize;
            for channel in 0..3 {
                data[channel * plane + offset] = f32::from(pixel[channel]) / 255.0;
            }
        }
        data
    }

    fn to_original(&self, raw: Detection) -> Detection {
        let map_x = |v: f32| (v - self.pad_x) / self.scale;
        let map_y = |v: f32| (v - self.pad_y) / self.scale;
        Detection {
            x1: map_x(raw.x1),
            y1: map_y(raw.y1),
            x2: map_x(raw.x2),
            y2: map_y(raw.y2),
            confidence: raw.confidence,
        }
    }
}

/// Pick the highest-scoring bird box from raw YOLO output.
///
/// Output layout is `[1, 4 + classes, anchors]` with rows `cx, cy, w, h`
/// followed by per-class scores. Coordinates stay in detector input space.
pub fn best_bird_box(shape: &[i64], output: &[f32], threshold: f32) -> Result<Option<Detection>> {
    let [_, rows, anchors] = shape else {
        return Err(unexpected_shape(shape));
    };
    let (Ok(rows), Ok(anchors)) = (usize::try_from(*rows), usize::try_from(*anchors)) else {
        return Err(unexpected_shape(shape));
    };
    let score_row = 4 + BIRD_CLASS_ID;
    if rows <= score_row || output.len() < rows * anchors {
        return Err(unexpected_shape(shape));
    }

    let at = |row: usize, anchor: usize| output[row * anchors + anchor];

    let best = (0..anchors)
        .map(|anchor| (anchor, at(score_row, anchor)))
        .filter(|&(_, score)| score >= threshold)
        .max_by(|a, b| a.1.total_cmp(&b.1));

    Ok(best.map(|(anchor, confidence)| {
        let (cx, cy) = (at(0, anchor), at(1, anchor));
        let (half_w, half_h) = (at(2, anchor) / 2.0, at(3, anchor) / 2.0);
        Detection {
            x1: cx - half_w,
            y1: cy - half_h,
            x2: cx + half_w,
            y2: cy + half_h,
            confidence,
        }
    }))
}

fn unexpected_shape(shape: &[i64]) -> Error {
    Error::Inference {
        reason: format!("unexpected detector output shape {shape:?}"),
    }
}
