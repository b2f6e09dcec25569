//! Species classifier: forward pass, temperature softmax and top-K.

use crate::config::InferenceDevice;
use crate::constants::inference::TEMPERATURE;
use crate::error::{Error, Result};
use crate::imaging::preprocess;
use crate::inference::session::{SessionPool, run_single};
use image::DynamicImage;
use ndarray::Array4;
use std::cmp::Ordering;
use std::path::Path;
use tracing::debug;

/// Anything that maps a preprocessed image tensor to class logits.
pub trait ImageModel: Send + Sync {
    /// Run a forward pass on a `(1, 3, H, W)` tensor and return raw logits.
    fn forward(&self, input: Array4<f32>) -> Result<Vec<f32>>;
}

/// ONNX-backed classifier network.
#[derive(Debug)]
pub struct OnnxModel {
    pool: SessionPool,
}

impl OnnxModel {
    /// Load the model with `workers` parallel sessions.
    pub fn load(path: &Path, device: InferenceDevice, workers: usize) -> Result<Self> {
        Ok(Self {
            pool: SessionPool::load(path, device, workers)?,
        })
    }
}

impl ImageModel for OnnxModel {
    fn forward(&self, input: Array4<f32>) -> Result<Vec<f32>> {
        let (batch, channels, height, width) = input.dim();
        let (data, offset) = input.into_raw_vec_and_offset();
        if offset.unwrap_or(0) != 0 {
            return Err(Error::Tensor {
                reason: "input tensor is not in standard layout".to_string(),
            });
        }

        let (_, logits) = self
            .pool
            .with_session(|session| run_single(session, [batch, channels, height, width], data))?;
        Ok(logits)
    }
}

/// A single classifier prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Index into the species table.
    pub class_index: usize,
    /// Softmax probability as a percentage (0-100].
    pub confidence: f32,
}

/// Image classifier with the fixed preprocessing and calibration.
pub struct BirdClassifier {
    model: Box<dyn ImageModel>,
}

impl std::fmt::Debug for BirdClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BirdClassifier").finish_non_exhaustive()
    }
}

impl BirdClassifier {
    /// Wrap a model.
    pub fn new(model: impl ImageModel + 'static) -> Self {
        Self {
            model: Box::new(model),
        }
    }

    /// Load the ONNX classifier.
    pub fn from_onnx(path: &Path, device: InferenceDevice, workers: usize) -> Result<Self> {
        Ok(Self::new(OnnxModel::load(path, device, workers)?))
    }

    /// Classify an image and return the `top_k` most likely classes.
    pub fn predict(&self, image: &DynamicImage, top_k: usize) -> Result<Vec<Prediction>> {
        let logits = self.model.forward(preprocess(image))?;
        debug!("Classifier produced {} logits", logits.len());
        if logits.is_empty() {
            return Err(Error::Inference {
                reason: "classifier produced an empty output".to_string(),
            });
        }

        let probabilities = softmax_with_temperature(&logits, TEMPERATURE);
        Ok(top_k_predictions(&probabilities, top_k))
    }
}

/// Softmax of `logits / temperature`, computed with max subtraction.
pub fn softmax_with_temperature(logits: &[f32], temperature: f32) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits
        .iter()
        .map(|&x| ((x - max) / temperature).exp())
        .collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Highest `k` probabilities as percentages.
///
/// Ordered by descending probability; ties go to the lower class index.
/// `k` is clamped to the number of classes.
pub fn top_k_predictions(probabilities: &[f32], k: usize) -> Vec<Prediction> {
    let mut indices: Vec<usize> = (0..probabilities.len()).collect();
    indices.sort_by(|&a, &b| {
        probabilities[b]
            .partial_cmp(&probabilities[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    indices
        .into_iter()
        .take(k)
        .map(|class_index| Prediction {
            class_index,
            confidence: probabilities[class_index] * 100.0,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    struct FixedLogits(Vec<f32>);

    impl ImageModel for FixedLogits {
        fn forward(&self, input: Array4<f32>) -> Result<Vec<f32>> {
            assert_eq!(input.shape(), &[1, 3, 224, 224]);
            Ok(self.0.clone())
        }
    }

    fn test_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([90, 140, 60])))
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax_with_temperature(&[1.0, 2.0, 3.0, -4.0], 0.6);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_temperature_sharpens() {
        let logits = [2.0, 1.0];
        let plain = softmax_with_temperature(&logits, 1.0);
        let sharp = softmax_with_temperature(&logits, 0.6);
        assert!(sharp[0] > plain[0]);
    }

    #[test]
    fn test_softmax_handles_large_logits() {
        let probs = softmax_with_temperature(&[1000.0, 999.0], 0.6);
        assert!(probs.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_top_k_ordering_and_ties() {
        let preds = top_k_predictions(&[0.1, 0.3, 0.3, 0.2, 0.1], 4);
        let indices: Vec<usize> = preds.iter().map(|p| p.class_index).collect();
        assert_eq!(indices, vec![1, 2, 3, 0]);
        assert!((preds[0].confidence - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_top_k_clamped_to_class_count() {
        let preds = top_k_predictions(&[0.5, 0.5], 10);
        assert_eq!(preds.len(), 2);
    }

    #[test]
    fn test_predict_orders_by_confidence() {
        let classifier = BirdClassifier::new(FixedLogits(vec![0.5, 3.0, -1.0, 2.0]));
        let preds = classifier.predict(&test_image(), 3).unwrap();

        assert_eq!(preds.len(), 3);
        assert_eq!(preds[0].class_index, 1);
        assert_eq!(preds[1].class_index, 3);
        for pair in preds.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
        for pred in &preds {
            assert!(pred.confidence > 0.0 && pred.confidence <= 100.0);
        }
    }

    #[test]
    fn test_predict_is_stateless() {
        let classifier = BirdClassifier::new(FixedLogits(vec![0.2, 0.1, 0.9]));
        let first = classifier.predict(&test_image(), 3).unwrap();
        let _ = classifier.predict(&test_image(), 1).unwrap();
        assert_eq!(classifier.predict(&test_image(), 3).unwrap(), first);
    }

    #[test]
    fn test_empty_logits_is_error() {
        let classifier = BirdClassifier::new(FixedLogits(Vec::new()));
        assert!(matches!(
            classifier.predict(&test_image(), 3),
            Err(Error::Inference { .. })
        ));
    }
}
