//! ONNX inference: species classifier and subject detector.

mod classifier;
mod detector;
mod session;

pub use classifier::{
    BirdClassifier, ImageModel, OnnxModel, Prediction, softmax_with_temperature,
    top_k_predictions,
};
pub use detector::{
    Crop, Detection, SubjectDetector, YoloDetector, best_bird_box, crop_to_detection,
    needs_detection,
};
pub use session::{SessionPool, execution_providers, init_runtime};
