//! Classifier input preparation.

use crate::constants::preprocess::{INPUT_SIZE, MEAN_BGR, STD_BGR};
use image::DynamicImage;
use image::imageops::FilterType;
use ndarray::Array4;

/// RGB source channel for each output channel (B, G, R).
const BGR_FROM_RGB: [usize; 3] = [2, 1, 0];

/// Convert an image into the classifier's `(1, 3, 224, 224)` input tensor.
///
/// Resizes with Lanczos3, reorders channels to BGR and normalizes each value
/// as `(v / 255 - mean) / std`.
pub fn preprocess(image: &DynamicImage) -> Array4<f32> {
    let rgb = image.to_rgb8();
    let resized = image::imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, FilterType::Lanczos3);

    let size = INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

    for (x, y, pixel) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for (channel, &source) in BGR_FROM_RGB.iter().enumerate() {
            let value = f32::from(pixel[source]) / 255.0;
            tensor[[0, channel, y, x]] = (value - MEAN_BGR[channel]) / STD_BGR[channel];
        }
    }

    tensor
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn test_output_shape() {
        let tensor = preprocess(&solid(500, 300, [0, 0, 0]));
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_channels_are_bgr_normalized() {
        let tensor = preprocess(&solid(224, 224, [255, 128, 0]));

        let blue = (0.0 - 0.406) / 0.225;
        let green = (128.0 / 255.0 - 0.456) / 0.224;
        let red = (1.0 - 0.485) / 0.229;

        assert!((tensor[[0, 0, 10, 10]] - blue).abs() < 1e-5);
        assert!((tensor[[0, 1, 10, 10]] - green).abs() < 1e-5);
        assert!((tensor[[0, 2, 10, 10]] - red).abs() < 1e-5);
    }

    #[test]
    fn test_grayscale_input_is_expanded() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(50, 50, image::Luma([0])));
        let tensor = preprocess(&gray);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
        assert!((tensor[[0, 2, 0, 0]] - (-0.485 / 0.229)).abs() < 1e-5);
    }

    #[test]
    fn test_deterministic() {
        let image = solid(640, 480, [30, 90, 150]);
        assert_eq!(preprocess(&image), preprocess(&image));
    }
}
