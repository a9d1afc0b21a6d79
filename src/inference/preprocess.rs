//! Image preprocessing
//!
//! Decodes uploaded bytes, resizes to the model's square input and normalizes
//! with the per-channel statistics of the training set.

use image::{imageops::FilterType, DynamicImage};

use crate::utils::error::{PlantDocError, Result};

/// Training-set channel means (RGB); predictions are only valid with these exact values
pub const PLANT_MEAN: [f32; 3] = [0.4594, 0.4749, 0.4108];
/// Training-set channel standard deviations (RGB)
pub const PLANT_STD: [f32; 3] = [0.1855, 0.1621, 0.1997];

/// Decode raw bytes into an RGB image, sniffing the format from the content
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(PlantDocError::ImageDecode("empty payload".to_string()));
    }
    let image = image::load_from_memory(bytes)?;
    Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
}

/// Resize an image to exactly `size` x `size` with a bilinear filter
pub fn resize_image(image: &DynamicImage, size: u32) -> DynamicImage {
    image.resize_exact(size, size, FilterType::Triangle)
}

/// Normalize an image to a flat vector in CHW layout: [C, H, W] flattened
pub fn normalize_image(image: &DynamicImage) -> Vec<f32> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let num_pixels = (width * height) as usize;

    let mut normalized = vec![0.0f32; 3 * num_pixels];

    for (i, pixel) in rgb.pixels().enumerate() {
        for c in 0..3 {
            normalized[c * num_pixels + i] =
                (pixel[c] as f32 / 255.0 - PLANT_MEAN[c]) / PLANT_STD[c];
        }
    }

    normalized
}

/// Decode, resize and normalize in one step
pub fn preprocess_bytes(bytes: &[u8], size: u32) -> Result<Vec<f32>> {
    let image = decode_image(bytes)?;
    let resized = resize_image(&image, size);
    Ok(normalize_image(&resized))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::png_bytes;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_decode_png() {
        let bytes = png_bytes(40, 30, [10, 200, 30]);
        let image = decode_image(&bytes).unwrap();
        assert_eq!(image.width(), 40);
        assert_eq!(image.height(), 30);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_image(b"definitely not an image"),
            Err(PlantDocError::ImageDecode(_))
        ));
        assert!(matches!(decode_image(&[]), Err(PlantDocError::ImageDecode(_))));
    }

    #[test]
    fn test_decode_rejects_truncated_png() {
        let bytes = png_bytes(64, 64, [1, 2, 3]);
        let truncated = &bytes[..bytes.len() / 2];
        assert!(decode_image(truncated).is_err());
    }

    #[test]
    fn test_resize_ignores_aspect_ratio() {
        let image = DynamicImage::new_rgb8(100, 50);
        let resized = resize_image(&image, 224);
        assert_eq!((resized.width(), resized.height()), (224, 224));
    }

    #[test]
    fn test_normalize_uses_channel_statistics() {
        let mut rgb = RgbImage::new(2, 2);
        for pixel in rgb.pixels_mut() {
            *pixel = Rgb([255, 0, 128]);
        }
        let normalized = normalize_image(&DynamicImage::ImageRgb8(rgb));

        assert_eq!(normalized.len(), 3 * 4);
        let expected_r = (1.0 - PLANT_MEAN[0]) / PLANT_STD[0];
        let expected_g = (0.0 - PLANT_MEAN[1]) / PLANT_STD[1];
        let expected_b = (128.0 / 255.0 - PLANT_MEAN[2]) / PLANT_STD[2];
        // CHW: four R values, then four G, then four B
        assert!((normalized[0] - expected_r).abs() < 1e-5);
        assert!((normalized[4] - expected_g).abs() < 1e-5);
        assert!((normalized[11] - expected_b).abs() < 1e-5);
    }

    #[test]
    fn test_preprocess_bytes_shape() {
        let bytes = png_bytes(17, 23, [90, 90, 90]);
        let tensor = preprocess_bytes(&bytes, 32).unwrap();
        assert_eq!(tensor.len(), 3 * 32 * 32);
    }
}
