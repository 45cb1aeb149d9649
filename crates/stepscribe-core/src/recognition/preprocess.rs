//! Image preparation for each recognition strategy.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::filter::sharpen3x3;
use imageproc::morphology::close;
use serde::{Deserialize, Serialize};

/// Crops smaller than this are upscaled before recognition.
const MIN_RECOGNITION_SIZE: (u32, u32) = (100, 50);

/// Recognition strategies, in cascade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Contrast boost plus sharpening, for the fast backend.
    Sharpened,
    /// Otsu binarization, for the secondary backend.
    BinaryThreshold,
    /// Otsu binarization followed by a morphological close.
    ButtonMorphology,
    /// Strong contrast boost and a fixed mid threshold.
    HighContrast,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Sharpened => "sharpened",
            Strategy::BinaryThreshold => "binary_threshold",
            Strategy::ButtonMorphology => "button_morphology",
            Strategy::HighContrast => "high_contrast",
        }
    }

    pub fn prepare(&self, crop: &GrayImage) -> GrayImage {
        let base = upscale_small(crop);
        match self {
            Strategy::Sharpened => sharpen3x3(&imageops::contrast(&base, 40.0)),
            Strategy::BinaryThreshold => {
                let level = otsu_level(&base);
                binarize(&base, level)
            }
            Strategy::ButtonMorphology => {
                let level = otsu_level(&base);
                close(&binarize(&base, level), Norm::LInf, 1)
            }
            Strategy::HighContrast => binarize(&imageops::contrast(&base, 75.0), 127),
        }
    }
}

/// Scale up so both sides reach the recognition minimum, keeping aspect.
pub fn upscale_small(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    if width >= MIN_RECOGNITION_SIZE.0 && height >= MIN_RECOGNITION_SIZE.1 {
        return image.clone();
    }
    let scale = (MIN_RECOGNITION_SIZE.0 as f64 / width as f64)
        .max(MIN_RECOGNITION_SIZE.1 as f64 / height as f64);
    let new_width = (width as f64 * scale).ceil() as u32;
    let new_height = (height as f64 * scale).ceil() as u32;
    imageops::resize(image, new_width, new_height, FilterType::Lanczos3)
}

/// Pixels above `level` become white, the rest black.
pub fn binarize(image: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y)[0] > level {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upscale_small() {
        let small = GrayImage::new(40, 20);
        let up = upscale_small(&small);
        assert!(up.width() >= 100 && up.height() >= 50);
        assert_eq!(up.width() / up.height(), 2);

        let large = GrayImage::new(200, 80);
        assert_eq!(upscale_small(&large).dimensions(), (200, 80));
    }

    #[test]
    fn test_binary_strategies_output_two_levels() {
        let gradient = GrayImage::from_fn(120, 60, |x, _| Luma([(x * 2) as u8]));
        for strategy in [
            Strategy::BinaryThreshold,
            Strategy::ButtonMorphology,
            Strategy::HighContrast,
        ] {
            let out = strategy.prepare(&gradient);
            assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255), "{}", strategy.name());
        }
    }

    #[test]
    fn test_sharpened_keeps_size() {
        let image = GrayImage::from_pixel(150, 60, Luma([128]));
        assert_eq!(Strategy::Sharpened.prepare(&image).dimensions(), (150, 60));
    }
}
