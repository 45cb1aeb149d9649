//! Coarse visual description of the area around a click, used when no
//! backend produced acceptable text.

use super::region::{luminance_stats, PixelRect};
use image::{imageops, DynamicImage, RgbImage};
use imageproc::edges::canny;
use std::collections::HashSet;

pub const BUTTON_OR_ELEMENT: &str = "button or interface element";
pub const EMPTY_AREA: &str = "empty area";
pub const COMPLEX_ELEMENT: &str = "complex interface element";
pub const LIGHT_ELEMENT: &str = "light interface element";
pub const DARK_ELEMENT: &str = "dark interface element";

/// Visual statistics of a square region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionStats {
    /// Fraction of pixels on a Canny edge.
    pub edge_density: f64,
    pub unique_colors: usize,
    pub mean: f64,
    pub variance: f64,
}

pub fn region_stats(image: &RgbImage, rect: PixelRect) -> RegionStats {
    let crop = imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height).to_image();
    let gray = DynamicImage::ImageRgb8(crop.clone()).into_luma8();

    let edges = canny(&gray, 50.0, 150.0);
    let total = (edges.width() as u64 * edges.height() as u64).max(1);
    let edge_pixels = edges.pixels().filter(|p| p[0] > 0).count() as u64;

    let unique_colors = crop.pixels().map(|p| p.0).collect::<HashSet<_>>().len();
    let full = PixelRect {
        x: 0,
        y: 0,
        width: gray.width(),
        height: gray.height(),
    };
    let (mean, variance) = luminance_stats(&gray, full);

    RegionStats {
        edge_density: edge_pixels as f64 / total as f64,
        unique_colors,
        mean,
        variance,
    }
}

pub fn classify_stats(stats: &RegionStats) -> Option<&'static str> {
    if stats.edge_density > 0.1 && stats.unique_colors < 10 {
        Some(BUTTON_OR_ELEMENT)
    } else if stats.edge_density < 0.05 && stats.variance < 100.0 {
        Some(EMPTY_AREA)
    } else if stats.unique_colors > 50 && stats.edge_density > 0.05 {
        Some(COMPLEX_ELEMENT)
    } else if stats.mean > 200.0 {
        Some(LIGHT_ELEMENT)
    } else if stats.mean < 100.0 {
        Some(DARK_ELEMENT)
    } else {
        None
    }
}

/// Describe the `size`x`size` square centered on the point.
pub fn describe(image: &RgbImage, x: u32, y: u32, size: u32) -> Option<&'static str> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return None;
    }
    let rect = PixelRect::centered(x, y, size, size, width, height);
    classify_stats(&region_stats(image, rect))
}
