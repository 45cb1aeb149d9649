//! UI element boundary detection around a click point.

use crate::RecognitionConfig;
use image::{imageops, GrayImage};
use imageproc::contours::find_contours;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::morphology::close;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};

const MIN_ELEMENT_SIZE: (u32, u32) = (20, 15);
const MAX_ELEMENT_SIZE: (u32, u32) = (300, 60);

const ADAPTIVE_BASE: (f64, f64) = (80.0, 40.0);
const ADAPTIVE_MAX: (f64, f64) = (400.0, 200.0);
const VARIANCE_SAMPLE: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Button,
    TextField,
    Icon,
    Unknown,
}

impl ElementKind {
    /// Margin added around a detected box before cropping.
    pub fn padding(&self) -> u32 {
        match self {
            ElementKind::Button => 5,
            ElementKind::TextField => 3,
            ElementKind::Icon | ElementKind::Unknown => 10,
        }
    }
}

/// Axis-aligned rectangle in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// Grow by `pad` on every side, clipped to the image.
    pub fn padded(&self, pad: u32, image_width: u32, image_height: u32) -> PixelRect {
        let x = self.x.saturating_sub(pad);
        let y = self.y.saturating_sub(pad);
        let right = (self.x + self.width + pad).min(image_width);
        let bottom = (self.y + self.height + pad).min(image_height);
        PixelRect {
            x,
            y,
            width: right.saturating_sub(x).max(1),
            height: bottom.saturating_sub(y).max(1),
        }
    }

    /// A `width`x`height` box centered on the point, shifted to stay inside the image.
    pub fn centered(
        cx: u32,
        cy: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    ) -> PixelRect {
        let width = width.clamp(1, image_width.max(1));
        let height = height.clamp(1, image_height.max(1));
        let x = cx.saturating_sub(width / 2).min(image_width.saturating_sub(width));
        let y = cy.saturating_sub(height / 2).min(image_height.saturating_sub(height));
        PixelRect { x, y, width, height }
    }
}

/// A contour box that looks like a UI element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementRegion {
    pub rect: PixelRect,
    pub kind: ElementKind,
    pub confidence: f32,
}

/// Classify a box by aspect ratio and height.
pub fn classify(width: u32, height: u32) -> ElementKind {
    if height == 0 {
        return ElementKind::Unknown;
    }
    let aspect = width as f64 / height as f64;
    if (1.5..=6.0).contains(&aspect) && (15..=40).contains(&height) {
        ElementKind::Button
    } else if aspect > 6.0 && height <= 30 {
        ElementKind::TextField
    } else if aspect < 1.5 && (15..=40).contains(&width) {
        ElementKind::Icon
    } else {
        ElementKind::Unknown
    }
}

/// Find element-sized outer contours in the search window around the point.
pub fn detect_regions(gray: &GrayImage, x: u32, y: u32, radius: u32) -> Vec<ElementRegion> {
    let (width, height) = gray.dimensions();
    let left = x.saturating_sub(radius);
    let top = y.saturating_sub(radius);
    let right = (x + radius).min(width);
    let bottom = (y + radius).min(height);
    if right <= left || bottom <= top {
        return Vec::new();
    }

    let window = imageops::crop_imm(gray, left, top, right - left, bottom - top).to_image();
    let edges = close(&canny(&window, 50.0, 150.0), Norm::LInf, 1);

    find_contours::<i32>(&edges)
        .into_iter()
        .filter(|contour| contour.parent.is_none())
        .filter_map(|contour| {
            let (min_x, min_y, max_x, max_y) = bounds(&contour.points)?;
            let w = (max_x - min_x + 1) as u32;
            let h = (max_y - min_y + 1) as u32;
            if w < MIN_ELEMENT_SIZE.0
                || h < MIN_ELEMENT_SIZE.1
                || w > MAX_ELEMENT_SIZE.0
                || h > MAX_ELEMENT_SIZE.1
            {
                return None;
            }

            let fill = polygon_area(&contour.points) / (w as f64 * h as f64);
            Some(ElementRegion {
                rect: PixelRect {
                    x: left + min_x as u32,
                    y: top + min_y as u32,
                    width: w,
                    height: h,
                },
                kind: classify(w, h),
                confidence: (fill as f32 + 0.3).min(1.0),
            })
        })
        .collect()
}

/// Prefer the most confident region containing the point, else the nearest
/// one whose center is within `max_distance`.
pub fn select_region(
    regions: &[ElementRegion],
    x: u32,
    y: u32,
    max_distance: u32,
) -> Option<ElementRegion> {
    let containing = regions
        .iter()
        .filter(|r| r.rect.contains(x, y))
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence));
    if let Some(region) = containing {
        return Some(*region);
    }

    regions
        .iter()
        .map(|r| {
            let (cx, cy) = r.rect.center();
            let distance = ((cx - x as f64).powi(2) + (cy - y as f64).powi(2)).sqrt();
            (r, distance)
        })
        .filter(|(_, distance)| *distance <= max_distance as f64)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(r, _)| *r)
}

pub fn locate_element(
    gray: &GrayImage,
    x: u32,
    y: u32,
    config: &RecognitionConfig,
) -> Option<ElementRegion> {
    let regions = detect_regions(gray, x, y, config.search_radius_px);
    select_region(&regions, x, y, config.nearest_region_max_distance_px)
}

/// Crop box used when no element boundary is found. Busier surroundings
/// get a larger box, up to 400x200.
pub fn adaptive_rect(gray: &GrayImage, x: u32, y: u32) -> PixelRect {
    let (width, height) = gray.dimensions();
    let sample = PixelRect::centered(x, y, VARIANCE_SAMPLE, VARIANCE_SAMPLE, width, height);
    let variance = luminance_stats(gray, sample).1;

    let scale = 1.0 + variance / 1000.0;
    let w = (ADAPTIVE_BASE.0 * scale).min(ADAPTIVE_MAX.0) as u32;
    let h = (ADAPTIVE_BASE.1 * scale).min(ADAPTIVE_MAX.1) as u32;
    PixelRect::centered(x, y, w, h, width, height)
}

/// Mean and variance of the luminance inside `rect`.
pub(crate) fn luminance_stats(gray: &GrayImage, rect: PixelRect) -> (f64, f64) {
    let mut count = 0u64;
    let mut sum = 0f64;
    let mut sum_sq = 0f64;
    for py in rect.y..(rect.y + rect.height).min(gray.height()) {
        for px in rect.x..(rect.x + rect.width).min(gray.width()) {
            let v = gray.get_pixel(px, py)[0] as f64;
            sum += v;
            sum_sq += v * v;
            count += 1;
        }
    }
    if count == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / count as f64;
    (mean, (sum_sq / count as f64 - mean * mean).max(0.0))
}

fn bounds(points: &[Point<i32>]) -> Option<(i32, i32, i32, i32)> {
    let first = points.first()?;
    Some(points.iter().fold(
        (first.x, first.y, first.x, first.y),
        |(min_x, min_y, max_x, max_y), p| {
            (
                min_x.min(p.x),
                min_y.min(p.y),
                max_x.max(p.x),
                max_y.max(p.y),
            )
        },
    ))
}

/// Shoelace area of a closed contour.
fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    (twice as f64 / 2.0).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn canvas(width: u32, height: u32) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([255]))
    }

    fn fill(image: &mut GrayImage, rect: PixelRect, value: u8) {
        for y in rect.y..rect.y + rect.height {
            for x in rect.x..rect.x + rect.width {
                image.put_pixel(x, y, Luma([value]));
            }
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(100, 30), ElementKind::Button);
        assert_eq!(classify(280, 24), ElementKind::TextField);
        assert_eq!(classify(24, 24), ElementKind::Icon);
        assert_eq!(classify(200, 55), ElementKind::Unknown);
        assert_eq!(classify(10, 0), ElementKind::Unknown);
    }

    #[test]
    fn test_detects_button_under_click() {
        let mut image = canvas(500, 400);
        let button = PixelRect { x: 200, y: 200, width: 100, height: 30 };
        fill(&mut image, button, 30);

        let region = locate_element(&image, 250, 215, &RecognitionConfig::default())
            .expect("button should be detected");
        assert_eq!(region.kind, ElementKind::Button);
        assert!(region.rect.contains(250, 215));
        assert!(region.confidence > 0.3);
    }

    #[test]
    fn test_blank_area_has_no_region() {
        let image = canvas(300, 300);
        assert!(locate_element(&image, 150, 150, &RecognitionConfig::default()).is_none());
    }

    #[test]
    fn test_select_prefers_containing_then_nearest() {
        let near = ElementRegion {
            rect: PixelRect { x: 125, y: 100, width: 40, height: 20 },
            kind: ElementKind::Button,
            confidence: 0.9,
        };
        let holding_low = ElementRegion {
            rect: PixelRect { x: 90, y: 90, width: 40, height: 20 },
            kind: ElementKind::Button,
            confidence: 0.4,
        };
        let holding_high = ElementRegion { confidence: 0.8, ..holding_low };

        let picked = select_region(&[near, holding_low, holding_high], 100, 100, 50).unwrap();
        assert_eq!(picked.confidence, 0.8);

        // Nothing contains (100, 100): nearest center within 50 px wins.
        let picked = select_region(&[near], 100, 100, 50).unwrap();
        assert_eq!(picked.rect.x, 125);
        assert!(select_region(&[near], 10, 10, 50).is_none());
    }

    #[test]
    fn test_adaptive_rect_grows_with_variance() {
        let flat = canvas(800, 600);
        let rect = adaptive_rect(&flat, 400, 300);
        assert_eq!((rect.width, rect.height), (80, 40));
        assert!(rect.contains(400, 300));

        let mut busy = canvas(800, 600);
        for y in 0..600 {
            for x in 0..800 {
                if (x + y) % 2 == 0 {
                    busy.put_pixel(x, y, Luma([0]));
                }
            }
        }
        let rect = adaptive_rect(&busy, 400, 300);
        assert_eq!((rect.width, rect.height), (400, 200));
    }

    #[test]
    fn test_rect_clipping() {
        let rect = PixelRect::centered(2, 2, 80, 40, 100, 100);
        assert_eq!((rect.x, rect.y), (0, 0));
        let rect = PixelRect::centered(99, 99, 80, 40, 100, 100);
        assert_eq!((rect.x + rect.width, rect.y + rect.height), (100, 100));
        let padded = PixelRect { x: 2, y: 2, width: 10, height: 10 }.padded(5, 14, 14);
        assert_eq!(padded, PixelRect { x: 0, y: 0, width: 14, height: 14 });
    }

    #[test]
    fn test_polygon_area() {
        let square = [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert_eq!(polygon_area(&square), 100.0);
    }
}
