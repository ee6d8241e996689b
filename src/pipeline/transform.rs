//! Crop and resize of rendered pages.

use std::io::Cursor;

use axum::body::Bytes;
use image::{imageops::FilterType, DynamicImage, ImageFormat};

use crate::config::{CropSpec, ImageLimits};
use crate::error::FetchError;

/// Crops `image` by the configured edge fractions, then scales it to fit
/// within `limits` while keeping the aspect ratio.
///
/// The scale ratio is not clamped to 1, so small pages are upscaled.
/// Degenerate crops (`left + right >= 1` and the like) and tiny resize
/// targets are floored at 1×1 instead of failing.
pub fn transform(image: DynamicImage, crop: Option<&CropSpec>, limits: &ImageLimits) -> DynamicImage {
    let image = match crop {
        Some(crop) => {
            let (x, y, w, h) = crop_rect(image.width(), image.height(), crop);
            image.crop_imm(x, y, w, h)
        }
        None => image,
    };

    let (width, height) = fit_within(image.width(), image.height(), limits);
    image.resize_exact(width, height, FilterType::Lanczos3)
}

/// Kept rectangle as `(x, y, width, height)` for a crop on a `width`×`height` image.
pub fn crop_rect(width: u32, height: u32, crop: &CropSpec) -> (u32, u32, u32, u32) {
    let (x0, x1) = span(width, crop.left, crop.right);
    let (y0, y1) = span(height, crop.top, crop.bottom);
    (x0, y0, x1 - x0, y1 - y0)
}

/// Start and end of the kept span along one axis, at least one pixel wide.
fn span(extent: u32, leading: f64, trailing: f64) -> (u32, u32) {
    let extent_f = f64::from(extent);
    let max_start = extent.saturating_sub(1);

    let start = ((leading * extent_f).round() as u32).min(max_start);
    let end = ((extent_f - trailing * extent_f).round() as u32).min(extent.max(1));

    (start, end.max(start + 1))
}

/// Output dimensions after scaling by `min(max_width / w, max_height / h)`.
pub fn fit_within(width: u32, height: u32, limits: &ImageLimits) -> (u32, u32) {
    let width_f = f64::from(width.max(1));
    let height_f = f64::from(height.max(1));
    let ratio = (f64::from(limits.max_width) / width_f).min(f64::from(limits.max_height) / height_f);

    let scaled = |v: f64| ((v * ratio).round() as u32).max(1);
    (scaled(width_f), scaled(height_f))
}

/// Encodes an image as PNG.
pub fn encode_png(image: &DynamicImage) -> Result<Bytes, FetchError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| FetchError::Image(format!("encode png: {e}")))?;
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    fn limits(max_width: u32, max_height: u32) -> ImageLimits {
        ImageLimits {
            dpi: 100,
            max_width,
            max_height,
        }
    }

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])))
    }

    #[test]
    fn crop_removes_horizontal_edges() {
        let crop = CropSpec {
            left: 0.1,
            right: 0.1,
            top: 0.0,
            bottom: 0.0,
        };
        assert_eq!(crop_rect(1000, 800, &crop), (100, 0, 800, 800));
    }

    #[test]
    fn crop_removes_vertical_edges() {
        let crop = CropSpec {
            left: 0.0,
            right: 0.0,
            top: 0.25,
            bottom: 0.5,
        };
        assert_eq!(crop_rect(400, 800, &crop), (0, 200, 400, 200));
    }

    #[test]
    fn noop_crop_keeps_full_frame() {
        assert_eq!(crop_rect(640, 480, &CropSpec::NONE), (0, 0, 640, 480));
    }

    #[test]
    fn inverted_crop_floors_at_one_pixel() {
        let crop = CropSpec {
            left: 0.7,
            right: 0.6,
            top: 1.0,
            bottom: 1.0,
        };
        let (x, y, w, h) = crop_rect(100, 50, &crop);
        assert_eq!((w, h), (1, 1));
        assert!(x < 100);
        assert!(y < 50);
    }

    #[test]
    fn full_left_crop_stays_inside_image() {
        let crop = CropSpec {
            left: 1.0,
            right: 0.0,
            top: 0.0,
            bottom: 0.0,
        };
        assert_eq!(crop_rect(10, 10, &crop), (9, 0, 1, 10));
    }

    #[test]
    fn fit_downscales_by_tighter_bound() {
        // ratio = min(500/1000, 500/800) = 0.5
        assert_eq!(fit_within(1000, 800, &limits(500, 500)), (500, 400));
    }

    #[test]
    fn fit_upscales_small_images() {
        // ratio = min(400/100, 300/50) = 4
        assert_eq!(fit_within(100, 50, &limits(400, 300)), (400, 200));
    }

    #[test]
    fn fit_rounds_to_nearest() {
        // ratio = min(100/300, 100/200) = 1/3, 200/3 = 66.67
        assert_eq!(fit_within(300, 200, &limits(100, 100)), (100, 67));
    }

    #[test]
    fn transform_crops_before_resizing() {
        let crop = CropSpec {
            left: 0.1,
            right: 0.1,
            top: 0.0,
            bottom: 0.0,
        };
        // cropped to 800x800, ratio = min(400/800, 1000/800) = 0.5
        let out = transform(blank(1000, 800), Some(&crop), &limits(400, 1000));
        assert_eq!(out.dimensions(), (400, 400));
    }

    #[test]
    fn transform_without_crop() {
        let out = transform(blank(200, 100), None, &limits(100, 100));
        assert_eq!(out.dimensions(), (100, 50));
    }

    #[test]
    fn transform_degenerate_crop_does_not_panic() {
        let crop = CropSpec {
            left: 0.9,
            right: 0.9,
            top: 0.9,
            bottom: 0.9,
        };
        let out = transform(blank(64, 64), Some(&crop), &limits(32, 16));
        assert_eq!(out.dimensions(), (16, 16));
    }

    #[test]
    fn encode_png_roundtrips_dimensions() {
        let png = encode_png(&blank(12, 7)).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.dimensions(), (12, 7));
    }
}
