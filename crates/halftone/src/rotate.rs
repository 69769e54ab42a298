//! Arbitrary-angle rotation with bounds expansion.
//!
//! The rotated raster grows to the bounding box of the turned input, uncovered
//! corners are filled, and the result starts at the origin (no page offset).

use image::imageops;
use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use tracing::debug;

use crate::{HalftoneError, Result};

/// Fill for corners uncovered by a rotation (X11 "grey").
pub const GREY: Rgb<u8> = Rgb([190, 190, 190]);

/// Width and height of the box enclosing a `width`×`height` raster turned by
/// `degrees`.
pub fn rotated_bounds(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    let theta = degrees.to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let (w, h) = (f64::from(width), f64::from(height));
    // Trim float noise so that 90° turns do not gain a pixel.
    let bw = (w * cos + h * sin - 1e-6).ceil().max(1.0);
    let bh = (w * sin + h * cos - 1e-6).ceil().max(1.0);
    (bw as u32, bh as u32)
}

/// Rotate `img` clockwise by `degrees`, expanding the canvas so no pixel is
/// lost. Uncovered areas are painted with `fill`.
pub fn rotate_expand(img: &RgbImage, degrees: f64, fill: Rgb<u8>) -> Result<RgbImage> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(HalftoneError::RotationFailure(
            "cannot rotate an empty raster".into(),
        ));
    }
    if !degrees.is_finite() {
        return Err(HalftoneError::RotationFailure(format!(
            "rotation angle must be finite, got {degrees}"
        )));
    }

    let (bw, bh) = rotated_bounds(w, h, degrees);
    debug!(w, h, degrees, bw, bh, "Rotating raster");

    // Center the input on a working canvas large enough for both the input
    // and its rotated footprint.
    let (pw, ph) = (bw.max(w), bh.max(h));
    let mut padded = RgbImage::from_pixel(pw, ph, fill);
    imageops::overlay(
        &mut padded,
        img,
        i64::from((pw - w) / 2),
        i64::from((ph - h) / 2),
    );

    let rotated = rotate_about_center(
        &padded,
        degrees.to_radians() as f32,
        Interpolation::Bilinear,
        fill,
    );
    drop(padded);

    // Repage: keep only the rotated footprint, anchored at (0, 0).
    if (pw, ph) == (bw, bh) {
        return Ok(rotated);
    }
    Ok(imageops::crop_imm(&rotated, (pw - bw) / 2, (ph - bh) / 2, bw, bh).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create an image whose top-left quadrant is black and the rest white.
    fn create_quadrant_image(side: u32) -> RgbImage {
        RgbImage::from_fn(side, side, |x, y| {
            if x < side / 2 && y < side / 2 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        })
    }

    #[test]
    fn test_rotated_bounds_45_degrees() {
        // 100·√2 = 141.42
        assert_eq!(rotated_bounds(100, 100, 45.0), (142, 142));
        assert_eq!(rotated_bounds(100, 100, -45.0), (142, 142));
    }

    #[test]
    fn test_rotated_bounds_right_angles() {
        assert_eq!(rotated_bounds(30, 20, 0.0), (30, 20));
        assert_eq!(rotated_bounds(30, 20, 90.0), (20, 30));
        assert_eq!(rotated_bounds(30, 20, 180.0), (30, 20));
    }

    #[test]
    fn test_rotate_expand_dimensions() {
        let img = create_quadrant_image(40);
        let rotated = rotate_expand(&img, 45.0, GREY).unwrap();
        assert_eq!(rotated.dimensions(), rotated_bounds(40, 40, 45.0));
    }

    #[test]
    fn test_rotate_expand_fills_corners() {
        let img = RgbImage::from_pixel(40, 40, Rgb([0, 0, 0]));
        let rotated = rotate_expand(&img, 45.0, GREY).unwrap();
        // The corners of the expanded box are outside the turned square.
        assert_eq!(*rotated.get_pixel(0, 0), GREY);
        let (w, h) = rotated.dimensions();
        assert_eq!(*rotated.get_pixel(w - 1, h - 1), GREY);
        // The center is still inside it.
        assert_eq!(rotated.get_pixel(w / 2, h / 2).0[0], 0);
    }

    #[test]
    fn test_rotate_expand_is_clockwise() {
        let img = create_quadrant_image(16);
        let rotated = rotate_expand(&img, 90.0, GREY).unwrap();
        assert_eq!(rotated.dimensions(), (16, 16));
        // Top-left quadrant moves to top-right.
        assert!(rotated.get_pixel(12, 3).0[0] < 64);
        assert!(rotated.get_pixel(3, 3).0[0] > 192);
        assert!(rotated.get_pixel(12, 12).0[0] > 192);
    }

    #[test]
    fn test_rotate_there_and_back_keeps_center() {
        let img = create_quadrant_image(32);
        let forward = rotate_expand(&img, 45.0, GREY).unwrap();
        let back = rotate_expand(&forward, -45.0, GREY).unwrap();
        let (w, h) = back.dimensions();
        let (cx, cy) = (w / 2, h / 2);
        // Dark quadrant up-left of center, light quadrant down-right.
        assert!(back.get_pixel(cx - 8, cy - 8).0[0] < 64);
        assert!(back.get_pixel(cx + 8, cy + 8).0[0] > 192);
    }

    #[test]
    fn test_rotate_empty_raster_fails() {
        let img = RgbImage::new(0, 0);
        assert!(matches!(
            rotate_expand(&img, 45.0, GREY),
            Err(HalftoneError::RotationFailure(_))
        ));
    }

    #[test]
    fn test_rotate_non_finite_angle_fails() {
        let img = create_quadrant_image(4);
        assert!(rotate_expand(&img, f64::NAN, GREY).is_err());
    }
}
