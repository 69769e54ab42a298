//! Compositing: a white canvas with every dot painted on it.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::dot::{self, Dot};
use crate::geometry::Geometry;
use crate::sample::Grid;
use crate::{HalftoneError, Result};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Raster surface owned by a single request.
#[derive(Debug)]
pub struct Canvas {
    pixels: RgbImage,
}

impl Canvas {
    /// Create a `side`×`side` canvas filled with white.
    pub fn new(side: u32) -> Self {
        let mut pixels = RgbImage::new(side, side);
        if side > 0 {
            draw_filled_rect_mut(&mut pixels, Rect::at(0, 0).of_size(side, side), WHITE);
        }
        Self { pixels }
    }

    /// Paint a solid black circle. Edge pixels are darkened by the fraction of
    /// them the circle covers; anything off-canvas is clipped.
    pub fn fill_circle(&mut self, dot: &Dot) {
        if dot.radius <= 0.0 {
            return;
        }
        let (w, h) = self.pixels.dimensions();
        let reach = dot.radius + 1.0;
        let x0 = (dot.cx - reach).floor().max(0.0) as u32;
        let y0 = (dot.cy - reach).floor().max(0.0) as u32;
        let x1 = ((dot.cx + reach).ceil().max(0.0) as u32).min(w);
        let y1 = ((dot.cy + reach).ceil().max(0.0) as u32).min(h);

        for py in y0..y1 {
            for px in x0..x1 {
                // Distance from the pixel center.
                let dx = f64::from(px) + 0.5 - dot.cx;
                let dy = f64::from(py) + 0.5 - dot.cy;
                let coverage = (dot.radius + 0.5 - dx.hypot(dy)).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    let pixel = self.pixels.get_pixel_mut(px, py);
                    let keep = 1.0 - coverage;
                    for c in pixel.0.iter_mut() {
                        *c = (f64::from(*c) * keep).round() as u8;
                    }
                }
            }
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn into_image(self) -> RgbImage {
        self.pixels
    }
}

/// Draw the dot for every grid cell, row by row, onto a fresh canvas.
///
/// `cancel` is polled between rows; a cancelled request drops the canvas and
/// returns [`HalftoneError::Cancelled`].
pub fn composite(
    geometry: &Geometry,
    grid: &Grid,
    cancel: Option<&CancellationToken>,
) -> Result<RgbImage> {
    let side = geometry.canvas_pixels();
    debug!(
        side,
        cells = grid.cells(),
        radius = geometry.dot_radius(),
        "Compositing dots"
    );

    let mut canvas = Canvas::new(side);
    for (row, y) in grid.rows().zip(0u32..) {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(HalftoneError::Cancelled);
        }
        for dot in dot::row_dots(geometry, y, row) {
            canvas.fill_circle(&dot);
        }
    }

    Ok(canvas.into_image())
}
