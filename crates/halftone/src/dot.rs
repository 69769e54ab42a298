//! Dot sizing.
//!
//! Each grid cell turns into one circle centered on the cell's canvas point.
//! Its radius is the base dot radius times a factor read off an asymmetric
//! gamma curve pivoted at half coverage:
//!
//! ```text
//! scale  = 1 - gray
//! sign   = if scale > 0.5 { 1 } else { -1 }
//! factor = sign · (sign · (scale - 0.5))^1.2 + 0.5
//! ```
//!
//! The curve maps `[0, 1]` onto roughly `[0.065, 0.935]` and is what gives the
//! screen its look, so it must stay exactly as written.

use crate::geometry::Geometry;
use crate::sample::Grid;

/// Exponent of the transfer curve.
const GAMMA: f64 = 1.2;

/// A circle on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dot {
    pub cx: f64,
    pub cy: f64,
    pub radius: f64,
}

/// Map an ink coverage `scale` in `[0, 1]` to a radius factor.
pub fn transfer(scale: f64) -> f64 {
    let sign = if scale > 0.5 { 1.0 } else { -1.0 };
    sign * (sign * (scale - 0.5)).powf(GAMMA) + 0.5
}

/// Radius factor for a cell of the given gray intensity (1 = white).
pub fn dot_factor(gray: f32) -> f64 {
    transfer(1.0 - f64::from(gray))
}

/// The dot for cell `(x, y)` of the grid.
pub fn dot_for_cell(geometry: &Geometry, x: u32, y: u32, gray: f32) -> Dot {
    let density = geometry.density();
    Dot {
        cx: f64::from(x) * density,
        cy: f64::from(y) * density,
        radius: geometry.dot_radius() * dot_factor(gray),
    }
}

/// Dots of grid row `y`, left to right.
pub fn row_dots<'a>(
    geometry: &'a Geometry,
    y: u32,
    row: &'a [f32],
) -> impl Iterator<Item = Dot> + 'a {
    row.iter()
        .zip(0u32..)
        .map(move |(&gray, x)| dot_for_cell(geometry, x, y, gray))
}

/// All dots of the grid in row-major order.
pub fn layout<'a>(geometry: &'a Geometry, grid: &'a Grid) -> impl Iterator<Item = Dot> + 'a {
    grid.rows()
        .zip(0u32..)
        .flat_map(move |(row, y)| row_dots(geometry, y, row))
}
