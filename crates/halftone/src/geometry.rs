//! Canvas, dot and crop geometry derived from a request.
//!
//! Every value here is a pure function of `size`, `density` and `spacing`,
//! so the renderer and the post-processor recompute them independently.

use std::f64::consts::SQRT_2;

use crate::{HalftoneError, Result};

/// Largest canvas or grid side accepted, in pixels.
pub const MAX_CANVAS_SIDE: u32 = 1 << 15;

/// Validated geometric parameters of one halftone request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    size: u32,
    density: f64,
    spacing: f64,
}

impl Geometry {
    /// Build geometry for an output of `size` pixels with a grid pitch of
    /// `density` pixels and a dot radius divisor of `spacing`.
    pub fn new(size: u32, density: f64, spacing: f64) -> Result<Self> {
        if size == 0 {
            return Err(HalftoneError::InvalidParameter(
                "size must be a positive integer".into(),
            ));
        }
        require_positive("density", density)?;
        require_positive("spacing", spacing)?;

        let geometry = Self {
            size,
            density,
            spacing,
        };
        let side = geometry.canvas_size().ceil();
        if side > f64::from(MAX_CANVAS_SIDE) {
            return Err(HalftoneError::InvalidParameter(format!(
                "canvas side {side} exceeds {MAX_CANVAS_SIDE} pixels"
            )));
        }
        let cells = (geometry.canvas_size() / density).round();
        if cells > f64::from(MAX_CANVAS_SIDE) {
            return Err(HalftoneError::InvalidParameter(format!(
                "density {density} yields a {cells}-cell grid, must be at most {MAX_CANVAS_SIDE}"
            )));
        }
        Ok(geometry)
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Exact side of the square working canvas: `(size + 2·density)·√2`.
    ///
    /// The margin keeps every output pixel inside the canvas once it has
    /// been rotated back by 45° and cropped.
    pub fn canvas_size(&self) -> f64 {
        (f64::from(self.size) + 2.0 * self.density) * SQRT_2
    }

    /// Canvas side rounded up to whole pixels.
    pub fn canvas_pixels(&self) -> u32 {
        self.canvas_size().ceil() as u32
    }

    /// Radius of a dot before the transfer function scales it.
    pub fn dot_radius(&self) -> f64 {
        self.density / (2.0 * self.spacing)
    }

    /// Top-left corner of the output square inside the back-rotated canvas.
    pub fn crop_offset(&self) -> f64 {
        f64::from(self.size) / 2.0 + 2.0 * self.density
    }

    /// Number of grid cells along each canvas side.
    pub fn grid_cells(&self) -> u32 {
        (self.canvas_size() / self.density).round().max(1.0) as u32
    }
}

fn require_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(HalftoneError::InvalidParameter(format!(
            "{name} must be a finite positive number, got {value}"
        )))
    }
}
