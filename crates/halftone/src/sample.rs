//! Grid sampling: area-averaged downsampling to one gray value per cell.

use image::RgbImage;
use tracing::debug;

use crate::{HalftoneError, Result};

/// Luma weights (ITU-R BT.601) used to turn RGB into gray.
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Square grid of gray intensities in `[0, 1]`, 0 being black.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    cells: u32,
    values: Vec<f32>,
}

impl Grid {
    /// Cells per side.
    pub fn cells(&self) -> u32 {
        self.cells
    }

    /// Gray intensity of cell `(x, y)`.
    pub fn intensity(&self, x: u32, y: u32) -> f32 {
        self.values[(y * self.cells + x) as usize]
    }

    /// Rows of intensities, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.values.chunks(self.cells as usize)
    }
}

/// Resample `img` to `cells`×`cells` with an area filter and read the gray
/// level of each cell.
///
/// Every cell is the area-weighted mean of the source pixels it covers, so
/// fractional pixel overlaps contribute proportionally.
pub fn sample_grid(img: &RgbImage, cells: u32) -> Result<Grid> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(HalftoneError::DecodeFailure(
            "cannot sample an empty raster".into(),
        ));
    }
    if cells == 0 {
        return Err(HalftoneError::DecodeFailure(
            "grid must have at least one cell".into(),
        ));
    }
    debug!(width, height, cells, "Sampling raster onto grid");

    let gray: Vec<f32> = img.pixels().map(|p| luminance(p.0)).collect();

    let x_weights = area_weights(width, cells);
    let y_weights = area_weights(height, cells);

    // Horizontal pass: height × cells.
    let w = width as usize;
    let n = cells as usize;
    let mut rows = vec![0.0f32; height as usize * n];
    for (src_row, out_row) in gray.chunks(w).zip(rows.chunks_mut(n)) {
        for (out, weights) in out_row.iter_mut().zip(&x_weights) {
            *out = weights.iter().map(|&(i, wt)| src_row[i] * wt).sum();
        }
    }

    // Vertical pass: cells × cells.
    let mut values = vec![0.0f32; n * n];
    for (gy, weights) in y_weights.iter().enumerate() {
        for gx in 0..n {
            let v: f32 = weights.iter().map(|&(j, wt)| rows[j * n + gx] * wt).sum();
            values[gy * n + gx] = v.clamp(0.0, 1.0);
        }
    }

    Ok(Grid { cells, values })
}

/// Normalized luminance of an RGB pixel.
fn luminance([r, g, b]: [u8; 3]) -> f32 {
    (f32::from(r) * LUMA_WEIGHTS[0] + f32::from(g) * LUMA_WEIGHTS[1] + f32::from(b) * LUMA_WEIGHTS[2])
        / 255.0
}

/// For each of `dst` output samples, the source indices it overlaps and the
/// share of the sample each one covers. Shares sum to 1.
fn area_weights(src: u32, dst: u32) -> Vec<Vec<(usize, f32)>> {
    let scale = f64::from(src) / f64::from(dst);
    (0..dst)
        .map(|i| {
            let start = f64::from(i) * scale;
            let end = start + scale;
            let first = start.floor() as u32;
            let last = (end.ceil() as u32).min(src);
            (first..last)
                .filter_map(|j| {
                    let overlap = end.min(f64::from(j + 1)) - start.max(f64::from(j));
                    (overlap > 0.0).then(|| (j as usize, (overlap / scale) as f32))
                })
                .collect()
        })
        .collect()
}
