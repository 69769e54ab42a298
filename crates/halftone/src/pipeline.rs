//! The halftone pipeline.
//!
//! load + decode (await) → rotate +45° → sample grid → draw dots →
//! rotate −45° → crop → encode → write (await)
//!
//! Every buffer in between belongs to the request that created it. CPU-bound
//! stages run on the blocking pool.

use image::{DynamicImage, RgbImage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::geometry::Geometry;
use crate::options::HalftoneOptions;
use crate::output::{self, HalftoneOutput};
use crate::rotate::{self, GREY};
use crate::sample;
use crate::source::ImageSource;
use crate::{HalftoneError, Result, SCREEN_ANGLE, compose};

/// Render `image` as a 45° circle-dot halftone.
///
/// Resolves with the output path when `options.output_file` is set and with
/// the encoded bytes otherwise.
pub async fn halftone(
    image: impl Into<ImageSource>,
    options: &HalftoneOptions,
) -> Result<HalftoneOutput> {
    halftone_with_cancel(image, options, &CancellationToken::new()).await
}

/// Like [`halftone`], but gives up with [`HalftoneError::Cancelled`] once
/// `cancel` fires. Cancellation is observed after loading, between grid rows
/// and around the final write; no output file is left behind.
pub async fn halftone_with_cancel(
    image: impl Into<ImageSource>,
    options: &HalftoneOptions,
    cancel: &CancellationToken,
) -> Result<HalftoneOutput> {
    let request = options.validate()?;
    let geometry = request.geometry;
    debug!(
        size = geometry.size(),
        density = geometry.density(),
        spacing = geometry.spacing(),
        format = %request.format,
        "Starting halftone"
    );

    let source = image.into();
    let decoded = tokio::select! {
        _ = cancel.cancelled() => return Err(HalftoneError::Cancelled),
        decoded = source.decode() => decoded?,
    };
    if cancel.is_cancelled() {
        return Err(HalftoneError::Cancelled);
    }

    let token = cancel.clone();
    let (format, quality) = (request.format, request.quality);
    let encoded = tokio::task::spawn_blocking(move || {
        let rendered = render_inner(&decoded, &geometry, Some(&token))?;
        output::encode(&rendered, format, quality)
    })
    .await
    .map_err(|e| HalftoneError::EncodeFailure(format!("render task failed: {e}")))??;

    let result = match request.output_file {
        Some(path) => {
            output::write_atomic(&path, &encoded, Some(cancel)).await?;
            HalftoneOutput::File(path)
        }
        None if cancel.is_cancelled() => return Err(HalftoneError::Cancelled),
        None => HalftoneOutput::Bytes(encoded),
    };

    info!(size = geometry.size(), %format, "Halftone complete");
    Ok(result)
}

/// Render the cropped halftone raster without encoding it.
pub fn render(image: &DynamicImage, geometry: &Geometry) -> Result<RgbImage> {
    render_inner(image, geometry, None)
}

fn render_inner(
    image: &DynamicImage,
    geometry: &Geometry,
    cancel: Option<&CancellationToken>,
) -> Result<RgbImage> {
    let rotated = rotate::rotate_expand(&image.to_rgb8(), SCREEN_ANGLE, GREY)?;
    let grid = sample::sample_grid(&rotated, geometry.grid_cells())?;
    drop(rotated);

    let composed = compose::composite(geometry, &grid, cancel)?;
    output::finish(&composed, geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OutputFormat;
    use image::{GrayImage, Luma};

    fn create_test_image(side: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(side, side, Luma([value])))
    }

    #[test]
    fn test_render_output_size() {
        for (size, density, spacing) in [(100, 10.0, 1.0), (50, 4.0, 1.3), (31, 12.5, 0.8)] {
            let g = Geometry::new(size, density, spacing).unwrap();
            let out = render(&create_test_image(size, 128), &g).unwrap();
            assert_eq!(out.dimensions(), (size, size), "{size} {density} {spacing}");
        }
    }

    #[test]
    fn test_render_input_size_independent_of_output() {
        let g = Geometry::new(40, 8.0, 1.0).unwrap();
        let out = render(&create_test_image(200, 0), &g).unwrap();
        assert_eq!(out.dimensions(), (40, 40));
    }

    #[tokio::test]
    async fn invalid_options_fail_before_loading() {
        // The path does not exist; validation must reject first.
        let options = HalftoneOptions::new(0).with_format(OutputFormat::Png);
        let result = halftone("/nonexistent/input.png", &options).await;
        assert!(matches!(result, Err(HalftoneError::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let options = HalftoneOptions::new(20).with_format(OutputFormat::Png);
        let result = halftone_with_cancel(create_test_image(20, 0), &options, &token).await;
        assert!(matches!(result, Err(HalftoneError::Cancelled)));
    }
}
