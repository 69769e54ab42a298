//! Post-processing: back-rotation, crop, encoding and the output sink.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{RgbImage, imageops};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::geometry::Geometry;
use crate::options::OutputFormat;
use crate::rotate::{self, GREY};
use crate::{HalftoneError, Result, SCREEN_ANGLE};

/// What a finished request resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HalftoneOutput {
    /// The result was written to this path.
    File(PathBuf),
    /// Encoded image bytes.
    Bytes(Vec<u8>),
}

/// Undo the screen rotation and cut the `size`×`size` output square out of
/// the composited canvas.
pub fn finish(rendered: &RgbImage, geometry: &Geometry) -> Result<RgbImage> {
    let upright = rotate::rotate_expand(rendered, -SCREEN_ANGLE, GREY)?;

    let size = geometry.size();
    let offset = geometry.crop_offset().floor() as u32;
    let (w, h) = upright.dimensions();
    if offset + size > w || offset + size > h {
        return Err(HalftoneError::RotationFailure(format!(
            "rotated canvas {w}x{h} cannot hold a {size}px crop at offset {offset}"
        )));
    }
    debug!(w, h, offset, size, "Cropping output square");

    Ok(imageops::crop_imm(&upright, offset, offset, size, size).to_image())
}

/// Encode `img` as `format`. Only pixel data is written, no metadata.
///
/// JPEG takes `quality` as-is (clamped to 1..=100); PNG maps it onto a
/// compression level.
pub fn encode(img: &RgbImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let result = match format {
        OutputFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
            img.write_with_encoder(encoder)
        }
        OutputFormat::Png => {
            let encoder =
                PngEncoder::new_with_quality(&mut buf, png_compression(quality), FilterType::Adaptive);
            img.write_with_encoder(encoder)
        }
    };
    result.map_err(|e| HalftoneError::EncodeFailure(format!("{format} encoding failed: {e}")))?;

    let bytes = buf.into_inner();
    debug!(%format, quality, len = bytes.len(), "Encoded output");
    Ok(bytes)
}

fn png_compression(quality: u8) -> CompressionType {
    match quality {
        90.. => CompressionType::Best,
        50..=89 => CompressionType::Default,
        _ => CompressionType::Fast,
    }
}

/// Write `bytes` to `path` atomically.
///
/// The data lands in a hidden sibling file that is renamed onto `path` once
/// complete. `cancel` is checked before writing and again before the rename.
/// On failure or cancellation the sibling is removed, so `path` is either
/// untouched or fully written.
pub async fn write_atomic(
    path: &Path,
    bytes: &[u8],
    cancel: Option<&CancellationToken>,
) -> Result<()> {
    let cancelled = || cancel.is_some_and(CancellationToken::is_cancelled);
    if cancelled() {
        return Err(HalftoneError::Cancelled);
    }

    let tmp = temp_sibling(path);
    let result = match write_temp(&tmp, bytes).await {
        Ok(()) if cancelled() => Err(HalftoneError::Cancelled),
        Ok(()) => tokio::fs::rename(&tmp, path).await.map_err(HalftoneError::from),
        Err(e) => Err(HalftoneError::from(e)),
    };

    if result.is_err() {
        remove_quietly(&tmp).await;
    } else {
        debug!(path = %path.display(), len = bytes.len(), "Wrote output file");
    }
    result
}

async fn write_temp(tmp: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4()))
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), "Failed to remove temp file: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};

    fn create_test_image(side: u32) -> RgbImage {
        RgbImage::from_fn(side, side, |x, y| Rgb([(x * 7) as u8, (y * 5) as u8, 128]))
    }

    fn temp_path(ext: &str) -> PathBuf {
        std::env::temp_dir().join(format!("halftone-output-{}.{ext}", Uuid::new_v4()))
    }

    #[test]
    fn test_finish_crops_to_size() {
        for (size, density, spacing) in [(100, 10.0, 1.0), (37, 3.5, 0.7), (64, 25.0, 2.0)] {
            let g = Geometry::new(size, density, spacing).unwrap();
            let canvas = RgbImage::from_pixel(g.canvas_pixels(), g.canvas_pixels(), Rgb([255; 3]));
            let out = finish(&canvas, &g).unwrap();
            assert_eq!(out.dimensions(), (size, size));
        }
    }

    #[test]
    fn test_finish_stays_inside_canvas() {
        // A white canvas must not show any of the grey rotation fill.
        let g = Geometry::new(80, 10.0, 1.0).unwrap();
        let canvas = RgbImage::from_pixel(g.canvas_pixels(), g.canvas_pixels(), Rgb([255; 3]));
        let out = finish(&canvas, &g).unwrap();
        assert!(out.pixels().all(|p| p.0.iter().all(|&c| c >= 250)));
    }

    #[test]
    fn test_encode_png_signature() {
        let bytes = encode(&create_test_image(16), OutputFormat::Png, 100).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.to_rgb8(), create_test_image(16));
    }

    #[test]
    fn test_encode_jpeg_signature() {
        let bytes = encode(&create_test_image(16), OutputFormat::Jpeg, 90).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_encode_jpeg_zero_quality() {
        let bytes = encode(&create_test_image(8), OutputFormat::Jpeg, 0).unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_jpeg_quality_changes_size() {
        let img = create_test_image(64);
        let low = encode(&img, OutputFormat::Jpeg, 10).unwrap();
        let high = encode(&img, OutputFormat::Jpeg, 100).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_png_compression_mapping() {
        assert!(matches!(png_compression(100), CompressionType::Best));
        assert!(matches!(png_compression(75), CompressionType::Default));
        assert!(matches!(png_compression(0), CompressionType::Fast));
    }

    #[tokio::test]
    async fn write_atomic_creates_file() {
        let path = temp_path("png");
        write_atomic(&path, b"payload", None).await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"payload");
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn write_atomic_missing_directory_fails_cleanly() {
        let path = std::env::temp_dir()
            .join(format!("halftone-missing-{}", Uuid::new_v4()))
            .join("out.png");
        let result = write_atomic(&path, b"payload", None).await;
        assert!(matches!(result, Err(HalftoneError::WriteFailure(_))));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn write_atomic_cancelled_leaves_nothing() {
        let path = temp_path("jpg");
        let token = CancellationToken::new();
        token.cancel();
        let result = write_atomic(&path, b"payload", Some(&token)).await;
        assert!(matches!(result, Err(HalftoneError::Cancelled)));
        assert!(!path.exists());
    }
}
