//! Image sources and asynchronous decoding.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

use crate::{HalftoneError, Result};

/// Where the source image comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// An encoded image file on disk.
    Path(PathBuf),
    /// Encoded image bytes (PNG, JPEG).
    Bytes(Vec<u8>),
    /// Pixels that are already decoded.
    Decoded(DynamicImage),
}

impl ImageSource {
    /// Drain an async stream of encoded image bytes.
    pub async fn from_reader<R>(mut reader: R) -> Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .await
            .map_err(|e| HalftoneError::DecodeFailure(format!("failed to read image stream: {e}")))?;
        Ok(Self::Bytes(bytes))
    }

    /// Load and decode the source. Decoding runs on the blocking pool.
    pub async fn decode(self) -> Result<DynamicImage> {
        let bytes = match self {
            Self::Decoded(img) => return check_square(img),
            Self::Bytes(bytes) => bytes,
            Self::Path(path) => tokio::fs::read(&path).await.map_err(|e| {
                HalftoneError::DecodeFailure(format!("failed to read {}: {e}", path.display()))
            })?,
        };

        let img = tokio::task::spawn_blocking(move || decode_bytes(&bytes))
            .await
            .map_err(|e| HalftoneError::DecodeFailure(format!("decode task failed: {e}")))??;
        check_square(img)
    }
}

/// Decode encoded image bytes, guessing the format from their content.
pub fn decode_bytes(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(HalftoneError::DecodeFailure("image data is empty".into()));
    }
    let img = image::load_from_memory(bytes)
        .map_err(|e| HalftoneError::DecodeFailure(format!("unreadable image: {e}")))?;
    debug!(
        width = img.width(),
        height = img.height(),
        "Decoded source image"
    );
    Ok(img)
}

fn check_square(img: DynamicImage) -> Result<DynamicImage> {
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return Err(HalftoneError::DecodeFailure(format!(
            "source image has no pixels ({w}x{h})"
        )));
    }
    if w != h {
        warn!(w, h, "Source image is not square; it will be stretched onto the grid");
    }
    Ok(img)
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for ImageSource {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<DynamicImage> for ImageSource {
    fn from(img: DynamicImage) -> Self {
        Self::Decoded(img)
    }
}
