//! Request options.
//!
//! Options deserialize from JSON with the keys `size`, `density`, `spacing`,
//! `quality`, `outputFile` and `extension` (alias `format`). Missing optional
//! keys take the defaults below.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::Geometry;
use crate::{HalftoneError, Result};

/// Default grid pitch in pixels.
pub const DEFAULT_DENSITY: f64 = 10.0;

/// Default dot radius divisor.
pub const DEFAULT_SPACING: f64 = 1.0;

/// Default output compression quality.
pub const DEFAULT_QUALITY: u8 = 100;

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    /// Canonical file extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            HalftoneError::InvalidParameter(format!(
                "output file '{}' has no extension to derive the format from",
                path.display()
            ))
        })?;
        ext.parse()
    }
}

impl FromStr for OutputFormat {
    type Err = HalftoneError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            _ => Err(HalftoneError::InvalidParameter(format!(
                "unsupported format '{s}': must be 'png' or 'jpg'"
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Options for one halftone request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HalftoneOptions {
    /// Side of the square output in pixels.
    pub size: u32,

    /// Grid pitch in pixels.
    #[serde(default = "default_density")]
    pub density: f64,

    /// Divides the dot radius; above 1 shrinks dots, below 1 enlarges them.
    #[serde(default = "default_spacing")]
    pub spacing: f64,

    /// Compression quality, 0..=100.
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// Write the result here instead of returning bytes. Its extension
    /// decides the output format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,

    /// `png` or `jpg`; required when `output_file` is absent.
    #[serde(default, alias = "format", skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

fn default_density() -> f64 {
    DEFAULT_DENSITY
}

fn default_spacing() -> f64 {
    DEFAULT_SPACING
}

fn default_quality() -> u8 {
    DEFAULT_QUALITY
}

/// Options after validation, with the output format resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub geometry: Geometry,
    pub format: OutputFormat,
    pub quality: u8,
    pub output_file: Option<PathBuf>,
}

impl HalftoneOptions {
    /// Create options for a `size`×`size` output with default density,
    /// spacing and quality.
    pub fn new(size: u32) -> Self {
        Self {
            size,
            density: DEFAULT_DENSITY,
            spacing: DEFAULT_SPACING,
            quality: DEFAULT_QUALITY,
            output_file: None,
            extension: None,
        }
    }

    /// Parse options from a JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| HalftoneError::InvalidParameter(format!("malformed options: {e}")))
    }

    /// Builder: set grid pitch.
    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    /// Builder: set dot radius divisor.
    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.spacing = spacing;
        self
    }

    /// Builder: set compression quality.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Builder: write the result to a file.
    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    /// Builder: set the in-memory output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.extension = Some(format.extension().to_string());
        self
    }

    /// Check every option and resolve the output format.
    ///
    /// An output file's extension takes precedence over `extension`.
    pub fn validate(&self) -> Result<ValidatedRequest> {
        let geometry = Geometry::new(self.size, self.density, self.spacing)?;

        if self.quality > 100 {
            return Err(HalftoneError::InvalidParameter(format!(
                "quality must be between 0 and 100, got {}",
                self.quality
            )));
        }

        let format = match (&self.output_file, &self.extension) {
            (Some(path), _) => OutputFormat::from_path(path)?,
            (None, Some(ext)) => ext.parse()?,
            (None, None) => {
                return Err(HalftoneError::InvalidParameter(
                    "extension must be set when no output file is given".into(),
                ));
            }
        };

        Ok(ValidatedRequest {
            geometry,
            format,
            quality: self.quality,
            output_file: self.output_file.clone(),
        })
    }
}
