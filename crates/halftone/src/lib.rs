//! Circle-dot halftone rendering for square images.
//!
//! The source is rotated 45°, sampled onto a coarse grid, and every grid cell
//! becomes a black dot whose radius follows the cell's darkness. The dot field
//! is then rotated back and cropped to the requested square.
//!
//! ```no_run
//! use halftone::{HalftoneOptions, HalftoneOutput, OutputFormat};
//!
//! # async fn run() -> halftone::Result<()> {
//! let options = HalftoneOptions::new(512)
//!     .with_density(12.0)
//!     .with_format(OutputFormat::Png);
//! match halftone::halftone("portrait.jpg", &options).await? {
//!     HalftoneOutput::Bytes(png) => println!("{} bytes", png.len()),
//!     HalftoneOutput::File(path) => println!("wrote {}", path.display()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod compose;
pub mod dot;
pub mod geometry;
pub mod options;
pub mod output;
pub mod pipeline;
pub mod rotate;
pub mod sample;
pub mod source;

// Re-exports for convenience
pub use geometry::Geometry;
pub use options::{HalftoneOptions, OutputFormat, ValidatedRequest};
pub use output::HalftoneOutput;
pub use pipeline::{halftone, halftone_with_cancel, render};
pub use source::ImageSource;
pub use tokio_util::sync::CancellationToken;

/// Rotation of the dot grid relative to the image axes, in degrees.
pub const SCREEN_ANGLE: f64 = 45.0;

/// Errors that can occur while rendering a halftone.
#[derive(Debug, thiserror::Error)]
pub enum HalftoneError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Rotation failed: {0}")]
    RotationFailure(String),

    #[error("Decode failed: {0}")]
    DecodeFailure(String),

    #[error("Encode failed: {0}")]
    EncodeFailure(String),

    #[error("Write failed: {0}")]
    WriteFailure(#[from] std::io::Error),

    #[error("Halftone request was cancelled")]
    Cancelled,
}

/// Result type alias for halftone operations.
pub type Result<T> = std::result::Result<T, HalftoneError>;
