//! Error taxonomy for the composition pipeline.
//!
//! Errors split into two classes. Recoverable errors (bad pixels, odd
//! dimensions) make the pipeline degrade to printing the original file.
//! Fatal errors (nothing usable can be written, or an internal geometry
//! invariant broke) are propagated to the caller as a failed job.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while composing a print layout.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// The source bytes could not be decoded as a raster image.
    #[error("failed to load image {path}: {reason}")]
    ImageLoad { path: PathBuf, reason: String },

    /// A dimension or ratio computation produced an unusable result.
    #[error("reconciliation failed: {0}")]
    Reconciliation(String),

    /// A planned slot rectangle does not fit inside the canvas.
    #[error(
        "slot {index} ({left},{top} {width}x{height}) exceeds canvas {canvas_width}x{canvas_height}"
    )]
    PlanningOverflow {
        index: usize,
        left: u32,
        top: u32,
        width: u32,
        height: u32,
        canvas_width: u32,
        canvas_height: u32,
    },

    /// The final raster could not be encoded.
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// A file could not be read, written or persisted.
    #[error("file system error on {path}: {source}")]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configured ICC profile is missing or malformed.
    #[error("invalid color profile {name}: {reason}")]
    Profile { name: String, reason: String },

    /// The pipeline configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ComposeError>;

impl ComposeError {
    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn image_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ImageLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the pipeline may degrade to the original file instead of
    /// failing the job.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ImageLoad { .. } | Self::Reconciliation(_) | Self::Profile { .. }
        )
    }
}
