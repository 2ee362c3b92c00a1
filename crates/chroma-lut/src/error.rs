//! Error types for LUT/CDL codecs.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for codec operations.
pub type LutResult<T> = Result<T, LutError>;

/// Errors raised while reading or writing LUT/CDL files.
#[derive(Debug, Error)]
pub enum LutError {
    /// I/O failure while reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed file contents.
    #[error("parse error in {path}: {reason}")]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// Extension not covered by the format registry.
    #[error("unsupported LUT format: .{ext}")]
    UnsupportedFormat {
        /// Lowercased file extension.
        ext: String,
    },

    /// A CCC/CDL collection did not contain the requested correction id.
    #[error("correction id not found in collection: {id}")]
    CorrectionNotFound {
        /// Requested ColorCorrection id.
        id: String,
    },
}

impl LutError {
    /// Shorthand for a parse error.
    pub(crate) fn parse(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}
