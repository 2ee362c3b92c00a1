//! Error types for config parsing, compilation and pixel processing.
//!
//! The taxonomy distinguishes recoverable kinds so callers can react
//! differently: a [`ChromaError::MissingFile`] during compilation can be
//! retried with another context, while a structural reference error means
//! the config itself needs fixing. No error here poisons the config or any
//! cache; a failed compilation aborts only that single request.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations.
pub type ChromaResult<T> = Result<T, ChromaError>;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum ChromaError {
    /// I/O error reading config or referenced files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// LUT/CDL file error.
    #[error("LUT error: {0}")]
    Lut(#[from] chroma_lut::LutError),

    /// Archive container error.
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Referenced file not found on any search path.
    ///
    /// Recoverable: callers may retry with a different context.
    #[error("file not found: {name} (searched {searched:?})")]
    MissingFile {
        /// The (substituted) file name that was looked up.
        name: String,
        /// Search path entries that were probed.
        searched: Vec<PathBuf>,
    },

    /// Color space (or role/alias resolving to one) not found.
    #[error("color space not found: {name}")]
    ColorSpaceNotFound {
        /// Name of the missing color space.
        name: String,
    },

    /// Named transform not found.
    #[error("named transform not found: {name}")]
    NamedTransformNotFound {
        /// Name of the missing named transform.
        name: String,
    },

    /// Display not found in config.
    #[error("display not found: {name}")]
    DisplayNotFound {
        /// Name of the missing display.
        name: String,
    },

    /// View not found for display.
    #[error("view '{view}' not found for display '{display}'")]
    ViewNotFound {
        /// Display name.
        display: String,
        /// View name.
        view: String,
    },

    /// Look not found in config.
    #[error("look not found: {name}")]
    LookNotFound {
        /// Name of the missing look.
        name: String,
    },

    /// Name or alias collides with an existing entry (case-insensitive).
    #[error("duplicate name: {name}")]
    Duplicate {
        /// The colliding name.
        name: String,
    },

    /// Out-of-range or inconsistent parameter at construction time.
    #[error("invalid parameter: {reason}")]
    InvalidParameter {
        /// Description of what's wrong.
        reason: String,
    },

    /// Invalid transform definition.
    #[error("invalid transform: {reason}")]
    InvalidTransform {
        /// Description of what's wrong.
        reason: String,
    },

    /// Wrong accessor type for a dynamic property.
    #[error("dynamic property type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Type the accessor expected.
        expected: &'static str,
        /// Type the cell actually holds.
        found: &'static str,
    },

    /// Requested dynamic property, rule index or custom key does not exist.
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing item.
        what: String,
    },

    /// Config cannot be archived.
    #[error("config is not archivable: {reason}")]
    NotArchivable {
        /// The offending path or search-path entry.
        reason: String,
    },

    /// Both configs define an entry and the merge options forbid overriding.
    #[error("merge conflict in {section}: {name}")]
    MergeConflict {
        /// Config section where the conflict occurred.
        section: &'static str,
        /// The conflicting entry name.
        name: String,
    },

    /// General validation failure.
    #[error("validation error: {0}")]
    Validation(String),
}
