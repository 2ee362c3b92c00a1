//! # chroma-lut
//!
//! LUT and CDL codecs for the chroma color engine.
//!
//! This crate holds the file-format layer that the engine's `FileTransform`
//! node dispatches into. Formats are registered by extension in
//! [`registry`]; adding a format means adding a reader function there, the
//! engine itself never changes.
//!
//! # Supported formats
//!
//! - `.cube`: Iridas/Resolve text LUTs, 1D and 3D ([`cube`] module)
//! - `.spi1d`: Sony Pictures Imageworks 1D LUT ([`spi`] module)
//! - `.cc` / `.ccc` / `.cdl`: ASC CDL XML family ([`cdl`] module)
//!
//! # Example
//!
//! ```rust
//! use chroma_lut::{Lut1d, Lut3d};
//!
//! let shaper = Lut1d::gamma(256, 2.2);
//! assert_eq!(shaper.size(), 256);
//!
//! let cube = Lut3d::identity(17);
//! let rgb = cube.sample_trilinear([0.25, 0.5, 0.75]);
//! assert!((rgb[0] - 0.25).abs() < 1e-5);
//! ```

#![warn(missing_docs)]

mod error;
mod interp;
mod lut1d;
mod lut3d;

pub mod cdl;
pub mod cube;
pub mod registry;
pub mod spi;

pub use cdl::{CdlCorrection, CdlCollection};
pub use error::{LutError, LutResult};
pub use interp::lerp;
pub use lut1d::Lut1d;
pub use lut3d::Lut3d;
pub use registry::{read_file, FileContent, FormatRegistry};
