//! # chroma-core
//!
//! A color management engine: configs describe color spaces, looks,
//! displays and rules relative to a reference space; the engine compiles
//! (src, dst) or (source, display, view) requests into flat op pipelines
//! and specializes them for CPU apply or GPU shader emission.
//!
//! File-format codecs (LUTs and CDLs) live in the companion `chroma-lut`
//! crate; this crate dispatches into it through `FileTransform` nodes.
//!
//! # Example
//!
//! ```
//! use chroma_core::{ColorSpace, Config, Transform};
//!
//! let mut config = Config::new();
//! config.add_colorspace(ColorSpace::new("linear"))?;
//! config.add_colorspace(ColorSpace::new("half").to_reference(Transform::matrix([
//!     2.0, 0.0, 0.0, 0.0, //
//!     0.0, 2.0, 0.0, 0.0, //
//!     0.0, 0.0, 2.0, 0.0, //
//!     0.0, 0.0, 0.0, 1.0,
//! ])))?;
//! config.roles_mut().define("reference", "linear");
//!
//! let processor = config.processor("half", "linear")?;
//! let cpu = processor.default_cpu();
//! let mut px = [0.25_f32, 0.5, 0.75];
//! cpu.apply_rgb(&mut px);
//! assert!((px[0] - 0.5).abs() < 1e-6);
//! # Ok::<(), chroma_core::ChromaError>(())
//! ```

#![warn(missing_docs)]

mod cache;
mod colorspace;
mod compiler;
mod config;
mod context;
mod cpu;
mod display;
mod dynamic;
mod error;
mod gpu;
mod look;
mod ops;
mod processor;
mod role;
mod rules;
mod serialize;
mod transform;

pub mod archive;
pub mod ctf;
pub mod merge;
pub mod validate;

pub use cache::{digest, ProcessorCache};
pub use colorspace::{ColorSpace, NamedTransform, ReferenceSpaceType};
pub use config::{Config, PROFILE_VERSION};
pub use context::{Context, FileResolver};
pub use cpu::{BitDepth, CpuProcessor};
pub use display::{Display, View, ViewTransform};
pub use dynamic::{DynamicKind, DynamicProperty, DynamicValue};
pub use error::{ChromaError, ChromaResult};
pub use gpu::{
    GpuShaderDesc, GpuShaderSettings, GpuTexture, GpuUniform, ShaderLanguage, TextureDims,
    DEFAULT_MAX_LUT1D_WIDTH,
};
pub use look::{parse_look_list, Look, LookRef};
pub use merge::{MergeOptions, MergeStrategy};
pub use ops::{Op, OptimizationLevel};
pub use processor::Processor;
pub use role::{names as role_names, Roles};
pub use rules::{
    FileRule, FileRules, ViewingRule, ViewingRules, DEFAULT_RULE_NAME, PATH_SEARCH_RULE_NAME,
};
pub use serialize::{from_yaml, to_yaml};
pub use transform::{
    CdlTransform, ColorSpaceTransform, DisplayViewTransform, ExponentTransform,
    ExposureContrastStyle, ExposureContrastTransform, FileTransform, GradingHueCurveTransform,
    GradingHueCurveValues, GradingPrimaryTransform, GradingPrimaryValues, GradingRgbCurveTransform,
    GradingRgbCurveValues, GradingToneTransform, GradingToneValues, GroupTransform, Interpolation,
    LogTransform, LookTransform, Lut1DTransform, Lut3DTransform, MatrixTransform, NegativeStyle,
    RangeTransform, TransferStyle, TransferTransform, Transform, TransformDirection,
    GRADING_GAMMA_MIN,
};
pub use validate::{check, Issue, Severity};
