//! Transform graph nodes.
//!
//! A transform is a node in a color space's to/from-reference graph: a
//! matrix, a curve, a LUT file reference, a grading operator, or a
//! reference to another part of the config (color space, look,
//! display/view). The set is closed; compilation, validation and shader
//! emission are matches over [`Transform`] rather than open dispatch.
//!
//! Transforms can be chained via [`GroupTransform`].

use serde::{Deserialize, Serialize};

use crate::error::{ChromaError, ChromaResult};

/// Transform application direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformDirection {
    /// Forward transform.
    #[default]
    Forward,
    /// Inverse transform.
    Inverse,
}

impl TransformDirection {
    /// Returns the opposite direction.
    #[inline]
    pub fn inverse(self) -> Self {
        match self {
            Self::Forward => Self::Inverse,
            Self::Inverse => Self::Forward,
        }
    }

    /// Combines an outer request direction with this node's direction.
    #[inline]
    pub fn combine(self, outer: Self) -> Self {
        if outer == Self::Inverse {
            self.inverse()
        } else {
            self
        }
    }
}

/// Interpolation method for LUT sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Nearest neighbor.
    Nearest,
    /// Linear interpolation (default for 1D).
    #[default]
    Linear,
    /// Tetrahedral interpolation (default for 3D).
    Tetrahedral,
    /// Best available.
    Best,
}

/// Negative value handling for exponent ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegativeStyle {
    /// Clamp negatives to zero.
    #[default]
    Clamp,
    /// Mirror: sign * pow(abs(x), exp).
    Mirror,
    /// Pass through unchanged.
    PassThru,
}

/// Built-in transfer curve styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransferStyle {
    /// sRGB piecewise curve.
    #[default]
    #[serde(rename = "srgb")]
    Srgb,
    /// Rec.709 camera OETF.
    #[serde(rename = "rec709")]
    Rec709,
    /// Pure gamma 2.2.
    #[serde(rename = "gamma22")]
    Gamma22,
    /// Pure gamma 2.4 (Rec.1886).
    #[serde(rename = "gamma24")]
    Gamma24,
    /// Pure gamma 2.6 (DCI).
    #[serde(rename = "gamma26")]
    Gamma26,
    /// SMPTE ST 2084 PQ.
    #[serde(rename = "pq")]
    Pq,
    /// ACEScct log curve.
    #[serde(rename = "acescct")]
    AcesCct,
}

/// Exposure/contrast working styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExposureContrastStyle {
    /// Scene-linear pixels: exposure is a 2^stops gain.
    #[default]
    Linear,
    /// Gamma-encoded video pixels.
    Video,
    /// Log-encoded pixels: exposure shifts code values.
    Log,
}

/// Color transform definition (closed set).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Transform {
    /// 4x4 matrix + offset.
    #[serde(rename = "MatrixTransform")]
    Matrix(MatrixTransform),

    /// Per-channel exponent/gamma.
    #[serde(rename = "ExponentTransform")]
    Exponent(ExponentTransform),

    /// Pure log base conversion.
    #[serde(rename = "LogTransform")]
    Log(LogTransform),

    /// Range remap/clamp.
    #[serde(rename = "RangeTransform")]
    Range(RangeTransform),

    /// ASC CDL (slope/offset/power/saturation).
    #[serde(rename = "CDLTransform")]
    Cdl(CdlTransform),

    /// LUT or CDL loaded from a file.
    #[serde(rename = "FileTransform")]
    File(FileTransform),

    /// Inline 1D LUT.
    #[serde(rename = "Lut1DTransform")]
    Lut1D(Lut1DTransform),

    /// Inline 3D LUT.
    #[serde(rename = "Lut3DTransform")]
    Lut3D(Lut3DTransform),

    /// Built-in transfer curve.
    #[serde(rename = "TransferTransform")]
    Transfer(TransferTransform),

    /// Exposure/contrast/gamma adjustment (dynamic-capable).
    #[serde(rename = "ExposureContrastTransform")]
    ExposureContrast(ExposureContrastTransform),

    /// Grading primary: lift/gamma/gain and friends (dynamic-capable).
    #[serde(rename = "GradingPrimaryTransform")]
    GradingPrimary(GradingPrimaryTransform),

    /// Grading tone: zone adjustments (dynamic-capable).
    #[serde(rename = "GradingToneTransform")]
    GradingTone(GradingToneTransform),

    /// Grading RGB curves (dynamic-capable).
    #[serde(rename = "GradingRgbCurveTransform")]
    GradingRgbCurve(GradingRgbCurveTransform),

    /// Grading hue curves (dynamic-capable).
    #[serde(rename = "GradingHueCurveTransform")]
    GradingHueCurve(GradingHueCurveTransform),

    /// Conversion between two named color spaces.
    #[serde(rename = "ColorSpaceTransform")]
    ColorSpace(ColorSpaceTransform),

    /// Look application between two spaces.
    #[serde(rename = "LookTransform")]
    Look(LookTransform),

    /// Full display/view pipeline.
    #[serde(rename = "DisplayViewTransform")]
    DisplayView(DisplayViewTransform),

    /// Ordered chain of transforms.
    #[serde(rename = "GroupTransform")]
    Group(GroupTransform),
}

impl Transform {
    /// Creates a matrix transform from a 4x4 row-major array.
    pub fn matrix(m: [f64; 16]) -> Self {
        Self::Matrix(MatrixTransform {
            matrix: m,
            offset: [0.0; 4],
            direction: TransformDirection::Forward,
        })
    }

    /// Creates a group transform.
    pub fn group(transforms: Vec<Transform>) -> Self {
        Self::Group(GroupTransform {
            transforms,
            direction: TransformDirection::Forward,
        })
    }

    /// Creates a file transform (LUT/CDL reference).
    pub fn file(src: impl Into<String>) -> Self {
        Self::File(FileTransform {
            src: src.into(),
            ccc_id: None,
            interpolation: Interpolation::default(),
            direction: TransformDirection::Forward,
        })
    }

    /// Returns this node's direction field.
    pub fn direction(&self) -> TransformDirection {
        match self {
            Self::Matrix(t) => t.direction,
            Self::Exponent(t) => t.direction,
            Self::Log(t) => t.direction,
            Self::Range(t) => t.direction,
            Self::Cdl(t) => t.direction,
            Self::File(t) => t.direction,
            Self::Lut1D(t) => t.direction,
            Self::Lut3D(t) => t.direction,
            Self::Transfer(t) => t.direction,
            Self::ExposureContrast(t) => t.direction,
            Self::GradingPrimary(t) => t.direction,
            Self::GradingTone(t) => t.direction,
            Self::GradingRgbCurve(t) => t.direction,
            Self::GradingHueCurve(t) => t.direction,
            Self::ColorSpace(t) => t.direction,
            Self::Look(t) => t.direction,
            Self::DisplayView(t) => t.direction,
            Self::Group(t) => t.direction,
        }
    }

    /// Returns the inverse of this transform.
    pub fn inverse(mut self) -> Self {
        match &mut self {
            Self::Matrix(t) => t.direction = t.direction.inverse(),
            Self::Exponent(t) => t.direction = t.direction.inverse(),
            Self::Log(t) => t.direction = t.direction.inverse(),
            Self::Range(t) => t.direction = t.direction.inverse(),
            Self::Cdl(t) => t.direction = t.direction.inverse(),
            Self::File(t) => t.direction = t.direction.inverse(),
            Self::Lut1D(t) => t.direction = t.direction.inverse(),
            Self::Lut3D(t) => t.direction = t.direction.inverse(),
            Self::Transfer(t) => t.direction = t.direction.inverse(),
            Self::ExposureContrast(t) => t.direction = t.direction.inverse(),
            Self::GradingPrimary(t) => t.direction = t.direction.inverse(),
            Self::GradingTone(t) => t.direction = t.direction.inverse(),
            Self::GradingRgbCurve(t) => t.direction = t.direction.inverse(),
            Self::GradingHueCurve(t) => t.direction = t.direction.inverse(),
            Self::ColorSpace(t) => t.direction = t.direction.inverse(),
            Self::Look(t) => t.direction = t.direction.inverse(),
            Self::DisplayView(t) => t.direction = t.direction.inverse(),
            // The compiler walks an inverse group in reverse child order.
            Self::Group(t) => t.direction = t.direction.inverse(),
        }
        self
    }

    /// Visits this node and every nested child, depth-first.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Transform)) {
        f(self);
        if let Self::Group(g) = self {
            for child in &g.transforms {
                child.walk(f);
            }
        }
    }

    /// Validates construction-time parameters.
    ///
    /// Catches statically detectable invalid states (negative CDL slope,
    /// grading gamma below its lower bound) before compilation.
    pub fn validate(&self) -> ChromaResult<()> {
        match self {
            Self::Exponent(t) => {
                if t.value.iter().any(|&v| v <= 0.0) {
                    return Err(invalid("exponent values must be positive"));
                }
            }
            Self::Log(t) => {
                if t.base <= 0.0 || (t.base - 1.0).abs() < 1e-9 {
                    return Err(invalid("log base must be positive and not 1"));
                }
            }
            Self::Range(t) => {
                if t.min_in.is_some() != t.min_out.is_some()
                    || t.max_in.is_some() != t.max_out.is_some()
                {
                    return Err(invalid("range bounds must be paired (in with out)"));
                }
                if let (Some(lo), Some(hi)) = (t.min_in, t.max_in) {
                    if lo >= hi {
                        return Err(invalid("range min_in must be below max_in"));
                    }
                }
            }
            Self::Cdl(t) => {
                if t.slope.iter().any(|&v| v < 0.0) {
                    return Err(invalid("CDL slope must be non-negative"));
                }
                if t.power.iter().any(|&v| v <= 0.0) {
                    return Err(invalid("CDL power must be positive"));
                }
                if t.saturation < 0.0 {
                    return Err(invalid("CDL saturation must be non-negative"));
                }
            }
            Self::File(t) => {
                if t.src.is_empty() {
                    return Err(invalid("file transform src must not be empty"));
                }
            }
            Self::Lut1D(t) => {
                if t.channels != 1 && t.channels != 3 {
                    return Err(invalid("1D LUT channels must be 1 or 3"));
                }
                if t.samples.is_empty() || t.samples.len() % t.channels != 0 {
                    return Err(invalid("1D LUT sample count must be a channel multiple"));
                }
            }
            Self::Lut3D(t) => {
                if t.size < 2 || t.data.len() != t.size * t.size * t.size * 3 {
                    return Err(invalid("3D LUT data must be size^3 RGB entries"));
                }
            }
            Self::ExposureContrast(t) => {
                if t.gamma < GRADING_GAMMA_MIN {
                    return Err(invalid("exposure/contrast gamma below lower bound"));
                }
                if t.pivot <= 0.0 {
                    return Err(invalid("exposure/contrast pivot must be positive"));
                }
            }
            Self::GradingPrimary(t) => {
                if t.values.gamma.iter().any(|&v| v < GRADING_GAMMA_MIN) {
                    return Err(invalid("grading gamma below lower bound"));
                }
                if t.values.saturation < 0.0 {
                    return Err(invalid("grading saturation must be non-negative"));
                }
                if t.values.pivot <= 0.0 {
                    return Err(invalid("grading pivot must be positive"));
                }
            }
            Self::GradingRgbCurve(t) => {
                for curve in [
                    &t.values.red,
                    &t.values.green,
                    &t.values.blue,
                    &t.values.master,
                ] {
                    if curve.len() == 1 {
                        return Err(invalid("grading curve needs at least two points"));
                    }
                }
            }
            Self::GradingHueCurve(t) => {
                if t.values.hue_hue.len() == 1 || t.values.hue_sat.len() == 1 {
                    return Err(invalid("hue curve needs at least two points"));
                }
            }
            Self::ColorSpace(t) => {
                if t.src.is_empty() || t.dst.is_empty() {
                    return Err(invalid("color space transform needs src and dst"));
                }
            }
            Self::DisplayView(t) => {
                if t.src.is_empty() || t.display.is_empty() || t.view.is_empty() {
                    return Err(invalid("display/view transform needs src, display, view"));
                }
            }
            Self::Group(g) => {
                for child in &g.transforms {
                    child.validate()?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> ChromaError {
    ChromaError::InvalidTransform {
        reason: reason.to_string(),
    }
}

/// Lower bound for grading gamma parameters.
pub const GRADING_GAMMA_MIN: f64 = 0.01;

/// 4x4 matrix + offset transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixTransform {
    /// 4x4 matrix in row-major order.
    pub matrix: [f64; 16],
    /// RGBA offset added after the multiply.
    #[serde(default)]
    pub offset: [f64; 4],
    /// Direction.
    #[serde(default)]
    pub direction: TransformDirection,
}

impl MatrixTransform {
    /// Identity matrix.
    pub const IDENTITY: [f64; 16] = [
        1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
    ];
}

impl Default for MatrixTransform {
    fn default() -> Self {
        Self {
            matrix: Self::IDENTITY,
            offset: [0.0; 4],
            direction: TransformDirection::Forward,
        }
    }
}

/// Per-channel exponent/gamma transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExponentTransform {
    /// Per-channel exponents [R, G, B, A].
    pub value: [f64; 4],
    /// Negative handling style.
    #[serde(default)]
    pub negative_style: NegativeStyle,
    /// Direction.
    #[serde(default)]
    pub direction: TransformDirection,
}

impl Default for ExponentTransform {
    fn default() -> Self {
        Self {
            value: [1.0; 4],
            negative_style: NegativeStyle::Clamp,
            direction: TransformDirection::Forward,
        }
    }
}

/// Pure log base conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogTransform {
    /// Log base (10 or 2, typically).
    pub base: f64,
    /// Direction (forward = lin to log).
    #[serde(default)]
    pub direction: TransformDirection,
}

impl Default for LogTransform {
    fn default() -> Self {
        Self {
            base: 10.0,
            direction: TransformDirection::Forward,
        }
    }
}

/// Range remapping transform.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RangeTransform {
    /// Input min (None = no lower clamp).
    #[serde(default)]
    pub min_in: Option<f64>,
    /// Input max.
    #[serde(default)]
    pub max_in: Option<f64>,
    /// Output min.
    #[serde(default)]
    pub min_out: Option<f64>,
    /// Output max.
    #[serde(default)]
    pub max_out: Option<f64>,
    /// Direction.
    #[serde(default)]
    pub direction: TransformDirection,
}

/// ASC CDL transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdlTransform {
    /// Per-channel slope.
    pub slope: [f64; 3],
    /// Per-channel offset.
    pub offset: [f64; 3],
    /// Per-channel power.
    pub power: [f64; 3],
    /// Saturation (1.0 = no change).
    pub saturation: f64,
    /// Direction.
    #[serde(default)]
    pub direction: TransformDirection,
}

impl Default for CdlTransform {
    fn default() -> Self {
        Self {
            slope: [1.0; 3],
            offset: [0.0; 3],
            power: [1.0; 3],
            saturation: 1.0,
            direction: TransformDirection::Forward,
        }
    }
}

/// File-based transform (LUT or CDL reference).
///
/// `src` may contain context variables; it is resolved against the
/// config's search paths at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileTransform {
    /// Source file reference, possibly with `$VAR` tokens.
    pub src: String,
    /// CDL correction ID for `.ccc`/`.cdl` collections.
    #[serde(default)]
    pub ccc_id: Option<String>,
    /// Interpolation method for LUT sampling.
    #[serde(default)]
    pub interpolation: Interpolation,
    /// Direction.
    #[serde(default)]
    pub direction: TransformDirection,
}

/// Inline 1D LUT transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lut1DTransform {
    /// Interleaved samples.
    pub samples: Vec<f32>,
    /// 1 (shared curve) or 3 (per-channel).
    pub channels: usize,
    /// Interpolation method.
    #[serde(default)]
    pub interpolation: Interpolation,
    /// Direction.
    #[serde(default)]
    pub direction: TransformDirection,
}

/// Inline 3D LUT transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lut3DTransform {
    /// Flat red-fastest RGB data, `size^3 * 3` floats.
    pub data: Vec<f32>,
    /// Edge length.
    pub size: usize,
    /// Interpolation method.
    #[serde(default)]
    pub interpolation: Interpolation,
    /// Direction.
    #[serde(default)]
    pub direction: TransformDirection,
}

/// Built-in transfer curve transform.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransferTransform {
    /// Curve style.
    pub style: TransferStyle,
    /// Direction (forward = linear to encoded).
    #[serde(default)]
    pub direction: TransformDirection,
}

/// Exposure/contrast/gamma adjustment.
///
/// Parameters flagged dynamic stay adjustable on compiled processors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureContrastTransform {
    /// Exposure in stops (0 = no change).
    pub exposure: f64,
    /// Contrast multiplier around the pivot (1 = no change).
    pub contrast: f64,
    /// Gamma power (1 = no change).
    pub gamma: f64,
    /// Contrast pivot (0.18 for scene-linear).
    pub pivot: f64,
    /// Working style.
    #[serde(default)]
    pub style: ExposureContrastStyle,
    /// Expose exposure as a dynamic property.
    #[serde(default)]
    pub dynamic_exposure: bool,
    /// Expose contrast as a dynamic property.
    #[serde(default)]
    pub dynamic_contrast: bool,
    /// Expose gamma as a dynamic property.
    #[serde(default)]
    pub dynamic_gamma: bool,
    /// Direction.
    #[serde(default)]
    pub direction: TransformDirection,
}

impl Default for ExposureContrastTransform {
    fn default() -> Self {
        Self {
            exposure: 0.0,
            contrast: 1.0,
            gamma: 1.0,
            pivot: 0.18,
            style: ExposureContrastStyle::Linear,
            dynamic_exposure: false,
            dynamic_contrast: false,
            dynamic_gamma: false,
            direction: TransformDirection::Forward,
        }
    }
}

/// Grading primary parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingPrimaryValues {
    /// Per-channel lift (black offset).
    pub lift: [f64; 3],
    /// Per-channel gamma.
    pub gamma: [f64; 3],
    /// Per-channel gain.
    pub gain: [f64; 3],
    /// Global additive offset.
    pub offset: f64,
    /// Exposure in stops.
    pub exposure: f64,
    /// Contrast around the pivot.
    pub contrast: f64,
    /// Saturation multiplier.
    pub saturation: f64,
    /// Pivot for contrast.
    pub pivot: f64,
    /// Optional lower clamp.
    #[serde(default)]
    pub clamp_black: Option<f64>,
    /// Optional upper clamp.
    #[serde(default)]
    pub clamp_white: Option<f64>,
}

impl Default for GradingPrimaryValues {
    fn default() -> Self {
        Self {
            lift: [0.0; 3],
            gamma: [1.0; 3],
            gain: [1.0; 3],
            offset: 0.0,
            exposure: 0.0,
            contrast: 1.0,
            saturation: 1.0,
            pivot: 0.18,
            clamp_black: None,
            clamp_white: None,
        }
    }
}

/// Grading primary transform (dynamic-capable).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GradingPrimaryTransform {
    /// Parameter set.
    pub values: GradingPrimaryValues,
    /// Expose the values as a dynamic property.
    #[serde(default)]
    pub dynamic: bool,
    /// Direction.
    #[serde(default)]
    pub direction: TransformDirection,
}

/// Grading tone parameter set: per-zone RGB + master adjustments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingToneValues {
    /// Shadow zone [R, G, B, master].
    pub shadows: [f64; 4],
    /// Midtone zone.
    pub midtones: [f64; 4],
    /// Highlight zone.
    pub highlights: [f64; 4],
    /// Black anchor.
    pub blacks: [f64; 4],
    /// White anchor.
    pub whites: [f64; 4],
    /// Where the shadow zone ends.
    pub shadow_start: f64,
    /// Where the highlight zone begins.
    pub highlight_start: f64,
}

impl Default for GradingToneValues {
    fn default() -> Self {
        Self {
            shadows: [1.0; 4],
            midtones: [1.0; 4],
            highlights: [1.0; 4],
            blacks: [1.0; 4],
            whites: [1.0; 4],
            shadow_start: 0.25,
            highlight_start: 0.75,
        }
    }
}

/// Grading tone transform (dynamic-capable).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GradingToneTransform {
    /// Parameter set.
    pub values: GradingToneValues,
    /// Expose the values as a dynamic property.
    #[serde(default)]
    pub dynamic: bool,
    /// Direction.
    #[serde(default)]
    pub direction: TransformDirection,
}

/// Grading RGB curve parameter set: four [x, y] control-point curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingRgbCurveValues {
    /// Red channel curve.
    pub red: Vec<[f64; 2]>,
    /// Green channel curve.
    pub green: Vec<[f64; 2]>,
    /// Blue channel curve.
    pub blue: Vec<[f64; 2]>,
    /// Master curve applied to all channels.
    pub master: Vec<[f64; 2]>,
}

impl Default for GradingRgbCurveValues {
    fn default() -> Self {
        let identity = vec![[0.0, 0.0], [1.0, 1.0]];
        Self {
            red: identity.clone(),
            green: identity.clone(),
            blue: identity.clone(),
            master: identity,
        }
    }
}

/// Grading RGB curve transform (dynamic-capable).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GradingRgbCurveTransform {
    /// Parameter set.
    pub values: GradingRgbCurveValues,
    /// Expose the values as a dynamic property.
    #[serde(default)]
    pub dynamic: bool,
    /// Direction.
    #[serde(default)]
    pub direction: TransformDirection,
}

/// Grading hue curve parameter set.
///
/// Curves are keyed on hue in [0, 1); `hue_hue` shifts hue, `hue_sat`
/// scales saturation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingHueCurveValues {
    /// Hue-vs-hue shift curve ([hue, shift] points).
    pub hue_hue: Vec<[f64; 2]>,
    /// Hue-vs-saturation curve ([hue, multiplier] points).
    pub hue_sat: Vec<[f64; 2]>,
}

impl Default for GradingHueCurveValues {
    fn default() -> Self {
        Self {
            hue_hue: vec![[0.0, 0.0], [1.0, 0.0]],
            hue_sat: vec![[0.0, 1.0], [1.0, 1.0]],
        }
    }
}

/// Grading hue curve transform (dynamic-capable).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GradingHueCurveTransform {
    /// Parameter set.
    pub values: GradingHueCurveValues,
    /// Expose the values as a dynamic property.
    #[serde(default)]
    pub dynamic: bool,
    /// Direction.
    #[serde(default)]
    pub direction: TransformDirection,
}

/// Conversion between two named color spaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSpaceTransform {
    /// Source color space (name, alias or role).
    pub src: String,
    /// Destination color space.
    pub dst: String,
    /// Direction.
    #[serde(default)]
    pub direction: TransformDirection,
}

/// Look application between two spaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookTransform {
    /// Source color space.
    pub src: String,
    /// Destination color space.
    pub dst: String,
    /// Look list (`"grade"`, `"+a, -b"`, `"a | b |"`).
    pub looks: String,
    /// Direction.
    #[serde(default)]
    pub direction: TransformDirection,
}

/// Full display/view pipeline as a transform node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayViewTransform {
    /// Source color space.
    pub src: String,
    /// Display name.
    pub display: String,
    /// View name.
    pub view: String,
    /// Skip the view's looks.
    #[serde(default)]
    pub looks_bypass: bool,
    /// Direction.
    #[serde(default)]
    pub direction: TransformDirection,
}

/// Ordered chain of transforms.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupTransform {
    /// Children, applied in order.
    pub transforms: Vec<Transform>,
    /// Direction.
    #[serde(default)]
    pub direction: TransformDirection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_inverse_flips_direction() {
        let g = Transform::group(vec![
            Transform::matrix(MatrixTransform::IDENTITY),
            Transform::file("a.cube"),
        ]);
        let inv = g.inverse();
        assert_eq!(inv.direction(), TransformDirection::Inverse);
    }

    #[test]
    fn negative_cdl_slope_rejected() {
        let t = Transform::Cdl(CdlTransform {
            slope: [-0.1, 1.0, 1.0],
            ..Default::default()
        });
        assert!(t.validate().is_err());
    }

    #[test]
    fn grading_gamma_bound_enforced() {
        let mut values = GradingPrimaryValues::default();
        values.gamma = [0.001, 1.0, 1.0];
        let t = Transform::GradingPrimary(GradingPrimaryTransform {
            values,
            ..Default::default()
        });
        assert!(t.validate().is_err());
    }

    #[test]
    fn yaml_round_trip_keeps_tag() {
        let t = Transform::file("luts/$SHOT/grade.cube");
        let text = serde_yaml::to_string(&t).unwrap();
        assert!(text.contains("FileTransform"));
        let back: Transform = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn walk_visits_nested() {
        let g = Transform::group(vec![
            Transform::file("a.cube"),
            Transform::group(vec![Transform::file("b.cube")]),
        ]);
        let mut files = 0;
        g.walk(&mut |t| {
            if matches!(t, Transform::File(_)) {
                files += 1;
            }
        });
        assert_eq!(files, 2);
    }
}
