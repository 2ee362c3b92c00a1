//! Compiled pixel operations.
//!
//! The compiler flattens a transform request into an ordered `Vec<Op>`.
//! Every op knows how to apply itself to an RGB triple, whether it is an
//! identity, whether it mixes channels, and how to feed a content hash.
//! Dynamic-capable ops hold their adjustable parameters in
//! [`DynamicProperty`] cells; the cell contents never enter the
//! fingerprint, only the static shape does.

use chroma_lut::{Lut1d, Lut3d};
use sha2::{Digest, Sha256};

use crate::dynamic::{DynamicKind, DynamicProperty, DynamicValue};
use crate::transform::{
    ExposureContrastStyle, GradingHueCurveValues, GradingPrimaryValues, GradingRgbCurveValues,
    GradingToneValues, Interpolation, NegativeStyle, TransferStyle,
};

const IDENTITY_TOL: f32 = 1e-6;

/// Optimization level for compiled pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OptimizationLevel {
    /// Keep every op; useful for introspection.
    None,
    /// Drop identities and fuse only exactly-representable pairs
    /// (adjacent affine matrix/offset ops).
    Lossless,
    /// Lossless plus behavior-preserving algebraic fusion heuristics.
    #[default]
    Default,
}

/// A single compiled operation.
#[derive(Debug, Clone)]
pub enum Op {
    /// 4x4 matrix + offset. Alpha row is carried but apply leaves alpha
    /// untouched.
    Matrix {
        /// Row-major 4x4 matrix.
        matrix: [f32; 16],
        /// RGBA offset.
        offset: [f32; 4],
    },
    /// 1D LUT.
    Lut1d {
        /// Table.
        lut: Lut1d,
        /// Sampling mode.
        interp: Interpolation,
    },
    /// 3D LUT.
    Lut3d {
        /// Table.
        lut: Lut3d,
        /// Sampling mode.
        interp: Interpolation,
    },
    /// Per-channel exponent.
    Exponent {
        /// RGBA exponents (alpha unused).
        value: [f32; 4],
        /// Negative handling.
        style: NegativeStyle,
    },
    /// Pure log base conversion.
    Log {
        /// Base.
        base: f32,
        /// Lin-to-log when true.
        forward: bool,
    },
    /// ASC CDL.
    Cdl {
        /// Slope.
        slope: [f32; 3],
        /// Offset.
        offset: [f32; 3],
        /// Power.
        power: [f32; 3],
        /// Saturation.
        saturation: f32,
    },
    /// Affine remap with optional clamping.
    Range {
        /// Multiplier.
        scale: f32,
        /// Offset.
        offset: f32,
        /// Lower clamp (output domain).
        clamp_min: Option<f32>,
        /// Upper clamp (output domain).
        clamp_max: Option<f32>,
    },
    /// Built-in transfer curve.
    Transfer {
        /// Curve style.
        style: TransferStyle,
        /// Linear-to-encoded when true.
        forward: bool,
    },
    /// Exposure/contrast/gamma with dynamic-capable parameters.
    ExposureContrast {
        /// Working style.
        style: ExposureContrastStyle,
        /// Contrast pivot.
        pivot: f32,
        /// Exposure cell (stops).
        exposure: DynamicProperty,
        /// Contrast cell.
        contrast: DynamicProperty,
        /// Gamma cell.
        gamma: DynamicProperty,
        /// Which cells are exposed as dynamic properties.
        dynamic: [bool; 3],
        /// Apply direction.
        forward: bool,
    },
    /// Grading primary.
    GradingPrimary {
        /// Value cell.
        values: DynamicProperty,
        /// Exposed as a dynamic property.
        dynamic: bool,
        /// Apply direction.
        forward: bool,
    },
    /// Grading tone.
    GradingTone {
        /// Value cell.
        values: DynamicProperty,
        /// Exposed as a dynamic property.
        dynamic: bool,
        /// Apply direction.
        forward: bool,
    },
    /// Grading RGB curves.
    GradingRgbCurve {
        /// Value cell.
        values: DynamicProperty,
        /// Exposed as a dynamic property.
        dynamic: bool,
        /// Apply direction.
        forward: bool,
    },
    /// Grading hue curves.
    GradingHueCurve {
        /// Value cell.
        values: DynamicProperty,
        /// Exposed as a dynamic property.
        dynamic: bool,
        /// Apply direction.
        forward: bool,
    },
}

impl Op {
    /// Applies this op to one RGB triple in place.
    pub fn apply(&self, px: &mut [f32; 3]) {
        match self {
            Op::Matrix { matrix, offset } => {
                let [r, g, b] = *px;
                px[0] = matrix[0] * r + matrix[1] * g + matrix[2] * b + matrix[3] + offset[0];
                px[1] = matrix[4] * r + matrix[5] * g + matrix[6] * b + matrix[7] + offset[1];
                px[2] = matrix[8] * r + matrix[9] * g + matrix[10] * b + matrix[11] + offset[2];
            }
            Op::Lut1d { lut, interp } => {
                if *interp == Interpolation::Nearest {
                    let size = lut.size();
                    for (c, v) in px.iter_mut().enumerate() {
                        let t = (*v).clamp(0.0, 1.0);
                        let i = (t * (size - 1) as f32).round() as usize;
                        let ch = if lut.channels() == 1 { 0 } else { c };
                        *v = lut.samples()[i * lut.channels() + ch];
                    }
                } else {
                    *px = lut.sample_rgb(*px);
                }
            }
            Op::Lut3d { lut, interp } => {
                *px = match interp {
                    Interpolation::Tetrahedral | Interpolation::Best => {
                        lut.sample_tetrahedral(*px)
                    }
                    _ => lut.sample_trilinear(*px),
                };
            }
            Op::Exponent { value, style } => {
                for (c, v) in px.iter_mut().enumerate() {
                    *v = apply_exponent(*v, value[c], *style);
                }
            }
            Op::Log { base, forward } => {
                let ln_base = base.ln();
                for v in px.iter_mut() {
                    *v = if *forward {
                        v.max(1e-10).ln() / ln_base
                    } else {
                        base.powf(*v)
                    };
                }
            }
            Op::Cdl {
                slope,
                offset,
                power,
                saturation,
            } => {
                for (c, v) in px.iter_mut().enumerate() {
                    let sop = (*v * slope[c] + offset[c]).max(0.0);
                    *v = sop.powf(power[c]);
                }
                if (*saturation - 1.0).abs() > IDENTITY_TOL {
                    let luma = luma(*px);
                    for v in px.iter_mut() {
                        *v = luma + (*v - luma) * saturation;
                    }
                }
            }
            Op::Range {
                scale,
                offset,
                clamp_min,
                clamp_max,
            } => {
                for v in px.iter_mut() {
                    let mut x = *v * scale + offset;
                    if let Some(lo) = clamp_min {
                        x = x.max(*lo);
                    }
                    if let Some(hi) = clamp_max {
                        x = x.min(*hi);
                    }
                    *v = x;
                }
            }
            Op::Transfer { style, forward } => {
                for v in px.iter_mut() {
                    *v = apply_transfer(*v, *style, *forward);
                }
            }
            Op::ExposureContrast {
                style,
                pivot,
                exposure,
                contrast,
                gamma,
                forward,
                ..
            } => {
                let e = exposure.get_scalar().unwrap_or(0.0) as f32;
                let c = contrast.get_scalar().unwrap_or(1.0) as f32;
                let g = gamma.get_scalar().unwrap_or(1.0) as f32;
                apply_exposure_contrast(px, *style, *pivot, e, c, g, *forward);
            }
            Op::GradingPrimary { values, forward, .. } => {
                if let DynamicValue::Primary(v) = values.value() {
                    apply_grading_primary(px, &v, *forward);
                }
            }
            Op::GradingTone { values, forward, .. } => {
                if let DynamicValue::Tone(v) = values.value() {
                    apply_grading_tone(px, &v, *forward);
                }
            }
            Op::GradingRgbCurve { values, forward, .. } => {
                if let DynamicValue::RgbCurve(v) = values.value() {
                    apply_grading_rgb_curve(px, &v, *forward);
                }
            }
            Op::GradingHueCurve { values, forward, .. } => {
                if let DynamicValue::HueCurve(v) = values.value() {
                    apply_grading_hue_curve(px, &v, *forward);
                }
            }
        }
    }

    /// True if this op provably maps every input to itself.
    ///
    /// Dynamic ops are never identities: their values can change later.
    pub fn is_identity(&self) -> bool {
        match self {
            Op::Matrix { matrix, offset } => {
                let identity = [
                    1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0,
                    1.0,
                ];
                matrix
                    .iter()
                    .zip(identity.iter())
                    .all(|(a, b)| (a - b).abs() < IDENTITY_TOL)
                    && offset.iter().all(|v| v.abs() < IDENTITY_TOL)
            }
            Op::Lut1d { lut, .. } => lut.is_identity(IDENTITY_TOL),
            Op::Exponent { value, .. } => {
                value.iter().all(|v| (*v - 1.0).abs() < IDENTITY_TOL)
            }
            Op::Cdl {
                slope,
                offset,
                power,
                saturation,
            } => {
                slope.iter().all(|v| (*v - 1.0).abs() < IDENTITY_TOL)
                    && offset.iter().all(|v| v.abs() < IDENTITY_TOL)
                    && power.iter().all(|v| (*v - 1.0).abs() < IDENTITY_TOL)
                    && (*saturation - 1.0).abs() < IDENTITY_TOL
            }
            Op::Range {
                scale,
                offset,
                clamp_min,
                clamp_max,
            } => {
                (*scale - 1.0).abs() < IDENTITY_TOL
                    && offset.abs() < IDENTITY_TOL
                    && clamp_min.is_none()
                    && clamp_max.is_none()
            }
            Op::ExposureContrast {
                exposure,
                contrast,
                gamma,
                dynamic,
                ..
            } => {
                !dynamic.iter().any(|d| *d)
                    && exposure.get_scalar().unwrap_or(0.0).abs() < 1e-9
                    && (contrast.get_scalar().unwrap_or(1.0) - 1.0).abs() < 1e-9
                    && (gamma.get_scalar().unwrap_or(1.0) - 1.0).abs() < 1e-9
            }
            _ => false,
        }
    }

    /// True if this op mixes color channels.
    pub fn has_crosstalk(&self) -> bool {
        match self {
            Op::Matrix { matrix, .. } => {
                const OFF_DIAGONAL: [usize; 6] = [1, 2, 4, 6, 8, 9];
                OFF_DIAGONAL.iter().any(|&i| matrix[i].abs() > IDENTITY_TOL)
            }
            Op::Lut3d { .. } => true,
            Op::Cdl { saturation, .. } => (*saturation - 1.0).abs() > IDENTITY_TOL,
            Op::GradingPrimary { values, dynamic, .. } => {
                if *dynamic {
                    return true;
                }
                match values.value() {
                    DynamicValue::Primary(v) => (v.saturation - 1.0).abs() > 1e-9,
                    _ => false,
                }
            }
            Op::GradingHueCurve { .. } => true,
            _ => false,
        }
    }

    /// Feeds the static shape of this op into a hash.
    ///
    /// Dynamic parameter values are excluded: mutating a dynamic property
    /// must not perturb processor or shader cache IDs.
    pub fn fingerprint(&self, h: &mut Sha256) {
        match self {
            Op::Matrix { matrix, offset } => {
                h.update(b"mtx");
                hash_f32s(h, matrix);
                hash_f32s(h, offset);
            }
            Op::Lut1d { lut, interp } => {
                h.update(b"l1d");
                h.update((lut.channels() as u64).to_le_bytes());
                hash_f32s(h, lut.samples());
                hash_f32s(h, &lut.domain_min);
                hash_f32s(h, &lut.domain_max);
                h.update([*interp as u8]);
            }
            Op::Lut3d { lut, interp } => {
                h.update(b"l3d");
                h.update((lut.size() as u64).to_le_bytes());
                hash_f32s(h, lut.data());
                h.update([*interp as u8]);
            }
            Op::Exponent { value, style } => {
                h.update(b"exp");
                hash_f32s(h, value);
                h.update([*style as u8]);
            }
            Op::Log { base, forward } => {
                h.update(b"log");
                hash_f32s(h, &[*base]);
                h.update([*forward as u8]);
            }
            Op::Cdl {
                slope,
                offset,
                power,
                saturation,
            } => {
                h.update(b"cdl");
                hash_f32s(h, slope);
                hash_f32s(h, offset);
                hash_f32s(h, power);
                hash_f32s(h, &[*saturation]);
            }
            Op::Range {
                scale,
                offset,
                clamp_min,
                clamp_max,
            } => {
                h.update(b"rng");
                hash_f32s(h, &[*scale, *offset]);
                hash_f32s(h, &[clamp_min.unwrap_or(f32::NAN), clamp_max.unwrap_or(f32::NAN)]);
            }
            Op::Transfer { style, forward } => {
                h.update(b"tfr");
                h.update([*style as u8, *forward as u8]);
            }
            Op::ExposureContrast {
                style,
                pivot,
                exposure,
                contrast,
                gamma,
                dynamic,
                forward,
            } => {
                h.update(b"exc");
                h.update([*style as u8, *forward as u8]);
                hash_f32s(h, &[*pivot]);
                h.update(dynamic.map(|d| d as u8));
                // Static parameters only; dynamic cells stay out.
                if !dynamic[0] {
                    hash_f64(h, exposure.get_scalar().unwrap_or(0.0));
                }
                if !dynamic[1] {
                    hash_f64(h, contrast.get_scalar().unwrap_or(1.0));
                }
                if !dynamic[2] {
                    hash_f64(h, gamma.get_scalar().unwrap_or(1.0));
                }
            }
            Op::GradingPrimary {
                values,
                dynamic,
                forward,
            } => {
                h.update(b"gpr");
                h.update([*dynamic as u8, *forward as u8]);
                if !dynamic {
                    if let DynamicValue::Primary(v) = values.value() {
                        hash_f64s(h, &v.lift);
                        hash_f64s(h, &v.gamma);
                        hash_f64s(h, &v.gain);
                        hash_f64s(h, &[v.offset, v.exposure, v.contrast, v.saturation, v.pivot]);
                        hash_f64(h, v.clamp_black.unwrap_or(f64::NAN));
                        hash_f64(h, v.clamp_white.unwrap_or(f64::NAN));
                    }
                }
            }
            Op::GradingTone {
                values,
                dynamic,
                forward,
            } => {
                h.update(b"gtn");
                h.update([*dynamic as u8, *forward as u8]);
                if !dynamic {
                    if let DynamicValue::Tone(v) = values.value() {
                        for zone in [&v.shadows, &v.midtones, &v.highlights, &v.blacks, &v.whites] {
                            hash_f64s(h, zone);
                        }
                        hash_f64s(h, &[v.shadow_start, v.highlight_start]);
                    }
                }
            }
            Op::GradingRgbCurve {
                values,
                dynamic,
                forward,
            } => {
                h.update(b"grc");
                h.update([*dynamic as u8, *forward as u8]);
                if !dynamic {
                    if let DynamicValue::RgbCurve(v) = values.value() {
                        for curve in [&v.red, &v.green, &v.blue, &v.master] {
                            for pt in curve {
                                hash_f64s(h, pt);
                            }
                        }
                    }
                }
            }
            Op::GradingHueCurve {
                values,
                dynamic,
                forward,
            } => {
                h.update(b"ghc");
                h.update([*dynamic as u8, *forward as u8]);
                if !dynamic {
                    if let DynamicValue::HueCurve(v) = values.value() {
                        for curve in [&v.hue_hue, &v.hue_sat] {
                            for pt in curve {
                                hash_f64s(h, pt);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Replaces shared dynamic cells with deep copies.
    pub fn detach_dynamic(&mut self) {
        match self {
            Op::ExposureContrast {
                exposure,
                contrast,
                gamma,
                ..
            } => {
                *exposure = exposure.detached();
                *contrast = contrast.detached();
                *gamma = gamma.detached();
            }
            Op::GradingPrimary { values, .. }
            | Op::GradingTone { values, .. }
            | Op::GradingRgbCurve { values, .. }
            | Op::GradingHueCurve { values, .. } => {
                *values = values.detached();
            }
            _ => {}
        }
    }

    /// Returns the dynamic property of the given kind, if this op exposes
    /// one.
    pub fn dynamic_property(&self, kind: DynamicKind) -> Option<&DynamicProperty> {
        match (self, kind) {
            (Op::ExposureContrast { exposure, dynamic, .. }, DynamicKind::Exposure)
                if dynamic[0] =>
            {
                Some(exposure)
            }
            (Op::ExposureContrast { contrast, dynamic, .. }, DynamicKind::Contrast)
                if dynamic[1] =>
            {
                Some(contrast)
            }
            (Op::ExposureContrast { gamma, dynamic, .. }, DynamicKind::Gamma) if dynamic[2] => {
                Some(gamma)
            }
            (Op::GradingPrimary { values, dynamic: true, .. }, DynamicKind::GradingPrimary) => {
                Some(values)
            }
            (Op::GradingTone { values, dynamic: true, .. }, DynamicKind::GradingTone) => {
                Some(values)
            }
            (Op::GradingRgbCurve { values, dynamic: true, .. }, DynamicKind::GradingRgbCurve) => {
                Some(values)
            }
            (Op::GradingHueCurve { values, dynamic: true, .. }, DynamicKind::GradingHueCurve) => {
                Some(values)
            }
            _ => None,
        }
    }
}

fn hash_f32s(h: &mut Sha256, values: &[f32]) {
    for v in values {
        h.update(v.to_bits().to_le_bytes());
    }
}

fn hash_f64s(h: &mut Sha256, values: &[f64]) {
    for v in values {
        h.update(v.to_bits().to_le_bytes());
    }
}

fn hash_f64(h: &mut Sha256, v: f64) {
    h.update(v.to_bits().to_le_bytes());
}

/// Rec.709 luma weights, used by saturation ops.
pub(crate) fn luma(px: [f32; 3]) -> f32 {
    0.2126 * px[0] + 0.7152 * px[1] + 0.0722 * px[2]
}

fn apply_exponent(v: f32, exp: f32, style: NegativeStyle) -> f32 {
    match style {
        NegativeStyle::Clamp => v.max(0.0).powf(exp),
        NegativeStyle::Mirror => v.signum() * v.abs().powf(exp),
        NegativeStyle::PassThru => {
            if v < 0.0 {
                v
            } else {
                v.powf(exp)
            }
        }
    }
}

/// Applies a built-in transfer curve to one component.
pub(crate) fn apply_transfer(v: f32, style: TransferStyle, forward: bool) -> f32 {
    match style {
        TransferStyle::Srgb => {
            if forward {
                if v <= 0.003_130_8 {
                    12.92 * v
                } else {
                    1.055 * v.max(0.0).powf(1.0 / 2.4) - 0.055
                }
            } else if v <= 0.040_45 {
                v / 12.92
            } else {
                ((v + 0.055) / 1.055).max(0.0).powf(2.4)
            }
        }
        TransferStyle::Rec709 => {
            if forward {
                if v < 0.018 {
                    4.5 * v
                } else {
                    1.099 * v.max(0.0).powf(0.45) - 0.099
                }
            } else if v < 0.081 {
                v / 4.5
            } else {
                ((v + 0.099) / 1.099).max(0.0).powf(1.0 / 0.45)
            }
        }
        TransferStyle::Gamma22 => pure_gamma(v, 2.2, forward),
        TransferStyle::Gamma24 => pure_gamma(v, 2.4, forward),
        TransferStyle::Gamma26 => pure_gamma(v, 2.6, forward),
        TransferStyle::Pq => {
            const M1: f32 = 0.159_301_76;
            const M2: f32 = 78.84375;
            const C1: f32 = 0.835_937_5;
            const C2: f32 = 18.851_562_5;
            const C3: f32 = 18.6875;
            if forward {
                let y = v.max(0.0).powf(M1);
                ((C1 + C2 * y) / (1.0 + C3 * y)).powf(M2)
            } else {
                let e = v.max(0.0).powf(1.0 / M2);
                (((e - C1).max(0.0)) / (C2 - C3 * e)).powf(1.0 / M1)
            }
        }
        TransferStyle::AcesCct => {
            const BREAK_LIN: f32 = 0.007_812_5;
            const BREAK_LOG: f32 = 0.155_251_14;
            const A: f32 = 10.540_238;
            const B: f32 = 0.072_905_534;
            if forward {
                if v <= BREAK_LIN {
                    A * v + B
                } else {
                    (v.log2() + 9.72) / 17.52
                }
            } else if v <= BREAK_LOG {
                (v - B) / A
            } else {
                (v * 17.52 - 9.72).exp2()
            }
        }
    }
}

fn pure_gamma(v: f32, gamma: f32, forward: bool) -> f32 {
    if forward {
        v.max(0.0).powf(1.0 / gamma)
    } else {
        v.max(0.0).powf(gamma)
    }
}

fn apply_exposure_contrast(
    px: &mut [f32; 3],
    style: ExposureContrastStyle,
    pivot: f32,
    exposure: f32,
    contrast: f32,
    gamma: f32,
    forward: bool,
) {
    let (exposure, contrast, gamma) = if forward {
        (exposure, contrast, gamma)
    } else {
        (-exposure, 1.0 / contrast.max(1e-6), 1.0 / gamma.max(1e-6))
    };
    match style {
        ExposureContrastStyle::Linear => {
            let gain = exposure.exp2();
            for v in px.iter_mut() {
                let x = *v * gain;
                *v = if (contrast - 1.0).abs() > 1e-9 {
                    pivot * (x / pivot).max(0.0).powf(contrast)
                } else {
                    x
                };
            }
        }
        ExposureContrastStyle::Video => {
            // Gamma-encoded pixels: gain applies through the encoding curve.
            let gain = exposure.exp2().powf(1.0 / 2.4);
            let pivot = pivot.max(1e-6).powf(1.0 / 2.4);
            for v in px.iter_mut() {
                let x = *v * gain;
                *v = if (contrast - 1.0).abs() > 1e-9 {
                    pivot * (x / pivot).max(0.0).powf(contrast)
                } else {
                    x
                };
            }
        }
        ExposureContrastStyle::Log => {
            // Exposure shifts code values; 0.6 code units per stop of a
            // typical 10-bit log curve footprint.
            const STOP_SCALE: f32 = 0.088;
            const LOG_PIVOT: f32 = 0.435;
            for v in px.iter_mut() {
                let x = *v + exposure * STOP_SCALE;
                *v = (x - LOG_PIVOT) * contrast + LOG_PIVOT;
            }
        }
    }
    if (gamma - 1.0).abs() > 1e-9 {
        let inv = 1.0 / gamma.max(1e-6);
        for v in px.iter_mut() {
            *v = v.max(0.0).powf(inv);
        }
    }
}

fn apply_grading_primary(px: &mut [f32; 3], v: &GradingPrimaryValues, forward: bool) {
    if forward {
        let gain_all = v.exposure.exp2();
        for (c, x) in px.iter_mut().enumerate() {
            let mut y = *x as f64;
            y = y * gain_all + v.offset;
            y = (y + v.lift[c]) * v.gain[c];
            y = y.max(0.0).powf(1.0 / v.gamma[c].max(0.01));
            if (v.contrast - 1.0).abs() > 1e-9 {
                y = v.pivot * (y / v.pivot).max(0.0).powf(v.contrast);
            }
            *x = y as f32;
        }
        if (v.saturation - 1.0).abs() > 1e-9 {
            let l = luma(*px);
            for x in px.iter_mut() {
                *x = l + (*x - l) * v.saturation as f32;
            }
        }
        for x in px.iter_mut() {
            if let Some(black) = v.clamp_black {
                *x = x.max(black as f32);
            }
            if let Some(white) = v.clamp_white {
                *x = x.min(white as f32);
            }
        }
    } else {
        // Undo the forward chain in reverse order. Clamps do not invert.
        if (v.saturation - 1.0).abs() > 1e-9 {
            let l = luma(*px);
            let inv = 1.0 / v.saturation.max(1e-9) as f32;
            for x in px.iter_mut() {
                *x = l + (*x - l) * inv;
            }
        }
        let gain_all = v.exposure.exp2();
        for (c, x) in px.iter_mut().enumerate() {
            let mut y = *x as f64;
            if (v.contrast - 1.0).abs() > 1e-9 {
                y = v.pivot * (y / v.pivot).max(0.0).powf(1.0 / v.contrast);
            }
            y = y.max(0.0).powf(v.gamma[c].max(0.01));
            y = y / v.gain[c] - v.lift[c];
            y = (y - v.offset) / gain_all;
            *x = y as f32;
        }
    }
}

fn apply_grading_tone(px: &mut [f32; 3], v: &GradingToneValues, forward: bool) {
    for (c, x) in px.iter_mut().enumerate() {
        let y = *x as f64;
        // Zone weights: smooth ramps around the zone boundaries.
        let shadow_w = smoothstep(v.shadow_start + 0.1, v.shadow_start - 0.1, y);
        let highlight_w = smoothstep(v.highlight_start - 0.1, v.highlight_start + 0.1, y);
        let midtone_w = (1.0 - shadow_w) * (1.0 - highlight_w);

        let gain = |zone: &[f64; 4]| zone[c] * zone[3];
        let mut adjust = shadow_w * gain(&v.shadows)
            + midtone_w * gain(&v.midtones)
            + highlight_w * gain(&v.highlights);
        // Black/white anchors bias the extremes.
        adjust *= gain(&v.blacks) * (1.0 - y).clamp(0.0, 1.0)
            + gain(&v.whites) * y.clamp(0.0, 1.0)
            + (1.0 - (1.0 - y).clamp(0.0, 1.0) - y.clamp(0.0, 1.0)).max(0.0);

        *x = if forward {
            (y * adjust) as f32
        } else {
            (y / adjust.max(1e-9)) as f32
        };
    }
}

fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Linear interpolation over [x, y] control points, clamped at the ends.
pub(crate) fn eval_curve(points: &[[f64; 2]], x: f64) -> f64 {
    if points.is_empty() {
        return x;
    }
    if x <= points[0][0] {
        return points[0][1];
    }
    let last = points.len() - 1;
    if x >= points[last][0] {
        return points[last][1];
    }
    let mut hi = 1;
    while hi < last && points[hi][0] < x {
        hi += 1;
    }
    let (x0, y0) = (points[hi - 1][0], points[hi - 1][1]);
    let (x1, y1) = (points[hi][0], points[hi][1]);
    if (x1 - x0).abs() < 1e-12 {
        return y0;
    }
    y0 + (x - x0) / (x1 - x0) * (y1 - y0)
}

/// Inverse lookup of a monotonically increasing curve.
fn eval_curve_inverse(points: &[[f64; 2]], y: f64) -> f64 {
    if points.is_empty() {
        return y;
    }
    if y <= points[0][1] {
        return points[0][0];
    }
    let last = points.len() - 1;
    if y >= points[last][1] {
        return points[last][0];
    }
    let mut hi = 1;
    while hi < last && points[hi][1] < y {
        hi += 1;
    }
    let (x0, y0) = (points[hi - 1][0], points[hi - 1][1]);
    let (x1, y1) = (points[hi][0], points[hi][1]);
    if (y1 - y0).abs() < 1e-12 {
        return x0;
    }
    x0 + (y - y0) / (y1 - y0) * (x1 - x0)
}

fn apply_grading_rgb_curve(px: &mut [f32; 3], v: &GradingRgbCurveValues, forward: bool) {
    let channels = [&v.red, &v.green, &v.blue];
    for (c, x) in px.iter_mut().enumerate() {
        let mut y = *x as f64;
        if forward {
            y = eval_curve(channels[c], y);
            y = eval_curve(&v.master, y);
        } else {
            y = eval_curve_inverse(&v.master, y);
            y = eval_curve_inverse(channels[c], y);
        }
        *x = y as f32;
    }
}

fn apply_grading_hue_curve(px: &mut [f32; 3], v: &GradingHueCurveValues, forward: bool) {
    let (h, s, val) = rgb_to_hsv(*px);
    let (h, s) = if forward {
        let shift = eval_curve(&v.hue_hue, h as f64) as f32;
        let sat_mult = eval_curve(&v.hue_sat, h as f64) as f32;
        ((h + shift).rem_euclid(1.0), (s * sat_mult).clamp(0.0, 1.0))
    } else {
        // Approximate inverse: the shift at the output hue.
        let shift = eval_curve(&v.hue_hue, h as f64) as f32;
        let src_h = (h - shift).rem_euclid(1.0);
        let sat_mult = eval_curve(&v.hue_sat, src_h as f64) as f32;
        (src_h, (s / sat_mult.max(1e-6)).clamp(0.0, 1.0))
    };
    *px = hsv_to_rgb(h, s, val);
}

/// RGB to HSV, hue in [0, 1).
pub(crate) fn rgb_to_hsv(px: [f32; 3]) -> (f32, f32, f32) {
    let [r, g, b] = px;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let h = if delta.abs() < 1e-12 {
        0.0
    } else if (max - r).abs() < 1e-12 {
        (((g - b) / delta).rem_euclid(6.0)) / 6.0
    } else if (max - g).abs() < 1e-12 {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };
    let s = if max.abs() < 1e-12 { 0.0 } else { delta / max };
    (h, s, max)
}

/// HSV to RGB, hue in [0, 1).
pub(crate) fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [f32; 3] {
    let h6 = h.rem_euclid(1.0) * 6.0;
    let c = v * s;
    let x = c * (1.0 - (h6.rem_euclid(2.0) - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h6 as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [r + m, g + m, b + m]
}

/// Optimizes an op list in place according to `level`.
pub fn optimize(ops: Vec<Op>, level: OptimizationLevel) -> Vec<Op> {
    match level {
        OptimizationLevel::None => ops,
        OptimizationLevel::Lossless => lossless(ops),
        OptimizationLevel::Default => fuse_exponents(lossless(ops)),
    }
}

/// Drops identities and fuses adjacent affine matrix/offset pairs.
///
/// Matrix composition is computed in f64 so the fused op is an exact
/// re-expression of the pair.
fn lossless(ops: Vec<Op>) -> Vec<Op> {
    let mut result: Vec<Op> = Vec::with_capacity(ops.len());
    for op in ops {
        if op.is_identity() {
            continue;
        }
        if let (Op::Matrix { matrix: m2, offset: o2 }, Some(Op::Matrix { matrix: m1, offset: o1 })) =
            (&op, result.last())
        {
            let (matrix, offset) = compose_affine(m1, o1, m2, o2);
            let fused = Op::Matrix { matrix, offset };
            result.pop();
            if !fused.is_identity() {
                result.push(fused);
            }
            continue;
        }
        result.push(op);
    }
    result
}

/// Default-level heuristic: adjacent exponents with the same negative
/// style compose by exponent product (behavior-preserving on the clamped
/// domain).
fn fuse_exponents(ops: Vec<Op>) -> Vec<Op> {
    let mut result: Vec<Op> = Vec::with_capacity(ops.len());
    for op in ops {
        if let (
            Op::Exponent { value: v2, style: s2 },
            Some(Op::Exponent { value: v1, style: s1 }),
        ) = (&op, result.last())
        {
            if s1 == s2 && *s1 == NegativeStyle::Clamp {
                let fused = Op::Exponent {
                    value: [
                        v1[0] * v2[0],
                        v1[1] * v2[1],
                        v1[2] * v2[2],
                        v1[3] * v2[3],
                    ],
                    style: *s1,
                };
                result.pop();
                if !fused.is_identity() {
                    result.push(fused);
                }
                continue;
            }
        }
        result.push(op);
    }
    result
}

/// Composes `second(first(x))` for affine matrix+offset pairs, in f64.
fn compose_affine(
    m1: &[f32; 16],
    o1: &[f32; 4],
    m2: &[f32; 16],
    o2: &[f32; 4],
) -> ([f32; 16], [f32; 4]) {
    let mut m = [0.0f64; 16];
    for i in 0..4 {
        for j in 0..4 {
            let mut sum = 0.0f64;
            for k in 0..4 {
                sum += m2[i * 4 + k] as f64 * m1[k * 4 + j] as f64;
            }
            m[i * 4 + j] = sum;
        }
    }
    let mut o = [0.0f64; 4];
    for i in 0..4 {
        let mut sum = o2[i] as f64;
        for k in 0..4 {
            sum += m2[i * 4 + k] as f64 * o1[k] as f64;
        }
        o[i] = sum;
    }
    (m.map(|v| v as f32), o.map(|v| v as f32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scale_matrix(s: f32) -> Op {
        let mut m = [0.0f32; 16];
        m[0] = s;
        m[5] = s;
        m[10] = s;
        m[15] = 1.0;
        Op::Matrix {
            matrix: m,
            offset: [0.0; 4],
        }
    }

    #[test]
    fn matrix_apply() {
        let op = scale_matrix(2.0);
        let mut px = [0.25, 0.5, 0.1];
        op.apply(&mut px);
        assert_eq!(px, [0.5, 1.0, 0.2]);
    }

    #[test]
    fn lossless_fuses_matrices_exactly() {
        let ops = vec![scale_matrix(2.0), scale_matrix(0.5)];
        let fused = optimize(ops, OptimizationLevel::Lossless);
        assert!(fused.is_empty());
    }

    #[test]
    fn none_level_keeps_everything() {
        let ops = vec![scale_matrix(1.0), scale_matrix(2.0)];
        let out = optimize(ops, OptimizationLevel::None);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn default_fuses_exponents() {
        let ops = vec![
            Op::Exponent {
                value: [2.0, 2.0, 2.0, 1.0],
                style: NegativeStyle::Clamp,
            },
            Op::Exponent {
                value: [0.5, 0.5, 0.5, 1.0],
                style: NegativeStyle::Clamp,
            },
        ];
        let out = optimize(ops, OptimizationLevel::Default);
        assert!(out.is_empty());
    }

    #[test]
    fn srgb_round_trip() {
        for &v in &[0.0f32, 0.002, 0.18, 0.5, 1.0] {
            let enc = apply_transfer(v, TransferStyle::Srgb, true);
            let dec = apply_transfer(enc, TransferStyle::Srgb, false);
            assert_relative_eq!(dec, v, epsilon = 1e-5);
        }
    }

    #[test]
    fn acescct_round_trip() {
        for &v in &[0.0f32, 0.001, 0.18, 1.0, 8.0] {
            let enc = apply_transfer(v, TransferStyle::AcesCct, true);
            let dec = apply_transfer(enc, TransferStyle::AcesCct, false);
            assert_relative_eq!(dec, v, epsilon = 1e-4);
        }
    }

    #[test]
    fn crosstalk_detection() {
        assert!(!scale_matrix(2.0).has_crosstalk());
        let mut m = [0.0f32; 16];
        m[0] = 1.0;
        m[1] = 0.5;
        m[5] = 1.0;
        m[10] = 1.0;
        m[15] = 1.0;
        assert!(Op::Matrix {
            matrix: m,
            offset: [0.0; 4]
        }
        .has_crosstalk());
        assert!(Op::Cdl {
            slope: [1.0; 3],
            offset: [0.0; 3],
            power: [1.0; 3],
            saturation: 0.8,
        }
        .has_crosstalk());
    }

    #[test]
    fn dynamic_op_never_identity() {
        let op = Op::ExposureContrast {
            style: ExposureContrastStyle::Linear,
            pivot: 0.18,
            exposure: DynamicProperty::scalar(DynamicKind::Exposure, 0.0),
            contrast: DynamicProperty::scalar(DynamicKind::Contrast, 1.0),
            gamma: DynamicProperty::scalar(DynamicKind::Gamma, 1.0),
            dynamic: [true, false, false],
            forward: true,
        };
        assert!(!op.is_identity());
    }

    #[test]
    fn fingerprint_ignores_dynamic_value() {
        let make = || Op::ExposureContrast {
            style: ExposureContrastStyle::Linear,
            pivot: 0.18,
            exposure: DynamicProperty::scalar(DynamicKind::Exposure, 0.0),
            contrast: DynamicProperty::scalar(DynamicKind::Contrast, 1.0),
            gamma: DynamicProperty::scalar(DynamicKind::Gamma, 1.0),
            dynamic: [true, false, false],
            forward: true,
        };
        let a = make();
        let b = make();
        if let Op::ExposureContrast { exposure, .. } = &b {
            exposure.set_scalar(2.0).unwrap();
        }
        let mut ha = Sha256::new();
        let mut hb = Sha256::new();
        a.fingerprint(&mut ha);
        b.fingerprint(&mut hb);
        assert_eq!(ha.finalize(), hb.finalize());
    }

    #[test]
    fn cdl_saturation_mixes_channels() {
        let op = Op::Cdl {
            slope: [1.0; 3],
            offset: [0.0; 3],
            power: [1.0; 3],
            saturation: 0.0,
        };
        let mut px = [1.0, 0.0, 0.0];
        op.apply(&mut px);
        assert_relative_eq!(px[0], px[1], epsilon = 1e-6);
        assert_relative_eq!(px[1], px[2], epsilon = 1e-6);
    }

    #[test]
    fn hsv_round_trip() {
        for &px in &[[0.8f32, 0.2, 0.1], [0.1, 0.9, 0.3], [0.5, 0.5, 0.5]] {
            let (h, s, v) = rgb_to_hsv(px);
            let back = hsv_to_rgb(h, s, v);
            for c in 0..3 {
                assert_relative_eq!(back[c], px[c], epsilon = 1e-5);
            }
        }
    }
}
