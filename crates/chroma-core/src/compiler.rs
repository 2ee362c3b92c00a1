//! Transform graph compilation.
//!
//! The compiler walks transform graphs and flattens them into ordered op
//! lists. Reference-relative conversions are composed from each space's
//! to/from-reference chains; when only one of the pair is authored, the
//! other is derived by inverting it. Inverse requests walk sequences in
//! reverse with every element's direction flipped.
//!
//! Compilation is where context variables and search paths are consumed:
//! file references are resolved and loaded here, so a processor never
//! touches the filesystem.

use glam::DMat4;
use tracing::debug;

use crate::colorspace::{ColorSpace, ReferenceSpaceType};
use crate::config::Config;
use crate::context::{Context, FileResolver};
use crate::display::ViewTransform;
use crate::dynamic::{DynamicKind, DynamicProperty, DynamicValue};
use crate::error::{ChromaError, ChromaResult};
use crate::look::{parse_look_list, LookRef};
use crate::ops::Op;
use crate::processor::Processor;
use crate::transform::{CdlTransform, Transform, TransformDirection};

/// Compiles transform requests against one config and context.
pub(crate) struct Compiler<'a> {
    config: &'a Config,
    context: Context,
    resolver: FileResolver,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(config: &'a Config, context: Context) -> Self {
        let resolver = config.file_resolver();
        Self {
            config,
            context,
            resolver,
        }
    }

    /// Compiles a conversion between two color spaces.
    pub(crate) fn colorspace_processor(&self, src: &str, dst: &str) -> ChromaResult<Processor> {
        let src_cs = self.config.require_colorspace(src)?;
        let dst_cs = self.config.require_colorspace(dst)?;
        let mut ops = Vec::new();
        self.emit_conversion(src_cs, dst_cs, TransformDirection::Forward, &mut ops)?;
        debug!(src = src_cs.name(), dst = dst_cs.name(), ops = ops.len(), "compiled conversion");
        Ok(Processor::from_ops(ops))
    }

    /// Compiles the full display pipeline for a view, with an optional
    /// look override.
    pub(crate) fn display_processor(
        &self,
        src: &str,
        display: &str,
        view: &str,
        looks_override: Option<&str>,
    ) -> ChromaResult<Processor> {
        let mut ops = Vec::new();
        self.emit_display_view(
            src,
            display,
            view,
            looks_override,
            false,
            TransformDirection::Forward,
            &mut ops,
        )?;
        let display_name = display;
        debug!(src, view, ops = ops.len(), "compiled display pipeline for '{display_name}'");
        Ok(Processor::from_ops(ops))
    }

    /// Compiles an arbitrary transform graph.
    pub(crate) fn transform_processor(
        &self,
        transform: &Transform,
        direction: TransformDirection,
    ) -> ChromaResult<Processor> {
        let mut ops = Vec::new();
        self.emit(transform, direction, &mut ops)?;
        Ok(Processor::from_ops(ops))
    }

    /// Compiles a named transform in the given direction.
    pub(crate) fn named_transform_processor(
        &self,
        name: &str,
        direction: TransformDirection,
    ) -> ChromaResult<Processor> {
        let nt = self
            .config
            .named_transform(name)
            .ok_or_else(|| ChromaError::NamedTransformNotFound {
                name: name.to_string(),
            })?;
        let mut ops = Vec::new();
        match direction {
            TransformDirection::Forward => match nt.get_forward() {
                Some(t) => self.emit(t, TransformDirection::Forward, &mut ops)?,
                None => match nt.get_inverse() {
                    Some(t) => self.emit(t, TransformDirection::Inverse, &mut ops)?,
                    None => {}
                },
            },
            TransformDirection::Inverse => match nt.get_inverse() {
                Some(t) => self.emit(t, TransformDirection::Forward, &mut ops)?,
                None => match nt.get_forward() {
                    Some(t) => self.emit(t, TransformDirection::Inverse, &mut ops)?,
                    None => {}
                },
            },
        }
        Ok(Processor::from_ops(ops))
    }

    // ------------------------------------------------------------------
    // Emission

    /// Emits ops for a transform under an outer direction.
    ///
    /// Every node is validated on the way in, so invalid parameters
    /// surface as errors no matter which compilation path reached them.
    fn emit(
        &self,
        t: &Transform,
        outer: TransformDirection,
        ops: &mut Vec<Op>,
    ) -> ChromaResult<()> {
        t.validate()?;
        let dir = t.direction().combine(outer);
        let fwd = dir == TransformDirection::Forward;
        match t {
            Transform::Matrix(m) => {
                if fwd {
                    ops.push(matrix_op(&m.matrix, &m.offset));
                } else {
                    let (inv, off) = invert_affine(&m.matrix, &m.offset)?;
                    ops.push(matrix_op(&inv, &off));
                }
            }
            Transform::Exponent(e) => {
                let value = if fwd {
                    e.value.map(|v| v as f32)
                } else {
                    e.value.map(|v| 1.0 / v as f32)
                };
                ops.push(Op::Exponent {
                    value,
                    style: e.negative_style,
                });
            }
            Transform::Log(l) => ops.push(Op::Log {
                base: l.base as f32,
                forward: fwd,
            }),
            Transform::Range(r) => {
                let (min_in, max_in, min_out, max_out) = if fwd {
                    (r.min_in, r.max_in, r.min_out, r.max_out)
                } else {
                    (r.min_out, r.max_out, r.min_in, r.max_in)
                };
                let (scale, offset) = match (min_in, max_in, min_out, max_out) {
                    (Some(i0), Some(i1), Some(o0), Some(o1)) => {
                        let scale = (o1 - o0) / (i1 - i0);
                        (scale, o0 - i0 * scale)
                    }
                    (Some(i0), None, Some(o0), None) => (1.0, o0 - i0),
                    (None, Some(i1), None, Some(o1)) => (1.0, o1 - i1),
                    _ => (1.0, 0.0),
                };
                ops.push(Op::Range {
                    scale: scale as f32,
                    offset: offset as f32,
                    clamp_min: min_out.map(|v| v as f32),
                    clamp_max: max_out.map(|v| v as f32),
                });
            }
            Transform::Cdl(c) => self.emit_cdl(c, fwd, ops),
            Transform::File(f) => {
                let path = self.resolver.resolve(&f.src, &self.context)?;
                match chroma_lut::read_file(&path)? {
                    chroma_lut::FileContent::Lut1d(lut) => {
                        let lut = if fwd { lut } else { lut.inverted() };
                        ops.push(Op::Lut1d {
                            lut,
                            interp: f.interpolation,
                        });
                    }
                    chroma_lut::FileContent::Lut3d(lut) => {
                        if !fwd {
                            return Err(ChromaError::InvalidTransform {
                                reason: format!(
                                    "3D LUT '{}' cannot be applied inverse",
                                    f.src
                                ),
                            });
                        }
                        ops.push(Op::Lut3d {
                            lut,
                            interp: f.interpolation,
                        });
                    }
                    chroma_lut::FileContent::Cdl(collection) => {
                        let correction = match &f.ccc_id {
                            Some(id) => collection.by_id(&self.context.resolve(id))?.clone(),
                            None => collection
                                .first()
                                .ok_or_else(|| ChromaError::InvalidTransform {
                                    reason: format!("'{}' holds no corrections", f.src),
                                })?
                                .clone(),
                        };
                        let cdl = CdlTransform {
                            slope: correction.slope,
                            offset: correction.offset,
                            power: correction.power,
                            saturation: correction.saturation,
                            direction: TransformDirection::Forward,
                        };
                        self.emit_cdl(&cdl, fwd, ops);
                    }
                }
            }
            Transform::Lut1D(l) => {
                let lut = chroma_lut::Lut1d::from_samples(l.samples.clone(), l.channels);
                let lut = if fwd { lut } else { lut.inverted() };
                ops.push(Op::Lut1d {
                    lut,
                    interp: l.interpolation,
                });
            }
            Transform::Lut3D(l) => {
                if !fwd {
                    return Err(ChromaError::InvalidTransform {
                        reason: "inline 3D LUT cannot be applied inverse".to_string(),
                    });
                }
                ops.push(Op::Lut3d {
                    lut: chroma_lut::Lut3d::from_data(l.data.clone(), l.size),
                    interp: l.interpolation,
                });
            }
            Transform::Transfer(tr) => ops.push(Op::Transfer {
                style: tr.style,
                forward: fwd,
            }),
            Transform::ExposureContrast(ec) => {
                ops.push(Op::ExposureContrast {
                    style: ec.style,
                    pivot: ec.pivot as f32,
                    exposure: DynamicProperty::scalar(DynamicKind::Exposure, ec.exposure),
                    contrast: DynamicProperty::scalar(DynamicKind::Contrast, ec.contrast),
                    gamma: DynamicProperty::scalar(DynamicKind::Gamma, ec.gamma),
                    dynamic: [ec.dynamic_exposure, ec.dynamic_contrast, ec.dynamic_gamma],
                    forward: fwd,
                });
            }
            Transform::GradingPrimary(g) => ops.push(Op::GradingPrimary {
                values: DynamicProperty::new(
                    DynamicKind::GradingPrimary,
                    DynamicValue::Primary(g.values.clone()),
                ),
                dynamic: g.dynamic,
                forward: fwd,
            }),
            Transform::GradingTone(g) => ops.push(Op::GradingTone {
                values: DynamicProperty::new(
                    DynamicKind::GradingTone,
                    DynamicValue::Tone(g.values.clone()),
                ),
                dynamic: g.dynamic,
                forward: fwd,
            }),
            Transform::GradingRgbCurve(g) => ops.push(Op::GradingRgbCurve {
                values: DynamicProperty::new(
                    DynamicKind::GradingRgbCurve,
                    DynamicValue::RgbCurve(g.values.clone()),
                ),
                dynamic: g.dynamic,
                forward: fwd,
            }),
            Transform::GradingHueCurve(g) => ops.push(Op::GradingHueCurve {
                values: DynamicProperty::new(
                    DynamicKind::GradingHueCurve,
                    DynamicValue::HueCurve(g.values.clone()),
                ),
                dynamic: g.dynamic,
                forward: fwd,
            }),
            Transform::ColorSpace(c) => {
                let (src, dst) = if fwd { (&c.src, &c.dst) } else { (&c.dst, &c.src) };
                let src_cs = self.config.require_colorspace(src)?;
                let dst_cs = self.config.require_colorspace(dst)?;
                self.emit_conversion(src_cs, dst_cs, TransformDirection::Forward, ops)?;
            }
            Transform::Look(l) => {
                let (src, dst) = if fwd { (&l.src, &l.dst) } else { (&l.dst, &l.src) };
                self.emit_look_chain(src, &l.looks, dst, !fwd, ops)?;
            }
            Transform::DisplayView(dv) => {
                self.emit_display_view(&dv.src, &dv.display, &dv.view, None, dv.looks_bypass, dir, ops)?;
            }
            Transform::Group(g) => {
                if dir == TransformDirection::Forward {
                    for child in &g.transforms {
                        self.emit(child, TransformDirection::Forward, ops)?;
                    }
                } else {
                    for child in g.transforms.iter().rev() {
                        self.emit(child, TransformDirection::Inverse, ops)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Emits a CDL, decomposing the inverse into its algebraic steps.
    fn emit_cdl(&self, c: &CdlTransform, fwd: bool, ops: &mut Vec<Op>) {
        if fwd {
            ops.push(Op::Cdl {
                slope: c.slope.map(|v| v as f32),
                offset: c.offset.map(|v| v as f32),
                power: c.power.map(|v| v as f32),
                saturation: c.saturation as f32,
            });
        } else {
            // Undo saturation, power, then slope/offset.
            if (c.saturation - 1.0).abs() > 1e-9 {
                ops.push(Op::Cdl {
                    slope: [1.0; 3],
                    offset: [0.0; 3],
                    power: [1.0; 3],
                    saturation: (1.0 / c.saturation) as f32,
                });
            }
            ops.push(Op::Exponent {
                value: [
                    (1.0 / c.power[0]) as f32,
                    (1.0 / c.power[1]) as f32,
                    (1.0 / c.power[2]) as f32,
                    1.0,
                ],
                style: crate::transform::NegativeStyle::Clamp,
            });
            let mut matrix = [0.0f32; 16];
            let mut offset = [0.0f32; 4];
            for i in 0..3 {
                let slope = if c.slope[i].abs() < 1e-12 { 1e-12 } else { c.slope[i] };
                matrix[i * 4 + i] = (1.0 / slope) as f32;
                offset[i] = (-c.offset[i] / slope) as f32;
            }
            matrix[15] = 1.0;
            ops.push(Op::Matrix { matrix, offset });
        }
    }

    /// Emits the conversion between two color spaces through the
    /// reference, bridging reference families when needed.
    ///
    /// Data spaces bypass conversion entirely; identical canonical spaces
    /// emit nothing.
    fn emit_conversion(
        &self,
        src: &ColorSpace,
        dst: &ColorSpace,
        dir: TransformDirection,
        ops: &mut Vec<Op>,
    ) -> ChromaResult<()> {
        if src.is_data() || dst.is_data() {
            return Ok(());
        }
        if src.name().eq_ignore_ascii_case(dst.name()) {
            return Ok(());
        }
        let mut chain: Vec<Transform> = Vec::new();
        chain.extend(to_reference_chain(src));
        match (src.reference_space(), dst.reference_space()) {
            (ReferenceSpaceType::Scene, ReferenceSpaceType::Display) => {
                let vt = self.default_view_transform()?;
                chain.extend(view_from_reference_chain(vt));
            }
            (ReferenceSpaceType::Display, ReferenceSpaceType::Scene) => {
                let vt = self.default_view_transform()?;
                chain.extend(view_to_reference_chain(vt));
            }
            _ => {}
        }
        chain.extend(from_reference_chain(dst));
        self.emit_all(&chain, dir, ops)
    }

    fn default_view_transform(&self) -> ChromaResult<&ViewTransform> {
        self.config
            .default_view_transform()
            .ok_or_else(|| ChromaError::NotFound {
                what: "a view transform bridging scene and display references".to_string(),
            })
    }

    /// Emits a sequence of transforms; inverse walks it backwards with
    /// each element inverted.
    fn emit_all(
        &self,
        chain: &[Transform],
        dir: TransformDirection,
        ops: &mut Vec<Op>,
    ) -> ChromaResult<()> {
        if dir == TransformDirection::Forward {
            for t in chain {
                self.emit(t, TransformDirection::Forward, ops)?;
            }
        } else {
            for t in chain.iter().rev() {
                self.emit(t, TransformDirection::Inverse, ops)?;
            }
        }
        Ok(())
    }

    /// Emits a look chain from `src` through each look's process space to
    /// `dst`, honoring `|` fallback alternatives.
    ///
    /// `invert` applies the whole chain backwards (each look flipped, in
    /// reverse order). A failed alternative falls through only on
    /// recoverable errors (unknown look, missing file).
    fn emit_look_chain(
        &self,
        src: &str,
        looks: &str,
        dst: &str,
        invert: bool,
        ops: &mut Vec<Op>,
    ) -> ChromaResult<()> {
        let looks = self.context.resolve(looks);
        let alternatives = parse_look_list(&looks);
        let mut last_err = None;
        for alternative in &alternatives {
            let mut refs = alternative.clone();
            if invert {
                refs.reverse();
                for r in &mut refs {
                    r.forward = !r.forward;
                }
            }
            let mut attempt = Vec::new();
            match self.emit_look_refs(src, &refs, dst, &mut attempt) {
                Ok(()) => {
                    ops.extend(attempt);
                    return Ok(());
                }
                Err(e @ (ChromaError::LookNotFound { .. } | ChromaError::MissingFile { .. })) => {
                    debug!(error = %e, "look alternative failed, trying next");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn emit_look_refs(
        &self,
        src: &str,
        refs: &[LookRef],
        dst: &str,
        ops: &mut Vec<Op>,
    ) -> ChromaResult<()> {
        let mut current = self.config.require_colorspace(src)?;
        for look_ref in refs {
            let look = self
                .config
                .look(&look_ref.name)
                .ok_or_else(|| ChromaError::LookNotFound {
                    name: look_ref.name.clone(),
                })?;
            let process = self.config.require_colorspace(look.get_process_space())?;
            self.emit_conversion(current, process, TransformDirection::Forward, ops)?;
            if look_ref.forward {
                match (look.get_transform(), look.get_inverse_transform()) {
                    (Some(t), _) => self.emit(t, TransformDirection::Forward, ops)?,
                    (None, Some(t)) => self.emit(t, TransformDirection::Inverse, ops)?,
                    (None, None) => {}
                }
            } else {
                match (look.get_inverse_transform(), look.get_transform()) {
                    (Some(t), _) => self.emit(t, TransformDirection::Forward, ops)?,
                    (None, Some(t)) => self.emit(t, TransformDirection::Inverse, ops)?,
                    (None, None) => {}
                }
            }
            current = process;
        }
        let dst_cs = self.config.require_colorspace(dst)?;
        self.emit_conversion(current, dst_cs, TransformDirection::Forward, ops)
    }

    /// Emits the display pipeline: looks in scene-referred space, then
    /// either a view-transform path through the display reference or a
    /// direct conversion to the view's color space.
    #[allow(clippy::too_many_arguments)]
    fn emit_display_view(
        &self,
        src: &str,
        display: &str,
        view: &str,
        looks_override: Option<&str>,
        looks_bypass: bool,
        dir: TransformDirection,
        ops: &mut Vec<Op>,
    ) -> ChromaResult<()> {
        if self.config.display(display).is_none() {
            return Err(ChromaError::DisplayNotFound {
                name: display.to_string(),
            });
        }
        let view_def = self
            .config
            .find_view(display, view)
            .ok_or_else(|| ChromaError::ViewNotFound {
                display: display.to_string(),
                view: view.to_string(),
            })?;
        let view_cs_name = view_def
            .colorspace
            .as_deref()
            .ok_or_else(|| ChromaError::InvalidTransform {
                reason: format!("view '{view}' names no color space"),
            })?;

        let src_cs = self.config.require_colorspace(src)?;
        let view_cs = self.config.require_colorspace(view_cs_name)?;
        if src_cs.is_data() || view_cs.is_data() {
            return Ok(());
        }

        let looks = if looks_bypass {
            None
        } else {
            looks_override.or(view_def.looks.as_deref())
        };

        let vt = match &view_def.view_transform {
            Some(vt_name) => Some(self.config.view_transform(vt_name).ok_or_else(|| {
                ChromaError::NotFound {
                    what: format!("view transform '{vt_name}'"),
                }
            })?),
            None => None,
        };

        if dir == TransformDirection::Forward {
            if let Some(looks) = looks {
                // Looks run from src back to src; the view step continues
                // from there. Process-space round trips collapse when the
                // spaces coincide.
                self.emit_look_chain(src_cs.name(), looks, src_cs.name(), false, ops)?;
            }
            match vt {
                Some(vt) => {
                    let mut chain: Vec<Transform> = Vec::new();
                    chain.extend(to_reference_chain(src_cs));
                    chain.extend(view_from_reference_chain(vt));
                    chain.extend(from_reference_chain(view_cs));
                    self.emit_all(&chain, TransformDirection::Forward, ops)?;
                }
                None => {
                    self.emit_conversion(src_cs, view_cs, TransformDirection::Forward, ops)?;
                }
            }
        } else {
            // Walk the same pipeline backwards, each segment inverted.
            match vt {
                Some(vt) => {
                    let mut chain: Vec<Transform> = Vec::new();
                    chain.extend(to_reference_chain(src_cs));
                    chain.extend(view_from_reference_chain(vt));
                    chain.extend(from_reference_chain(view_cs));
                    self.emit_all(&chain, TransformDirection::Inverse, ops)?;
                }
                None => {
                    self.emit_conversion(view_cs, src_cs, TransformDirection::Forward, ops)?;
                }
            }
            if let Some(looks) = looks {
                self.emit_look_chain(src_cs.name(), looks, src_cs.name(), true, ops)?;
            }
        }
        Ok(())
    }
}

/// The transforms taking a color space to its reference.
fn to_reference_chain(cs: &ColorSpace) -> Vec<Transform> {
    match (cs.get_to_reference(), cs.get_from_reference()) {
        (Some(t), _) => vec![t.clone()],
        (None, Some(t)) => vec![t.clone().inverse()],
        (None, None) => Vec::new(),
    }
}

/// The transforms taking the reference to a color space.
fn from_reference_chain(cs: &ColorSpace) -> Vec<Transform> {
    match (cs.get_from_reference(), cs.get_to_reference()) {
        (Some(t), _) => vec![t.clone()],
        (None, Some(t)) => vec![t.clone().inverse()],
        (None, None) => Vec::new(),
    }
}

/// Scene reference to display reference via a view transform.
fn view_from_reference_chain(vt: &ViewTransform) -> Vec<Transform> {
    match (vt.get_from_reference(), vt.get_to_reference()) {
        (Some(t), _) => vec![t.clone()],
        (None, Some(t)) => vec![t.clone().inverse()],
        (None, None) => Vec::new(),
    }
}

/// Display reference to scene reference via a view transform.
fn view_to_reference_chain(vt: &ViewTransform) -> Vec<Transform> {
    match (vt.get_to_reference(), vt.get_from_reference()) {
        (Some(t), _) => vec![t.clone()],
        (None, Some(t)) => vec![t.clone().inverse()],
        (None, None) => Vec::new(),
    }
}

fn matrix_op(matrix: &[f64; 16], offset: &[f64; 4]) -> Op {
    Op::Matrix {
        matrix: matrix.map(|v| v as f32),
        offset: offset.map(|v| v as f32),
    }
}

/// Inverts `y = M x + o` to `x = M^-1 y - M^-1 o`.
fn invert_affine(matrix: &[f64; 16], offset: &[f64; 4]) -> ChromaResult<([f64; 16], [f64; 4])> {
    // Row-major storage; glam is column-major.
    let m = DMat4::from_cols_array(matrix).transpose();
    if m.determinant().abs() < 1e-12 {
        return Err(ChromaError::InvalidTransform {
            reason: "matrix is singular and cannot be inverted".to_string(),
        });
    }
    let inv = m.inverse();
    let o = glam::DVec4::from_array(*offset);
    let inv_offset = -(inv * o);
    Ok((inv.transpose().to_cols_array(), inv_offset.to_array()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colorspace::ColorSpace;
    use crate::look::Look;
    use crate::transform::{ExponentTransform, MatrixTransform};

    fn scale(s: f64) -> Transform {
        let mut m = MatrixTransform::IDENTITY;
        m[0] = s;
        m[5] = s;
        m[10] = s;
        Transform::matrix(m)
    }

    fn config() -> Config {
        let mut c = Config::new();
        c.add_colorspace(ColorSpace::new("linear")).unwrap();
        c.add_colorspace(ColorSpace::new("half").from_reference(scale(0.5)))
            .unwrap();
        c.add_colorspace(ColorSpace::new("double").to_reference(scale(0.5)))
            .unwrap();
        c.add_colorspace(ColorSpace::new("raw").data(true)).unwrap();
        c.roles_mut().define("reference", "linear");
        c
    }

    fn apply(p: &Processor, px: [f32; 3]) -> [f32; 3] {
        let mut px = px;
        for op in p.ops() {
            op.apply(&mut px);
        }
        px
    }

    #[test]
    fn conversion_through_reference() {
        let c = config();
        // half -> reference doubles, reference -> double doubles again.
        let p = c.processor("half", "double").unwrap();
        assert_eq!(apply(&p, [0.25, 0.25, 0.25]), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn data_space_bypasses() {
        let c = config();
        let p = c.processor("half", "raw").unwrap();
        assert!(p.is_noop());
        let p = c.processor("raw", "double").unwrap();
        assert!(p.is_noop());
    }

    #[test]
    fn same_space_is_noop() {
        let c = config();
        let p = c.processor("half", "half").unwrap();
        assert!(p.is_noop());
    }

    #[test]
    fn round_trip_inverts_exactly() {
        let c = config();
        let fwd = c.processor("half", "double").unwrap();
        let inv = c.processor("double", "half").unwrap();
        let mid = apply(&fwd, [0.3, 0.3, 0.3]);
        let back = apply(&inv, mid);
        for v in back {
            assert!((v - 0.3).abs() < 1e-6);
        }
    }

    #[test]
    fn group_inverse_reverses_children() {
        let c = config();
        let g = Transform::group(vec![
            scale(2.0),
            Transform::Exponent(ExponentTransform {
                value: [2.0; 4],
                ..Default::default()
            }),
        ]);
        let p = c
            .transform_processor(None, &g, TransformDirection::Inverse)
            .unwrap();
        // Inverse order: sqrt first, then halve.
        let out = apply(&p, [4.0, 4.0, 4.0]);
        for v in out {
            assert!((v - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn look_fallback_skips_unknown_look() {
        let mut c = config();
        c.add_look(
            Look::new("grade")
                .process_space("linear")
                .transform(scale(3.0)),
        )
        .unwrap();
        let t = Transform::Look(crate::transform::LookTransform {
            src: "linear".into(),
            dst: "linear".into(),
            looks: "missing_look | grade".into(),
            direction: TransformDirection::Forward,
        });
        let p = c
            .transform_processor(None, &t, TransformDirection::Forward)
            .unwrap();
        assert_eq!(apply(&p, [1.0, 1.0, 1.0]), [3.0, 3.0, 3.0]);
    }

    #[test]
    fn look_empty_fallback_applies_no_looks() {
        let c = config();
        let t = Transform::Look(crate::transform::LookTransform {
            src: "half".into(),
            dst: "double".into(),
            looks: "missing_look |".into(),
            direction: TransformDirection::Forward,
        });
        let p = c
            .transform_processor(None, &t, TransformDirection::Forward)
            .unwrap();
        assert_eq!(apply(&p, [0.25, 0.25, 0.25]), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn process_space_elision() {
        let mut c = config();
        c.add_look(Look::new("a").process_space("half").transform(scale(2.0)))
            .unwrap();
        c.add_look(Look::new("b").process_space("half").transform(scale(5.0)))
            .unwrap();
        let t = Transform::Look(crate::transform::LookTransform {
            src: "half".into(),
            dst: "half".into(),
            looks: "a, b".into(),
            direction: TransformDirection::Forward,
        });
        let p = c
            .transform_processor(None, &t, TransformDirection::Forward)
            .unwrap();
        // Two scale ops only, no conversions in between.
        assert_eq!(p.ops().len(), 2);
    }

    #[test]
    fn ccc_id_resolves_context_tokens() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("grades.ccc"),
            r#"<ColorCorrectionCollection xmlns="urn:ASC:CDL:v1.01">
  <ColorCorrection id="sh010">
    <SOPNode><Slope>1 1 1</Slope><Offset>0 0 0</Offset><Power>1 1 1</Power></SOPNode>
  </ColorCorrection>
  <ColorCorrection id="sh020">
    <SOPNode><Slope>2 2 2</Slope><Offset>0 0 0</Offset><Power>1 1 1</Power></SOPNode>
  </ColorCorrection>
</ColorCorrectionCollection>"#,
        )
        .unwrap();
        let mut c = config();
        c.set_working_dir(dir.path());
        let t = Transform::File(crate::transform::FileTransform {
            src: "grades.ccc".into(),
            ccc_id: Some("$SHOT".into()),
            interpolation: Default::default(),
            direction: TransformDirection::Forward,
        });
        let mut ctx = Context::new();
        ctx.set("SHOT", "sh020");
        let p = c
            .transform_processor(Some(&ctx), &t, TransformDirection::Forward)
            .unwrap();
        let out = apply(&p, [1.0, 1.0, 1.0]);
        for v in out {
            assert!((v - 2.0).abs() < 1e-6, "expected sh020 slope, got {out:?}");
        }
    }

    #[test]
    fn look_list_resolves_context_tokens() {
        let mut c = config();
        c.add_look(
            Look::new("grade")
                .process_space("linear")
                .transform(scale(3.0)),
        )
        .unwrap();
        let t = Transform::Look(crate::transform::LookTransform {
            src: "linear".into(),
            dst: "linear".into(),
            looks: "$LOOK".into(),
            direction: TransformDirection::Forward,
        });
        let mut ctx = Context::new();
        ctx.set("LOOK", "grade");
        let p = c
            .transform_processor(Some(&ctx), &t, TransformDirection::Forward)
            .unwrap();
        assert_eq!(apply(&p, [1.0, 1.0, 1.0]), [3.0, 3.0, 3.0]);
    }

    #[test]
    fn invalid_colorspace_transform_is_rejected() {
        let mut c = config();
        c.add_colorspace(
            ColorSpace::new("bad").from_reference(Transform::Exponent(ExponentTransform {
                value: [2.2, 2.2, 0.0, 1.0],
                ..Default::default()
            })),
        )
        .unwrap();
        assert!(matches!(
            c.processor("linear", "bad"),
            Err(ChromaError::InvalidTransform { .. })
        ));
        assert!(matches!(
            c.processor("bad", "linear"),
            Err(ChromaError::InvalidTransform { .. })
        ));
    }

    #[test]
    fn singular_matrix_rejected() {
        let c = config();
        let t = Transform::matrix([0.0; 16]).inverse();
        assert!(matches!(
            c.transform_processor(None, &t, TransformDirection::Forward),
            Err(ChromaError::InvalidTransform { .. })
        ));
    }
}
