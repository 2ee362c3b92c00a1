//! Compiled processors.
//!
//! A [`Processor`] is the immutable result of compiling a transform
//! request: an ordered op list plus a content-derived cache ID. It is the
//! hand-off point to the execution backends; CPU specializations and GPU
//! shader descriptors are minted from it, each with independent dynamic
//! property cells.

use sha2::{Digest, Sha256};

use crate::cache::hex_digest;
use crate::cpu::{BitDepth, CpuProcessor};
use crate::dynamic::{DynamicKind, DynamicProperty};
use crate::error::ChromaResult;
use crate::gpu::{GpuShaderDesc, GpuShaderSettings};
use crate::ops::{optimize, Op, OptimizationLevel};
use crate::transform::{
    CdlTransform, ExposureContrastTransform, LogTransform, Lut1DTransform, Lut3DTransform,
    MatrixTransform, RangeTransform, Transform, TransferTransform, TransformDirection,
};

/// A compiled, immutable color processing pipeline.
#[derive(Debug, Clone)]
pub struct Processor {
    ops: Vec<Op>,
    cache_id: String,
}

impl Processor {
    /// Wraps an op list, computing its cache ID.
    pub(crate) fn from_ops(ops: Vec<Op>) -> Self {
        let cache_id = ops_cache_id(&ops);
        Self { ops, cache_id }
    }

    /// The compiled ops, in application order.
    #[inline]
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Content hash of the pipeline.
    ///
    /// Equal IDs mean pixel-identical static behavior regardless of how
    /// the processor was requested. Dynamic property values do not
    /// contribute; mutating one leaves the ID unchanged.
    #[inline]
    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    /// True if every op is provably an identity.
    pub fn is_noop(&self) -> bool {
        self.ops.iter().all(Op::is_identity)
    }

    /// True if any op mixes color channels.
    pub fn has_channel_crosstalk(&self) -> bool {
        self.ops.iter().any(Op::has_crosstalk)
    }

    /// True if any op exposes a dynamic property.
    pub fn has_dynamic_properties(&self) -> bool {
        DynamicKind::ALL
            .iter()
            .any(|k| self.dynamic_property(*k).is_some())
    }

    /// The first dynamic property of the given kind, if any op exposes
    /// one. The handle shares the op's cell.
    pub fn dynamic_property(&self, kind: DynamicKind) -> Option<DynamicProperty> {
        self.ops
            .iter()
            .find_map(|op| op.dynamic_property(kind).cloned())
    }

    /// Deep-copies the processor, detaching every dynamic cell.
    pub(crate) fn detached(&self) -> Self {
        let mut ops = self.ops.clone();
        for op in &mut ops {
            op.detach_dynamic();
        }
        Self {
            ops,
            cache_id: self.cache_id.clone(),
        }
    }

    /// Creates a CPU specialization at F32 with default optimization.
    pub fn default_cpu(&self) -> CpuProcessor {
        self.optimized_cpu(BitDepth::F32, OptimizationLevel::Default)
    }

    /// Creates a CPU specialization with explicit depth and optimization.
    ///
    /// The specialization detaches its dynamic cells from this processor.
    pub fn optimized_cpu(&self, depth: BitDepth, level: OptimizationLevel) -> CpuProcessor {
        let mut ops = self.ops.clone();
        for op in &mut ops {
            op.detach_dynamic();
        }
        let ops = optimize(ops, level);
        CpuProcessor::new(ops, depth, self.cache_id.clone(), level)
    }

    /// Emits a GPU shader description of this pipeline.
    ///
    /// The descriptor detaches its dynamic cells from this processor.
    pub fn extract_gpu_shader_info(&self, settings: GpuShaderSettings) -> ChromaResult<GpuShaderDesc> {
        let mut ops = self.ops.clone();
        for op in &mut ops {
            op.detach_dynamic();
        }
        let ops = optimize(ops, OptimizationLevel::Lossless);
        GpuShaderDesc::build(ops, settings)
    }

    /// Reconstructs an equivalent transform graph from the compiled ops.
    ///
    /// Reference and file indirections are already flattened, so the
    /// result is a group of primitive transforms.
    pub fn create_group_transform(&self) -> Transform {
        let transforms = self.ops.iter().map(op_to_transform).collect();
        Transform::group(transforms)
    }
}

fn ops_cache_id(ops: &[Op]) -> String {
    let mut h = Sha256::new();
    h.update(b"processor:");
    h.update((ops.len() as u64).to_le_bytes());
    for op in ops {
        op.fingerprint(&mut h);
    }
    hex_digest(h)
}

fn dir(forward: bool) -> TransformDirection {
    if forward {
        TransformDirection::Forward
    } else {
        TransformDirection::Inverse
    }
}

fn op_to_transform(op: &Op) -> Transform {
    match op {
        Op::Matrix { matrix, offset } => Transform::Matrix(MatrixTransform {
            matrix: matrix.map(|v| v as f64),
            offset: offset.map(|v| v as f64),
            direction: TransformDirection::Forward,
        }),
        Op::Lut1d { lut, interp } => Transform::Lut1D(Lut1DTransform {
            samples: lut.samples().to_vec(),
            channels: lut.channels(),
            interpolation: *interp,
            direction: TransformDirection::Forward,
        }),
        Op::Lut3d { lut, interp } => Transform::Lut3D(Lut3DTransform {
            data: lut.data().to_vec(),
            size: lut.size(),
            interpolation: *interp,
            direction: TransformDirection::Forward,
        }),
        Op::Exponent { value, style } => {
            Transform::Exponent(crate::transform::ExponentTransform {
                value: value.map(|v| v as f64),
                negative_style: *style,
                direction: TransformDirection::Forward,
            })
        }
        Op::Log { base, forward } => Transform::Log(LogTransform {
            base: *base as f64,
            direction: dir(*forward),
        }),
        Op::Cdl {
            slope,
            offset,
            power,
            saturation,
        } => Transform::Cdl(CdlTransform {
            slope: slope.map(|v| v as f64),
            offset: offset.map(|v| v as f64),
            power: power.map(|v| v as f64),
            saturation: *saturation as f64,
            direction: TransformDirection::Forward,
        }),
        Op::Range {
            scale,
            offset,
            clamp_min,
            clamp_max,
        } => {
            let min_out = clamp_min.map(|v| v as f64);
            let max_out = clamp_max.map(|v| v as f64);
            Transform::Range(RangeTransform {
                min_in: min_out.map(|o| (o - *offset as f64) / *scale as f64),
                max_in: max_out.map(|o| (o - *offset as f64) / *scale as f64),
                min_out,
                max_out,
                direction: TransformDirection::Forward,
            })
        }
        Op::Transfer { style, forward } => Transform::Transfer(TransferTransform {
            style: *style,
            direction: dir(*forward),
        }),
        Op::ExposureContrast {
            style,
            pivot,
            exposure,
            contrast,
            gamma,
            dynamic,
            forward,
        } => Transform::ExposureContrast(ExposureContrastTransform {
            exposure: exposure.get_scalar().unwrap_or(0.0),
            contrast: contrast.get_scalar().unwrap_or(1.0),
            gamma: gamma.get_scalar().unwrap_or(1.0),
            pivot: *pivot as f64,
            style: *style,
            dynamic_exposure: dynamic[0],
            dynamic_contrast: dynamic[1],
            dynamic_gamma: dynamic[2],
            direction: dir(*forward),
        }),
        Op::GradingPrimary {
            values,
            dynamic,
            forward,
        } => Transform::GradingPrimary(crate::transform::GradingPrimaryTransform {
            values: values.get_primary().unwrap_or_default(),
            dynamic: *dynamic,
            direction: dir(*forward),
        }),
        Op::GradingTone {
            values,
            dynamic,
            forward,
        } => {
            let v = match values.value() {
                crate::dynamic::DynamicValue::Tone(v) => v,
                _ => Default::default(),
            };
            Transform::GradingTone(crate::transform::GradingToneTransform {
                values: v,
                dynamic: *dynamic,
                direction: dir(*forward),
            })
        }
        Op::GradingRgbCurve {
            values,
            dynamic,
            forward,
        } => {
            let v = match values.value() {
                crate::dynamic::DynamicValue::RgbCurve(v) => v,
                _ => Default::default(),
            };
            Transform::GradingRgbCurve(crate::transform::GradingRgbCurveTransform {
                values: v,
                dynamic: *dynamic,
                direction: dir(*forward),
            })
        }
        Op::GradingHueCurve {
            values,
            dynamic,
            forward,
        } => {
            let v = match values.value() {
                crate::dynamic::DynamicValue::HueCurve(v) => v,
                _ => Default::default(),
            };
            Transform::GradingHueCurve(crate::transform::GradingHueCurveTransform {
                values: v,
                dynamic: *dynamic,
                direction: dir(*forward),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::DynamicValue;

    fn scale_op(s: f32) -> Op {
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

    fn dynamic_ec() -> Op {
        Op::ExposureContrast {
            style: crate::transform::ExposureContrastStyle::Linear,
            pivot: 0.18,
            exposure: DynamicProperty::scalar(DynamicKind::Exposure, 0.0),
            contrast: DynamicProperty::scalar(DynamicKind::Contrast, 1.0),
            gamma: DynamicProperty::scalar(DynamicKind::Gamma, 1.0),
            dynamic: [true, false, false],
            forward: true,
        }
    }

    #[test]
    fn noop_detection() {
        assert!(Processor::from_ops(vec![scale_op(1.0)]).is_noop());
        assert!(!Processor::from_ops(vec![scale_op(2.0)]).is_noop());
    }

    #[test]
    fn cache_id_depends_on_ops_not_request() {
        let a = Processor::from_ops(vec![scale_op(2.0)]);
        let b = Processor::from_ops(vec![scale_op(2.0)]);
        let c = Processor::from_ops(vec![scale_op(3.0)]);
        assert_eq!(a.cache_id(), b.cache_id());
        assert_ne!(a.cache_id(), c.cache_id());
        assert_eq!(a.cache_id().len(), 32);
    }

    #[test]
    fn cache_id_stable_under_dynamic_mutation() {
        let p = Processor::from_ops(vec![dynamic_ec()]);
        let before = p.cache_id().to_string();
        p.dynamic_property(DynamicKind::Exposure)
            .unwrap()
            .set_scalar(2.0)
            .unwrap();
        assert_eq!(Processor::from_ops(p.ops.clone()).cache_id(), before);
    }

    #[test]
    fn cpu_specialization_is_isolated() {
        let p = Processor::from_ops(vec![dynamic_ec()]);
        let cpu = p.default_cpu();
        p.dynamic_property(DynamicKind::Exposure)
            .unwrap()
            .set_scalar(3.0)
            .unwrap();
        // The specialization kept its own cell at the original value.
        assert_eq!(
            cpu.dynamic_property(DynamicKind::Exposure)
                .unwrap()
                .get_scalar()
                .unwrap(),
            0.0
        );
    }

    #[test]
    fn group_transform_round_trips_ops() {
        let p = Processor::from_ops(vec![scale_op(2.0), dynamic_ec()]);
        let t = p.create_group_transform();
        match t {
            Transform::Group(g) => {
                assert_eq!(g.transforms.len(), 2);
                assert!(matches!(g.transforms[0], Transform::Matrix(_)));
                assert!(matches!(g.transforms[1], Transform::ExposureContrast(_)));
            }
            _ => panic!("expected group"),
        }
    }

    #[test]
    fn dynamic_property_lookup() {
        let p = Processor::from_ops(vec![dynamic_ec()]);
        assert!(p.dynamic_property(DynamicKind::Exposure).is_some());
        // Contrast is not flagged dynamic on this op.
        assert!(p.dynamic_property(DynamicKind::Contrast).is_none());
        assert!(p.has_dynamic_properties());
        let value = p.dynamic_property(DynamicKind::Exposure).unwrap();
        value.set_value(DynamicValue::Scalar(1.0)).unwrap();
        assert_eq!(value.get_scalar().unwrap(), 1.0);
    }
}
