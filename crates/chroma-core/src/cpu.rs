//! CPU execution backend.
//!
//! A [`CpuProcessor`] is a processor specialized for a pixel bit depth
//! and optimization level. Integer depths convert through normalized f32
//! with round-to-nearest and saturation; alpha channels pass through
//! untouched in every RGBA entry point.

use half::f16;

use crate::dynamic::{DynamicKind, DynamicProperty};
use crate::error::{ChromaError, ChromaResult};
use crate::ops::{Op, OptimizationLevel};

/// Pixel bit depths supported by the CPU backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BitDepth {
    /// 8-bit unsigned, full range 0..=255.
    U8,
    /// 10-bit unsigned in a 16-bit container, range 0..=1023.
    U10,
    /// 16-bit unsigned, range 0..=65535.
    U16,
    /// Half float.
    F16,
    /// Single float.
    #[default]
    F32,
}

impl BitDepth {
    /// The code value representing 1.0, for integer depths.
    pub fn max_value(self) -> f32 {
        match self {
            BitDepth::U8 => 255.0,
            BitDepth::U10 => 1023.0,
            BitDepth::U16 => 65535.0,
            BitDepth::F16 | BitDepth::F32 => 1.0,
        }
    }

    /// True for floating-point depths.
    pub fn is_float(self) -> bool {
        matches!(self, BitDepth::F16 | BitDepth::F32)
    }
}

/// A processor specialized for CPU evaluation.
#[derive(Debug, Clone)]
pub struct CpuProcessor {
    ops: Vec<Op>,
    depth: BitDepth,
    cache_id: String,
    level: OptimizationLevel,
}

impl CpuProcessor {
    pub(crate) fn new(
        ops: Vec<Op>,
        depth: BitDepth,
        source_id: String,
        level: OptimizationLevel,
    ) -> Self {
        let cache_id = format!("{source_id}:{depth:?}:{level:?}");
        Self {
            ops,
            depth,
            cache_id,
            level,
        }
    }

    /// The specialized op list (post-optimization).
    #[inline]
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// The bit depth this specialization targets.
    #[inline]
    pub fn bit_depth(&self) -> BitDepth {
        self.depth
    }

    /// The optimization level the op list was built with.
    #[inline]
    pub fn optimization(&self) -> OptimizationLevel {
        self.level
    }

    /// Cache ID: the source processor's ID qualified by depth and level.
    #[inline]
    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    /// True if the optimized pipeline is empty or all identities.
    pub fn is_noop(&self) -> bool {
        self.ops.iter().all(Op::is_identity)
    }

    /// The first dynamic property of the given kind, if present.
    pub fn dynamic_property(&self, kind: DynamicKind) -> Option<DynamicProperty> {
        self.ops
            .iter()
            .find_map(|op| op.dynamic_property(kind).cloned())
    }

    /// Applies the pipeline to one RGB triple.
    #[inline]
    pub fn apply_rgb(&self, px: &mut [f32; 3]) {
        for op in &self.ops {
            op.apply(px);
        }
    }

    /// Applies the pipeline to one RGBA pixel. Alpha is untouched.
    #[inline]
    pub fn apply_rgba(&self, px: &mut [f32; 4]) {
        let mut rgb = [px[0], px[1], px[2]];
        self.apply_rgb(&mut rgb);
        px[0] = rgb[0];
        px[1] = rgb[1];
        px[2] = rgb[2];
    }

    /// Applies the pipeline in place to a flat f32 buffer of RGB or RGBA
    /// pixels. The length must be a multiple of 3 or 4; ambiguous lengths
    /// (multiples of both) are treated as RGB.
    pub fn apply_flat(&self, data: &mut [f32]) -> ChromaResult<()> {
        if data.len() % 3 == 0 {
            for px in data.chunks_exact_mut(3) {
                let mut rgb = [px[0], px[1], px[2]];
                self.apply_rgb(&mut rgb);
                px.copy_from_slice(&rgb);
            }
            Ok(())
        } else if data.len() % 4 == 0 {
            for px in data.chunks_exact_mut(4) {
                let mut rgb = [px[0], px[1], px[2]];
                self.apply_rgb(&mut rgb);
                px[0] = rgb[0];
                px[1] = rgb[1];
                px[2] = rgb[2];
            }
            Ok(())
        } else {
            Err(ChromaError::InvalidParameter {
                reason: format!(
                    "buffer length {} is not a multiple of 3 or 4",
                    data.len()
                ),
            })
        }
    }

    /// Applies the pipeline from an immutable source into a new buffer.
    pub fn apply_to(&self, src: &[f32]) -> ChromaResult<Vec<f32>> {
        let mut out = src.to_vec();
        self.apply_flat(&mut out)?;
        Ok(out)
    }

    /// Applies the pipeline in place to interleaved 8-bit RGB(A) pixels.
    ///
    /// `channels` must be 3 or 4; with 4, alpha bytes are untouched.
    pub fn apply_u8(&self, data: &mut [u8], channels: usize) -> ChromaResult<()> {
        self.apply_int(data, channels, BitDepth::U8.max_value())
    }

    /// Applies the pipeline in place to interleaved 16-bit RGB(A) pixels
    /// at the specialized depth's code range (U10 or U16).
    pub fn apply_u16(&self, data: &mut [u16], channels: usize) -> ChromaResult<()> {
        let max = match self.depth {
            BitDepth::U10 => BitDepth::U10.max_value(),
            _ => BitDepth::U16.max_value(),
        };
        self.apply_int(data, channels, max)
    }

    /// Applies the pipeline in place to interleaved half-float RGB(A)
    /// pixels.
    pub fn apply_f16(&self, data: &mut [f16], channels: usize) -> ChromaResult<()> {
        check_channels(data.len(), channels)?;
        for px in data.chunks_exact_mut(channels) {
            let mut rgb = [px[0].to_f32(), px[1].to_f32(), px[2].to_f32()];
            self.apply_rgb(&mut rgb);
            px[0] = f16::from_f32(rgb[0]);
            px[1] = f16::from_f32(rgb[1]);
            px[2] = f16::from_f32(rgb[2]);
        }
        Ok(())
    }

    fn apply_int<T: IntCode>(
        &self,
        data: &mut [T],
        channels: usize,
        max: f32,
    ) -> ChromaResult<()> {
        check_channels(data.len(), channels)?;
        for px in data.chunks_exact_mut(channels) {
            let mut rgb = [
                px[0].to_f32() / max,
                px[1].to_f32() / max,
                px[2].to_f32() / max,
            ];
            self.apply_rgb(&mut rgb);
            px[0] = T::from_f32(rgb[0] * max);
            px[1] = T::from_f32(rgb[1] * max);
            px[2] = T::from_f32(rgb[2] * max);
        }
        Ok(())
    }
}

fn check_channels(len: usize, channels: usize) -> ChromaResult<()> {
    if channels != 3 && channels != 4 {
        return Err(ChromaError::InvalidParameter {
            reason: format!("channels must be 3 or 4, got {channels}"),
        });
    }
    if len % channels != 0 {
        return Err(ChromaError::InvalidParameter {
            reason: format!("buffer length {len} is not a multiple of {channels}"),
        });
    }
    Ok(())
}

/// Integer code value conversion with round-to-nearest and saturation.
trait IntCode: Copy {
    fn to_f32(self) -> f32;
    fn from_f32(v: f32) -> Self;
}

impl IntCode for u8 {
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
    #[inline]
    fn from_f32(v: f32) -> Self {
        v.round().clamp(0.0, 255.0) as u8
    }
}

impl IntCode for u16 {
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
    #[inline]
    fn from_f32(v: f32) -> Self {
        v.round().clamp(0.0, 65535.0) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn cpu(ops: Vec<Op>, depth: BitDepth) -> CpuProcessor {
        CpuProcessor::new(ops, depth, "test".into(), OptimizationLevel::None)
    }

    #[test]
    fn rgba_alpha_untouched() {
        let p = cpu(vec![scale_op(2.0)], BitDepth::F32);
        let mut px = [0.1, 0.2, 0.3, 0.75];
        p.apply_rgba(&mut px);
        assert_eq!(px[3], 0.75);
        assert!((px[0] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn flat_rgba_buffer() {
        let p = cpu(vec![scale_op(2.0)], BitDepth::F32);
        let mut data = vec![0.5, 0.5, 0.5, 1.0, 0.25, 0.25, 0.25, 0.5];
        p.apply_flat(&mut data).unwrap();
        assert_eq!(data[3], 1.0);
        assert_eq!(data[7], 0.5);
        assert!((data[4] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn bad_buffer_length_rejected() {
        let p = cpu(vec![scale_op(2.0)], BitDepth::F32);
        let mut data = vec![0.0; 5];
        assert!(matches!(
            p.apply_flat(&mut data),
            Err(ChromaError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn u8_saturates_and_rounds() {
        let p = cpu(vec![scale_op(2.0)], BitDepth::U8);
        let mut data = [200u8, 100, 1, 128];
        p.apply_u8(&mut data, 4).unwrap();
        assert_eq!(data[0], 255);
        assert_eq!(data[1], 200);
        assert_eq!(data[2], 2);
        assert_eq!(data[3], 128);
    }

    #[test]
    fn u10_uses_ten_bit_range() {
        let p = cpu(vec![scale_op(0.5)], BitDepth::U10);
        let mut data = [1023u16, 1023, 1023];
        p.apply_u16(&mut data, 3).unwrap();
        assert_eq!(data[0], 512);
    }

    #[test]
    fn f16_round_trip() {
        let p = cpu(vec![scale_op(1.0)], BitDepth::F16);
        let mut data = [f16::from_f32(0.5); 3];
        p.apply_f16(&mut data, 3).unwrap();
        assert!((data[0].to_f32() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn apply_to_leaves_source_untouched() {
        let p = cpu(vec![scale_op(2.0)], BitDepth::F32);
        let src = vec![0.25, 0.25, 0.25];
        let out = p.apply_to(&src).unwrap();
        assert_eq!(src[0], 0.25);
        assert!((out[0] - 0.5).abs() < 1e-6);
    }
}
