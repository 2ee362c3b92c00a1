//! Interpolation helpers shared by the LUT types.

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Maps `v` from `[min, max]` to `[0, 1]`, clamped.
#[inline]
pub(crate) fn normalize(v: f32, min: f32, max: f32) -> f32 {
    if (max - min).abs() < f32::EPSILON {
        0.0
    } else {
        ((v - min) / (max - min)).clamp(0.0, 1.0)
    }
}

/// Splits a normalized coordinate into (lower index, fraction) over `size` samples.
#[inline]
pub(crate) fn bracket(t: f32, size: usize) -> (usize, f32) {
    let x = t * (size - 1) as f32;
    let i = (x.floor() as usize).min(size.saturating_sub(2));
    (i, x - i as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerp(1.0, 3.0, 0.0), 1.0);
        assert_eq!(lerp(1.0, 3.0, 1.0), 3.0);
        assert_eq!(lerp(1.0, 3.0, 0.5), 2.0);
    }

    #[test]
    fn bracket_clamps_to_last_interval() {
        let (i, f) = bracket(1.0, 16);
        assert_eq!(i, 14);
        assert!((f - 1.0).abs() < 1e-6);
    }
}
