//! 3D lookup table.

use crate::interp::{bracket, normalize};

/// A 3-dimensional lookup table over an RGB cube.
///
/// Data is stored red-fastest: index `(b * size + g) * size + r`, three
/// floats per entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3d {
    data: Vec<f32>,
    size: usize,
    /// Input domain lower bound per channel.
    pub domain_min: [f32; 3],
    /// Input domain upper bound per channel.
    pub domain_max: [f32; 3],
}

impl Lut3d {
    /// Creates a LUT from flat data (`size^3 * 3` floats, red-fastest).
    pub fn from_data(data: Vec<f32>, size: usize) -> Self {
        debug_assert_eq!(data.len(), size * size * size * 3);
        Self {
            data,
            size,
            domain_min: [0.0; 3],
            domain_max: [1.0; 3],
        }
    }

    /// Builds an identity cube with `size` samples per edge.
    pub fn identity(size: usize) -> Self {
        let mut data = Vec::with_capacity(size * size * size * 3);
        let max = (size - 1) as f32;
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    data.push(r as f32 / max);
                    data.push(g as f32 / max);
                    data.push(b as f32 / max);
                }
            }
        }
        Self::from_data(data, size)
    }

    /// Edge length of the cube.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Flat red-fastest data.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    fn entry(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        let i = ((b * self.size + g) * self.size + r) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Samples the cube with trilinear interpolation.
    pub fn sample_trilinear(&self, rgb: [f32; 3]) -> [f32; 3] {
        let (r0, fr) = self.coord(rgb[0], 0);
        let (g0, fg) = self.coord(rgb[1], 1);
        let (b0, fb) = self.coord(rgb[2], 2);

        let mut out = [0.0f32; 3];
        for c in 0..3 {
            let c00 = self.entry(r0, g0, b0)[c] * (1.0 - fr) + self.entry(r0 + 1, g0, b0)[c] * fr;
            let c10 =
                self.entry(r0, g0 + 1, b0)[c] * (1.0 - fr) + self.entry(r0 + 1, g0 + 1, b0)[c] * fr;
            let c01 =
                self.entry(r0, g0, b0 + 1)[c] * (1.0 - fr) + self.entry(r0 + 1, g0, b0 + 1)[c] * fr;
            let c11 = self.entry(r0, g0 + 1, b0 + 1)[c] * (1.0 - fr)
                + self.entry(r0 + 1, g0 + 1, b0 + 1)[c] * fr;
            let c0 = c00 * (1.0 - fg) + c10 * fg;
            let c1 = c01 * (1.0 - fg) + c11 * fg;
            out[c] = c0 * (1.0 - fb) + c1 * fb;
        }
        out
    }

    /// Samples the cube with tetrahedral interpolation.
    ///
    /// Preferred for color work: exact on the cube diagonal (neutrals).
    pub fn sample_tetrahedral(&self, rgb: [f32; 3]) -> [f32; 3] {
        let (r0, fr) = self.coord(rgb[0], 0);
        let (g0, fg) = self.coord(rgb[1], 1);
        let (b0, fb) = self.coord(rgb[2], 2);

        let c000 = self.entry(r0, g0, b0);
        let c100 = self.entry(r0 + 1, g0, b0);
        let c010 = self.entry(r0, g0 + 1, b0);
        let c110 = self.entry(r0 + 1, g0 + 1, b0);
        let c001 = self.entry(r0, g0, b0 + 1);
        let c101 = self.entry(r0 + 1, g0, b0 + 1);
        let c011 = self.entry(r0, g0 + 1, b0 + 1);
        let c111 = self.entry(r0 + 1, g0 + 1, b0 + 1);

        let mut out = [0.0f32; 3];
        for c in 0..3 {
            out[c] = if fr > fg {
                if fg > fb {
                    (1.0 - fr) * c000[c] + (fr - fg) * c100[c] + (fg - fb) * c110[c] + fb * c111[c]
                } else if fr > fb {
                    (1.0 - fr) * c000[c] + (fr - fb) * c100[c] + (fb - fg) * c101[c] + fg * c111[c]
                } else {
                    (1.0 - fb) * c000[c] + (fb - fr) * c001[c] + (fr - fg) * c101[c] + fg * c111[c]
                }
            } else if fr > fb {
                (1.0 - fg) * c000[c] + (fg - fr) * c010[c] + (fr - fb) * c110[c] + fb * c111[c]
            } else if fg > fb {
                (1.0 - fg) * c000[c] + (fg - fb) * c010[c] + (fb - fr) * c011[c] + fr * c111[c]
            } else {
                (1.0 - fb) * c000[c] + (fb - fg) * c001[c] + (fg - fr) * c011[c] + fr * c111[c]
            };
        }
        out
    }

    #[inline]
    fn coord(&self, v: f32, channel: usize) -> (usize, f32) {
        let t = normalize(v, self.domain_min[channel], self.domain_max[channel]);
        bracket(t, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_samples_to_input() {
        let lut = Lut3d::identity(9);
        for &p in &[[0.0f32, 0.0, 0.0], [0.5, 0.25, 0.75], [1.0, 1.0, 1.0]] {
            let tri = lut.sample_trilinear(p);
            let tet = lut.sample_tetrahedral(p);
            for c in 0..3 {
                assert_relative_eq!(tri[c], p[c], epsilon = 1e-5);
                assert_relative_eq!(tet[c], p[c], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn tetrahedral_exact_on_neutral_axis() {
        let lut = Lut3d::identity(5);
        let out = lut.sample_tetrahedral([0.3, 0.3, 0.3]);
        assert_relative_eq!(out[0], out[1], epsilon = 1e-7);
        assert_relative_eq!(out[1], out[2], epsilon = 1e-7);
    }
}
