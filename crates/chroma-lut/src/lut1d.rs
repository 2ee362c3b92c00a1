//! 1D lookup table.

use crate::interp::{bracket, lerp, normalize};

/// A 1-dimensional lookup table.
///
/// Samples are stored interleaved: `channels == 1` means a single curve
/// applied to R, G and B alike; `channels == 3` means independent per-channel
/// curves stored as `[r0, g0, b0, r1, g1, b1, ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut1d {
    samples: Vec<f32>,
    channels: usize,
    /// Input domain lower bound per channel.
    pub domain_min: [f32; 3],
    /// Input domain upper bound per channel.
    pub domain_max: [f32; 3],
}

impl Lut1d {
    /// Creates a LUT from interleaved samples.
    ///
    /// `channels` must be 1 or 3 and must divide `samples.len()`.
    pub fn from_samples(samples: Vec<f32>, channels: usize) -> Self {
        debug_assert!(channels == 1 || channels == 3);
        debug_assert!(samples.len() % channels == 0);
        Self {
            samples,
            channels,
            domain_min: [0.0; 3],
            domain_max: [1.0; 3],
        }
    }

    /// Creates a LUT with an explicit input domain.
    pub fn with_domain(mut self, min: [f32; 3], max: [f32; 3]) -> Self {
        self.domain_min = min;
        self.domain_max = max;
        self
    }

    /// Builds a gamma curve LUT with `size` samples.
    pub fn gamma(size: usize, gamma: f32) -> Self {
        let samples = (0..size)
            .map(|i| (i as f32 / (size - 1) as f32).powf(gamma))
            .collect();
        Self::from_samples(samples, 1)
    }

    /// Number of samples per channel.
    #[inline]
    pub fn size(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Number of channels (1 or 3).
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Raw interleaved sample data.
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Evaluates one channel at input `v` with linear interpolation.
    pub fn sample(&self, v: f32, channel: usize) -> f32 {
        let size = self.size();
        if size == 0 {
            return v;
        }
        if size == 1 {
            return self.samples[channel.min(self.channels - 1)];
        }
        let c = if self.channels == 1 { 0 } else { channel };
        let t = normalize(v, self.domain_min[channel], self.domain_max[channel]);
        let (i, f) = bracket(t, size);
        let a = self.samples[i * self.channels + c];
        let b = self.samples[(i + 1) * self.channels + c];
        lerp(a, b, f)
    }

    /// Evaluates all three channels of an RGB triple.
    pub fn sample_rgb(&self, rgb: [f32; 3]) -> [f32; 3] {
        [
            self.sample(rgb[0], 0),
            self.sample(rgb[1], 1),
            self.sample(rgb[2], 2),
        ]
    }

    /// True if every channel maps input to itself within `tol`.
    pub fn is_identity(&self, tol: f32) -> bool {
        let size = self.size();
        if size < 2 {
            return true;
        }
        for i in 0..size {
            let expected = i as f32 / (size - 1) as f32;
            for c in 0..self.channels {
                if (self.samples[i * self.channels + c] - expected).abs() > tol {
                    return false;
                }
            }
        }
        true
    }

    /// Builds the inverse LUT by monotonic reverse lookup.
    ///
    /// Assumes each channel curve is monotonically increasing; flat regions
    /// resolve to their lower edge.
    pub fn inverted(&self) -> Self {
        let size = self.size();
        let mut out = vec![0.0f32; self.samples.len()];
        for c in 0..self.channels {
            for i in 0..size {
                let target = i as f32 / (size - 1) as f32;
                // Binary search over the forward curve.
                let mut lo = 0usize;
                let mut hi = size - 1;
                while lo < hi {
                    let mid = (lo + hi) / 2;
                    if self.samples[mid * self.channels + c] < target {
                        lo = mid + 1;
                    } else {
                        hi = mid;
                    }
                }
                let v = if lo == 0 {
                    0.0
                } else {
                    let below = self.samples[(lo - 1) * self.channels + c];
                    let above = self.samples[lo * self.channels + c];
                    let span = above - below;
                    if span.abs() < 1e-10 {
                        (lo - 1) as f32 / (size - 1) as f32
                    } else {
                        ((lo - 1) as f32 + (target - below) / span) / (size - 1) as f32
                    }
                };
                out[i * self.channels + c] = v.clamp(0.0, 1.0);
            }
        }
        Self {
            samples: out,
            channels: self.channels,
            domain_min: [0.0; 3],
            domain_max: [1.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_detection() {
        let lut = Lut1d::gamma(64, 1.0);
        assert!(lut.is_identity(1e-6));
        let lut = Lut1d::gamma(64, 2.2);
        assert!(!lut.is_identity(1e-3));
    }

    #[test]
    fn sample_interpolates() {
        let lut = Lut1d::from_samples(vec![0.0, 1.0], 1);
        assert_relative_eq!(lut.sample(0.25, 0), 0.25, epsilon = 1e-6);
    }

    #[test]
    fn inverse_round_trips_gamma() {
        let lut = Lut1d::gamma(1024, 2.2);
        let inv = lut.inverted();
        for &v in &[0.1f32, 0.5, 0.9] {
            let fwd = lut.sample(v, 0);
            let back = inv.sample(fwd, 0);
            assert_relative_eq!(back, v, epsilon = 2e-3);
        }
    }

    #[test]
    fn three_channel_sampling() {
        let lut = Lut1d::from_samples(vec![0.0, 0.0, 0.0, 1.0, 0.5, 0.25], 3);
        let out = lut.sample_rgb([1.0, 1.0, 1.0]);
        assert_relative_eq!(out[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(out[1], 0.5, epsilon = 1e-6);
        assert_relative_eq!(out[2], 0.25, epsilon = 1e-6);
    }
}
