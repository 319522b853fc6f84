//! 3D lookup tables: validation, trilinear sampling and two-slot compositing.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Grid positions this close to an integer sample that node exactly.
pub const SNAP_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Cube of `size³` RGB entries, red varying fastest, then green, then blue.
pub struct Lut3d {
    pub size: usize,
    pub data: Vec<f32>,
    #[serde(default = "full_intensity")]
    pub intensity: f32,
}

fn full_intensity() -> f32 {
    1.0
}

impl Lut3d {
    pub fn identity(size: usize) -> Self {
        let size = size.max(2);
        let scale = (size - 1) as f32;
        let mut data = Vec::with_capacity(size * size * size * 3);
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    data.extend([r as f32 / scale, g as f32 / scale, b as f32 / scale]);
                }
            }
        }
        Self {
            size,
            data,
            intensity: 1.0,
        }
    }

    /// Size of at least 2, data length `size³·3`, finite entries.
    pub fn is_valid(&self) -> bool {
        let expected = self
            .size
            .checked_mul(self.size)
            .and_then(|n| n.checked_mul(self.size))
            .and_then(|n| n.checked_mul(3));
        self.size >= 2
            && expected == Some(self.data.len())
            && self.data.iter().all(|v| v.is_finite())
    }

    fn index(&self, r: usize, g: usize, b: usize) -> usize {
        (r + g * self.size + b * self.size * self.size) * 3
    }

    pub fn grid(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        let i = self.index(r, g, b);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Trilinear sample of the raw table, ignoring intensity. Inputs are
    /// clamped to `[0,1]`.
    pub fn sample(&self, rgb: [f32; 3]) -> [f32; 3] {
        let max_index = self.size - 1;
        let axis = |v: f32| {
            let v = if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
            let mut pos = v * max_index as f32;
            let nearest = pos.round();
            if (pos - nearest).abs() < SNAP_EPSILON {
                pos = nearest;
            }
            let i0 = (pos.floor() as usize).min(max_index - 1);
            (i0, pos - i0 as f32)
        };
        let (r0, fr) = axis(rgb[0]);
        let (g0, fg) = axis(rgb[1]);
        let (b0, fb) = axis(rgb[2]);

        // Endpoint-exact form: t=0 yields a, t=1 yields b.
        let lerp = |a: [f32; 3], b: [f32; 3], t: f32| {
            [0, 1, 2].map(|c| a[c] * (1.0 - t) + b[c] * t)
        };
        let along_r = |g: usize, b: usize| lerp(self.grid(r0, g, b), self.grid(r0 + 1, g, b), fr);
        let c0 = lerp(along_r(g0, b0), along_r(g0 + 1, b0), fg);
        let c1 = lerp(along_r(g0, b0 + 1), along_r(g0 + 1, b0 + 1), fg);
        lerp(c0, c1, fb)
    }

    /// Raw sample blended against the input by this table's intensity.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let raw = self.sample(rgb);
        if self.intensity == 1.0 {
            return raw;
        }
        let clamped = rgb.map(|v| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 });
        [0, 1, 2].map(|c| clamped[c] * (1.0 - self.intensity) + raw[c] * self.intensity)
    }
}

/// Drops a table that fails validation, logging why.
pub fn validated<'a>(slot: &str, lut: Option<&'a Lut3d>) -> Option<&'a Lut3d> {
    let lut = lut?;
    if lut.is_valid() {
        Some(lut)
    } else {
        warn!(
            slot = %slot,
            size = lut.size,
            values = lut.data.len(),
            "ignoring malformed 3D LUT"
        );
        None
    }
}

/// Bakes both slots, each blended against identity at its own intensity,
/// into one table on the larger grid. The result has intensity 1.0.
///
/// Returns `None` when neither slot is present.
pub fn build_combined_lut(lut1: Option<&Lut3d>, lut2: Option<&Lut3d>) -> Option<Lut3d> {
    let size = match (lut1, lut2) {
        (None, None) => return None,
        (Some(a), None) => a.size,
        (None, Some(b)) => b.size,
        (Some(a), Some(b)) => a.size.max(b.size),
    };
    let scale = (size - 1) as f32;
    let mut data = Vec::with_capacity(size * size * size * 3);

    for b in 0..size {
        for g in 0..size {
            for r in 0..size {
                let identity = [r as f32 / scale, g as f32 / scale, b as f32 / scale];
                let mut value = identity;
                if let Some(lut) = lut1 {
                    let raw = if lut.size == size {
                        lut.grid(r, g, b)
                    } else {
                        lut.sample(identity)
                    };
                    value = blend(identity, raw, lut.intensity);
                }
                if let Some(lut) = lut2 {
                    let raw = lut.sample(value);
                    value = blend(value, raw, lut.intensity);
                }
                data.extend(value);
            }
        }
    }

    Some(Lut3d {
        size,
        data,
        intensity: 1.0,
    })
}

fn blend(base: [f32; 3], raw: [f32; 3], intensity: f32) -> [f32; 3] {
    if intensity == 1.0 {
        return raw;
    }
    [0, 1, 2].map(|c| base[c] * (1.0 - intensity) + raw[c] * intensity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_rgb_close(actual: [f32; 3], expected: [f32; 3], eps: f32) {
        for c in 0..3 {
            assert!(
                (actual[c] - expected[c]).abs() <= eps,
                "channel {} differs: actual={:?} expected={:?}",
                c,
                actual,
                expected
            );
        }
    }

    /// Swaps red and blue and darkens green.
    fn swizzle_lut(size: usize) -> Lut3d {
        let mut lut = Lut3d::identity(size);
        for px in lut.data.chunks_exact_mut(3) {
            let [r, g, b] = [px[0], px[1], px[2]];
            px[0] = b;
            px[1] = g * 0.5;
            px[2] = r;
        }
        lut
    }

    #[test]
    fn identity_table_samples_identity() {
        let lut = Lut3d::identity(17);
        assert!(lut.is_valid());
        for rgb in [[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [0.13, 0.57, 0.91]] {
            assert_rgb_close(lut.sample(rgb), rgb, 1e-6);
        }
    }

    #[test]
    fn grid_points_sample_exactly() {
        let mut lut = Lut3d::identity(5);
        for (i, v) in lut.data.iter_mut().enumerate() {
            *v = ((i * 37) % 101) as f32 / 100.0;
        }
        for (r, g, b) in [(0, 0, 0), (1, 2, 3), (4, 4, 4), (3, 0, 2)] {
            let input = [r as f32 / 4.0, g as f32 / 4.0, b as f32 / 4.0];
            assert_eq!(lut.sample(input), lut.grid(r, g, b));
        }
    }

    #[test]
    fn trilinear_interpolates_linear_tables_exactly() {
        let lut = swizzle_lut(9);
        assert_rgb_close(lut.sample([0.3, 0.6, 0.1]), [0.1, 0.3, 0.3], 1e-6);
    }

    #[test]
    fn size_mismatch_is_invalid() {
        let mut lut = Lut3d::identity(3);
        lut.data.pop();
        assert!(!lut.is_valid());
        assert!(validated("lut1", Some(&lut)).is_none());
        let tiny = Lut3d {
            size: 1,
            data: vec![0.0; 3],
            intensity: 1.0,
        };
        assert!(!tiny.is_valid());
    }

    #[test]
    fn non_finite_entries_are_invalid() {
        let mut lut = Lut3d::identity(2);
        lut.data[4] = f32::NAN;
        assert!(!lut.is_valid());
    }

    #[test]
    fn single_full_intensity_lut_combines_to_its_own_data() {
        let lut = swizzle_lut(6);
        let combined = build_combined_lut(Some(&lut), None).expect("combined lut");
        assert_eq!(combined.size, 6);
        assert_eq!(combined.data, lut.data);
        assert_eq!(combined.intensity, 1.0);
    }

    #[test]
    fn half_intensity_blends_against_identity() {
        let mut lut = swizzle_lut(4);
        lut.intensity = 0.5;
        let combined = build_combined_lut(Some(&lut), None).expect("combined lut");
        let rgb = [1.0, 1.0 / 3.0, 0.0];
        assert_rgb_close(combined.sample(rgb), lut.apply(rgb), 1e-6);
        assert_rgb_close(combined.sample(rgb), [0.5, 0.25, 0.5], 1e-6);
    }

    #[test]
    fn second_lut_is_applied_to_first_lut_output() {
        let first = swizzle_lut(5);
        let second = swizzle_lut(9);
        let combined = build_combined_lut(Some(&first), Some(&second)).expect("combined lut");
        assert_eq!(combined.size, 9);
        let rgb = [0.25, 0.5, 0.75];
        let expected = second.sample(first.sample(rgb));
        assert_rgb_close(combined.sample(rgb), expected, 1e-5);
    }

    #[test]
    fn nothing_to_combine() {
        assert!(build_combined_lut(None, None).is_none());
    }
}
