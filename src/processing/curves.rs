//! Tone curves baked into lookup tables.
//!
//! Four curves in order rgb, red, green, blue. The master curve runs first,
//! then each channel's own curve. The 8-bit path samples 256-entry tables;
//! the float path and the GPU share the 1024-entry tables.

use crate::params::Curves;

use super::finite_or_zero;
use super::spline::{CODE_MAX, create_spline};

pub const COARSE_SIZE: usize = 256;
pub const FINE_SIZE: usize = 1024;
pub const CURVE_COUNT: usize = 4;

#[derive(Clone, Debug, PartialEq)]
pub struct CurveTables {
    /// `CURVE_COUNT × COARSE_SIZE`, curve-major.
    coarse: Vec<f32>,
    /// `CURVE_COUNT × FINE_SIZE`, curve-major. Uploaded to the GPU as-is.
    fine: Vec<f32>,
    identity: [bool; CURVE_COUNT],
}

impl CurveTables {
    pub fn from_params(curves: &Curves) -> Self {
        let mut coarse = Vec::with_capacity(CURVE_COUNT * COARSE_SIZE);
        let mut fine = Vec::with_capacity(CURVE_COUNT * FINE_SIZE);
        let mut identity = [true; CURVE_COUNT];

        for (slot, points) in curves.channels().into_iter().enumerate() {
            let spline = create_spline(points, curves.monotone);
            identity[slot] = spline.is_identity();
            coarse.extend((0..COARSE_SIZE).map(|i| sample(&spline, i as f64)));
            fine.extend((0..FINE_SIZE).map(|j| {
                let x = j as f64 * CODE_MAX / (FINE_SIZE - 1) as f64;
                sample(&spline, x)
            }));
        }

        Self {
            coarse,
            fine,
            identity,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.identity.iter().all(|&id| id)
    }

    /// Bit `i` set when curve `i` (rgb, red, green, blue) is not identity.
    pub fn active_mask(&self) -> u32 {
        self.identity
            .iter()
            .enumerate()
            .filter(|(_, id)| !**id)
            .fold(0, |mask, (slot, _)| mask | (1 << slot))
    }

    pub fn fine_tables(&self) -> &[f32] {
        &self.fine
    }

    /// Applies the curves with the 256-entry tables.
    pub fn apply_coarse(&self, rgb: [f32; 3]) -> [f32; 3] {
        self.apply_with(rgb, COARSE_SIZE, &self.coarse)
    }

    /// Applies the curves with the 1024-entry tables.
    pub fn apply_fine(&self, rgb: [f32; 3]) -> [f32; 3] {
        self.apply_with(rgb, FINE_SIZE, &self.fine)
    }

    fn apply_with(&self, rgb: [f32; 3], size: usize, tables: &[f32]) -> [f32; 3] {
        let table = |slot: usize| &tables[slot * size..(slot + 1) * size];
        let mut out = rgb;
        if !self.identity[0] {
            out = out.map(|v| lookup(table(0), v));
        }
        for c in 0..3 {
            if !self.identity[c + 1] {
                out[c] = lookup(table(c + 1), out[c]);
            }
        }
        out
    }
}

fn sample(spline: &super::spline::Spline, x: f64) -> f32 {
    (spline.eval(x) / CODE_MAX) as f32
}

/// Linear interpolation into a table spanning `[0,1]`. Inputs outside the
/// range clamp to the end entries.
pub fn lookup(table: &[f32], v: f32) -> f32 {
    let last = table.len() - 1;
    let pos = finite_or_zero(v).clamp(0.0, 1.0) * last as f32;
    let i0 = (pos.floor() as usize).min(last);
    let i1 = (i0 + 1).min(last);
    let frac = pos - i0 as f32;
    table[i0] + (table[i1] - table[i0]) * frac
}
