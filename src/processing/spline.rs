//! Natural cubic spline through curve control points.
//!
//! Node slopes come from the C²-continuity system with natural end
//! conditions (zero second derivative at both ends), solved in O(n) with the
//! Thomas algorithm. Each segment is then a cubic in Hermite form. The
//! optional Fritsch-Carlson pass rescales slope pairs so the interpolant
//! never overshoots monotone data.

use crate::params::ControlPoint;

pub const CODE_MAX: f64 = 255.0;
/// `α² + β²` bound from Fritsch-Carlson.
const MONOTONE_LIMIT: f64 = 9.0;

#[derive(Clone, Debug, PartialEq)]
enum Shape {
    Identity,
    Linear,
    Cubic {
        slopes: Vec<f64>,
        c2: Vec<f64>,
        c3: Vec<f64>,
    },
}

#[derive(Clone, Debug, PartialEq)]
/// Interpolating curve over `[0,255]`. Flat extrapolation beyond the first
/// and last control point.
pub struct Spline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    shape: Shape,
}

/// Drops non-finite points, clamps both axes to `[0,255]`, stably sorts by x
/// and collapses duplicate x values keeping the last point given for that x.
pub fn sanitize_points(points: &[ControlPoint]) -> Vec<(f64, f64)> {
    let mut cleaned: Vec<(f64, f64)> = points
        .iter()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .map(|p| {
            (
                (p.x as f64).clamp(0.0, CODE_MAX),
                (p.y as f64).clamp(0.0, CODE_MAX),
            )
        })
        .collect();
    cleaned.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut deduped: Vec<(f64, f64)> = Vec::with_capacity(cleaned.len());
    for point in cleaned {
        match deduped.last_mut() {
            Some(last) if last.0 == point.0 => *last = point,
            _ => deduped.push(point),
        }
    }
    deduped
}

/// Builds the spline through `points`. Fewer than two distinct x values give
/// the identity mapping; exactly two give straight-line interpolation.
pub fn create_spline(points: &[ControlPoint], monotone: bool) -> Spline {
    let cleaned = sanitize_points(points);
    let xs: Vec<f64> = cleaned.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = cleaned.iter().map(|p| p.1).collect();

    let shape = match xs.len() {
        0 | 1 => Shape::Identity,
        2 => Shape::Linear,
        _ => {
            let mut slopes = natural_slopes(&xs, &ys);
            if monotone {
                fritsch_carlson(&xs, &ys, &mut slopes);
            }
            let (c2, c3) = segment_coefficients(&xs, &ys, &slopes);
            Shape::Cubic { slopes, c2, c3 }
        }
    };
    Spline { xs, ys, shape }
}

impl Spline {
    pub fn is_identity(&self) -> bool {
        match self.shape {
            Shape::Identity => true,
            Shape::Linear => {
                self.xs[0] == 0.0
                    && self.ys[0] == 0.0
                    && self.xs[1] == CODE_MAX
                    && self.ys[1] == CODE_MAX
            }
            Shape::Cubic { .. } => false,
        }
    }

    /// Evaluates at `x` in code units.
    pub fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        match &self.shape {
            Shape::Identity => x,
            _ if x <= self.xs[0] => self.ys[0],
            _ if x >= self.xs[n - 1] => self.ys[n - 1],
            Shape::Linear => {
                let t = (x - self.xs[0]) / (self.xs[1] - self.xs[0]);
                self.ys[0] + (self.ys[1] - self.ys[0]) * t
            }
            Shape::Cubic { slopes, c2, c3 } => {
                let i = self.segment_index(x);
                let dx = x - self.xs[i];
                self.ys[i] + dx * (slopes[i] + dx * (c2[i] + dx * c3[i]))
            }
        }
    }

    fn segment_index(&self, x: f64) -> usize {
        // First node strictly greater than x, minus one.
        let upper = self.xs.partition_point(|&node| node <= x);
        upper.saturating_sub(1).min(self.xs.len() - 2)
    }
}

/// Solves `a[i]·x[i−1] + b[i]·x[i] + c[i]·x[i+1] = d[i]` by forward
/// elimination and back-substitution. `a[0]` and `c[n−1]` are ignored.
pub fn solve_tridiagonal(a: &[f64], b: &[f64], c: &[f64], d: &[f64]) -> Vec<f64> {
    let n = d.len();
    if n == 0 {
        return Vec::new();
    }
    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];
    c_prime[0] = c[0] / b[0];
    d_prime[0] = d[0] / b[0];
    for i in 1..n {
        let denom = b[i] - a[i] * c_prime[i - 1];
        c_prime[i] = if i + 1 < n { c[i] / denom } else { 0.0 };
        d_prime[i] = (d[i] - a[i] * d_prime[i - 1]) / denom;
    }

    let mut x = vec![0.0; n];
    x[n - 1] = d_prime[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = d_prime[i] - c_prime[i] * x[i + 1];
    }
    x
}

/// First-derivative values at each node for the natural cubic spline.
fn natural_slopes(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
    let delta: Vec<f64> = (0..n - 1).map(|i| (ys[i + 1] - ys[i]) / h[i]).collect();

    let mut a = vec![0.0; n];
    let mut b = vec![0.0; n];
    let mut c = vec![0.0; n];
    let mut d = vec![0.0; n];

    b[0] = 2.0 / h[0];
    c[0] = 1.0 / h[0];
    d[0] = 3.0 * delta[0] / h[0];
    for i in 1..n - 1 {
        a[i] = 1.0 / h[i - 1];
        b[i] = 2.0 * (1.0 / h[i - 1] + 1.0 / h[i]);
        c[i] = 1.0 / h[i];
        d[i] = 3.0 * (delta[i - 1] / h[i - 1] + delta[i] / h[i]);
    }
    a[n - 1] = 1.0 / h[n - 2];
    b[n - 1] = 2.0 / h[n - 2];
    d[n - 1] = 3.0 * delta[n - 2] / h[n - 2];

    solve_tridiagonal(&a, &b, &c, &d)
}

/// Fritsch-Carlson monotonicity constraint on node slopes.
fn fritsch_carlson(xs: &[f64], ys: &[f64], slopes: &mut [f64]) {
    let n = xs.len();
    let delta: Vec<f64> = (0..n - 1)
        .map(|i| (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i]))
        .collect();

    // Local extrema and sign disagreements get a flat tangent.
    for i in 0..n {
        let left = if i > 0 { Some(delta[i - 1]) } else { None };
        let right = if i < n - 1 { Some(delta[i]) } else { None };
        let flat = match (left, right) {
            (Some(l), Some(r)) => l * r <= 0.0,
            _ => false,
        };
        let reversed = [left, right]
            .into_iter()
            .flatten()
            .any(|d| d != 0.0 && slopes[i] * d < 0.0);
        if flat || reversed {
            slopes[i] = 0.0;
        }
    }

    for i in 0..n - 1 {
        if delta[i] == 0.0 {
            slopes[i] = 0.0;
            slopes[i + 1] = 0.0;
            continue;
        }
        let alpha = slopes[i] / delta[i];
        let beta = slopes[i + 1] / delta[i];
        let sum = alpha * alpha + beta * beta;
        if sum > MONOTONE_LIMIT {
            let tau = 3.0 / sum.sqrt();
            slopes[i] = tau * alpha * delta[i];
            slopes[i + 1] = tau * beta * delta[i];
        }
    }
}

/// Quadratic and cubic coefficients of each segment in Hermite form.
fn segment_coefficients(xs: &[f64], ys: &[f64], slopes: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let segments = xs.len() - 1;
    let mut c2 = Vec::with_capacity(segments);
    let mut c3 = Vec::with_capacity(segments);
    for i in 0..segments {
        let h = xs[i + 1] - xs[i];
        let delta = (ys[i + 1] - ys[i]) / h;
        c2.push((3.0 * delta - 2.0 * slopes[i] - slopes[i + 1]) / h);
        c3.push((slopes[i] + slopes[i + 1] - 2.0 * delta) / (h * h));
    }
    (c2, c3)
}
