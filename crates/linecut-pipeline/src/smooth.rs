//! Path smoothing: moving average or smoothing spline.
//!
//! Hand-drawn strokes and pixel staircases produce jittery paths. Two
//! interchangeable strategies remove the jitter; both run after
//! simplification so they work on the reduced point set.
//!
//! - [`SmoothingMethod::MovingAverage`] replaces each point with the mean
//!   of its neighbours and keeps the point count.
//! - [`SmoothingMethod::Spline`] fits a discrete cubic smoothing spline
//!   (least squares with a second-difference penalty, also known as a
//!   Whittaker smoother) and resamples it with Catmull-Rom
//!   interpolation, changing the point count.

use serde::{Deserialize, Serialize};

use crate::types::{Path, Point};

/// Samples per original point when resampling a fitted spline.
pub const RESAMPLE_FACTOR: usize = 2;

/// Relative residual at which the spline solver stops.
const SOLVER_TOLERANCE: f64 = 1e-10;

/// Selects the smoothing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SmoothingMethod {
    /// Symmetric moving average over `smooth_level` points.
    #[default]
    MovingAverage,
    /// Smoothing spline with penalty `smooth_level²`, resampled at
    /// [`RESAMPLE_FACTOR`] points per input point.
    Spline,
}

/// Smooth a path with the given method and strength.
///
/// A `level` of zero returns the path unchanged.
#[must_use = "returns the smoothed path"]
pub fn smooth(path: &Path, level: u32, method: SmoothingMethod) -> Path {
    if level == 0 {
        return path.clone();
    }
    match method {
        SmoothingMethod::MovingAverage => moving_average(path, level),
        SmoothingMethod::Spline => spline(path, level),
    }
}

/// Replace every point with the mean of a symmetric window.
///
/// The window spans `level / 2` points on each side. On an open path it
/// shrinks symmetrically near the ends, so the endpoints stay put and
/// the output has exactly as many points as the input. On a closed path
/// it wraps around, and the window always leaves out part of the ring so
/// a short loop keeps its shape instead of averaging to its centroid.
#[must_use = "returns the smoothed path"]
pub fn moving_average(path: &Path, level: u32) -> Path {
    let points = path.points();
    let n = points.len();
    let half = (level / 2) as usize;
    if n < 3 || half == 0 {
        return path.clone();
    }

    let smoothed = if path.is_closed() {
        let half = half.min(n.saturating_sub(2) / 2);
        (0..n)
            .map(|i| mean((0..=2 * half).map(|k| points[(i + n + k - half) % n])))
            .collect()
    } else {
        (0..n)
            .map(|i| {
                let reach = half.min(i).min(n - 1 - i);
                mean(points[i - reach..=i + reach].iter().copied())
            })
            .collect()
    };

    path.with_points(smoothed)
}

fn mean(points: impl Iterator<Item = Point>) -> Point {
    let (mut sx, mut sy, mut count) = (0.0, 0.0, 0.0);
    for p in points {
        sx += p.x;
        sy += p.y;
        count += 1.0;
    }
    Point::new(sx / count, sy / count)
}

/// Fit a discrete smoothing spline and resample it.
///
/// Minimises `|z - p|² + λ |D² z|²` independently in x and y, with
/// `λ = level²` and `D²` the second-difference operator (cyclic for
/// closed paths). Higher levels give smoother curves with fewer
/// effective degrees of freedom. The fit is resampled with uniform
/// Catmull-Rom interpolation at [`RESAMPLE_FACTOR`] points per input
/// point; open paths keep their original endpoints.
#[must_use = "returns the smoothed path"]
pub fn spline(path: &Path, level: u32) -> Path {
    let points = path.points();
    let n = points.len();
    if n < 3 {
        return path.clone();
    }

    let lambda = f64::from(level).powi(2);
    let closed = path.is_closed();
    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
    let fx = solve_smoothing(&xs, lambda, closed);
    let fy = solve_smoothing(&ys, lambda, closed);
    let mut fitted: Vec<Point> = fx.into_iter().zip(fy).map(|(x, y)| Point::new(x, y)).collect();

    if !closed {
        fitted[0] = points[0];
        fitted[n - 1] = points[n - 1];
    }

    let mut resampled = resample_catmull_rom(&fitted, n * RESAMPLE_FACTOR, closed);
    if !closed {
        if let Some(last) = resampled.last_mut() {
            *last = points[n - 1];
        }
    }
    path.with_points(dedup_consecutive(resampled))
}

/// Smooth every path independently.
#[must_use = "returns the smoothed paths"]
pub fn smooth_paths(paths: &[Path], level: u32, method: SmoothingMethod) -> Vec<Path> {
    paths.iter().map(|p| smooth(p, level, method)).collect()
}

/// Solve `(I + λ DᵀD) z = values` by conjugate gradients.
///
/// The system is symmetric positive definite, so CG converges; the
/// operator is applied matrix-free.
fn solve_smoothing(values: &[f64], lambda: f64, closed: bool) -> Vec<f64> {
    let n = values.len();
    let apply = |v: &[f64]| -> Vec<f64> {
        let mut penalty = vec![0.0; n];
        if closed {
            for i in 0..n {
                let (prev, next) = ((i + n - 1) % n, (i + 1) % n);
                let d = 2.0f64.mul_add(-v[i], v[prev] + v[next]);
                penalty[prev] += d;
                penalty[i] -= 2.0 * d;
                penalty[next] += d;
            }
        } else {
            for i in 0..n - 2 {
                let d = 2.0f64.mul_add(-v[i + 1], v[i] + v[i + 2]);
                penalty[i] += d;
                penalty[i + 1] -= 2.0 * d;
                penalty[i + 2] += d;
            }
        }
        v.iter()
            .zip(penalty)
            .map(|(&vi, pi)| lambda.mul_add(pi, vi))
            .collect()
    };
    let dot = |a: &[f64], b: &[f64]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f64>();

    let mut z = values.to_vec();
    let az = apply(&z);
    let mut r: Vec<f64> = values.iter().zip(&az).map(|(b, a)| b - a).collect();
    let mut p = r.clone();
    let mut rs_old = dot(&r, &r);
    let threshold = SOLVER_TOLERANCE * dot(values, values).max(1.0);

    for _ in 0..(4 * n + 50) {
        if rs_old <= threshold {
            break;
        }
        let ap = apply(&p);
        let alpha = rs_old / dot(&p, &ap);
        for i in 0..n {
            z[i] = alpha.mul_add(p[i], z[i]);
            r[i] = (-alpha).mul_add(ap[i], r[i]);
        }
        let rs_new = dot(&r, &r);
        let beta = rs_new / rs_old;
        for i in 0..n {
            p[i] = beta.mul_add(p[i], r[i]);
        }
        rs_old = rs_new;
    }

    z
}

/// Sample a uniform Catmull-Rom spline through `points`.
///
/// Open curves are sampled from the first to the last point inclusive;
/// closed curves over the full loop, without repeating the start.
fn resample_catmull_rom(points: &[Point], samples: usize, closed: bool) -> Vec<Point> {
    let n = points.len();
    let at = |i: isize| -> Point {
        #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
        let index = if closed {
            i.rem_euclid(n as isize) as usize
        } else {
            i.clamp(0, n as isize - 1) as usize
        };
        points[index]
    };

    #[allow(clippy::cast_precision_loss)]
    let span = if closed { n as f64 } else { (n - 1) as f64 };
    #[allow(clippy::cast_precision_loss)]
    let steps = if closed { samples as f64 } else { (samples.max(2) - 1) as f64 };
    let count = if closed { samples } else { samples.max(2) };

    (0..count)
        .map(|k| {
            #[allow(clippy::cast_precision_loss)]
            let t = k as f64 * span / steps;
            #[allow(clippy::cast_possible_truncation)]
            let segment = (t.floor() as isize).min(if closed { isize::MAX } else { n as isize - 2 });
            #[allow(clippy::cast_precision_loss)]
            let u = t - segment as f64;
            catmull_rom(
                at(segment - 1),
                at(segment),
                at(segment + 1),
                at(segment + 2),
                u,
            )
        })
        .collect()
}

/// Uniform Catmull-Rom interpolation between `p1` and `p2`.
fn catmull_rom(p0: Point, p1: Point, p2: Point, p3: Point, u: f64) -> Point {
    let u2 = u * u;
    let u3 = u2 * u;
    let blend = |a: f64, b: f64, c: f64, d: f64| {
        0.5 * ((2.0 * b)
            + (c - a) * u
            + (2.0f64.mul_add(a, -5.0 * b) + 4.0f64.mul_add(c, -d)) * u2
            + (3.0f64.mul_add(b, -a) + (-3.0f64).mul_add(c, d)) * u3)
    };
    Point::new(
        blend(p0.x, p1.x, p2.x, p3.x),
        blend(p0.y, p1.y, p2.y, p3.y),
    )
}

fn dedup_consecutive(mut points: Vec<Point>) -> Vec<Point> {
    points.dedup();
    points
}
