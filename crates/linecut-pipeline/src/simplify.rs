//! Path simplification using the Ramer-Douglas-Peucker algorithm.
//!
//! Reduces point count in paths by removing points that are within
//! a given tolerance of the chord between their kept neighbours.
//!
//! This is the first refinement step, between contour tracing and
//! smoothing.

use crate::types::{Path, Point};

/// Simplify a single path using the Ramer-Douglas-Peucker algorithm.
///
/// Points within `tolerance` of the chord between the kept points around
/// them are removed. The first and last points are always kept. A
/// tolerance of 0.0 (or less) returns the path unchanged, collinear
/// points included.
///
/// A closed path is simplified as a ring anchored at its first point:
/// the implied closing segment takes part, and the first point stays.
///
/// Raising the tolerance never keeps more points: every split made at a
/// larger tolerance is also made at a smaller one.
#[must_use = "returns the simplified path"]
pub fn simplify(path: &Path, tolerance: f64) -> Path {
    let points = path.points();
    if tolerance <= 0.0 || points.len() < 3 {
        return path.clone();
    }

    let ring: Vec<Point>;
    let working: &[Point] = if path.is_closed() {
        ring = points.iter().chain(points.first()).copied().collect();
        &ring
    } else {
        points
    };

    let mut kept = vec![false; working.len()];
    kept[0] = true;
    kept[working.len() - 1] = true;

    rdp_recurse(working, 0, working.len() - 1, tolerance, &mut kept);

    let mut simplified: Vec<Point> = working
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect();
    if path.is_closed() {
        simplified.pop();
    }

    path.with_points(simplified)
}

/// Simplify multiple paths, applying RDP to each independently.
#[must_use = "returns the simplified paths"]
pub fn simplify_paths(paths: &[Path], tolerance: f64) -> Vec<Path> {
    paths.iter().map(|p| simplify(p, tolerance)).collect()
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// line segment between them. If that distance exceeds `tolerance`, the
/// point is kept and both sub-segments are processed recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from point `p` to the line defined by `a` and `b`.
///
/// Uses the formula: |cross(b-a, p-a)| / |b-a|.
/// When `a` and `b` coincide, returns the distance from `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        // a and b are the same point.
        return p.distance(a);
    }

    // |cross product| / |line length|
    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}
