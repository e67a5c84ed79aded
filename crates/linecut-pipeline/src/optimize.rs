//! Path ordering: reorder and orient paths to shorten rapid travel.
//!
//! Uses a nearest-neighbor greedy heuristic on path endpoints. An open
//! path may be entered from either end and is reversed when its far end
//! is the nearer one. A closed path can be entered at any vertex, so it
//! is rotated to start at the vertex nearest the tool.
//!
//! Optional refinement step, run after smoothing.

use crate::types::{Path, Point};

/// Reorder and orient paths to minimize total rapid travel.
///
/// Starting from the first path, greedily visits the nearest unvisited
/// path. Every input path with at least one point appears exactly once
/// in the output; empty paths are dropped.
#[must_use = "returns the optimized path ordering"]
pub fn optimize_path_order(paths: &[Path]) -> Vec<Path> {
    let candidates: Vec<&Path> = paths.iter().filter(|p| !p.is_empty()).collect();

    if candidates.is_empty() {
        return Vec::new();
    }

    let n = candidates.len();
    let mut visited = vec![false; n];
    let mut result: Vec<Path> = Vec::with_capacity(n);

    // The first path keeps its place and orientation.
    visited[0] = true;
    result.push(candidates[0].clone());

    for _ in 1..n {
        let current_end = result
            .last()
            .and_then(exit_point)
            .unwrap_or(Point::new(0.0, 0.0));

        let mut best: Option<(usize, Entry)> = None;
        let mut best_dist = f64::INFINITY;

        for (j, candidate) in candidates.iter().enumerate() {
            if visited[j] {
                continue;
            }
            let Some((dist, entry)) = nearest_entry(candidate, current_end) else {
                continue;
            };
            if dist < best_dist {
                best_dist = dist;
                best = Some((j, entry));
            }
        }

        let Some((best_idx, entry)) = best else {
            continue;
        };
        visited[best_idx] = true;

        let chosen = candidates[best_idx];
        result.push(match entry {
            Entry::Forward => chosen.clone(),
            Entry::Reversed => chosen.reversed(),
            Entry::Rotated(start) => rotate(chosen, start),
        });
    }

    let before = total_travel(paths);
    let after = total_travel(&result);
    tracing::debug!(paths = result.len(), before, after, "optimized path order");
    result
}

/// How a path is entered by the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Forward,
    Reversed,
    /// Closed path entered at the given vertex index.
    Rotated(usize),
}

/// Where the tool stands after cutting `path`.
fn exit_point(path: &Path) -> Option<Point> {
    if path.is_closed() {
        path.first().copied()
    } else {
        path.last().copied()
    }
}

/// Squared distance from `from` to the cheapest way into `path`.
fn nearest_entry(path: &Path, from: Point) -> Option<(f64, Entry)> {
    if path.is_closed() {
        path.points()
            .iter()
            .enumerate()
            .map(|(i, p)| (from.distance_squared(*p), i))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(d, i)| {
                let entry = if i == 0 { Entry::Forward } else { Entry::Rotated(i) };
                (d, entry)
            })
    } else {
        let forward = from.distance_squared(*path.first()?);
        let reverse = from.distance_squared(*path.last()?);
        Some(if forward <= reverse {
            (forward, Entry::Forward)
        } else {
            (reverse, Entry::Reversed)
        })
    }
}

fn rotate(path: &Path, start: usize) -> Path {
    let mut points = path.points().to_vec();
    points.rotate_left(start);
    path.with_points(points)
}

/// Total rapid travel between consecutive paths.
#[must_use]
pub fn total_travel(paths: &[Path]) -> f64 {
    paths
        .windows(2)
        .filter_map(|pair| Some(exit_point(&pair[0])?.distance(*pair[1].first()?)))
        .sum()
}
