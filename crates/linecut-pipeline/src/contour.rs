//! Contour tracing: extract paths from a binary image.
//!
//! This module defines the [`ContourTracer`] trait for pluggable tracing
//! algorithms and the [`ContourTracerKind`] enum for selecting one at
//! runtime.
//!
//! # Strategy pattern
//!
//! Different tracers produce different geometry from the same image.
//! Border following outlines every foreground region, so a thick stroke
//! becomes two offset paths. Centerline tracing expects a skeletonized
//! image and follows the single-pixel strokes themselves.

use serde::{Deserialize, Serialize};

use crate::types::{BinaryImage, Path, PathSet, Point};

/// Selects which contour tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContourTracerKind {
    /// Suzuki-Abe border following via `imageproc::contours::find_contours`.
    ///
    /// Every border becomes a closed path. On thick strokes this yields
    /// the outline, one path per border.
    #[default]
    BorderFollowing,

    /// Walk the pixel graph of a 1-pixel-wide skeleton.
    ///
    /// Paths are split at every junction; see [`trace_centerlines`] for
    /// the exact, deterministic rule.
    Centerline,
}

/// Trait for contour tracing strategies.
///
/// Input: a binary image (true = foreground).
/// Output: paths with at least two points each, in a stable order.
pub trait ContourTracer {
    /// Trace paths in the given binary image.
    fn trace(&self, image: &BinaryImage) -> PathSet;
}

impl ContourTracer for ContourTracerKind {
    fn trace(&self, image: &BinaryImage) -> PathSet {
        let paths = match *self {
            Self::BorderFollowing => trace_border_following(image),
            Self::Centerline => trace_centerlines(image),
        };
        tracing::debug!(tracer = ?self, paths = paths.len(), "traced contours");
        paths
    }
}

/// Extract paths from a binary image with the given strategy.
#[must_use = "returns the extracted paths"]
pub fn extract_paths(image: &BinaryImage, tracer: ContourTracerKind) -> PathSet {
    tracer.trace(image)
}

/// Suzuki-Abe border following via `imageproc::contours::find_contours`.
///
/// Converts `imageproc` contour points (integer grid coordinates) into
/// floating-point [`Point`]s and marks each border closed.
fn trace_border_following(image: &BinaryImage) -> PathSet {
    let contours: Vec<imageproc::contours::Contour<u32>> =
        imageproc::contours::find_contours(&image.to_gray_image());

    contours
        .into_iter()
        .filter_map(|c| {
            let mut points: Vec<Point> = Vec::with_capacity(c.points.len());
            for p in c.points {
                let point = Point::new(f64::from(p.x), f64::from(p.y));
                if points.last() != Some(&point) {
                    points.push(point);
                }
            }
            if points.len() > 1 && points.first() == points.last() {
                points.pop();
            }
            (points.len() >= 2).then(|| Path::closed(points))
        })
        .collect()
}

/// Neighbour offsets in the fixed walking order E, SE, S, SW, W, NW, N, NE.
const NEIGHBOURS: [(i64, i64); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Index of the opposite direction in [`NEIGHBOURS`].
const fn opposite(direction: usize) -> usize {
    (direction + 4) % 8
}

/// Pixel adjacency graph of a skeleton.
///
/// Pixels are 8-connected, except that a diagonal link is dropped when
/// either orthogonal pixel between the two ends is foreground. That pixel
/// already connects them, so keeping the diagonal would turn every
/// staircase step and corner into a false junction.
struct SkeletonGraph<'a> {
    image: &'a BinaryImage,
    width: usize,
    /// One bit per direction, set once the link has been walked.
    visited: Vec<u8>,
}

impl<'a> SkeletonGraph<'a> {
    fn new(image: &'a BinaryImage) -> Self {
        Self {
            image,
            width: image.width() as usize,
            visited: vec![0; image.as_slice().len()],
        }
    }

    fn index(&self, x: i64, y: i64) -> usize {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = y as usize * self.width + x as usize;
        index
    }

    fn linked(&self, x: i64, y: i64, direction: usize) -> bool {
        let (dx, dy) = NEIGHBOURS[direction];
        if !self.image.get(x + dx, y + dy) {
            return false;
        }
        if dx != 0 && dy != 0 {
            return !self.image.get(x + dx, y) && !self.image.get(x, y + dy);
        }
        true
    }

    fn degree(&self, x: i64, y: i64) -> usize {
        (0..8).filter(|&d| self.linked(x, y, d)).count()
    }

    fn is_visited(&self, x: i64, y: i64, direction: usize) -> bool {
        self.visited[self.index(x, y)] & (1 << direction) != 0
    }

    /// Mark the link from `(x, y)` in `direction` as walked, from both
    /// ends.
    fn mark(&mut self, x: i64, y: i64, direction: usize) {
        let (dx, dy) = NEIGHBOURS[direction];
        let here = self.index(x, y);
        let there = self.index(x + dx, y + dy);
        self.visited[here] |= 1 << direction;
        self.visited[there] |= 1 << opposite(direction);
    }

    fn next_unvisited(&self, x: i64, y: i64) -> Option<usize> {
        (0..8).find(|&d| self.linked(x, y, d) && !self.is_visited(x, y, d))
    }

    /// Follow links from `(x, y)` starting in `direction` through
    /// degree-2 pixels until a node (degree != 2) or the start pixel is
    /// reached again. The flag reports the latter.
    fn walk(&mut self, x: i64, y: i64, direction: usize) -> (Vec<Point>, bool) {
        #[allow(clippy::cast_precision_loss)]
        let to_point = |x: i64, y: i64| Point::new(x as f64, y as f64);

        let (start_x, start_y) = (x, y);
        let mut points = vec![to_point(x, y)];
        let (mut cx, mut cy, mut dir) = (x, y, direction);

        loop {
            self.mark(cx, cy, dir);
            let (dx, dy) = NEIGHBOURS[dir];
            cx += dx;
            cy += dy;
            if (cx, cy) == (start_x, start_y) {
                return (points, true);
            }
            points.push(to_point(cx, cy));
            if self.degree(cx, cy) != 2 {
                break;
            }
            match self.next_unvisited(cx, cy) {
                Some(next) => dir = next,
                None => break,
            }
        }
        (points, false)
    }
}

/// Trace the strokes of a 1-pixel-wide skeleton.
///
/// Splitting rule, applied deterministically:
///
/// 1. Pixels whose link count is not 2 are *nodes*: endpoints
///    (1 link), junctions (3 or more) and isolated pixels (0).
/// 2. Nodes are visited in raster order (top to bottom, left to right).
///    From each node every unwalked link is followed, in the order
///    E, SE, S, SW, W, NW, N, NE, until the next node. Each walk is one
///    open path, or a closed one if it comes back to the node it left.
///    A junction therefore ends every path that touches it, and a "Y"
///    yields three paths.
/// 3. Links left over belong to loops without nodes. Each loop becomes
///    one closed path, starting at its first pixel in raster order and
///    leaving it through its first link in the order above.
///
/// Isolated pixels would give single-point paths and are dropped.
#[must_use = "returns the traced centerlines"]
pub fn trace_centerlines(image: &BinaryImage) -> PathSet {
    let mut graph = SkeletonGraph::new(image);
    let mut paths = Vec::new();
    let (width, height) = (i64::from(image.width()), i64::from(image.height()));

    for y in 0..height {
        for x in 0..width {
            if !image.get(x, y) || graph.degree(x, y) == 2 {
                continue;
            }
            while let Some(direction) = graph.next_unvisited(x, y) {
                match graph.walk(x, y, direction) {
                    (points, true) if points.len() >= 3 => paths.push(Path::closed(points)),
                    (points, _) if points.len() >= 2 => paths.push(Path::new(points)),
                    _ => {}
                }
            }
        }
    }

    for y in 0..height {
        for x in 0..width {
            if !image.get(x, y) {
                continue;
            }
            if let Some(direction) = graph.next_unvisited(x, y) {
                let (points, _) = graph.walk(x, y, direction);
                if points.len() >= 3 {
                    paths.push(Path::closed(points));
                }
            }
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_from_rows(rows: &[&str]) -> BinaryImage {
        let height = u32::try_from(rows.len()).unwrap_or(0);
        let width = u32::try_from(rows.first().map_or(0, |r| r.len())).unwrap_or(0);
        BinaryImage::from_fn(width, height, |x, y| {
            rows[y as usize].as_bytes()[x as usize] == b'#'
        })
    }

    fn pt(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn default_is_border_following() {
        assert_eq!(
            ContourTracerKind::default(),
            ContourTracerKind::BorderFollowing
        );
    }

    #[test]
    fn empty_image_produces_no_paths() {
        let img = BinaryImage::new(10, 10);
        assert!(extract_paths(&img, ContourTracerKind::BorderFollowing).is_empty());
        assert!(extract_paths(&img, ContourTracerKind::Centerline).is_empty());
    }

    #[test]
    fn border_following_single_pixel_is_dropped() {
        let mut img = BinaryImage::new(10, 10);
        img.set(5, 5, true);
        let paths = extract_paths(&img, ContourTracerKind::BorderFollowing);
        assert!(paths.iter().all(|p| p.len() >= 2));
    }

    #[test]
    fn border_following_rectangle_is_closed() {
        let img = BinaryImage::from_fn(20, 20, |x, y| (5..15).contains(&x) && (5..15).contains(&y));
        let paths = extract_paths(&img, ContourTracerKind::BorderFollowing);
        assert_eq!(paths.len(), 1);
        assert!(paths[0].is_closed());
        assert!(paths[0].len() >= 4);
        assert_ne!(paths[0].first(), paths[0].last());
    }

    #[test]
    fn border_following_ring_has_two_borders() {
        // A thick square ring: outer border plus hole border.
        let img = BinaryImage::from_fn(30, 30, |x, y| {
            let outer = (5..25).contains(&x) && (5..25).contains(&y);
            let inner = (10..20).contains(&x) && (10..20).contains(&y);
            outer && !inner
        });
        let paths = extract_paths(&img, ContourTracerKind::BorderFollowing);
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn centerline_horizontal_line() {
        let img = image_from_rows(&["......", ".####.", "......"]);
        let paths = trace_centerlines(&img);
        assert_eq!(paths.len(), 1);
        assert!(!paths[0].is_closed());
        assert_eq!(
            paths[0].points(),
            &[pt(1.0, 1.0), pt(2.0, 1.0), pt(3.0, 1.0), pt(4.0, 1.0)]
        );
    }

    #[test]
    fn centerline_starts_at_first_endpoint_in_raster_order() {
        // Diagonal from bottom-left to top-right: the top-right end is
        // first in raster order, so the path starts there.
        let img = image_from_rows(&["...#", "..#.", ".#..", "#..."]);
        let paths = trace_centerlines(&img);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].first(), Some(&pt(3.0, 0.0)));
        assert_eq!(paths[0].last(), Some(&pt(0.0, 3.0)));
    }

    #[test]
    fn centerline_staircase_is_one_chain() {
        let img = image_from_rows(&["##...", ".##..", "..##.", "...##"]);
        let paths = trace_centerlines(&img);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].len(), 8);
    }

    #[test]
    fn centerline_square_outline_is_one_closed_path() {
        let img = image_from_rows(&[
            "........", ".######.", ".#....#.", ".#....#.", ".#....#.", ".######.", "........",
        ]);
        let paths = trace_centerlines(&img);
        assert_eq!(paths.len(), 1);
        assert!(paths[0].is_closed());
        assert_eq!(paths[0].len(), img.foreground_count());
        // Starts at the first pixel in raster order, heading east.
        assert_eq!(paths[0].points()[0], pt(1.0, 1.0));
        assert_eq!(paths[0].points()[1], pt(2.0, 1.0));
    }

    #[test]
    fn centerline_y_junction_splits_into_three() {
        // Two arms meet at (3, 3); a stem runs down from there.
        let img = image_from_rows(&[
            "#.....#", ".#...#.", "..#.#..", "...#...", "...#...", "...#...",
        ]);
        let paths = trace_centerlines(&img);
        assert_eq!(paths.len(), 3);

        let junction = pt(3.0, 3.0);
        for path in &paths {
            assert!(!path.is_closed());
            assert!(
                path.first() == Some(&junction) || path.last() == Some(&junction),
                "path {path:?} does not touch the junction",
            );
        }
        // First path starts at the top-left endpoint, the first node in
        // raster order.
        assert_eq!(paths[0].first(), Some(&pt(0.0, 0.0)));
        assert_eq!(paths[0].last(), Some(&junction));
        // Second path starts at the top-right endpoint.
        assert_eq!(paths[1].first(), Some(&pt(6.0, 0.0)));
        // The stem is walked last, from the junction down.
        assert_eq!(paths[2].first(), Some(&junction));
        assert_eq!(paths[2].last(), Some(&pt(3.0, 5.0)));
    }

    #[test]
    fn centerline_covers_every_link_once() {
        let img = image_from_rows(&[
            "#.....#", ".#...#.", "..#.#..", "...#...", "...#...", "...#...",
        ]);
        let paths = trace_centerlines(&img);
        let segments: usize = paths.iter().map(|p| p.len() - 1).sum();
        // 9 pixels forming a tree: 8 links.
        assert_eq!(segments, 8);
    }

    #[test]
    fn centerline_isolated_pixel_is_dropped() {
        let img = image_from_rows(&["...", ".#.", "..."]);
        assert!(trace_centerlines(&img).is_empty());
    }

    #[test]
    fn centerline_is_deterministic() {
        let img = image_from_rows(&[
            "#.....#", ".#...#.", "..#.#..", "...#...", "..#.#..", ".#...#.",
        ]);
        assert_eq!(trace_centerlines(&img), trace_centerlines(&img));
    }

    #[test]
    fn centerline_consecutive_points_are_distinct() {
        let img = image_from_rows(&["#.#.#", "#####", "..#.."]);
        for path in trace_centerlines(&img) {
            for w in path.points().windows(2) {
                assert_ne!(w[0], w[1]);
            }
        }
    }
}
