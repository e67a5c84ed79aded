//! Path refinement: simplify, smooth, filter, and optionally reorder.
//!
//! Shared by the raster and vector pipelines, after extraction or
//! loading and before scaling.

use crate::optimize::optimize_path_order;
use crate::simplify::simplify_paths;
use crate::smooth::smooth_paths;
use crate::types::{ConversionConfig, Path, PathSet};

/// Points closer than this are merged after smoothing.
const MERGE_DISTANCE: f64 = 1e-9;

/// Simplify then smooth every path, drop paths below
/// `min_path_points`, and reorder when `optimize_order` is set.
///
/// Consecutive points that coincide after smoothing are merged (for a
/// closed path, also the last point with the first) before the
/// `min_path_points` filter runs.
///
/// Without reordering, the output keeps the input order.
#[must_use = "returns the refined paths"]
pub fn refine_paths(paths: &[Path], config: &ConversionConfig) -> PathSet {
    let simplified = simplify_paths(paths, config.simplify_epsilon());
    let smoothed = smooth_paths(
        &simplified,
        config.smooth_level(),
        config.smoothing_method(),
    );

    let min_points = config.min_path_points();
    let refined: PathSet = smoothed
        .iter()
        .map(merge_repeated_points)
        .filter(|p| p.len() >= min_points)
        .collect();

    tracing::debug!(
        input = paths.len(),
        kept = refined.len(),
        points = refined.iter().map(Path::len).sum::<usize>(),
        length = refined.iter().map(Path::length).sum::<f64>(),
        "refined paths"
    );

    if config.optimize_order() {
        optimize_path_order(&refined)
    } else {
        refined
    }
}

fn merge_repeated_points(path: &Path) -> Path {
    let limit = MERGE_DISTANCE * MERGE_DISTANCE;
    let mut points = path.points().to_vec();
    points.dedup_by(|b, a| a.distance_squared(*b) <= limit);
    if path.is_closed()
        && points.len() > 1
        && points[0].distance_squared(points[points.len() - 1]) <= limit
    {
        points.pop();
    }
    path.with_points(points)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn staircase(n: u32) -> Path {
        Path::new(
            (0..n)
                .map(|i| Point::new(f64::from(i), f64::from(i / 2)))
                .collect(),
        )
    }

    #[test]
    fn default_config_simplifies_only() {
        let config = ConversionConfig::default();
        let out = refine_paths(&[staircase(20)], &config);
        assert_eq!(out.len(), 1);
        assert!(out[0].len() < 20);
        assert_eq!(out[0].first(), Some(&Point::new(0.0, 0.0)));
    }

    #[test]
    fn zero_epsilon_and_level_is_identity() {
        let config = ConversionConfig::builder()
            .simplify_epsilon(0.0)
            .build()
            .unwrap();
        let input = vec![staircase(10), staircase(4)];
        assert_eq!(refine_paths(&input, &config), input);
    }

    #[test]
    fn short_paths_are_dropped() {
        let config = ConversionConfig::builder()
            .simplify_epsilon(0.0)
            .min_path_points(5)
            .build()
            .unwrap();
        let out = refine_paths(&[staircase(3), staircase(8), staircase(4)], &config);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 8);
    }

    #[test]
    fn spline_smoothing_changes_point_count() {
        let config = ConversionConfig::builder()
            .simplify_epsilon(0.0)
            .smooth_level(3)
            .use_spline(true)
            .build()
            .unwrap();
        let out = refine_paths(&[staircase(10)], &config);
        assert_eq!(out[0].len(), 20);
    }

    #[test]
    fn repeated_points_are_merged_and_collapsed_paths_dropped() {
        let config = ConversionConfig::builder()
            .simplify_epsilon(0.0)
            .build()
            .unwrap();
        let input = vec![
            Path::new(vec![
                Point::new(0.0, 0.0),
                Point::new(0.0, 0.0),
                Point::new(5.0, 0.0),
            ]),
            Path::closed(vec![
                Point::new(0.0, 0.0),
                Point::new(4.0, 0.0),
                Point::new(4.0, 4.0),
                Point::new(0.0, 0.0),
            ]),
            Path::new(vec![Point::new(1.0, 1.0), Point::new(1.0, 1.0)]),
        ];
        let out = refine_paths(&input, &config);
        assert_eq!(
            out,
            vec![
                Path::new(vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0)]),
                Path::closed(vec![
                    Point::new(0.0, 0.0),
                    Point::new(4.0, 0.0),
                    Point::new(4.0, 4.0),
                ]),
            ]
        );
    }

    #[test]
    fn smoothed_short_loop_keeps_distinct_points() {
        let pentagon = Path::closed(
            (0..5)
                .map(|i| {
                    let a = f64::from(i) * std::f64::consts::TAU / 5.0;
                    Point::new(20.0f64.mul_add(a.cos(), 50.0), 20.0f64.mul_add(a.sin(), 50.0))
                })
                .collect(),
        );
        let config = ConversionConfig::builder()
            .simplify_epsilon(0.0)
            .smooth_level(8)
            .build()
            .unwrap();
        let out = refine_paths(&[pentagon], &config);
        assert_eq!(out.len(), 1);
        let points = out[0].points();
        assert_eq!(points.len(), 5);
        for (i, p) in points.iter().enumerate() {
            let next = points[(i + 1) % points.len()];
            assert!(p.distance(next) > 1.0, "{points:?}");
        }
    }

    #[test]
    fn order_kept_unless_optimizing() {
        let far = Path::new(vec![Point::new(100.0, 0.0), Point::new(101.0, 0.0)]);
        let origin = Path::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]);
        let near = Path::new(vec![Point::new(2.0, 0.0), Point::new(3.0, 0.0)]);
        let input = vec![origin.clone(), far.clone(), near.clone()];

        let plain = ConversionConfig::default();
        assert_eq!(refine_paths(&input, &plain), input);

        let optimizing = ConversionConfig::builder()
            .optimize_order(true)
            .build()
            .unwrap();
        assert_eq!(refine_paths(&input, &optimizing), vec![origin, near, far]);
    }
}
