//! Coordinate scaling from source units to machine units.
//!
//! Pixel and SVG user-unit coordinates are mapped onto the material
//! size with independent x and y factors. Image rows grow downwards
//! while machine Y grows away from the operator, so the Y axis is
//! normally flipped.

use crate::types::{Path, PathSet, PipelineError, Point};

/// An axis-aligned mapping from source to target coordinates.
///
/// `x' = x * sx`, and `y' = target_height - y * sy` when flipping or
/// `y' = y * sy` otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleTransform {
    sx: f64,
    sy: f64,
    target_height: f64,
    flip_y: bool,
}

impl ScaleTransform {
    /// Build the mapping from a source canvas onto a target area.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if any dimension is zero,
    /// negative, or not finite.
    pub fn new(
        source_width: f64,
        source_height: f64,
        target_width: f64,
        target_height: f64,
        flip_y: bool,
    ) -> Result<Self, PipelineError> {
        for (name, value) in [
            ("source width", source_width),
            ("source height", source_height),
            ("target width", target_width),
            ("target height", target_height),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        Ok(Self {
            sx: target_width / source_width,
            sy: target_height / source_height,
            target_height,
            flip_y,
        })
    }

    /// Horizontal scale factor.
    #[must_use]
    pub const fn sx(&self) -> f64 {
        self.sx
    }

    /// Vertical scale factor.
    #[must_use]
    pub const fn sy(&self) -> f64 {
        self.sy
    }

    /// Map one point.
    #[must_use]
    pub fn apply(&self, p: Point) -> Point {
        let y = p.y * self.sy;
        Point::new(
            p.x * self.sx,
            if self.flip_y { self.target_height - y } else { y },
        )
    }

    /// The reverse mapping, target back to source.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let source_height = self.target_height / self.sy;
        Self {
            sx: self.sx.recip(),
            sy: self.sy.recip(),
            target_height: source_height,
            flip_y: self.flip_y,
        }
    }

    /// Map every point of a path; the closed flag is kept.
    #[must_use]
    pub fn apply_path(&self, path: &Path) -> Path {
        path.with_points(path.points().iter().map(|&p| self.apply(p)).collect())
    }
}

/// Scale a path set from a `source_width × source_height` canvas onto a
/// `target_width × target_height` area.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if any dimension is zero,
/// negative, or not finite.
pub fn scale_paths(
    paths: &[Path],
    source_width: f64,
    source_height: f64,
    target_width: f64,
    target_height: f64,
    flip_y: bool,
) -> Result<PathSet, PipelineError> {
    let transform = ScaleTransform::new(
        source_width,
        source_height,
        target_width,
        target_height,
        flip_y,
    )?;
    tracing::debug!(
        sx = transform.sx(),
        sy = transform.sy(),
        flip_y,
        paths = paths.len(),
        "scaling paths"
    );
    Ok(paths.iter().map(|p| transform.apply_path(p)).collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        a.distance(b) < 1e-9
    }

    #[test]
    fn scales_without_flip() {
        let paths = vec![Path::new(vec![Point::new(0.0, 0.0), Point::new(100.0, 50.0)])];
        let out = scale_paths(&paths, 100.0, 50.0, 200.0, 25.0, false).unwrap();
        assert!(close(out[0].points()[0], Point::new(0.0, 0.0)));
        assert!(close(out[0].points()[1], Point::new(200.0, 25.0)));
    }

    #[test]
    fn flip_maps_top_row_to_top_of_material() {
        let paths = vec![Path::new(vec![Point::new(10.0, 0.0), Point::new(10.0, 100.0)])];
        let out = scale_paths(&paths, 100.0, 100.0, 50.0, 50.0, true).unwrap();
        assert!(close(out[0].points()[0], Point::new(5.0, 50.0)));
        assert!(close(out[0].points()[1], Point::new(5.0, 0.0)));
    }

    #[test]
    fn closed_flag_survives() {
        let paths = vec![Path::closed(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
        ])];
        let out = scale_paths(&paths, 1.0, 1.0, 10.0, 10.0, true).unwrap();
        assert!(out[0].is_closed());
        assert_eq!(out[0].len(), 3);
    }

    #[test]
    fn rejects_bad_dimensions() {
        let paths: Vec<Path> = Vec::new();
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                scale_paths(&paths, bad, 10.0, 10.0, 10.0, false),
                Err(PipelineError::InvalidConfig(_))
            ));
            assert!(matches!(
                scale_paths(&paths, 10.0, 10.0, 10.0, bad, true),
                Err(PipelineError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn inverse_restores_coordinates() {
        for flip in [false, true] {
            let t = ScaleTransform::new(640.0, 480.0, 210.0, 297.0, flip).unwrap();
            let inverse = t.inverse();
            for p in [
                Point::new(0.0, 0.0),
                Point::new(640.0, 480.0),
                Point::new(123.4, 56.7),
            ] {
                assert!(close(inverse.apply(t.apply(p)), p), "flip {flip}: {p:?}");
            }
        }
    }

    #[test]
    fn empty_set_scales_to_empty() {
        assert!(scale_paths(&[], 1.0, 1.0, 1.0, 1.0, true).unwrap().is_empty());
    }
}
