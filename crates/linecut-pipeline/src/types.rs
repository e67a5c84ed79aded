//! Shared types for the linecut conversion pipeline.

use serde::{Deserialize, Serialize};

use crate::contour::ContourTracerKind;
use crate::smooth::SmoothingMethod;

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// A 2D point in source coordinates.
///
/// Pixels from the top-left corner for raster input, user units for
/// SVG input, machine units once scaled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// One continuous stroke or contour.
///
/// A closed path stores its first point once and sets the `closed`
/// flag; the segment from the last point back to the first is implied.
/// Every stage of the pipeline (and the toolpath generator) honours the
/// flag instead of looking for a repeated endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    points: Vec<Point>,
    closed: bool,
}

impl Path {
    /// Create an open path from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self {
            points,
            closed: false,
        }
    }

    /// Create a closed path. The first point must not be repeated at
    /// the end.
    #[must_use]
    pub const fn closed(points: Vec<Point>) -> Self {
        Self {
            points,
            closed: true,
        }
    }

    /// Build a path with the same open/closed state as `self` but
    /// different points.
    #[must_use]
    pub const fn with_points(&self, points: Vec<Point>) -> Self {
        Self {
            points,
            closed: self.closed,
        }
    }

    /// Whether the path loops back to its first point.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns `true` if the path has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the number of stored points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// A path with fewer than two points cannot be followed by a tool.
    #[must_use]
    pub const fn is_degenerate(&self) -> bool {
        self.points.len() < 2
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.points.first()
    }

    /// Returns the last stored point, if any.
    ///
    /// For a closed path this is *not* the first point again.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.points.last()
    }

    /// Returns a slice of all stored points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Consumes the path and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    /// The same path traversed in the opposite direction.
    ///
    /// A closed path keeps its starting point.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let mut points = self.points.clone();
        if self.closed && points.len() > 1 {
            points[1..].reverse();
        } else {
            points.reverse();
        }
        self.with_points(points)
    }

    /// Total length of the path, including the closing segment.
    #[must_use]
    pub fn length(&self) -> f64 {
        let open: f64 = self
            .points
            .windows(2)
            .map(|w| w[0].distance(w[1]))
            .sum();
        match (self.closed, self.points.first(), self.points.last()) {
            (true, Some(&first), Some(&last)) => open + last.distance(first),
            _ => open,
        }
    }
}

/// Paths extracted from one input, in extraction order.
pub type PathSet = Vec<Path>;

/// Source canvas size.
///
/// Pixels for raster input, user units for SVG input. The scaler maps
/// this rectangle onto the material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Canvas width.
    pub width: f64,
    /// Canvas height.
    pub height: f64,
}

impl Dimensions {
    /// Dimensions of a raster image.
    #[must_use]
    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self {
            width: f64::from(width),
            height: f64::from(height),
        }
    }
}

/// A foreground/background pixel grid.
///
/// `true` marks foreground (ink). Stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryImage {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
}

impl BinaryImage {
    /// An all-background image.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; width as usize * height as usize],
        }
    }

    /// Build an image by evaluating `f(x, y)` for every pixel.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Image width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Dimensions as used by the scaler.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::from_pixels(self.width, self.height)
    }

    /// Whether `(x, y)` is foreground. Out-of-bounds coordinates are
    /// background.
    #[must_use]
    pub fn get(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return false;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = y as usize * self.width as usize + x as usize;
        self.pixels[index]
    }

    /// Set the pixel at `(x, y)`. Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            self.pixels[y as usize * self.width as usize + x as usize] = value;
        }
    }

    /// Number of foreground pixels.
    #[must_use]
    pub fn foreground_count(&self) -> usize {
        self.pixels.iter().filter(|&&p| p).count()
    }

    /// Number of 8-connected foreground components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        let width = self.width as usize;
        let mut seen = vec![false; self.pixels.len()];
        let mut stack = Vec::new();
        let mut count = 0;

        for start in 0..self.pixels.len() {
            if !self.pixels[start] || seen[start] {
                continue;
            }
            count += 1;
            seen[start] = true;
            stack.push(start);
            while let Some(index) = stack.pop() {
                let (x, y) = ((index % width) as i64, (index / width) as i64);
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        let (nx, ny) = (x + dx, y + dy);
                        if !self.get(nx, ny) {
                            continue;
                        }
                        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                        let neighbor = ny as usize * width + nx as usize;
                        if !seen[neighbor] {
                            seen[neighbor] = true;
                            stack.push(neighbor);
                        }
                    }
                }
            }
        }
        count
    }

    /// Row-major pixel slice.
    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.pixels
    }

    /// Convert to an 8-bit image with foreground as 255 and background
    /// as 0, the layout `imageproc` expects.
    #[must_use]
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([if self.get(i64::from(x), i64::from(y)) {
                255
            } else {
                0
            }])
        })
    }
}

/// Validated configuration for the conversion pipeline.
///
/// Construct through [`ConversionConfig::builder`] or deserialization;
/// both reject out-of-range values so an invalid configuration never
/// reaches a pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConversionConfigBuilder", into = "ConversionConfigBuilder")]
pub struct ConversionConfig {
    threshold: u8,
    simplify_epsilon: f64,
    use_skeleton: bool,
    smooth_level: u32,
    use_spline: bool,
    min_path_points: usize,
    optimize_order: bool,
}

impl ConversionConfig {
    /// Default binarization threshold.
    pub const DEFAULT_THRESHOLD: u8 = 127;
    /// Default simplification tolerance in source units.
    pub const DEFAULT_SIMPLIFY_EPSILON: f64 = 1.0;
    /// Paths with fewer points are dropped after refinement.
    pub const DEFAULT_MIN_PATH_POINTS: usize = 2;

    /// Start building a configuration from the defaults.
    #[must_use]
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder::default()
    }

    /// Luminance cut: pixels darker than this are foreground.
    #[must_use]
    pub const fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Ramer-Douglas-Peucker tolerance in source units.
    #[must_use]
    pub const fn simplify_epsilon(&self) -> f64 {
        self.simplify_epsilon
    }

    /// Whether to thin strokes to their centerline before tracing.
    #[must_use]
    pub const fn use_skeleton(&self) -> bool {
        self.use_skeleton
    }

    /// Smoothing strength; zero disables smoothing.
    #[must_use]
    pub const fn smooth_level(&self) -> u32 {
        self.smooth_level
    }

    /// Whether smoothing fits a spline instead of a moving average.
    #[must_use]
    pub const fn use_spline(&self) -> bool {
        self.use_spline
    }

    /// Minimum number of points a refined path needs to be kept.
    #[must_use]
    pub const fn min_path_points(&self) -> usize {
        self.min_path_points
    }

    /// Whether to reorder paths to shorten rapid travel.
    #[must_use]
    pub const fn optimize_order(&self) -> bool {
        self.optimize_order
    }

    /// The contour tracer implied by `use_skeleton`.
    #[must_use]
    pub const fn contour_tracer(&self) -> ContourTracerKind {
        if self.use_skeleton {
            ContourTracerKind::Centerline
        } else {
            ContourTracerKind::BorderFollowing
        }
    }

    /// The smoothing method implied by `use_spline`.
    #[must_use]
    pub const fn smoothing_method(&self) -> SmoothingMethod {
        if self.use_spline {
            SmoothingMethod::Spline
        } else {
            SmoothingMethod::MovingAverage
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            simplify_epsilon: Self::DEFAULT_SIMPLIFY_EPSILON,
            use_skeleton: false,
            smooth_level: 0,
            use_spline: false,
            min_path_points: Self::DEFAULT_MIN_PATH_POINTS,
            optimize_order: false,
        }
    }
}

/// Unvalidated form of [`ConversionConfig`].
///
/// Also the serde representation: every field is optional in JSON and
/// falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfigBuilder {
    /// Binarization threshold, 0 to 255.
    pub threshold: i64,
    /// Simplification tolerance, non-negative.
    pub simplify_epsilon: f64,
    /// Enable centerline extraction.
    pub use_skeleton: bool,
    /// Smoothing strength.
    pub smooth_level: u32,
    /// Spline instead of moving-average smoothing.
    pub use_spline: bool,
    /// Minimum kept path length in points, at least 2.
    pub min_path_points: usize,
    /// Nearest-neighbour path reordering.
    pub optimize_order: bool,
}

impl Default for ConversionConfigBuilder {
    fn default() -> Self {
        ConversionConfig::default().into()
    }
}

impl ConversionConfigBuilder {
    /// Set the binarization threshold.
    #[must_use]
    pub const fn threshold(mut self, threshold: i64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the simplification tolerance.
    #[must_use]
    pub const fn simplify_epsilon(mut self, epsilon: f64) -> Self {
        self.simplify_epsilon = epsilon;
        self
    }

    /// Enable or disable centerline extraction.
    #[must_use]
    pub const fn use_skeleton(mut self, enabled: bool) -> Self {
        self.use_skeleton = enabled;
        self
    }

    /// Set the smoothing strength.
    #[must_use]
    pub const fn smooth_level(mut self, level: u32) -> Self {
        self.smooth_level = level;
        self
    }

    /// Choose spline smoothing.
    #[must_use]
    pub const fn use_spline(mut self, enabled: bool) -> Self {
        self.use_spline = enabled;
        self
    }

    /// Set the minimum kept path length.
    #[must_use]
    pub const fn min_path_points(mut self, points: usize) -> Self {
        self.min_path_points = points;
        self
    }

    /// Enable or disable travel optimization.
    #[must_use]
    pub const fn optimize_order(mut self, enabled: bool) -> Self {
        self.optimize_order = enabled;
        self
    }

    /// Validate and freeze the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the threshold is
    /// outside 0..=255, the simplification tolerance is negative or not
    /// finite, or `min_path_points` is below 2.
    pub fn build(self) -> Result<ConversionConfig, PipelineError> {
        let threshold = u8::try_from(self.threshold).map_err(|_| {
            PipelineError::InvalidConfig(format!(
                "threshold must be between 0 and 255, got {}",
                self.threshold
            ))
        })?;
        if !self.simplify_epsilon.is_finite() || self.simplify_epsilon < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "simplify_epsilon must be a non-negative number, got {}",
                self.simplify_epsilon
            )));
        }
        if self.min_path_points < 2 {
            return Err(PipelineError::InvalidConfig(format!(
                "min_path_points must be at least 2, got {}",
                self.min_path_points
            )));
        }
        Ok(ConversionConfig {
            threshold,
            simplify_epsilon: self.simplify_epsilon,
            use_skeleton: self.use_skeleton,
            smooth_level: self.smooth_level,
            use_spline: self.use_spline,
            min_path_points: self.min_path_points,
            optimize_order: self.optimize_order,
        })
    }
}

impl From<ConversionConfig> for ConversionConfigBuilder {
    fn from(config: ConversionConfig) -> Self {
        Self {
            threshold: i64::from(config.threshold),
            simplify_epsilon: config.simplify_epsilon,
            use_skeleton: config.use_skeleton,
            smooth_level: config.smooth_level,
            use_spline: config.use_spline,
            min_path_points: config.min_path_points,
            optimize_order: config.optimize_order,
        }
    }
}

impl TryFrom<ConversionConfigBuilder> for ConversionConfig {
    type Error = PipelineError;

    fn try_from(builder: ConversionConfigBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

/// Result of converting one input into paths.
///
/// Contains the refined paths and the source canvas size the scaler
/// needs to map them onto the material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Refined paths in source coordinates.
    pub paths: PathSet,

    /// Size of the source canvas.
    pub dimensions: Dimensions,
}

/// Errors that can occur during conversion.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input data was empty.
    #[error("input data is empty")]
    EmptyInput,

    /// The SVG document could not be parsed.
    #[error("failed to parse SVG: {0}")]
    SvgParse(String),

    /// The SVG document declares neither a `viewBox` nor a numeric
    /// `width`/`height`.
    #[error("SVG document has no viewBox or width/height")]
    MissingCanvasSize,

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}
