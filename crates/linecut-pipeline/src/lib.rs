//! linecut-pipeline: Pure drawing-to-path conversion pipeline (sans-IO).
//!
//! Converts raster line drawings into polylines through:
//! grayscale -> binarize -> optional skeletonize -> path extraction ->
//! simplification -> smoothing -> optional reordering.
//!
//! SVG drawings skip the raster stages: their elements are loaded
//! directly as polylines and then refined the same way.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and strings and returns structured data. Reading files
//! and writing G-code lives in the `linecut` binary.

pub mod binarize;
pub mod contour;
pub mod grayscale;
pub mod optimize;
pub mod refine;
pub mod scale;
pub mod simplify;
pub mod skeleton;
pub mod smooth;
pub mod types;
pub mod vector;

pub use contour::{ContourTracer, ContourTracerKind};
pub use scale::{ScaleTransform, scale_paths};
pub use smooth::SmoothingMethod;
pub use types::{
    BinaryImage, ConversionConfig, ConversionConfigBuilder, ConversionResult, Dimensions, Path,
    PathSet, PipelineError, Point,
};
pub use vector::{VectorDocument, load_vector_paths};

/// Run the raster pipeline.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP) and a configuration,
/// then produces a [`ConversionResult`] containing the refined paths in
/// pixel coordinates and the image dimensions the scaler needs.
///
/// # Pipeline steps
///
/// 1. Decode image and convert to grayscale
/// 2. Binarize at `threshold`
/// 3. Optional skeletonization (`use_skeleton`)
/// 4. Path extraction: centerlines when skeletonized, borders otherwise
/// 5. Simplification (Ramer-Douglas-Peucker)
/// 6. Smoothing (moving average or spline)
/// 7. Minimum-length filter and optional reordering
///
/// An image without foreground yields an empty path set, not an error.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is unrecognized.
pub fn process_raster(
    image_bytes: &[u8],
    config: &ConversionConfig,
) -> Result<ConversionResult, PipelineError> {
    // 1. Decode and convert to grayscale.
    let gray = grayscale::decode_and_grayscale(image_bytes)?;

    // 2. Binarize.
    let binary = binarize::binarize(&gray, config.threshold());
    let dimensions = binary.dimensions();

    // 3. Optional thinning.
    let binary = if config.use_skeleton() {
        skeleton::skeletonize(&binary)
    } else {
        binary
    };

    // 4. Path extraction.
    let paths = contour::extract_paths(&binary, config.contour_tracer());

    // 5-7. Refinement.
    let paths = refine::refine_paths(&paths, config);
    if paths.is_empty() {
        tracing::warn!("no paths found in image");
    }

    Ok(ConversionResult { paths, dimensions })
}

/// Run the vector pipeline.
///
/// Loads every drawable SVG element as a polyline in user units and
/// refines it like raster output. Nothing is binarized.
///
/// # Errors
///
/// Returns [`PipelineError::SvgParse`] for malformed documents and
/// [`PipelineError::MissingCanvasSize`] when the canvas size is unknown.
pub fn process_vector(
    svg_text: &str,
    config: &ConversionConfig,
) -> Result<ConversionResult, PipelineError> {
    let document = vector::load_vector_paths(svg_text)?;
    let paths = refine::refine_paths(&document.paths, config);
    if paths.is_empty() {
        tracing::warn!("no paths found in SVG document");
    }

    Ok(ConversionResult {
        paths,
        dimensions: document.dimensions,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Encode a grayscale image as PNG bytes.
    fn png(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> Vec<u8> {
        let img = image::GrayImage::from_fn(width, height, |x, y| image::Luma([f(x, y)]));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = process_raster(&[], &ConversionConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }

    #[test]
    fn garbage_input_is_a_decode_error() {
        let err = process_raster(&[1, 2, 3, 4], &ConversionConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::ImageDecode(_)));
    }

    #[test]
    fn blank_image_gives_no_paths() {
        let bytes = png(32, 32, |_, _| 255);
        let result = process_raster(&bytes, &ConversionConfig::default()).unwrap();
        assert!(result.paths.is_empty());
        assert_eq!(result.dimensions, Dimensions::from_pixels(32, 32));
    }

    #[test]
    fn horizontal_stroke_becomes_one_centerline() {
        let bytes = png(40, 20, |x, y| {
            if (5..35).contains(&x) && (9..12).contains(&y) {
                0
            } else {
                255
            }
        });
        let config = ConversionConfig::builder()
            .use_skeleton(true)
            .build()
            .unwrap();
        let result = process_raster(&bytes, &config).unwrap();

        assert_eq!(result.paths.len(), 1);
        let path = &result.paths[0];
        assert!(!path.is_closed());
        let (a, b) = (path.first().unwrap(), path.last().unwrap());
        assert!((a.x - b.x).abs() > 20.0, "spans the stroke: {a:?} -> {b:?}");
        for p in path.points() {
            assert!((9.0..12.0).contains(&p.y), "{p:?}");
        }
    }

    #[test]
    fn border_following_outlines_a_filled_shape() {
        let bytes = png(30, 30, |x, y| {
            if (5..25).contains(&x) && (5..25).contains(&y) {
                0
            } else {
                255
            }
        });
        let result = process_raster(&bytes, &ConversionConfig::default()).unwrap();
        assert_eq!(result.paths.len(), 1);
        assert!(result.paths[0].is_closed());
        // RDP leaves the four corners.
        assert_eq!(result.paths[0].len(), 4);
    }

    #[test]
    fn vector_pipeline_refines_loaded_paths() {
        let svg = r#"<svg width="100" height="50">
            <polyline points="0,0 10,0.1 20,0 30,0.1 40,0"/>
            <circle cx="50" cy="25" r="10"/>
        </svg>"#;
        let result = process_vector(svg, &ConversionConfig::default()).unwrap();
        assert_eq!(result.paths.len(), 2);
        assert_eq!(result.paths[0].len(), 2);
        assert!(result.paths[1].is_closed());
        assert!((result.dimensions.width - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn vector_errors_propagate() {
        let err = process_vector("<svg/>", &ConversionConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingCanvasSize));
    }
}
