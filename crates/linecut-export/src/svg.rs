//! SVG preview serializer.
//!
//! Converts paths into an SVG string with `<path>` elements using the
//! [`svg`] crate for document construction, XML escaping, and path data
//! formatting.
//!
//! Each path becomes a separate `<path>` element using `M` (move to) and
//! `L` (line to) commands, with `z` for closed paths. The `viewBox`
//! matches the source canvas, so the preview overlays the input.
//!
//! Optional [`SvgMetadata`] embeds `<title>` and `<desc>` elements to
//! help file managers identify exported files.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::Text;
use svg::node::Value;
use svg::node::element::path::Data;
use svg::node::element::{Description, Path as PathElement, Title};

use linecut_pipeline::{Dimensions, Path};

/// Metadata to embed in the SVG document.
///
/// Both fields are optional. When present, a `<title>` and/or `<desc>`
/// element is emitted immediately after the opening `<svg>` tag.
///
/// Text values are XML-escaped automatically by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the input filename.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    ///
    /// Typically the conversion settings.
    pub description: Option<&'a str>,
}

/// Build an SVG path `d` attribute string from a path.
///
/// Uses `M` for the first point, `L` for subsequent points, and `z`
/// when the path is closed. Returns an empty string for paths with
/// fewer than 2 points.
///
/// Coordinates are formatted by the [`svg`] crate using `f32` precision.
///
/// # Examples
///
/// ```
/// use linecut_pipeline::{Path, Point};
/// use linecut_export::build_path_data;
///
/// let path = Path::new(vec![
///     Point::new(10.0, 20.0),
///     Point::new(30.0, 40.0),
/// ]);
/// let d = build_path_data(&path);
/// assert_eq!(d, "M10,20 L30,40");
/// ```
#[must_use]
pub fn build_path_data(path: &Path) -> String {
    let points = path.points();
    if points.len() < 2 {
        return String::new();
    }

    let first = &points[0];
    let mut data = Data::new().move_to((first.x, first.y));
    for p in &points[1..] {
        data = data.line_to((p.x, p.y));
    }
    if path.is_closed() {
        data = data.close();
    }
    String::from(Value::from(data))
}

/// Serialize paths into an SVG document string.
///
/// The document's `width`, `height`, and `viewBox` are the source
/// dimensions. Paths with fewer than 2 points are skipped.
#[must_use]
pub fn to_svg(paths: &[Path], dimensions: Dimensions, metadata: &SvgMetadata<'_>) -> String {
    let (w, h) = (dimensions.width, dimensions.height);
    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0.0, 0.0, w, h));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    for path in paths {
        let d = build_path_data(path);
        if d.is_empty() {
            continue;
        }
        doc = doc.add(
            PathElement::new()
                .set("d", d)
                .set("fill", "none")
                .set("stroke", "black")
                .set("stroke-width", 1),
        );
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
