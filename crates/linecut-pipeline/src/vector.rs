//! SVG loading: turn vector drawing elements into polylines.
//!
//! The document is read as a stream of XML events. Drawable elements
//! (`path`, `polyline`, `polygon`, `line`, `rect`, `circle`, `ellipse`)
//! become one [`Path`] per subpath, with every `transform` between the
//! element and the root applied. Curves are flattened so that the chord
//! error stays below [`CURVE_TOLERANCE`] in document units.
//!
//! Elements that are never rendered directly (`defs`, `clipPath`, `mask`,
//! `symbol`, `pattern`, `marker`) are skipped with their content.
//! Elements that draw something this loader cannot follow (`text`,
//! `image`, `use`, `foreignObject`) are skipped with a warning.

use std::collections::HashMap;
use std::str::FromStr;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use svgtypes::{LengthUnit, SimplePathSegment};

use crate::types::{Dimensions, Path, PathSet, PipelineError, Point};

/// Maximum distance between a flattened curve and its chords, in
/// document user units.
pub const CURVE_TOLERANCE: f64 = 0.1;

/// Segments used for a full turn of a circle or ellipse.
pub const CIRCLE_SEGMENTS: usize = 72;

/// Elements whose content is referenced elsewhere rather than drawn.
const NON_RENDERED: &[&str] = &[
    "defs", "clipPath", "mask", "symbol", "pattern", "marker", "metadata", "title", "desc",
    "style", "script",
];

/// Drawable elements the loader does not convert.
const UNSUPPORTED: &[&str] = &["text", "image", "use", "foreignObject"];

/// Paths loaded from an SVG document, in document user units.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorDocument {
    /// One entry per subpath or shape, in document order.
    pub paths: PathSet,
    /// Canvas size: the `viewBox` size, or `width`/`height`.
    pub dimensions: Dimensions,
}

/// Parse SVG text into paths and canvas dimensions.
///
/// When the root has a `viewBox`, coordinates are translated by its
/// origin so the canvas spans `0..width × 0..height`.
///
/// # Errors
///
/// Returns [`PipelineError::SvgParse`] if the text is not well-formed XML
/// or the root element is not `svg`, and
/// [`PipelineError::MissingCanvasSize`] if the root has neither a usable
/// `viewBox` nor numeric `width` and `height`.
pub fn load_vector_paths(svg: &str) -> Result<VectorDocument, PipelineError> {
    let mut reader = Reader::from_str(svg);
    reader.config_mut().trim_text(true);

    let mut loader = Loader::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => loader.element(e, true)?,
            Ok(Event::Empty(ref e)) => loader.element(e, false)?,
            Ok(Event::End(_)) => {
                loader.stack.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(PipelineError::SvgParse(format!(
                    "at byte {}: {e}",
                    reader.error_position()
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = loader.stack.last() {
        return Err(PipelineError::SvgParse(format!(
            "document ends inside <{}>",
            open.name
        )));
    }
    let Some(dimensions) = loader.canvas else {
        return Err(PipelineError::SvgParse("no <svg> root element".to_owned()));
    };

    tracing::debug!(
        paths = loader.paths.len(),
        points = loader.paths.iter().map(Path::len).sum::<usize>(),
        width = dimensions.width,
        height = dimensions.height,
        "loaded vector paths"
    );
    Ok(VectorDocument {
        paths: loader.paths,
        dimensions,
    })
}

/// An open element and the state its children inherit.
#[derive(Debug)]
struct Frame {
    name: String,
    ctm: Affine,
    hidden: bool,
}

#[derive(Debug, Default)]
struct Loader {
    stack: Vec<Frame>,
    canvas: Option<Dimensions>,
    paths: PathSet,
}

impl Loader {
    fn element(&mut self, e: &BytesStart<'_>, has_children: bool) -> Result<(), PipelineError> {
        let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
        let attrs = attributes(e);

        let Some(parent) = self.stack.last() else {
            return self.root(name, &attrs, has_children);
        };

        let mut hidden = parent.hidden || attrs.get("display").is_some_and(|d| d == "none");
        let mut ctm = parent.ctm;

        if !hidden {
            if name == "svg" {
                ctm = ctm.then(Affine::translate(length(&attrs, "x"), length(&attrs, "y")));
            }
            ctm = ctm.then(local_transform(&attrs, &name));
            if NON_RENDERED.contains(&name.as_str()) {
                hidden = true;
            } else if UNSUPPORTED.contains(&name.as_str()) {
                tracing::warn!(element = %name, "skipping unsupported SVG element");
                hidden = true;
            } else if let Some(paths) = shape_paths(&name, &attrs, &ctm) {
                self.emit(&name, paths);
            }
        }

        if has_children {
            self.stack.push(Frame { name, ctm, hidden });
        }
        Ok(())
    }

    fn root(
        &mut self,
        name: String,
        attrs: &HashMap<String, String>,
        has_children: bool,
    ) -> Result<(), PipelineError> {
        if self.canvas.is_some() {
            return Err(PipelineError::SvgParse(format!(
                "unexpected <{name}> after the root element"
            )));
        }
        if name != "svg" {
            return Err(PipelineError::SvgParse(format!(
                "root element is <{name}>, expected <svg>"
            )));
        }

        let view_box = attrs
            .get("viewBox")
            .and_then(|v| svgtypes::ViewBox::from_str(v).ok())
            .filter(|vb| vb.w > 0.0 && vb.h > 0.0 && vb.w.is_finite() && vb.h.is_finite());

        let (dimensions, origin) = if let Some(vb) = view_box {
            (
                Dimensions {
                    width: vb.w,
                    height: vb.h,
                },
                Affine::translate(-vb.x, -vb.y),
            )
        } else {
            let width = attrs.get("width").and_then(|v| user_units(v));
            let height = attrs.get("height").and_then(|v| user_units(v));
            match (width, height) {
                (Some(width), Some(height)) if width > 0.0 && height > 0.0 => {
                    (Dimensions { width, height }, Affine::IDENTITY)
                }
                _ => return Err(PipelineError::MissingCanvasSize),
            }
        };

        self.canvas = Some(dimensions);
        if has_children {
            self.stack.push(Frame {
                name,
                ctm: origin.then(local_transform(attrs, "svg")),
                hidden: false,
            });
        }
        Ok(())
    }

    fn emit(&mut self, element: &str, paths: Vec<Path>) {
        for path in paths {
            let path = tidy(path);
            if path.is_degenerate() {
                tracing::debug!(element, "dropping degenerate vector path");
            } else {
                self.paths.push(path);
            }
        }
    }
}

/// Attribute values keyed by local name.
fn attributes(e: &BytesStart<'_>) -> HashMap<String, String> {
    e.attributes()
        .flatten()
        .filter_map(|attr| {
            let name = attr.key.local_name();
            let key = std::str::from_utf8(name.as_ref()).ok()?;
            let value = std::str::from_utf8(&attr.value).ok()?;
            Some((key.to_owned(), value.to_owned()))
        })
        .collect()
}

/// The element's own `transform` attribute.
fn local_transform(attrs: &HashMap<String, String>, name: &str) -> Affine {
    match attrs.get("transform").map(|v| svgtypes::Transform::from_str(v)) {
        Some(Ok(t)) => Affine::from(t),
        Some(Err(e)) => {
            tracing::warn!(element = name, error = %e, "ignoring malformed transform");
            Affine::IDENTITY
        }
        None => Affine::IDENTITY,
    }
}

/// Convert a length to user units. Relative units have no fixed size
/// and are rejected.
fn user_units(value: &str) -> Option<f64> {
    let length = svgtypes::Length::from_str(value.trim()).ok()?;
    let factor = match length.unit {
        LengthUnit::None | LengthUnit::Px => 1.0,
        LengthUnit::In => 96.0,
        LengthUnit::Cm => 96.0 / 2.54,
        LengthUnit::Mm => 96.0 / 25.4,
        LengthUnit::Pt => 4.0 / 3.0,
        LengthUnit::Pc => 16.0,
        _ => return None,
    };
    Some(length.number * factor).filter(|v| v.is_finite())
}

fn length(attrs: &HashMap<String, String>, key: &str) -> f64 {
    attrs.get(key).and_then(|v| user_units(v)).unwrap_or(0.0)
}

/// Geometry for a drawable element, or `None` for containers and
/// unknown elements.
fn shape_paths(name: &str, attrs: &HashMap<String, String>, ctm: &Affine) -> Option<Vec<Path>> {
    let local = match name {
        "path" => {
            return Some(
                attrs
                    .get("d")
                    .map(|d| path_data(d, ctm))
                    .unwrap_or_default(),
            );
        }
        "polyline" | "polygon" => {
            let points: Vec<Point> = attrs
                .get("points")
                .map(|s| svgtypes::PointsParser::from(s.as_str()).map(|(x, y)| Point::new(x, y)).collect())
                .unwrap_or_default();
            if name == "polygon" {
                Path::closed(points)
            } else {
                Path::new(points)
            }
        }
        "line" => Path::new(vec![
            Point::new(length(attrs, "x1"), length(attrs, "y1")),
            Point::new(length(attrs, "x2"), length(attrs, "y2")),
        ]),
        "rect" => rect(attrs)?,
        "circle" => {
            let r = length(attrs, "r");
            ellipse(length(attrs, "cx"), length(attrs, "cy"), r, r)?
        }
        "ellipse" => ellipse(
            length(attrs, "cx"),
            length(attrs, "cy"),
            length(attrs, "rx"),
            length(attrs, "ry"),
        )?,
        _ => return None,
    };
    Some(vec![local.with_points(local.points().iter().map(|&p| ctm.apply(p)).collect())])
}

fn rect(attrs: &HashMap<String, String>) -> Option<Path> {
    let (x, y) = (length(attrs, "x"), length(attrs, "y"));
    let (w, h) = (length(attrs, "width"), length(attrs, "height"));
    if w <= 0.0 || h <= 0.0 {
        tracing::debug!(w, h, "skipping rect without area");
        return None;
    }

    let rx = attrs.get("rx").and_then(|v| user_units(v));
    let ry = attrs.get("ry").and_then(|v| user_units(v));
    let (rx, ry) = match (rx, ry) {
        (Some(rx), Some(ry)) => (rx, ry),
        (Some(r), None) | (None, Some(r)) => (r, r),
        (None, None) => (0.0, 0.0),
    };
    let (rx, ry) = (rx.clamp(0.0, w / 2.0), ry.clamp(0.0, h / 2.0));

    if rx == 0.0 || ry == 0.0 {
        return Some(Path::closed(vec![
            Point::new(x, y),
            Point::new(x + w, y),
            Point::new(x + w, y + h),
            Point::new(x, y + h),
        ]));
    }

    // Quarter arcs clockwise from the top-right corner.
    let quarter = CIRCLE_SEGMENTS / 4;
    let corners = [
        (x + w - rx, y + ry, -90.0),
        (x + w - rx, y + h - ry, 0.0),
        (x + rx, y + h - ry, 90.0),
        (x + rx, y + ry, 180.0),
    ];
    let points = corners
        .iter()
        .flat_map(|&(cx, cy, start)| {
            (0..=quarter).map(move |i| {
                #[allow(clippy::cast_precision_loss)]
                let angle = (start + 90.0 * i as f64 / quarter as f64).to_radians();
                Point::new(rx.mul_add(angle.cos(), cx), ry.mul_add(angle.sin(), cy))
            })
        })
        .collect();
    Some(Path::closed(points))
}

fn ellipse(cx: f64, cy: f64, rx: f64, ry: f64) -> Option<Path> {
    if rx <= 0.0 || ry <= 0.0 {
        tracing::debug!(rx, ry, "skipping ellipse without area");
        return None;
    }
    Some(Path::closed(
        (0..CIRCLE_SEGMENTS)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let angle = std::f64::consts::TAU * i as f64 / CIRCLE_SEGMENTS as f64;
                Point::new(rx.mul_add(angle.cos(), cx), ry.mul_add(angle.sin(), cy))
            })
            .collect(),
    ))
}

/// Flatten path data into one path per subpath, in document space.
///
/// Parsing stops at the first malformed segment; everything before it
/// is kept.
fn path_data(d: &str, ctm: &Affine) -> Vec<Path> {
    let mut paths = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    let mut subpath_start = Point::new(0.0, 0.0);

    let finish = |points: &mut Vec<Point>, closed: bool, paths: &mut Vec<Path>| {
        if !points.is_empty() {
            let points = std::mem::take(points);
            paths.push(if closed {
                Path::closed(points)
            } else {
                Path::new(points)
            });
        }
    };

    for segment in svgtypes::SimplifyingPathParser::from(d) {
        let segment = match segment {
            Ok(segment) => segment,
            Err(e) => {
                tracing::warn!(error = %e, "truncating malformed path data");
                break;
            }
        };

        if !matches!(segment, SimplePathSegment::MoveTo { .. }) && current.is_empty() {
            current.push(subpath_start);
        }
        let from = current.last().copied().unwrap_or(subpath_start);

        match segment {
            SimplePathSegment::MoveTo { x, y } => {
                finish(&mut current, false, &mut paths);
                subpath_start = ctm.apply(Point::new(x, y));
                current.push(subpath_start);
            }
            SimplePathSegment::LineTo { x, y } => {
                current.push(ctm.apply(Point::new(x, y)));
            }
            SimplePathSegment::CurveTo {
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                let c1 = ctm.apply(Point::new(x1, y1));
                let c2 = ctm.apply(Point::new(x2, y2));
                let to = ctm.apply(Point::new(x, y));
                flatten_cubic(from, c1, c2, to, &mut current);
            }
            SimplePathSegment::Quadratic { x1, y1, x, y } => {
                let c = ctm.apply(Point::new(x1, y1));
                let to = ctm.apply(Point::new(x, y));
                flatten_quadratic(from, c, to, &mut current);
            }
            SimplePathSegment::ClosePath => {
                finish(&mut current, true, &mut paths);
            }
        }
    }
    finish(&mut current, false, &mut paths);
    paths
}

/// Append a cubic Bézier (excluding its start point) as chords.
///
/// With `d` the largest second difference of the control polygon, `n`
/// uniform steps keep the chord error below `3d / (4n²)`.
fn flatten_cubic(p0: Point, p1: Point, p2: Point, p3: Point, out: &mut Vec<Point>) {
    let d = second_difference(p0, p1, p2).max(second_difference(p1, p2, p3));
    let n = segment_count(3.0 * d / (4.0 * CURVE_TOLERANCE));
    for i in 1..=n {
        #[allow(clippy::cast_precision_loss)]
        let t = i as f64 / n as f64;
        let mt = 1.0 - t;
        let (a, b, c, e) = (mt * mt * mt, 3.0 * mt * mt * t, 3.0 * mt * t * t, t * t * t);
        out.push(Point::new(
            a * p0.x + b * p1.x + c * p2.x + e * p3.x,
            a * p0.y + b * p1.y + c * p2.y + e * p3.y,
        ));
    }
}

/// Append a quadratic Bézier (excluding its start point) as chords.
///
/// The chord error of `n` uniform steps is at most `d / (4n²)`.
fn flatten_quadratic(p0: Point, p1: Point, p2: Point, out: &mut Vec<Point>) {
    let d = second_difference(p0, p1, p2);
    let n = segment_count(d / (4.0 * CURVE_TOLERANCE));
    for i in 1..=n {
        #[allow(clippy::cast_precision_loss)]
        let t = i as f64 / n as f64;
        let mt = 1.0 - t;
        let (a, b, c) = (mt * mt, 2.0 * mt * t, t * t);
        out.push(Point::new(
            a * p0.x + b * p1.x + c * p2.x,
            a * p0.y + b * p1.y + c * p2.y,
        ));
    }
}

fn second_difference(a: Point, b: Point, c: Point) -> f64 {
    (2.0f64.mul_add(-b.x, a.x + c.x)).hypot(2.0f64.mul_add(-b.y, a.y + c.y))
}

/// `ceil(sqrt(n_squared))`, at least one.
fn segment_count(n_squared: f64) -> usize {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n = n_squared.sqrt().ceil().clamp(1.0, 10_000.0) as usize;
    n
}

/// Drop repeated consecutive points, and a repeated start on a closed
/// path.
fn tidy(path: Path) -> Path {
    let closed = path.is_closed();
    let mut points = path.into_points();
    points.dedup();
    if closed && points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if closed {
        Path::closed(points)
    } else {
        Path::new(points)
    }
}

/// A 2-D affine map `[a c e; b d f]`, as in SVG.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Affine {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl From<svgtypes::Transform> for Affine {
    fn from(t: svgtypes::Transform) -> Self {
        Self {
            a: t.a,
            b: t.b,
            c: t.c,
            d: t.d,
            e: t.e,
            f: t.f,
        }
    }
}

impl Affine {
    const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    const fn translate(tx: f64, ty: f64) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    /// The map that applies `inner` first, then `self`.
    fn then(self, inner: Self) -> Self {
        Self {
            a: self.a.mul_add(inner.a, self.c * inner.b),
            b: self.b.mul_add(inner.a, self.d * inner.b),
            c: self.a.mul_add(inner.c, self.c * inner.d),
            d: self.b.mul_add(inner.c, self.d * inner.d),
            e: self.a.mul_add(inner.e, self.c.mul_add(inner.f, self.e)),
            f: self.b.mul_add(inner.e, self.d.mul_add(inner.f, self.f)),
        }
    }

    fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a.mul_add(p.x, self.c.mul_add(p.y, self.e)),
            self.b.mul_add(p.x, self.d.mul_add(p.y, self.f)),
        )
    }
}
