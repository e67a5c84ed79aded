//! G-code toolpath generator.
//!
//! Turns scaled paths into a linear-motion G-code program for a router,
//! engraver, or pen plotter. Every path is cut with the same four-step
//! cycle:
//!
//! 1. rapid (`G0`) to the first point at safe height,
//! 2. plunge (`G1 Z`) to cut depth at the plunge rate,
//! 3. cut (`G1 X Y`) through the remaining points at the feed rate,
//! 4. retract (`G0 Z`) to safe height.
//!
//! The tool therefore never moves sideways below safe height except
//! while cutting, and never cuts without a preceding plunge.
//!
//! Comment lines use the parenthesised `( ... )` form, which every
//! common controller ignores.
//!
//! This is a pure function with no I/O -- the program renders to a
//! `String` through [`std::fmt::Display`].

use std::fmt;

use serde::{Deserialize, Serialize};

use linecut_pipeline::Path;

/// Decimal places for coordinates and depths.
const COORDINATE_DECIMALS: usize = 4;

/// Errors raised while building machine parameters.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A machine parameter is out of range.
    #[error("invalid machine parameters: {0}")]
    InvalidParameters(String),
}

/// Length unit of every coordinate, depth, and rate in the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Units {
    /// Millimetres (`G21`).
    #[default]
    #[serde(rename = "mm")]
    Millimeters,
    /// Inches (`G20`).
    #[serde(rename = "inch")]
    Inches,
}

impl Units {
    /// The G-code word selecting this unit.
    #[must_use]
    pub const fn gcode(self) -> &'static str {
        match self {
            Self::Millimeters => "G21",
            Self::Inches => "G20",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Millimeters => "mm",
            Self::Inches => "inch",
        })
    }
}

/// Validated machine and material settings.
///
/// All numeric fields are positive and finite. Construct through
/// [`MachineParameters::builder`] or deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MachineParametersBuilder", into = "MachineParametersBuilder")]
pub struct MachineParameters {
    units: Units,
    material_width: f64,
    material_height: f64,
    tool_diameter: f64,
    cut_depth: f64,
    feed_rate: f64,
    plunge_rate: f64,
    safe_height: f64,
    spindle_speed: f64,
    source_name: Option<String>,
}

impl MachineParameters {
    /// Start building parameters from the defaults.
    #[must_use]
    pub fn builder() -> MachineParametersBuilder {
        MachineParametersBuilder::default()
    }

    /// Unit of every length and rate.
    #[must_use]
    pub const fn units(&self) -> Units {
        self.units
    }

    /// Width of the area the drawing is scaled onto.
    #[must_use]
    pub const fn material_width(&self) -> f64 {
        self.material_width
    }

    /// Height of the area the drawing is scaled onto.
    #[must_use]
    pub const fn material_height(&self) -> f64 {
        self.material_height
    }

    /// Tool diameter; recorded in the header only.
    #[must_use]
    pub const fn tool_diameter(&self) -> f64 {
        self.tool_diameter
    }

    /// Depth below the surface; cuts run at `Z = -cut_depth`.
    #[must_use]
    pub const fn cut_depth(&self) -> f64 {
        self.cut_depth
    }

    /// Cutting feed rate in units per minute.
    #[must_use]
    pub const fn feed_rate(&self) -> f64 {
        self.feed_rate
    }

    /// Plunge feed rate in units per minute.
    #[must_use]
    pub const fn plunge_rate(&self) -> f64 {
        self.plunge_rate
    }

    /// Height above the surface for rapid moves.
    #[must_use]
    pub const fn safe_height(&self) -> f64 {
        self.safe_height
    }

    /// Spindle speed in RPM.
    #[must_use]
    pub const fn spindle_speed(&self) -> f64 {
        self.spindle_speed
    }

    /// Name of the input the program was made from, if known.
    #[must_use]
    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }
}

impl Default for MachineParameters {
    fn default() -> Self {
        Self {
            units: Units::Millimeters,
            material_width: 100.0,
            material_height: 100.0,
            tool_diameter: 3.175,
            cut_depth: 2.0,
            feed_rate: 800.0,
            plunge_rate: 200.0,
            safe_height: 5.0,
            spindle_speed: 18_000.0,
            source_name: None,
        }
    }
}

/// Unvalidated form of [`MachineParameters`].
///
/// Also the serde representation: every field is optional in JSON and
/// falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineParametersBuilder {
    /// `"mm"` or `"inch"`.
    pub units: Units,
    /// Material width.
    pub material_width: f64,
    /// Material height.
    pub material_height: f64,
    /// Tool diameter.
    pub tool_diameter: f64,
    /// Cut depth, positive.
    pub cut_depth: f64,
    /// Feed rate.
    pub feed_rate: f64,
    /// Plunge rate.
    pub plunge_rate: f64,
    /// Safe height, positive.
    pub safe_height: f64,
    /// Spindle RPM.
    pub spindle_speed: f64,
    /// Input name for the header comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
}

impl Default for MachineParametersBuilder {
    fn default() -> Self {
        MachineParameters::default().into()
    }
}

impl MachineParametersBuilder {
    /// Set the units.
    #[must_use]
    pub fn units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    /// Set the material size.
    #[must_use]
    pub fn material_size(mut self, width: f64, height: f64) -> Self {
        self.material_width = width;
        self.material_height = height;
        self
    }

    /// Set the tool diameter.
    #[must_use]
    pub fn tool_diameter(mut self, diameter: f64) -> Self {
        self.tool_diameter = diameter;
        self
    }

    /// Set the cut depth.
    #[must_use]
    pub fn cut_depth(mut self, depth: f64) -> Self {
        self.cut_depth = depth;
        self
    }

    /// Set the feed rate.
    #[must_use]
    pub fn feed_rate(mut self, rate: f64) -> Self {
        self.feed_rate = rate;
        self
    }

    /// Set the plunge rate.
    #[must_use]
    pub fn plunge_rate(mut self, rate: f64) -> Self {
        self.plunge_rate = rate;
        self
    }

    /// Set the safe height.
    #[must_use]
    pub fn safe_height(mut self, height: f64) -> Self {
        self.safe_height = height;
        self
    }

    /// Set the spindle speed.
    #[must_use]
    pub fn spindle_speed(mut self, rpm: f64) -> Self {
        self.spindle_speed = rpm;
        self
    }

    /// Set the source name shown in the header.
    #[must_use]
    pub fn source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidParameters`] naming the first field
    /// that is zero, negative, or not finite.
    pub fn build(self) -> Result<MachineParameters, ExportError> {
        for (name, value) in [
            ("material_width", self.material_width),
            ("material_height", self.material_height),
            ("tool_diameter", self.tool_diameter),
            ("cut_depth", self.cut_depth),
            ("feed_rate", self.feed_rate),
            ("plunge_rate", self.plunge_rate),
            ("safe_height", self.safe_height),
            ("spindle_speed", self.spindle_speed),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ExportError::InvalidParameters(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        Ok(MachineParameters {
            units: self.units,
            material_width: self.material_width,
            material_height: self.material_height,
            tool_diameter: self.tool_diameter,
            cut_depth: self.cut_depth,
            feed_rate: self.feed_rate,
            plunge_rate: self.plunge_rate,
            safe_height: self.safe_height,
            spindle_speed: self.spindle_speed,
            source_name: self.source_name,
        })
    }
}

impl From<MachineParameters> for MachineParametersBuilder {
    fn from(p: MachineParameters) -> Self {
        Self {
            units: p.units,
            material_width: p.material_width,
            material_height: p.material_height,
            tool_diameter: p.tool_diameter,
            cut_depth: p.cut_depth,
            feed_rate: p.feed_rate,
            plunge_rate: p.plunge_rate,
            safe_height: p.safe_height,
            spindle_speed: p.spindle_speed,
            source_name: p.source_name,
        }
    }
}

impl TryFrom<MachineParametersBuilder> for MachineParameters {
    type Error = ExportError;

    fn try_from(builder: MachineParametersBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

/// One machine move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    /// `G0 Z`: rise to the given height.
    Retract {
        /// Target height.
        z: f64,
    },
    /// `G0 X Y`: rapid move at the current height.
    Rapid {
        /// Target X.
        x: f64,
        /// Target Y.
        y: f64,
    },
    /// `G1 Z F`: descend into the material.
    Plunge {
        /// Target height (negative).
        z: f64,
        /// Plunge rate.
        feed: f64,
    },
    /// `G1 X Y`: cut a straight segment. The feed is only emitted on
    /// the first cut after a plunge; controllers keep it modal.
    Cut {
        /// Target X.
        x: f64,
        /// Target Y.
        y: f64,
        /// Feed rate, when it changes.
        feed: Option<f64>,
    },
}

impl fmt::Display for Motion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Retract { z } => write!(f, "G0 Z{}", coord(z)),
            Self::Rapid { x, y } => write!(f, "G0 X{} Y{}", coord(x), coord(y)),
            Self::Plunge { z, feed } => write!(f, "G1 Z{} F{}", coord(z), rate(feed)),
            Self::Cut { x, y, feed: None } => write!(f, "G1 X{} Y{}", coord(x), coord(y)),
            Self::Cut {
                x,
                y,
                feed: Some(feed),
            } => write!(f, "G1 X{} Y{} F{}", coord(x), coord(y), rate(feed)),
        }
    }
}

/// A complete G-code program: header, moves, footer.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolpathProgram {
    header: Vec<String>,
    motions: Vec<Motion>,
    footer: Vec<String>,
}

impl ToolpathProgram {
    /// Setup lines: comments, modal settings, initial retract, spindle on.
    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// The moves for every path, in order.
    #[must_use]
    pub fn motions(&self) -> &[Motion] {
        &self.motions
    }

    /// Shutdown lines: retract, spindle off, park, end of program.
    #[must_use]
    pub fn footer(&self) -> &[String] {
        &self.footer
    }
}

impl fmt::Display for ToolpathProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.header {
            writeln!(f, "{line}")?;
        }
        for motion in &self.motions {
            writeln!(f, "{motion}")?;
        }
        for line in &self.footer {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Generate the program that cuts `paths` in order.
///
/// Paths are expected in machine coordinates (see
/// `linecut_pipeline::scale_paths`). Paths with fewer than two points
/// are skipped. Closed paths end with a cut back to their first point.
/// An empty input still yields a valid program that only starts and
/// stops the spindle.
///
/// The header rises to safe height before the spindle starts and every
/// path ends with a retract, so the footer parks without another `G0 Z`.
#[must_use = "returns the generated program"]
pub fn generate_toolpath(paths: &[Path], params: &MachineParameters) -> ToolpathProgram {
    let safe = params.safe_height();
    let depth = -params.cut_depth();

    let mut motions = Vec::new();
    let mut cut = 0usize;
    let mut skipped = 0usize;

    for path in paths {
        let points = path.points();
        let Some((first, rest)) = points.split_first() else {
            skipped += 1;
            continue;
        };
        if rest.is_empty() {
            skipped += 1;
            continue;
        }

        motions.push(Motion::Rapid {
            x: first.x,
            y: first.y,
        });
        motions.push(Motion::Plunge {
            z: depth,
            feed: params.plunge_rate(),
        });

        let closing = path.is_closed().then_some(first);
        for (i, p) in rest.iter().chain(closing).enumerate() {
            motions.push(Motion::Cut {
                x: p.x,
                y: p.y,
                feed: (i == 0).then_some(params.feed_rate()),
            });
        }

        motions.push(Motion::Retract { z: safe });
        cut += 1;
    }

    if cut == 0 {
        tracing::warn!("no cuttable paths; program only starts and stops the spindle");
    }
    tracing::debug!(paths = cut, skipped, motions = motions.len(), "generated toolpath");

    ToolpathProgram {
        header: header(params),
        motions,
        footer: vec![
            "M5".to_owned(),
            Motion::Rapid { x: 0.0, y: 0.0 }.to_string(),
            "M2".to_owned(),
        ],
    }
}

fn header(params: &MachineParameters) -> Vec<String> {
    let units = params.units();
    let mut lines = vec!["(linecut)".to_owned()];
    if let Some(source) = params.source_name() {
        lines.push(format!("(Source: {})", comment_text(source)));
    }
    lines.extend([
        format!("(Units: {units})"),
        format!(
            "(Tool diameter: {} {units})",
            coord(params.tool_diameter())
        ),
        format!(
            "(Material: {} x {} {units})",
            coord(params.material_width()),
            coord(params.material_height())
        ),
        units.gcode().to_owned(),
        "G90".to_owned(),
        "G17".to_owned(),
        Motion::Retract {
            z: params.safe_height(),
        }
        .to_string(),
        format!("M3 S{}", rate(params.spindle_speed())),
    ]);
    lines
}

/// Comments end at the first `)` and at line breaks, so both are
/// replaced.
fn comment_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '(' => '[',
            ')' => ']',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect()
}

/// Fixed-point coordinate without a negative zero.
fn coord(value: f64) -> String {
    let text = format!("{value:.prec$}", prec = COORDINATE_DECIMALS);
    if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
        text[1..].to_owned()
    } else {
        text
    }
}

/// Feeds and speeds: integral values without decimals.
fn rate(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        coord(value)
    }
}
