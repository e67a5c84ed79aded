//! Command-line arguments and their resolution into pipeline settings.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, ValueEnum};
use serde::Deserialize;

use linecut_export::{MachineParameters, MachineParametersBuilder, Units};
use linecut_pipeline::{ConversionConfig, ConversionConfigBuilder};

use crate::error::CliError;

/// Convert a line drawing or SVG file into a G-code toolpath.
///
/// Raster images are binarized, optionally thinned to their centerlines,
/// traced, simplified, and smoothed. SVG elements are loaded as
/// polylines directly. The paths are then scaled onto the material and
/// cut one after another at a fixed depth.
#[derive(Debug, Parser)]
#[command(name = "linecut", version)]
pub struct Cli {
    /// Input drawing (PNG, JPEG, BMP, WebP, or SVG).
    pub input: PathBuf,

    /// Where to write the G-code program.
    #[arg(short, long)]
    pub output: PathBuf,

    /// How to read the input. `auto` picks SVG for `.svg` files.
    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    pub format: InputFormat,

    /// JSON file with `conversion` and `machine` sections.
    ///
    /// When provided, the individual conversion and machine flags are
    /// ignored.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also write an SVG preview of the paths in source coordinates.
    #[arg(long)]
    pub svg_preview: Option<PathBuf>,

    /// Keep the source Y axis instead of flipping it to point up.
    #[arg(long)]
    pub no_flip_y: bool,

    /// Log pipeline details.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(flatten)]
    pub conversion: ConversionArgs,

    #[command(flatten)]
    pub machine: MachineArgs,
}

/// Input format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// Decide by file extension.
    Auto,
    /// Decode as a raster image.
    Raster,
    /// Parse as an SVG document.
    Svg,
}

impl InputFormat {
    /// Replace `Auto` with the format implied by `path`.
    #[must_use]
    pub fn resolve(self, path: &Path) -> Self {
        match self {
            Self::Auto => {
                let is_svg = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("svg"));
                if is_svg { Self::Svg } else { Self::Raster }
            }
            other => other,
        }
    }
}

/// Conversion flags. Unset flags keep the pipeline defaults.
#[derive(Debug, Args)]
#[command(next_help_heading = "Conversion")]
pub struct ConversionArgs {
    /// Binarization threshold (0-255); darker pixels are ink.
    #[arg(long)]
    pub threshold: Option<i64>,

    /// Simplification tolerance in source units.
    #[arg(long)]
    pub simplify_epsilon: Option<f64>,

    /// Trace stroke centerlines instead of stroke borders.
    #[arg(long)]
    pub use_skeleton: bool,

    /// Smoothing strength; 0 disables smoothing.
    #[arg(long)]
    pub smooth_level: Option<u32>,

    /// Smooth with a spline instead of a moving average.
    #[arg(long)]
    pub use_spline: bool,

    /// Drop paths with fewer points than this.
    #[arg(long)]
    pub min_path_points: Option<usize>,

    /// Reorder paths to shorten rapid moves.
    #[arg(long)]
    pub optimize_order: bool,
}

impl ConversionArgs {
    fn to_builder(&self) -> ConversionConfigBuilder {
        let defaults = ConversionConfig::builder();
        ConversionConfigBuilder {
            threshold: self.threshold.unwrap_or(defaults.threshold),
            simplify_epsilon: self.simplify_epsilon.unwrap_or(defaults.simplify_epsilon),
            use_skeleton: self.use_skeleton,
            smooth_level: self.smooth_level.unwrap_or(defaults.smooth_level),
            use_spline: self.use_spline,
            min_path_points: self.min_path_points.unwrap_or(defaults.min_path_points),
            optimize_order: self.optimize_order,
        }
    }
}

/// Length unit selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnitsArg {
    /// Millimetres.
    Mm,
    /// Inches.
    Inch,
}

impl From<UnitsArg> for Units {
    fn from(units: UnitsArg) -> Self {
        match units {
            UnitsArg::Mm => Self::Millimeters,
            UnitsArg::Inch => Self::Inches,
        }
    }
}

/// Machine flags. Unset flags keep the machine defaults.
#[derive(Debug, Args)]
#[command(next_help_heading = "Machine")]
pub struct MachineArgs {
    /// Unit of every length and rate below.
    #[arg(long, value_enum)]
    pub units: Option<UnitsArg>,

    /// Material width the drawing is stretched to.
    #[arg(long)]
    pub material_width: Option<f64>,

    /// Material height the drawing is stretched to.
    #[arg(long)]
    pub material_height: Option<f64>,

    /// Tool diameter, recorded in the program header.
    #[arg(long)]
    pub tool_diameter: Option<f64>,

    /// Depth below the surface while cutting.
    #[arg(long)]
    pub cut_depth: Option<f64>,

    /// Cutting feed rate per minute.
    #[arg(long)]
    pub feed_rate: Option<f64>,

    /// Plunge feed rate per minute.
    #[arg(long)]
    pub plunge_rate: Option<f64>,

    /// Height above the surface for rapid moves.
    #[arg(long)]
    pub safe_height: Option<f64>,

    /// Spindle speed in RPM.
    #[arg(long)]
    pub spindle_speed: Option<f64>,
}

impl MachineArgs {
    fn to_builder(&self) -> MachineParametersBuilder {
        let defaults = MachineParameters::builder();
        MachineParametersBuilder {
            units: self.units.map_or(defaults.units, Units::from),
            material_width: self.material_width.unwrap_or(defaults.material_width),
            material_height: self.material_height.unwrap_or(defaults.material_height),
            tool_diameter: self.tool_diameter.unwrap_or(defaults.tool_diameter),
            cut_depth: self.cut_depth.unwrap_or(defaults.cut_depth),
            feed_rate: self.feed_rate.unwrap_or(defaults.feed_rate),
            plunge_rate: self.plunge_rate.unwrap_or(defaults.plunge_rate),
            safe_height: self.safe_height.unwrap_or(defaults.safe_height),
            spindle_speed: self.spindle_speed.unwrap_or(defaults.spindle_speed),
            source_name: None,
        }
    }
}

/// Contents of a `--config` file. Missing sections use the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub conversion: ConversionConfig,
    pub machine: MachineParameters,
}

/// Validated settings of one run.
#[derive(Debug)]
pub struct Settings {
    pub conversion: ConversionConfig,
    pub machine: MachineParameters,
    pub flip_y: bool,
}

impl Settings {
    /// Resolve the settings from the config file, or from the flags
    /// when no config file is given.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Io`] if the config file cannot be read,
    /// [`CliError::ConfigFile`] if it does not parse or validate, and a
    /// pipeline or export error for out-of-range flags.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let (conversion, machine) = if let Some(path) = &cli.config {
            let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
                path: path.clone(),
                source,
            })?;
            let file: ConfigFile = serde_json::from_str(&text)?;
            tracing::debug!(config = %path.display(), "settings loaded from file");
            (file.conversion, file.machine)
        } else {
            (
                cli.conversion.to_builder().build()?,
                cli.machine.to_builder().build()?,
            )
        };

        Ok(Self {
            conversion,
            machine,
            flip_y: !cli.no_flip_y,
        })
    }
}
