//! linecut-export: Pure output serializers (sans-IO)
//!
//! Converts scaled paths into a G-code toolpath program, and source
//! paths into an SVG preview. Nothing here touches the filesystem.

pub mod gcode;
pub mod svg;

pub use gcode::{
    ExportError, MachineParameters, MachineParametersBuilder, Motion, ToolpathProgram, Units,
    generate_toolpath,
};
pub use svg::{SvgMetadata, build_path_data, to_svg};
