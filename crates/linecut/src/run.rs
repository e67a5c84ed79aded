//! One conversion run: read, convert, scale, generate, write.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use linecut_export::{MachineParametersBuilder, SvgMetadata, generate_toolpath, to_svg};
use linecut_pipeline::{ConversionResult, PipelineError, process_raster, process_vector, scale_paths};

use crate::cli::{Cli, InputFormat, Settings};
use crate::error::CliError;

/// Convert `cli.input` and write the program (and preview, if asked).
///
/// Every output is rendered before the first file is written.
///
/// # Errors
///
/// Returns the first fatal error; no output file is created or replaced
/// in that case.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    let settings = Settings::from_cli(cli)?;
    let bytes = std::fs::read(&cli.input).map_err(|source| CliError::Io {
        path: cli.input.clone(),
        source,
    })?;

    let format = cli.format.resolve(&cli.input);
    tracing::debug!(input = %cli.input.display(), bytes = bytes.len(), ?format, "read input");
    let result = convert(&bytes, format, &settings)?;

    let source_name = cli
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    let mut machine = MachineParametersBuilder::from(settings.machine.clone());
    if let Some(name) = &source_name {
        machine = machine.source_name(name.as_str());
    }
    let machine = machine.build()?;

    let scaled = scale_paths(
        &result.paths,
        result.dimensions.width,
        result.dimensions.height,
        machine.material_width(),
        machine.material_height(),
        settings.flip_y,
    )?;
    let program = generate_toolpath(&scaled, &machine);
    let gcode = program.to_string();

    let preview = cli.svg_preview.as_ref().map(|path| {
        let description = format!("{:#?}", settings.conversion);
        let metadata = SvgMetadata {
            title: source_name.as_deref(),
            description: Some(&description),
        };
        (path, to_svg(&result.paths, result.dimensions, &metadata))
    });

    write_atomic(&cli.output, &gcode)?;
    if let Some((path, svg)) = preview {
        write_atomic(path, &svg)?;
        tracing::info!(preview = %path.display(), "wrote SVG preview");
    }

    tracing::info!(
        paths = scaled.len(),
        motions = program.motions().len(),
        output = %cli.output.display(),
        "wrote G-code"
    );
    Ok(())
}

fn convert(
    bytes: &[u8],
    format: InputFormat,
    settings: &Settings,
) -> Result<ConversionResult, PipelineError> {
    match format {
        InputFormat::Svg => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| PipelineError::SvgParse(format!("input is not UTF-8: {e}")))?;
            process_vector(text, &settings.conversion)
        }
        InputFormat::Raster | InputFormat::Auto => process_raster(bytes, &settings.conversion),
    }
}

/// Write `contents` to `path` through a temporary file in the same
/// directory, renamed into place once complete.
///
/// # Errors
///
/// Returns [`CliError::Io`] naming `path` if any step fails. The
/// temporary file is removed on failure.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), CliError> {
    let io_error = |source| CliError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
    file.write_all(contents.as_bytes()).map_err(io_error)?;
    file.as_file().sync_all().map_err(io_error)?;
    file.persist(path).map_err(|e| io_error(e.error))?;
    Ok(())
}
