use std::path::PathBuf;

use linecut_export::ExportError;
use linecut_pipeline::PipelineError;

/// Fatal errors of a conversion run.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The drawing could not be converted.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The machine parameters are invalid.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Reading or writing a file failed.
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The `--config` file is not valid JSON or holds invalid settings.
    #[error("invalid config file: {0}")]
    ConfigFile(#[from] serde_json::Error),
}
