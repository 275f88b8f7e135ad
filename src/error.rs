use std::path::PathBuf;

use thiserror::Error;

/// Fatal problems with the run configuration. Nothing is scanned when one of
/// these is returned.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Source path does not exist: {0}")]
    SourceMissing(PathBuf),

    #[error("Target path does not exist: {0}")]
    TargetMissing(PathBuf),

    #[error("Report directory is not usable {0}: {1}")]
    ReportDir(PathBuf, String),
}

/// Failure of a single repair action. Recorded in the report, never fatal.
#[derive(Debug, Error)]
pub enum RepairError {
    #[error("Destination exists, skipped: {0}")]
    DestinationExists(PathBuf),

    #[error("Nested folder not empty after flatten, {skipped} item(s) left in {path}")]
    FlattenIncomplete { path: PathBuf, skipped: usize },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RepairError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RepairError::Io {
            path: path.into(),
            source,
        }
    }
}
