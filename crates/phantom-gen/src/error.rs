use std::path::PathBuf;

use phantom_core::GeometryError;
use phantom_persist::PersistError;
use thiserror::Error;

/// Fatal errors of a generation run. None are recoverable mid-run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("{0}")]
    Usage(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] GeometryError),

    #[error("failed to read geometry file {path}: {source}")]
    GeometryFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to allocate slab buffer of {bytes} bytes")]
    Allocation { bytes: usize },

    #[error("unable to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to write header: {0}")]
    HeaderWrite(#[source] PersistError),

    #[error("unable to write voxel data: {0}")]
    BodyWrite(#[source] PersistError),

    #[error("verification failed: {0}")]
    Verify(#[source] PersistError),

    #[error("unable to save summary to {path}: {source}")]
    Summary {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Usage(_) | RunError::Config(_) | RunError::GeometryFile { .. } => 1,
            RunError::Open { .. } => 2,
            RunError::HeaderWrite(_) => 3,
            RunError::BodyWrite(_) => 4,
            RunError::Allocation { .. } => 5,
            RunError::Verify(_) => 6,
            RunError::Summary { .. } => 7,
        }
    }
}
