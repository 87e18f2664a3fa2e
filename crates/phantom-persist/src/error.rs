use phantom_core::GeometryError;

/// Errors that can occur while writing or reading a phantom file.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("failed to write header: {0}")]
    HeaderWrite(#[source] std::io::Error),

    #[error("failed to write voxel data: {0}")]
    BodyWrite(#[source] std::io::Error),

    #[error("header must be written before any voxel data")]
    HeaderAfterBody,

    #[error("failed to read phantom file: {0}")]
    Read(#[source] std::io::Error),

    #[error("file too small ({0} bytes, minimum {1})")]
    FileTooSmall(usize, usize),

    #[error("invalid header: {0}")]
    InvalidHeader(#[from] GeometryError),

    #[error("header does not match the generated grid: {0}")]
    HeaderMismatch(String),

    #[error("body length mismatch: expected {expected} bytes, got {actual}")]
    BodyLength { expected: usize, actual: usize },
}
