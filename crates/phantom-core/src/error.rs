use thiserror::Error;

/// Errors raised while deriving or rebuilding grid geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: i64 },

    #[error("detector pixels per side must be at least 1, got {0}")]
    ZeroDetectorPixels(u32),

    #[error("{field} does not fit a 32-bit header field (value {value})")]
    Overflow { field: &'static str, value: f64 },

    #[error("voxel grid {0:?} is too large to address in memory")]
    GridTooLarge([i32; 3]),

    #[error("inconsistent {field}: expected {expected}, got {actual}")]
    Inconsistent {
        field: &'static str,
        expected: i32,
        actual: i32,
    },

    #[error("cavity ratio must be finite and within [0, 1], got {0}")]
    InvalidCavityRatio(f64),

    #[error("failed to parse geometry RON: {0}")]
    ParseError(String),
}
