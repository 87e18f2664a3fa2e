pub mod constants;
pub mod error;
pub mod geometry;
pub mod shape;

pub use error::GeometryError;
pub use geometry::{BaseGeometry, GridConfig, HEADER_FIELD_COUNT, X, Y, Z};
pub use shape::{Shape, ShapeEvaluator, ShapeKind};
