pub mod cli;
pub mod error;
pub mod report;
pub mod runner;
pub mod slab;

pub use error::RunError;
