pub mod compat;
pub mod error;
pub mod format;
pub mod load;
pub mod save;

pub use error::PersistError;
pub use format::{Endianness, HeaderMode, PhantomHeader};
pub use load::{load, read_header, PhantomFile};
pub use save::PhantomWriter;
