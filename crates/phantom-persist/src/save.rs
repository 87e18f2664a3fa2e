use std::io::Write;

use phantom_core::GridConfig;

use crate::error::PersistError;
use crate::format::*;

/// Streams a phantom file into `W`: an optional header, then density slabs
/// in the order they are handed over.
///
/// Nothing is buffered here beyond what `W` itself buffers. A failed write
/// leaves whatever already reached the sink in place.
pub struct PhantomWriter<W: Write> {
    sink: W,
    header_bytes: usize,
    body_bytes: usize,
    slabs_written: usize,
}

impl<W: Write> PhantomWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            header_bytes: 0,
            body_bytes: 0,
            slabs_written: 0,
        }
    }

    /// Write the 64-byte header for `grid`. Returns the number of bytes written.
    ///
    /// Must precede every [`write_slab`](Self::write_slab) call.
    pub fn write_header(&mut self, grid: &GridConfig) -> Result<usize, PersistError> {
        if self.body_bytes > 0 {
            return Err(PersistError::HeaderAfterBody);
        }
        let header = PhantomHeader::from(grid);
        self.sink
            .write_all(bytemuck::bytes_of(&header))
            .map_err(PersistError::HeaderWrite)?;
        self.header_bytes = HEADER_SIZE;
        Ok(HEADER_SIZE)
    }

    /// Append density values as host-endian `f64`s.
    pub fn write_slab(&mut self, values: &[f64]) -> Result<(), PersistError> {
        self.sink
            .write_all(bytemuck::cast_slice(values))
            .map_err(PersistError::BodyWrite)?;
        self.body_bytes += values.len() * DENSITY_SIZE;
        self.slabs_written += 1;
        Ok(())
    }

    /// Header length in bytes: 64, or 0 if no header was written.
    pub fn header_bytes(&self) -> usize {
        self.header_bytes
    }

    pub fn body_bytes(&self) -> usize {
        self.body_bytes
    }

    pub fn slabs_written(&self) -> usize {
        self.slabs_written
    }

    /// Flush the sink and hand it back.
    pub fn finish(mut self) -> Result<W, PersistError> {
        self.sink.flush().map_err(PersistError::BodyWrite)?;
        log::debug!(
            "Phantom stream finished: {} header bytes, {} body bytes in {} slabs",
            self.header_bytes,
            self.body_bytes,
            self.slabs_written
        );
        Ok(self.sink)
    }
}
