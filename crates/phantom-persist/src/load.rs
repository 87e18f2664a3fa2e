use std::io::Read;

use phantom_core::GridConfig;

use crate::compat;
use crate::error::PersistError;
use crate::format::*;

/// A phantom file parsed back into memory.
pub struct PhantomFile {
    /// Header and the grid it describes. `None` for raw files.
    pub header: Option<(PhantomHeader, GridConfig)>,
    /// Density values in file order: Y slices bottom first, X fastest within a slice.
    pub densities: Vec<f64>,
}

impl PhantomFile {
    /// Density at voxel (x, y, z). Requires a header to know the layout.
    pub fn density_at(&self, x: usize, y: usize, z: usize) -> Option<f64> {
        let (_, grid) = self.header.as_ref()?;
        let [nx, ny, nz] = grid.n_voxel().map(|n| n as usize);
        if x >= nx || y >= ny || z >= nz {
            return None;
        }
        self.densities.get(y * nx * nz + z * nx + x).copied()
    }
}

/// Read and validate only the 64-byte header.
pub fn read_header<R: Read>(mut reader: R) -> Result<PhantomHeader, PersistError> {
    let mut buf = [0u8; HEADER_SIZE];
    reader.read_exact(&mut buf).map_err(PersistError::Read)?;
    let header: PhantomHeader = bytemuck::pod_read_unaligned(&buf);
    compat::validate_header(&header)?;
    Ok(header)
}

/// Parse a complete phantom file from raw bytes.
pub fn load(bytes: &[u8], mode: HeaderMode) -> Result<PhantomFile, PersistError> {
    let header_len = mode.header_len();
    if bytes.len() < header_len {
        return Err(PersistError::FileTooSmall(bytes.len(), header_len));
    }

    let (header, body) = bytes.split_at(header_len);
    let header = match mode {
        HeaderMode::Standard => {
            let header: PhantomHeader = bytemuck::pod_read_unaligned(header);
            let grid = compat::validate_header(&header)?;
            let expected = grid.body_bytes();
            if body.len() != expected {
                return Err(PersistError::BodyLength {
                    expected,
                    actual: body.len(),
                });
            }
            Some((header, grid))
        }
        HeaderMode::Raw => {
            if body.len() % DENSITY_SIZE != 0 {
                return Err(PersistError::BodyLength {
                    expected: body.len() - body.len() % DENSITY_SIZE,
                    actual: body.len(),
                });
            }
            None
        }
    };

    let densities = body
        .chunks_exact(DENSITY_SIZE)
        .map(|chunk| {
            let mut raw = [0u8; DENSITY_SIZE];
            raw.copy_from_slice(chunk);
            f64::from_ne_bytes(raw)
        })
        .collect();

    Ok(PhantomFile { header, densities })
}
