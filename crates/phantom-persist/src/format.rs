use phantom_core::{GridConfig, HEADER_FIELD_COUNT, X, Y, Z};

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = HEADER_FIELD_COUNT * std::mem::size_of::<i32>();

/// Size of one serialized density value in bytes.
pub const DENSITY_SIZE: usize = std::mem::size_of::<f64>();

/// Phantom file header: 16 host-endian `i32`s, 64 bytes, repr(C) for
/// byte-level serialization.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PhantomHeader {
    pub pixel_dim: i32,
    pub angular_trajectory: i32,
    pub positions_angular_distance: i32,
    pub object_side_length: i32,
    pub detector_side_length: i32,
    pub distance_object_detector: i32,
    pub distance_object_source: i32,
    pub voxel_dim: [i32; 3],
    pub n_voxel: [i32; 3],
    pub n_planes: [i32; 3],
}

impl From<&GridConfig> for PhantomHeader {
    fn from(grid: &GridConfig) -> Self {
        bytemuck::cast(grid.header_fields())
    }
}

impl PhantomHeader {
    /// Header fields in serialization order.
    pub fn fields(&self) -> [i32; HEADER_FIELD_COUNT] {
        bytemuck::cast(*self)
    }

    /// Number of density values the body must hold, or `None` if the
    /// product does not fit a `usize`.
    ///
    /// Negative counts (only possible in a corrupt header) count as zero.
    pub fn voxel_count(&self) -> Option<usize> {
        [X, Y, Z].iter().try_fold(1usize, |count, &axis| {
            count.checked_mul(self.n_voxel[axis].max(0) as usize)
        })
    }
}

/// Whether the 64-byte header precedes the voxel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderMode {
    /// Header followed by voxel data. The only layout the projector accepts.
    #[default]
    Standard,
    /// Voxel data only, for raw inspection.
    Raw,
}

impl HeaderMode {
    /// Byte offset of the first density value.
    pub fn header_len(self) -> usize {
        match self {
            HeaderMode::Standard => HEADER_SIZE,
            HeaderMode::Raw => 0,
        }
    }
}

/// Byte order of the host, which is also the byte order of every file it writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    pub fn host() -> Self {
        if cfg!(target_endian = "little") {
            Endianness::Little
        } else {
            Endianness::Big
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Endianness::Little => "little endian",
            Endianness::Big => "big endian",
        }
    }
}
