use std::path::Path;

use phantom_core::{GridConfig, X, Y, Z};
use phantom_persist::format::DENSITY_SIZE;
use phantom_persist::Endianness;

/// Layout of a generated phantom file, as an image viewer would need it to
/// import the body as a raw image stack.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Summary {
    /// Size of the voxel data in bytes.
    pub model_bytes: u64,
    /// Bits per density value.
    pub bit_depth: u32,
    pub image_width: i32,
    pub image_height: i32,
    /// Byte offset of the first image (the header length).
    pub header_offset: usize,
    /// Number of images, one per Y layer.
    pub image_count: i32,
    /// Gap between consecutive images; slices are contiguous.
    pub image_gap: usize,
    pub little_endian: bool,
}

impl Summary {
    pub fn new(grid: &GridConfig, header_offset: usize) -> Self {
        let n = grid.n_voxel();
        Self {
            model_bytes: grid.body_bytes() as u64,
            bit_depth: (DENSITY_SIZE * 8) as u32,
            image_width: n[X],
            image_height: n[Z],
            header_offset,
            image_count: n[Y],
            image_gap: 0,
            little_endian: Endianness::host() == Endianness::Little,
        }
    }

    pub fn endianness(&self) -> Endianness {
        if self.little_endian {
            Endianness::Little
        } else {
            Endianness::Big
        }
    }

    /// Human-readable summary for stdout.
    pub fn format_text(&self) -> String {
        let mut out = String::new();
        out.push_str("Output file details:\n");
        out.push_str(&format!("\tVoxel model size: {} byte\n", self.model_bytes));
        out.push_str(&format!("\tImage type: {} bit real\n", self.bit_depth));
        out.push_str(&format!("\tImage width: {} pixels\n", self.image_width));
        out.push_str(&format!("\tImage height: {} pixels\n", self.image_height));
        out.push_str(&format!(
            "\tOffset to first image: {} bytes\n",
            self.header_offset
        ));
        out.push_str(&format!("\tNumber of images: {}\n", self.image_count));
        out.push_str(&format!("\tGap between images: {} bytes\n", self.image_gap));
        let order = match self.endianness() {
            Endianness::Little => "Little endian byte order",
            Endianness::Big => "Big endian byte order",
        };
        out.push_str(&format!("\t{order}\n"));
        out
    }
}

/// Save a summary as pretty-printed JSON.
pub fn save_summary(path: &Path, summary: &Summary) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(summary).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}
