//! Grid geometry: the base scan constants and the voxel grid derived from them.

use glam::UVec3;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::GeometryError;

/// Axis index of X in the `[i32; 3]` per-axis arrays.
pub const X: usize = 0;
/// Axis index of Y.
pub const Y: usize = 1;
/// Axis index of Z.
pub const Z: usize = 2;

/// Number of integers in the serialized geometry header.
pub const HEADER_FIELD_COUNT: usize = 16;

/// Base scan constants the grid is derived from.
///
/// `Default` yields the compiled-in constants. A RON file may override any
/// subset of fields; missing fields keep their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseGeometry {
    pub pixel_dim: i32,
    pub angular_trajectory: i32,
    pub positions_angular_distance: i32,
    pub object_side_length: i32,
    pub detector_side_length: i32,
    pub distance_object_detector: i32,
    pub distance_object_source: i32,
    pub voxel_dim: [i32; 3],
}

impl Default for BaseGeometry {
    fn default() -> Self {
        Self {
            pixel_dim: PIXEL_DIM,
            angular_trajectory: ANGULAR_TRAJECTORY,
            positions_angular_distance: POSITIONS_ANGULAR_DISTANCE,
            object_side_length: OBJECT_SIDE_LENGTH,
            detector_side_length: DETECTOR_SIDE_LENGTH,
            distance_object_detector: DISTANCE_OBJECT_DETECTOR,
            distance_object_source: DISTANCE_OBJECT_SOURCE,
            voxel_dim: [VOXEL_X_DIM, VOXEL_Y_DIM, VOXEL_Z_DIM],
        }
    }
}

impl BaseGeometry {
    /// Parse base constants from a RON string.
    pub fn from_ron_str(ron_str: &str) -> Result<Self, GeometryError> {
        let options = ron::Options::default();
        options
            .from_str(ron_str)
            .map_err(|e| GeometryError::ParseError(e.to_string()))
    }

    /// Detector pixels per side of the base geometry (truncating).
    pub fn detector_pixels_per_side(&self) -> i32 {
        self.detector_side_length / self.pixel_dim
    }

    fn validate(&self) -> Result<(), GeometryError> {
        positive("pixel_dim", self.pixel_dim)?;
        positive("object_side_length", self.object_side_length)?;
        positive("voxel_dim[X]", self.voxel_dim[X])?;
        positive("voxel_dim[Y]", self.voxel_dim[Y])?;
        positive("voxel_dim[Z]", self.voxel_dim[Z])?;
        positive(
            "detector pixels per side",
            self.detector_pixels_per_side(),
        )
    }
}

/// Fully derived, immutable grid geometry.
///
/// Constructed only through [`GridConfig::derive`] or
/// [`GridConfig::from_header_fields`], so `n_voxel` and `n_planes` always
/// agree with `object_side_length` and `voxel_dim`, and the byte size of
/// the whole density body fits a `usize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridConfig {
    pixel_dim: i32,
    angular_trajectory: i32,
    positions_angular_distance: i32,
    object_side_length: i32,
    detector_side_length: i32,
    distance_object_detector: i32,
    distance_object_source: i32,
    voxel_dim: [i32; 3],
    n_voxel: [i32; 3],
    n_planes: [i32; 3],
}

impl GridConfig {
    /// Derive the grid from base constants and an optional detector
    /// resolution `n` (pixels per detector side).
    ///
    /// Without `n` every base constant is kept. With `n` the object side is
    /// rescaled so the voxel-to-detector resolution ratio of the base
    /// geometry is preserved, and the detector and source distances follow
    /// the object side. Every division truncates.
    pub fn derive(
        base: &BaseGeometry,
        detector_pixels: Option<u32>,
    ) -> Result<Self, GeometryError> {
        base.validate()?;

        let Some(n) = detector_pixels else {
            return Self::with_counts(
                base,
                base.object_side_length,
                base.detector_side_length,
                base.distance_object_detector,
                base.distance_object_source,
            );
        };
        if n == 0 {
            return Err(GeometryError::ZeroDetectorPixels(n));
        }

        let n = n as i64;
        let ratio = base.object_side_length as f64
            / (base.voxel_dim[X] as i64 * base.detector_pixels_per_side() as i64) as f64;
        let object_side_length = narrow_f64(
            "object_side_length",
            (n * base.voxel_dim[X] as i64) as f64 * ratio,
        )?;
        let detector_side_length =
            narrow_i64("detector_side_length", n * base.pixel_dim as i64)?;
        let distance_object_detector = narrow_f64(
            "distance_object_detector",
            DETECTOR_DISTANCE_FACTOR * object_side_length as f64,
        )?;
        let distance_object_source = narrow_i64(
            "distance_object_source",
            SOURCE_DISTANCE_FACTOR * object_side_length as i64,
        )?;

        let grid = Self::with_counts(
            base,
            object_side_length,
            detector_side_length,
            distance_object_detector,
            distance_object_source,
        )?;
        if grid.voxel_count() == 0 {
            log::warn!(
                "n = {n} yields an empty grid (object side {object_side_length}, voxel counts {:?})",
                grid.n_voxel
            );
        }
        Ok(grid)
    }

    fn with_counts(
        base: &BaseGeometry,
        object_side_length: i32,
        detector_side_length: i32,
        distance_object_detector: i32,
        distance_object_source: i32,
    ) -> Result<Self, GeometryError> {
        let voxel_dim = base.voxel_dim;
        let n_voxel = [
            object_side_length / voxel_dim[X],
            object_side_length / voxel_dim[Y],
            object_side_length / voxel_dim[Z],
        ];

        const PLANE_FIELDS: [&str; 3] = ["n_planes[X]", "n_planes[Y]", "n_planes[Z]"];
        let mut n_planes = [0; 3];
        for axis in [X, Y, Z] {
            n_planes[axis] = n_voxel[axis]
                .checked_add(1)
                .ok_or(GeometryError::Overflow {
                    field: PLANE_FIELDS[axis],
                    value: n_voxel[axis] as f64 + 1.0,
                })?;
        }

        // Counts are non-negative here: the side length and voxel sizes are.
        let body_bytes = (n_voxel[X] as usize)
            .checked_mul(n_voxel[Z] as usize)
            .and_then(|slice| slice.checked_mul(n_voxel[Y] as usize))
            .and_then(|count| count.checked_mul(std::mem::size_of::<f64>()));
        if body_bytes.is_none() {
            return Err(GeometryError::GridTooLarge(n_voxel));
        }

        Ok(Self {
            pixel_dim: base.pixel_dim,
            angular_trajectory: base.angular_trajectory,
            positions_angular_distance: base.positions_angular_distance,
            object_side_length,
            detector_side_length,
            distance_object_detector,
            distance_object_source,
            voxel_dim,
            n_voxel,
            n_planes,
        })
    }

    /// Rebuild a grid from the 16 serialized header integers, checking that
    /// the voxel and plane counts agree with the side length and voxel size.
    pub fn from_header_fields(fields: [i32; HEADER_FIELD_COUNT]) -> Result<Self, GeometryError> {
        let base = BaseGeometry {
            pixel_dim: fields[0],
            angular_trajectory: fields[1],
            positions_angular_distance: fields[2],
            object_side_length: fields[3],
            detector_side_length: fields[4],
            distance_object_detector: fields[5],
            distance_object_source: fields[6],
            voxel_dim: [fields[7], fields[8], fields[9]],
        };
        positive("voxel_dim[X]", base.voxel_dim[X])?;
        positive("voxel_dim[Y]", base.voxel_dim[Y])?;
        positive("voxel_dim[Z]", base.voxel_dim[Z])?;
        if base.object_side_length < 0 {
            return Err(GeometryError::NonPositive {
                field: "object_side_length",
                value: base.object_side_length as i64,
            });
        }

        let grid = Self::with_counts(
            &base,
            base.object_side_length,
            base.detector_side_length,
            base.distance_object_detector,
            base.distance_object_source,
        )?;

        const VOXEL_FIELDS: [&str; 3] = ["n_voxel[X]", "n_voxel[Y]", "n_voxel[Z]"];
        const PLANE_FIELDS: [&str; 3] = ["n_planes[X]", "n_planes[Y]", "n_planes[Z]"];
        for axis in [X, Y, Z] {
            expect_field(VOXEL_FIELDS[axis], grid.n_voxel[axis], fields[10 + axis])?;
            expect_field(PLANE_FIELDS[axis], grid.n_planes[axis], fields[13 + axis])?;
        }
        Ok(grid)
    }

    /// The 16 header integers in serialization order.
    pub fn header_fields(&self) -> [i32; HEADER_FIELD_COUNT] {
        [
            self.pixel_dim,
            self.angular_trajectory,
            self.positions_angular_distance,
            self.object_side_length,
            self.detector_side_length,
            self.distance_object_detector,
            self.distance_object_source,
            self.voxel_dim[X],
            self.voxel_dim[Y],
            self.voxel_dim[Z],
            self.n_voxel[X],
            self.n_voxel[Y],
            self.n_voxel[Z],
            self.n_planes[X],
            self.n_planes[Y],
            self.n_planes[Z],
        ]
    }

    pub fn pixel_dim(&self) -> i32 {
        self.pixel_dim
    }

    pub fn angular_trajectory(&self) -> i32 {
        self.angular_trajectory
    }

    pub fn positions_angular_distance(&self) -> i32 {
        self.positions_angular_distance
    }

    pub fn object_side_length(&self) -> i32 {
        self.object_side_length
    }

    pub fn detector_side_length(&self) -> i32 {
        self.detector_side_length
    }

    pub fn distance_object_detector(&self) -> i32 {
        self.distance_object_detector
    }

    pub fn distance_object_source(&self) -> i32 {
        self.distance_object_source
    }

    pub fn voxel_dim(&self) -> [i32; 3] {
        self.voxel_dim
    }

    pub fn n_voxel(&self) -> [i32; 3] {
        self.n_voxel
    }

    pub fn n_planes(&self) -> [i32; 3] {
        self.n_planes
    }

    /// Voxel counts as an unsigned vector. Counts are never negative.
    pub fn extent(&self) -> UVec3 {
        UVec3::new(
            self.n_voxel[X] as u32,
            self.n_voxel[Y] as u32,
            self.n_voxel[Z] as u32,
        )
    }

    /// Number of voxels in one horizontal (XZ) slice.
    pub fn slice_len(&self) -> usize {
        self.n_voxel[X] as usize * self.n_voxel[Z] as usize
    }

    /// Total number of voxels in the grid.
    pub fn voxel_count(&self) -> usize {
        self.slice_len() * self.n_voxel[Y] as usize
    }

    /// Size in bytes of the density body, one `f64` per voxel.
    pub fn body_bytes(&self) -> usize {
        self.voxel_count() * std::mem::size_of::<f64>()
    }

    /// Radius of the sphere inscribed in the object cube (integer halving).
    pub fn sphere_radius(&self) -> f64 {
        (self.object_side_length / 2) as f64
    }
}

fn positive(field: &'static str, value: i32) -> Result<(), GeometryError> {
    if value <= 0 {
        return Err(GeometryError::NonPositive {
            field,
            value: value as i64,
        });
    }
    Ok(())
}

fn expect_field(field: &'static str, expected: i32, actual: i32) -> Result<(), GeometryError> {
    if expected != actual {
        return Err(GeometryError::Inconsistent {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}

fn narrow_i64(field: &'static str, value: i64) -> Result<i32, GeometryError> {
    i32::try_from(value).map_err(|_| GeometryError::Overflow {
        field,
        value: value as f64,
    })
}

/// Truncate toward zero, as an integer assignment from a double does.
fn narrow_f64(field: &'static str, value: f64) -> Result<i32, GeometryError> {
    let truncated = value.trunc();
    if !truncated.is_finite() || truncated < i32::MIN as f64 || truncated > i32::MAX as f64 {
        return Err(GeometryError::Overflow { field, value });
    }
    Ok(truncated as i32)
}
