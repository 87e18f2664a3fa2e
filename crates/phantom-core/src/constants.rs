//! Compiled-in scan geometry. All lengths share one integer unit; the
//! downstream projector reads them back from the file header unchanged.

/// Side length of one detector pixel.
pub const PIXEL_DIM: i32 = 85;

/// Angular span covered by the source trajectory, in degrees.
pub const ANGULAR_TRAJECTORY: i32 = 90;

/// Angular distance between two consecutive source positions, in degrees.
pub const POSITIONS_ANGULAR_DISTANCE: i32 = 15;

/// Side length of the cubic region holding the phantom.
pub const OBJECT_SIDE_LENGTH: i32 = 100_000;

/// Side length of the square detector.
pub const DETECTOR_SIDE_LENGTH: i32 = 200_000;

/// Distance between the object center and the detector.
pub const DISTANCE_OBJECT_DETECTOR: i32 = 150_000;

/// Distance between the object center and the source.
pub const DISTANCE_OBJECT_SOURCE: i32 = 600_000;

/// Voxel size along X.
pub const VOXEL_X_DIM: i32 = 100;

/// Voxel size along Y.
pub const VOXEL_Y_DIM: i32 = 100;

/// Voxel size along Z.
pub const VOXEL_Z_DIM: i32 = 100;

/// Detector pixels per side for the compiled-in geometry (integer division).
pub const N_PIXEL_ALONG_SIDE: i32 = DETECTOR_SIDE_LENGTH / PIXEL_DIM;

/// Maximum number of Y layers generated and flushed per slab.
pub const OBJ_BUFFER: u32 = 100;

/// Source-to-object distance factor applied when rescaling from `n`.
pub const SOURCE_DISTANCE_FACTOR: i64 = 6;

/// Detector-to-object distance factor applied when rescaling from `n`.
pub const DETECTOR_DISTANCE_FACTOR: f64 = 1.5;

/// Density written for voxels inside the phantom.
pub const SOLID_DENSITY: f64 = 1.0;

/// Density written for voxels outside the phantom.
pub const EMPTY_DENSITY: f64 = 0.0;

/// Default cavity radius as a fraction of the inscribed sphere radius.
pub const DEFAULT_CAVITY_RATIO: f64 = 0.5;
