//! Density functions for the built-in phantom shapes.
//!
//! Every evaluator is a pure function of the voxel index and the immutable
//! grid, so voxels may be evaluated in any order and on any thread.

use glam::{DVec3, IVec3, UVec3};

use crate::constants::{EMPTY_DENSITY, SOLID_DENSITY};
use crate::error::GeometryError;
use crate::geometry::GridConfig;

/// Phantom shape family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShapeKind {
    /// Solid cube filling the whole grid.
    #[default]
    Cube,
    /// Solid sphere inscribed in the grid.
    Sphere,
    /// Solid cube with a centered spherical void.
    CubeWithSphericalCavity,
}

impl ShapeKind {
    /// Map the numeric object type used on the command line.
    /// 1 = cube with cavity, 2 = sphere, anything else = cube.
    pub fn from_object_type(code: i32) -> Self {
        match code {
            1 => ShapeKind::CubeWithSphericalCavity,
            2 => ShapeKind::Sphere,
            _ => ShapeKind::Cube,
        }
    }

    /// Canonical numeric object type.
    pub fn object_type(self) -> i32 {
        match self {
            ShapeKind::CubeWithSphericalCavity => 1,
            ShapeKind::Sphere => 2,
            ShapeKind::Cube => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Cube => "solid cube",
            ShapeKind::Sphere => "solid sphere",
            ShapeKind::CubeWithSphericalCavity => "cube with spherical cavity",
        }
    }
}

/// A density field over voxel indices.
pub trait Shape: Sync {
    /// Density of the voxel at `voxel`: [`SOLID_DENSITY`] or [`EMPTY_DENSITY`].
    fn density(&self, voxel: UVec3) -> f64;
}

/// Maps voxel indices to physical voxel centers.
///
/// Shared by every evaluator so shape boundaries agree voxel for voxel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelLattice {
    extent: UVec3,
    voxel_dim: DVec3,
    center: DVec3,
}

impl VoxelLattice {
    pub fn new(grid: &GridConfig) -> Self {
        let extent = grid.extent();
        let voxel_dim = IVec3::from_array(grid.voxel_dim()).as_dvec3();
        Self {
            extent,
            voxel_dim,
            center: extent.as_dvec3() * voxel_dim * 0.5,
        }
    }

    /// Voxel counts along each axis.
    pub fn extent(&self) -> UVec3 {
        self.extent
    }

    pub fn contains(&self, voxel: UVec3) -> bool {
        voxel.cmplt(self.extent).all()
    }

    /// Physical center of a voxel, measured from the grid origin corner.
    pub fn voxel_center(&self, voxel: UVec3) -> DVec3 {
        (voxel.as_dvec3() + DVec3::splat(0.5)) * self.voxel_dim
    }

    /// Physical center of the whole grid.
    pub fn grid_center(&self) -> DVec3 {
        self.center
    }

    /// Euclidean distance between a voxel center and the grid center.
    pub fn center_distance(&self, voxel: UVec3) -> f64 {
        self.voxel_center(voxel).distance(self.center)
    }
}

fn density_of(inside: bool) -> f64 {
    if inside {
        SOLID_DENSITY
    } else {
        EMPTY_DENSITY
    }
}

/// Solid block: every voxel in bounds is filled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cube {
    lattice: VoxelLattice,
}

impl Cube {
    pub fn new(grid: &GridConfig) -> Self {
        Self {
            lattice: VoxelLattice::new(grid),
        }
    }
}

impl Shape for Cube {
    #[inline]
    fn density(&self, voxel: UVec3) -> f64 {
        density_of(self.lattice.contains(voxel))
    }
}

/// Solid ball: filled where the center distance is at most `radius`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    lattice: VoxelLattice,
    radius: f64,
}

impl Sphere {
    /// Sphere inscribed in the object cube.
    pub fn new(grid: &GridConfig) -> Self {
        Self::with_radius(grid, grid.sphere_radius())
    }

    pub fn with_radius(grid: &GridConfig, radius: f64) -> Self {
        Self {
            lattice: VoxelLattice::new(grid),
            radius,
        }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }
}

impl Shape for Sphere {
    #[inline]
    fn density(&self, voxel: UVec3) -> f64 {
        density_of(
            self.lattice.contains(voxel) && self.lattice.center_distance(voxel) <= self.radius,
        )
    }
}

/// Solid block with a centered void of radius `cavity_radius`.
///
/// The exact complement of a [`Sphere`] of the same radius within the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeWithCavity {
    lattice: VoxelLattice,
    cavity_radius: f64,
}

impl CubeWithCavity {
    /// Cavity radius is `cavity_ratio` times the inscribed sphere radius.
    pub fn new(grid: &GridConfig, cavity_ratio: f64) -> Result<Self, GeometryError> {
        if !cavity_ratio.is_finite() || !(0.0..=1.0).contains(&cavity_ratio) {
            return Err(GeometryError::InvalidCavityRatio(cavity_ratio));
        }
        Ok(Self {
            lattice: VoxelLattice::new(grid),
            cavity_radius: grid.sphere_radius() * cavity_ratio,
        })
    }

    pub fn cavity_radius(&self) -> f64 {
        self.cavity_radius
    }
}

impl Shape for CubeWithCavity {
    #[inline]
    fn density(&self, voxel: UVec3) -> f64 {
        density_of(
            self.lattice.contains(voxel)
                && self.lattice.center_distance(voxel) > self.cavity_radius,
        )
    }
}

/// The evaluator selected for a run.
///
/// Hot loops match on this once and then call the concrete shape, so the
/// per-voxel path never branches on the shape kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeEvaluator {
    Cube(Cube),
    Sphere(Sphere),
    CubeWithCavity(CubeWithCavity),
}

impl ShapeEvaluator {
    pub fn new(
        kind: ShapeKind,
        grid: &GridConfig,
        cavity_ratio: f64,
    ) -> Result<Self, GeometryError> {
        Ok(match kind {
            ShapeKind::Cube => ShapeEvaluator::Cube(Cube::new(grid)),
            ShapeKind::Sphere => ShapeEvaluator::Sphere(Sphere::new(grid)),
            ShapeKind::CubeWithSphericalCavity => {
                ShapeEvaluator::CubeWithCavity(CubeWithCavity::new(grid, cavity_ratio)?)
            }
        })
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeEvaluator::Cube(_) => ShapeKind::Cube,
            ShapeEvaluator::Sphere(_) => ShapeKind::Sphere,
            ShapeEvaluator::CubeWithCavity(_) => ShapeKind::CubeWithSphericalCavity,
        }
    }
}

impl Shape for ShapeEvaluator {
    fn density(&self, voxel: UVec3) -> f64 {
        match self {
            ShapeEvaluator::Cube(shape) => shape.density(voxel),
            ShapeEvaluator::Sphere(shape) => shape.density(voxel),
            ShapeEvaluator::CubeWithCavity(shape) => shape.density(voxel),
        }
    }
}
