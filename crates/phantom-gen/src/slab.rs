//! Chunked slab generation.
//!
//! The grid is produced in Y-ascending slabs of at most `max_rows` layers,
//! each filled into one reusable buffer. Peak memory is bounded by
//! `n_voxel[X] * n_voxel[Z] * max_rows` densities regardless of the grid height.

use std::num::NonZeroU32;

use glam::UVec3;
use phantom_core::{GridConfig, Shape, ShapeEvaluator};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::RunError;

/// A contiguous run of Y layers: `start..start + rows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlabSpan {
    pub start: u32,
    pub rows: u32,
}

/// Iterator over the slabs covering `0..total_rows`.
///
/// Every slab holds `max_rows` layers except possibly the last, which is
/// sized down to the remainder.
#[derive(Debug, Clone)]
pub struct SlabSpans {
    next: u32,
    total_rows: u32,
    max_rows: NonZeroU32,
}

impl SlabSpans {
    pub fn new(total_rows: u32, max_rows: NonZeroU32) -> Self {
        Self {
            next: 0,
            total_rows,
            max_rows,
        }
    }
}

impl Iterator for SlabSpans {
    type Item = SlabSpan;

    fn next(&mut self) -> Option<SlabSpan> {
        if self.next >= self.total_rows {
            return None;
        }
        let start = self.next;
        let rows = self.max_rows.get().min(self.total_rows - start);
        self.next = start + rows;
        Some(SlabSpan { start, rows })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .total_rows
            .saturating_sub(self.next)
            .div_ceil(self.max_rows.get()) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SlabSpans {}

/// Reusable density buffer sized for one full slab.
///
/// Allocated once; every fill overwrites it in place and bumps `generation`.
pub struct VoxelSlab {
    values: Vec<f64>,
    slice_len: usize,
    max_rows: NonZeroU32,
    generation: u64,
}

impl VoxelSlab {
    /// Reserve room for `max_rows` slices of `slice_len` densities.
    pub fn allocate(slice_len: usize, max_rows: u32) -> Result<Self, RunError> {
        let max_rows = NonZeroU32::new(max_rows)
            .ok_or_else(|| RunError::Usage("slab height must be at least 1".into()))?;
        let len = slice_len
            .checked_mul(max_rows.get() as usize)
            .ok_or(RunError::Allocation { bytes: usize::MAX })?;
        let bytes = len.saturating_mul(std::mem::size_of::<f64>());

        let mut values = Vec::new();
        values
            .try_reserve_exact(len)
            .map_err(|_| RunError::Allocation { bytes })?;
        values.resize(len, 0.0);
        log::debug!("Allocated slab buffer: {max_rows} rows x {slice_len} voxels ({bytes} bytes)");

        Ok(Self {
            values,
            slice_len,
            max_rows,
            generation: 0,
        })
    }

    /// Allocate a slab for `grid`, clamping the height to the grid's Y extent
    /// so small grids do not reserve unused rows.
    pub fn for_grid(grid: &GridConfig, max_rows: u32) -> Result<Self, RunError> {
        let rows = max_rows.min(grid.extent().y).max(1);
        Self::allocate(grid.slice_len(), rows)
    }

    pub fn max_rows(&self) -> u32 {
        self.max_rows.get()
    }

    pub fn slice_len(&self) -> usize {
        self.slice_len
    }

    /// Number of completed fills.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A fully computed slab, borrowed from the generator until it is written.
///
/// The generator cannot refill its buffer while this borrow is alive.
#[derive(Debug)]
pub struct FilledSlab<'a> {
    pub span: SlabSpan,
    pub generation: u64,
    pub values: &'a [f64],
}

/// Produces the grid slab by slab from a shape evaluator.
pub struct SlabGenerator {
    grid: GridConfig,
    shape: ShapeEvaluator,
    slab: VoxelSlab,
}

impl SlabGenerator {
    pub fn new(grid: GridConfig, shape: ShapeEvaluator, slab: VoxelSlab) -> Self {
        debug_assert_eq!(slab.slice_len(), grid.slice_len());
        Self { grid, shape, slab }
    }

    pub fn grid(&self) -> &GridConfig {
        &self.grid
    }

    pub fn shape(&self) -> &ShapeEvaluator {
        &self.shape
    }

    /// Slabs covering the whole grid, bottom first.
    pub fn spans(&self) -> SlabSpans {
        SlabSpans::new(self.grid.extent().y, self.slab.max_rows)
    }

    /// Evaluate every voxel of `span` into the reusable buffer.
    pub fn fill(&mut self, span: SlabSpan) -> FilledSlab<'_> {
        debug_assert!(span.rows <= self.slab.max_rows.get());
        let len = self.slab.slice_len * span.rows as usize;
        let values = &mut self.slab.values[..len];
        let extent = self.grid.extent();

        match &self.shape {
            ShapeEvaluator::Cube(shape) => fill_layers(shape, values, extent, span.start),
            ShapeEvaluator::Sphere(shape) => fill_layers(shape, values, extent, span.start),
            ShapeEvaluator::CubeWithCavity(shape) => {
                fill_layers(shape, values, extent, span.start)
            }
        }

        self.slab.generation += 1;
        FilledSlab {
            span,
            generation: self.slab.generation,
            values: &self.slab.values[..len],
        }
    }

    /// Give the buffer back, e.g. to reuse it for another grid of the same shape.
    pub fn into_slab(self) -> VoxelSlab {
        self.slab
    }
}

/// Fill consecutive Y layers starting at `first_row`.
///
/// Layers are independent, so with the `parallel` feature each one is
/// evaluated on the rayon pool; the call returns only once all are done.
fn fill_layers<S: Shape>(shape: &S, values: &mut [f64], extent: UVec3, first_row: u32) {
    #[cfg(feature = "parallel")]
    fill_layers_parallel(shape, values, extent, first_row);

    #[cfg(not(feature = "parallel"))]
    fill_layers_serial(shape, values, extent, first_row);
}

#[cfg(feature = "parallel")]
fn fill_layers_parallel<S: Shape>(shape: &S, values: &mut [f64], extent: UVec3, first_row: u32) {
    let slice_len = extent.x as usize * extent.z as usize;
    if slice_len == 0 {
        return;
    }
    values
        .par_chunks_mut(slice_len)
        .enumerate()
        .for_each(|(row, layer)| fill_layer(shape, layer, extent, first_row + row as u32));
}

#[cfg_attr(all(feature = "parallel", not(test)), allow(dead_code))]
fn fill_layers_serial<S: Shape>(shape: &S, values: &mut [f64], extent: UVec3, first_row: u32) {
    let slice_len = extent.x as usize * extent.z as usize;
    if slice_len == 0 {
        return;
    }
    values
        .chunks_mut(slice_len)
        .enumerate()
        .for_each(|(row, layer)| fill_layer(shape, layer, extent, first_row + row as u32));
}

/// One XZ slice, X varying fastest. `extent.x` must be non-zero.
#[inline]
fn fill_layer<S: Shape>(shape: &S, layer: &mut [f64], extent: UVec3, y: u32) {
    for (z, row) in layer.chunks_mut(extent.x as usize).enumerate() {
        for (x, value) in row.iter_mut().enumerate() {
            *value = shape.density(UVec3::new(x as u32, y, z as u32));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phantom_core::constants::{EMPTY_DENSITY, OBJ_BUFFER, SOLID_DENSITY};
    use phantom_core::{BaseGeometry, ShapeKind};

    fn grid_with_rows(ny: i32) -> GridConfig {
        // 5 x ny x 3 voxels
        let base = BaseGeometry {
            object_side_length: 15 * ny,
            voxel_dim: [3 * ny, 15, 5 * ny],
            ..BaseGeometry::default()
        };
        GridConfig::derive(&base, None).expect("valid base")
    }

    fn generator(grid: GridConfig, kind: ShapeKind, max_rows: u32) -> SlabGenerator {
        let shape = ShapeEvaluator::new(kind, &grid, 0.5).expect("valid shape");
        let slab = VoxelSlab::for_grid(&grid, max_rows).expect("allocate");
        SlabGenerator::new(grid, shape, slab)
    }

    fn rows(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).expect("non-zero rows")
    }

    fn collect(slabs: &mut SlabGenerator) -> (Vec<SlabSpan>, Vec<f64>) {
        let spans: Vec<SlabSpan> = slabs.spans().collect();
        let mut values = Vec::new();
        for &span in &spans {
            values.extend_from_slice(slabs.fill(span).values);
        }
        (spans, values)
    }

    #[test]
    fn test_spans_cover_rows_with_short_tail() {
        let spans: Vec<SlabSpan> = SlabSpans::new(250, rows(100)).collect();
        assert_eq!(
            spans,
            vec![
                SlabSpan { start: 0, rows: 100 },
                SlabSpan { start: 100, rows: 100 },
                SlabSpan { start: 200, rows: 50 },
            ]
        );
        assert_eq!(SlabSpans::new(200, rows(100)).count(), 2);
        assert_eq!(SlabSpans::new(0, rows(100)).count(), 0);
        assert_eq!(SlabSpans::new(1, rows(OBJ_BUFFER)).len(), 1);
        assert_eq!(SlabSpans::new(u32::MAX, rows(1)).len(), u32::MAX as usize);
    }

    #[test]
    fn test_slab_completeness() {
        for (ny, max_rows) in [(7, 3), (7, 7), (7, 100), (12, 5), (1, 1)] {
            let grid = grid_with_rows(ny);
            assert_eq!(grid.n_voxel(), [5, ny, 3]);
            let mut slabs = generator(grid, ShapeKind::Cube, max_rows);
            let (spans, values) = collect(&mut slabs);

            let expected_slabs = (ny as u32).div_ceil(max_rows);
            assert_eq!(spans.len() as u32, expected_slabs, "ny {ny}, rows {max_rows}");
            for span in &spans {
                let remaining = ny as u32 - span.start;
                assert_eq!(span.rows, max_rows.min(remaining));
            }
            assert_eq!(values.len(), grid.voxel_count());
        }
    }

    #[test]
    fn test_slab_order_is_x_then_z_then_y() {
        let grid = grid_with_rows(4);
        let shape = ShapeEvaluator::new(ShapeKind::Sphere, &grid, 0.5).expect("valid shape");
        let mut slabs = generator(grid, ShapeKind::Sphere, 3);
        let (_, values) = collect(&mut slabs);

        let e = grid.extent();
        let mut i = 0;
        for y in 0..e.y {
            for z in 0..e.z {
                for x in 0..e.x {
                    assert_eq!(values[i], shape.density(UVec3::new(x, y, z)), "({x}, {y}, {z})");
                    i += 1;
                }
            }
        }
    }

    #[test]
    fn test_buffer_reused_across_fills() {
        let grid = grid_with_rows(10);
        let mut slabs = generator(grid, ShapeKind::Cube, 4);
        let ptr = slabs.slab.values.as_ptr();
        let spans: Vec<SlabSpan> = slabs.spans().collect();
        for (i, &span) in spans.iter().enumerate() {
            let filled = slabs.fill(span);
            assert_eq!(filled.generation, i as u64 + 1);
            assert_eq!(filled.values.as_ptr(), ptr);
            assert!(filled.values.iter().all(|&v| v == SOLID_DENSITY));
        }
        assert_eq!(slabs.into_slab().generation(), 3);
    }

    #[test]
    fn test_sphere_slabs_match_direct_evaluation() {
        let grid = GridConfig::derive(&BaseGeometry::default(), Some(100)).expect("valid n");
        let mut slabs = generator(grid, ShapeKind::Sphere, 10);
        let (spans, values) = collect(&mut slabs);
        assert_eq!(spans.len(), 5);
        assert_eq!(values.len(), 42 * 42 * 42);

        let center = 21 * 42 * 42 + 21 * 42 + 21;
        assert_eq!(values[center], SOLID_DENSITY);
        assert_eq!(values[0], EMPTY_DENSITY);
        assert_eq!(values[values.len() - 1], EMPTY_DENSITY);
    }

    #[test]
    fn test_empty_grid_yields_no_slabs() {
        let grid = GridConfig::derive(&BaseGeometry::default(), Some(1)).expect("valid n");
        assert_eq!(grid.voxel_count(), 0);
        let mut slabs = generator(grid, ShapeKind::Cube, OBJ_BUFFER);
        let (spans, values) = collect(&mut slabs);
        assert!(spans.is_empty());
        assert!(values.is_empty());
    }

    #[test]
    fn test_slab_height_clamped_to_grid() {
        let grid = grid_with_rows(7);
        let slab = VoxelSlab::for_grid(&grid, OBJ_BUFFER).expect("allocate");
        assert_eq!(slab.max_rows(), 7);
        assert_eq!(slab.slice_len(), 15);
    }

    #[test]
    fn test_zero_slab_height_rejected() {
        let result = VoxelSlab::allocate(15, 0);
        assert!(matches!(result, Err(RunError::Usage(_))));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_fill_matches_serial() {
        let grid = GridConfig::derive(&BaseGeometry::default(), Some(60)).expect("valid n");
        let extent = grid.extent();
        for kind in [
            ShapeKind::Cube,
            ShapeKind::Sphere,
            ShapeKind::CubeWithSphericalCavity,
        ] {
            let shape = ShapeEvaluator::new(kind, &grid, 0.5).expect("valid shape");
            let len = grid.voxel_count();
            let mut serial = vec![-1.0; len];
            let mut parallel = vec![-1.0; len];
            fill_layers_serial(&shape, &mut serial, extent, 0);
            fill_layers_parallel(&shape, &mut parallel, extent, 0);
            assert_eq!(serial, parallel, "{kind:?}");
            assert!(serial.iter().all(|&v| v >= 0.0), "{kind:?}");
        }
    }

    #[test]
    fn test_layer_rows_follow_x_extent() {
        // Non-square slice: 5 wide, 3 deep
        let grid = grid_with_rows(2);
        let shape = ShapeEvaluator::new(ShapeKind::Cube, &grid, 0.5).expect("valid shape");
        let mut layer = vec![-1.0; grid.slice_len()];
        fill_layer(&shape, &mut layer, grid.extent(), 1);
        assert!(layer.iter().all(|&v| v == SOLID_DENSITY));
    }

    #[test]
    fn test_oversized_allocation_fails() {
        let result = VoxelSlab::allocate(usize::MAX / 4, 2);
        assert!(matches!(result, Err(RunError::Allocation { .. })));
    }
}
