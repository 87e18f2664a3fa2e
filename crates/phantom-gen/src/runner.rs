use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use phantom_core::constants::{DEFAULT_CAVITY_RATIO, OBJ_BUFFER};
use phantom_core::{BaseGeometry, GridConfig, ShapeEvaluator, ShapeKind};
use phantom_persist::{compat, read_header, Endianness, HeaderMode, PhantomWriter};

use crate::error::RunError;
use crate::report::Summary;
use crate::slab::{SlabGenerator, VoxelSlab};

/// Runtime knobs for one generation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub shape: ShapeKind,
    /// Maximum Y layers per slab.
    pub slab_rows: u32,
    /// Cavity radius as a fraction of the inscribed sphere radius.
    pub cavity_ratio: f64,
    pub header_mode: HeaderMode,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            shape: ShapeKind::default(),
            slab_rows: OBJ_BUFFER,
            cavity_ratio: DEFAULT_CAVITY_RATIO,
            header_mode: if cfg!(feature = "raw") {
                HeaderMode::Raw
            } else {
                HeaderMode::Standard
            },
        }
    }
}

/// Everything needed to produce one phantom file.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub output: PathBuf,
    pub base: BaseGeometry,
    /// Detector pixels per side; `None` keeps the base geometry.
    pub detector_pixels: Option<u32>,
    pub options: GenerationOptions,
    /// Re-read the written header and compare it with the generated grid.
    pub verify: bool,
}

/// Build the slab generator for `grid`: shape evaluator plus slab buffer.
pub fn prepare(grid: GridConfig, options: &GenerationOptions) -> Result<SlabGenerator, RunError> {
    if options.slab_rows == 0 {
        return Err(RunError::Usage("slab height must be at least 1".into()));
    }
    let shape = ShapeEvaluator::new(options.shape, &grid, options.cavity_ratio)?;
    let slab = VoxelSlab::for_grid(&grid, options.slab_rows)?;
    Ok(SlabGenerator::new(grid, shape, slab))
}

/// Stream the phantom produced by `generator` into `sink`.
///
/// Writes the header (unless `mode` is raw), then every slab bottom first.
/// Returns the sink and the header length in bytes.
pub fn write_phantom<W: Write>(
    generator: &mut SlabGenerator,
    mode: HeaderMode,
    sink: W,
) -> Result<(W, usize), RunError> {
    let mut writer = PhantomWriter::new(sink);

    if mode == HeaderMode::Standard {
        writer
            .write_header(generator.grid())
            .map_err(RunError::HeaderWrite)?;
    }

    let spans = generator.spans();
    let total = spans.len();
    for (i, span) in spans.enumerate() {
        let slab = generator.fill(span);
        writer.write_slab(slab.values).map_err(RunError::BodyWrite)?;
        log::debug!(
            "Slab {}/{} written: rows {}..{} (generation {})",
            i + 1,
            total,
            span.start,
            span.start + span.rows,
            slab.generation
        );
    }

    let header_len = writer.header_bytes();
    let sink = writer.finish().map_err(RunError::BodyWrite)?;
    Ok((sink, header_len))
}

/// Run a full generation: derive the grid, allocate the slab, open the
/// output, stream the phantom and optionally verify the header.
///
/// The output is opened only after the slab buffer exists, so configuration
/// and allocation failures never touch the file system. A write failure
/// leaves the partial file in place.
pub fn run(request: &RunRequest) -> Result<Summary, RunError> {
    let grid = GridConfig::derive(&request.base, request.detector_pixels)?;
    log::info!(
        "Grid: {:?} voxels of {:?}, object side {}, shape: {}",
        grid.n_voxel(),
        grid.voxel_dim(),
        grid.object_side_length(),
        request.options.shape.name()
    );

    let mut generator = prepare(grid, &request.options)?;

    let file = File::create(&request.output).map_err(|source| RunError::Open {
        path: request.output.clone(),
        source,
    })?;
    let (file, header_len) = write_phantom(&mut generator, request.options.header_mode, file)?;
    drop(file);

    if request.verify {
        verify_header(request, &grid)?;
    }

    log::info!(
        "Phantom written to {} ({})",
        request.output.display(),
        Endianness::host().name()
    );
    Ok(Summary::new(&grid, header_len))
}

fn verify_header(request: &RunRequest, grid: &GridConfig) -> Result<(), RunError> {
    if request.options.header_mode == HeaderMode::Raw {
        log::warn!("Skipping header verification: raw output has no header");
        return Ok(());
    }
    let file = File::open(&request.output).map_err(|source| RunError::Open {
        path: request.output.clone(),
        source,
    })?;
    let header = read_header(file).map_err(RunError::Verify)?;
    compat::check_matches(&header, grid).map_err(RunError::Verify)?;
    log::info!("Header verified against generated grid");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use phantom_core::constants::{EMPTY_DENSITY, SOLID_DENSITY};
    use phantom_core::GeometryError;
    use phantom_persist::{load, PersistError};
    use std::io;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("phantom-gen-{}-{}", std::process::id(), name))
    }

    fn request(name: &str, shape: ShapeKind, n: u32) -> RunRequest {
        RunRequest {
            output: temp_path(name),
            base: BaseGeometry::default(),
            detector_pixels: Some(n),
            options: GenerationOptions {
                shape,
                header_mode: HeaderMode::Standard,
                ..GenerationOptions::default()
            },
            verify: true,
        }
    }

    fn generate_bytes(shape: ShapeKind, n: u32, mode: HeaderMode, slab_rows: u32) -> Vec<u8> {
        let grid = GridConfig::derive(&BaseGeometry::default(), Some(n)).expect("valid n");
        let options = GenerationOptions {
            shape,
            slab_rows,
            header_mode: mode,
            ..GenerationOptions::default()
        };
        let mut generator = prepare(grid, &options).expect("prepare");
        let (bytes, _) = write_phantom(&mut generator, mode, Vec::new()).expect("write");
        bytes
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_output_is_deterministic() {
        for shape in [
            ShapeKind::Cube,
            ShapeKind::Sphere,
            ShapeKind::CubeWithSphericalCavity,
        ] {
            let a = generate_bytes(shape, 60, HeaderMode::Standard, 7);
            let b = generate_bytes(shape, 60, HeaderMode::Standard, 7);
            assert_eq!(a, b, "{shape:?}");
        }
    }

    #[test]
    fn test_slab_height_does_not_change_output() {
        let tall = generate_bytes(ShapeKind::Sphere, 80, HeaderMode::Standard, 100);
        let short = generate_bytes(ShapeKind::Sphere, 80, HeaderMode::Standard, 3);
        assert_eq!(tall, short);
    }

    #[test]
    fn test_header_roundtrip_through_file_bytes() {
        let bytes = generate_bytes(ShapeKind::Cube, 100, HeaderMode::Standard, 100);
        let grid = GridConfig::derive(&BaseGeometry::default(), Some(100)).expect("valid n");
        let loaded = load(&bytes, HeaderMode::Standard).expect("load");
        let (header, rebuilt) = loaded.header.expect("has header");
        assert_eq!(header.fields(), grid.header_fields());
        assert_eq!(rebuilt, grid);
        assert!(loaded.densities.iter().all(|&d| d == SOLID_DENSITY));
    }

    #[test]
    fn test_sphere_n_100_scenario() {
        let req = request("sphere-100.dat", ShapeKind::Sphere, 100);
        let summary = run(&req).expect("run should succeed");
        assert_eq!(summary.header_offset, 64);

        let bytes = std::fs::read(&req.output).expect("read output");
        let loaded = load(&bytes, HeaderMode::Standard).expect("load");
        assert_eq!(loaded.densities.len(), 42 * 42 * 42);
        assert_eq!(bytes.len(), 64 + 8 * 42 * 42 * 42);
        assert_eq!(loaded.density_at(21, 21, 21), Some(SOLID_DENSITY));
        assert_eq!(loaded.density_at(0, 0, 0), Some(EMPTY_DENSITY));
        assert_eq!(loaded.density_at(41, 41, 41), Some(EMPTY_DENSITY));
        std::fs::remove_file(&req.output).ok();
    }

    #[test]
    fn test_cavity_scenario() {
        let req = request("cavity-100.dat", ShapeKind::CubeWithSphericalCavity, 100);
        run(&req).expect("run should succeed");
        let bytes = std::fs::read(&req.output).expect("read output");
        let loaded = load(&bytes, HeaderMode::Standard).expect("load");
        assert_eq!(loaded.density_at(21, 21, 21), Some(EMPTY_DENSITY));
        assert_eq!(loaded.density_at(0, 0, 0), Some(SOLID_DENSITY));
        std::fs::remove_file(&req.output).ok();
    }

    #[test]
    fn test_raw_mode_has_no_header() {
        let mut req = request("raw-100.dat", ShapeKind::Cube, 100);
        req.options.header_mode = HeaderMode::Raw;
        let summary = run(&req).expect("run should succeed");
        assert_eq!(summary.header_offset, 0);

        let size = std::fs::metadata(&req.output).expect("metadata").len();
        assert_eq!(size, 8 * 42 * 42 * 42);
        std::fs::remove_file(&req.output).ok();
    }

    #[test]
    fn test_missing_directory_is_open_error() {
        let dir = temp_path("no-such-dir");
        let mut req = request("unused", ShapeKind::Cube, 100);
        req.output = dir.join("out.dat");
        let result = run(&req);
        assert!(matches!(result, Err(RunError::Open { .. })));
        assert_eq!(result.map(|_| ()).unwrap_err().exit_code(), 2);
        assert!(!req.output.exists());
    }

    #[test]
    fn test_config_error_precedes_open() {
        let mut req = request("never-created.dat", ShapeKind::CubeWithSphericalCavity, 100);
        req.options.cavity_ratio = 2.0;
        let result = run(&req);
        assert!(matches!(result, Err(RunError::Config(_))));
        assert!(!req.output.exists());
    }

    #[test]
    fn test_zero_slab_rows_rejected() {
        let mut req = request("zero-rows.dat", ShapeKind::Cube, 100);
        req.options.slab_rows = 0;
        assert!(matches!(run(&req), Err(RunError::Usage(_))));
        assert!(!req.output.exists());
    }

    #[test]
    fn test_header_write_failure_maps_to_header_error() {
        let grid = GridConfig::derive(&BaseGeometry::default(), Some(100)).expect("valid n");
        let mut generator = prepare(grid, &GenerationOptions::default()).expect("prepare");
        let result = write_phantom(&mut generator, HeaderMode::Standard, BrokenSink);
        match result {
            Err(err @ RunError::HeaderWrite(PersistError::HeaderWrite(_))) => {
                assert_eq!(err.exit_code(), 3)
            }
            Err(other) => panic!("expected header write error, got {other:?}"),
            Ok(_) => panic!("expected header write error"),
        }
    }

    #[test]
    fn test_body_write_failure_maps_to_body_error() {
        let grid = GridConfig::derive(&BaseGeometry::default(), Some(100)).expect("valid n");
        let mut generator = prepare(grid, &GenerationOptions::default()).expect("prepare");
        let result = write_phantom(&mut generator, HeaderMode::Raw, BrokenSink);
        match result {
            Err(err @ RunError::BodyWrite(_)) => assert_eq!(err.exit_code(), 4),
            Err(other) => panic!("expected body write error, got {other:?}"),
            Ok(_) => panic!("expected body write error"),
        }
    }

    #[test]
    fn test_default_request_uses_compiled_grid() {
        let req = RunRequest {
            detector_pixels: None,
            ..request("default.dat", ShapeKind::Cube, 1)
        };
        let grid = GridConfig::derive(&req.base, req.detector_pixels).expect("valid defaults");
        let header = phantom_persist::PhantomHeader::from(&grid);
        assert_eq!(header.n_voxel, [1000, 1000, 1000]);
        assert_eq!(header.n_planes, [1001, 1001, 1001]);
        assert_eq!(Summary::new(&grid, 64).model_bytes, 8_000_000_000);

        // Stream the header and the bottom layer of the full-size cube
        let options = GenerationOptions {
            slab_rows: 1,
            ..req.options
        };
        let mut generator = prepare(grid, &options).expect("prepare");
        let mut spans = generator.spans();
        assert_eq!(spans.len(), 1000);
        let first = spans.next().expect("first slab");
        assert_eq!(first.start, 0);
        assert_eq!(first.rows, 1);

        let mut writer = PhantomWriter::new(Vec::new());
        writer.write_header(generator.grid()).expect("header");
        let slab = generator.fill(first);
        assert_eq!(slab.values.len(), 1000 * 1000);
        assert!(slab.values.iter().all(|&v| v == SOLID_DENSITY));
        writer.write_slab(slab.values).expect("slab");
        let bytes = writer.finish().expect("finish");
        assert_eq!(bytes.len(), 64 + 8 * 1000 * 1000);
        let read_back = read_header(bytes.as_slice()).expect("header");
        assert_eq!(read_back, header);
    }

    #[test]
    fn test_unaddressable_grid_is_config_error() {
        let req = request("huge.dat", ShapeKind::Sphere, 8_000_000);
        let err = run(&req).expect_err("grid too large");
        assert!(matches!(err, RunError::Config(GeometryError::GridTooLarge(_))));
        assert_eq!(err.exit_code(), 1);
        assert!(!req.output.exists());
    }
}
