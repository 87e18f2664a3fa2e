use phantom_core::GridConfig;

use crate::error::PersistError;
use crate::format::PhantomHeader;

/// Validate a header and rebuild the grid it describes.
///
/// Fails if the voxel or plane counts disagree with the side length and
/// voxel size, which is what the projector relies on.
pub fn validate_header(header: &PhantomHeader) -> Result<GridConfig, PersistError> {
    Ok(GridConfig::from_header_fields(header.fields())?)
}

/// Check that a header read back from disk describes exactly `grid`.
pub fn check_matches(header: &PhantomHeader, grid: &GridConfig) -> Result<(), PersistError> {
    let expected = grid.header_fields();
    let actual = header.fields();
    if let Some(i) = (0..expected.len()).find(|&i| expected[i] != actual[i]) {
        return Err(PersistError::HeaderMismatch(format!(
            "field {} is {}, expected {}",
            i, actual[i], expected[i]
        )));
    }
    Ok(())
}
