use ctrinvoice_core::error::CtrError;
use ctrinvoice_core::projection::xlsx::read_cells;
use ctrinvoice_core::projection::{builtin, target_cells};
use std::path::Path;

use crate::output;

pub fn run(file: &Path, preset: &str) -> Result<(), CtrError> {
    let projection = builtin::load_preset(preset)?;
    if !file.exists() {
        return Err(CtrError::SourceNotFound(file.to_path_buf()));
    }
    let bytes = std::fs::read(file)?;
    let values = read_cells(&bytes, &target_cells(&projection))?;

    output::table::print_cells(&projection, &values);
    Ok(())
}
