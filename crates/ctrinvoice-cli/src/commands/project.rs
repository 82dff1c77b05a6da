use ctrinvoice_core::error::CtrError;
use ctrinvoice_core::projection::builtin;
use ctrinvoice_core::projection::xlsx::XlsxTemplate;
use ctrinvoice_core::store::TagStore;
use std::path::PathBuf;

use super::{db_path, output_path, DEFAULT_PROJECTION};
use crate::output;

pub fn run(
    template: PathBuf,
    db: Option<PathBuf>,
    projection_file: Option<PathBuf>,
    preset: Option<String>,
    out: Option<PathBuf>,
    output_format: &str,
) -> Result<(), CtrError> {
    let projection = match projection_file {
        Some(path) => ctrinvoice_core::projection::load_projection(&path)?,
        None => builtin::load_preset(preset.as_deref().unwrap_or(DEFAULT_PROJECTION))?,
    };

    // Opening a missing store would silently create an empty one
    let db = db_path(db);
    if !db.exists() {
        return Err(CtrError::SourceNotFound(db));
    }
    let store = TagStore::open(&db)?;

    let out = output_path(&template, out);
    if ctrinvoice_core::same_file(&template, &out) {
        return Err(CtrError::Template(format!(
            "output {} would overwrite the template",
            out.display()
        )));
    }

    let mut workbook = XlsxTemplate::open(&template)?;
    let report = ctrinvoice_core::project_store(&store, &projection, &mut workbook)?;
    workbook.save(&out)?;

    match output_format {
        "json" => output::json::print(&report)?,
        _ => {
            output::table::print_projection_report(&report);
            println!("Saved {}", out.display());
        }
    }

    Ok(())
}
