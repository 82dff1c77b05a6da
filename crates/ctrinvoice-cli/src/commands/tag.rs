use ctrinvoice_core::error::CtrError;
use ctrinvoice_core::layout::builtin;
use ctrinvoice_core::store::TagStore;
use std::path::PathBuf;

use super::{db_path, token_source, DEFAULT_LAYOUT};
use crate::output;

pub fn run(
    input_file: PathBuf,
    layout_file: Option<PathBuf>,
    preset: Option<String>,
    db: Option<PathBuf>,
    output_format: &str,
) -> Result<(), CtrError> {
    let layout = match layout_file {
        Some(path) => ctrinvoice_core::layout::load_layout(&path)?,
        None => builtin::load_preset(preset.as_deref().unwrap_or(DEFAULT_LAYOUT))?,
    };

    if !input_file.exists() {
        return Err(CtrError::SourceNotFound(input_file));
    }
    let document = std::fs::read(&input_file)?;
    let source = token_source(&input_file);

    let db = db_path(db);
    tracing::debug!(
        "tagging {} with {} into {}",
        input_file.display(),
        source.backend_name(),
        db.display()
    );
    let mut store = TagStore::create(&db)?;
    let report = ctrinvoice_core::tag_pdf(&document, source.as_ref(), &mut store, &layout)?;

    match output_format {
        "json" => output::json::print(&report)?,
        _ => {
            output::table::print_tag_report(&report);
            println!("Tag store: {}", db.display());
        }
    }

    Ok(())
}
