use ctrinvoice_core::error::CtrError;
use ctrinvoice_core::store::TagStore;
use ctrinvoice_core::{layout, projection};
use std::path::PathBuf;

use super::{db_path, output_path, token_source, DEFAULT_LAYOUT, DEFAULT_PROJECTION};
use crate::output;

pub fn run(
    input_file: PathBuf,
    template: PathBuf,
    out: Option<PathBuf>,
    db: Option<PathBuf>,
    output_format: &str,
) -> Result<(), CtrError> {
    let layout = layout::builtin::load_preset(DEFAULT_LAYOUT)?;
    let projection = projection::builtin::load_preset(DEFAULT_PROJECTION)?;

    // Leave the previous store alone when there is nothing to process
    for path in [&input_file, &template] {
        if !path.exists() {
            return Err(CtrError::SourceNotFound(path.clone()));
        }
    }

    let source = token_source(&input_file);
    let out = output_path(&template, out);
    let mut store = TagStore::create(&db_path(db))?;

    let report = ctrinvoice_core::process_invoice(
        &input_file,
        &template,
        &out,
        source.as_ref(),
        &mut store,
        &layout,
        &projection,
    )?;

    match output_format {
        "json" => output::json::print(&report)?,
        _ => {
            output::table::print_tag_report(&report.tag);
            println!();
            output::table::print_projection_report(&report.projection);
            println!("Saved {}", report.output.display());
        }
    }

    Ok(())
}
