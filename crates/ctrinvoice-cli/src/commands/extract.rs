use ctrinvoice_core::error::CtrError;
use ctrinvoice_core::extraction::json::save_tokens;
use ctrinvoice_core::extraction::pdftotext::PdftotextSource;
use ctrinvoice_core::extraction::TokenSource;
use std::path::PathBuf;

use crate::output;

pub fn run(
    pdf_file: PathBuf,
    output_format: &str,
    output_file: Option<PathBuf>,
) -> Result<(), CtrError> {
    if !pdf_file.exists() {
        return Err(CtrError::SourceNotFound(pdf_file));
    }
    let pdf_bytes = std::fs::read(&pdf_file)?;
    let tokens = PdftotextSource::new().extract_tokens(&pdf_bytes)?;

    match output_file {
        Some(path) => {
            // Always JSON on disk, so the file can be fed back to `tag`
            save_tokens(&path, &tokens)?;
            let sheets = tokens.iter().map(|t| t.sheet).max().unwrap_or(0);
            eprintln!(
                "Extracted {} token(s) from {} sheet(s), written to {}",
                tokens.len(),
                sheets,
                path.display()
            );
        }
        None => match output_format {
            "json" => output::json::print(&tokens)?,
            _ => output::table::print_tokens(&tokens),
        },
    }

    Ok(())
}
