pub mod extract;
pub mod inspect;
pub mod layouts;
pub mod project;
pub mod run;
pub mod tag;

use ctrinvoice_core::extraction::json::JsonTokenSource;
use ctrinvoice_core::extraction::pdftotext::PdftotextSource;
use ctrinvoice_core::extraction::TokenSource;
use std::path::{Path, PathBuf};

pub const DEFAULT_LAYOUT: &str = "bmcd-invoice";
pub const DEFAULT_PROJECTION: &str = "duke-ctr";
const OUTPUT_NAME: &str = "updated_CTR.xlsx";

/// Token JSON files (from `ctrinvoice extract -O`) are read as-is, anything
/// else goes through pdftotext.
pub fn token_source(input: &Path) -> Box<dyn TokenSource> {
    let is_json = input
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        Box::new(JsonTokenSource)
    } else {
        Box::new(PdftotextSource::new())
    }
}

pub fn db_path(db: Option<PathBuf>) -> PathBuf {
    db.unwrap_or_else(|| std::env::temp_dir().join("data.db"))
}

/// `updated_CTR.xlsx` in the template's directory unless given.
pub fn output_path(template: &Path, out: Option<PathBuf>) -> PathBuf {
    out.unwrap_or_else(|| match template.parent() {
        Some(dir) => dir.join(OUTPUT_NAME),
        None => PathBuf::from(OUTPUT_NAME),
    })
}
