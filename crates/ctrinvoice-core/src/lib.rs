pub mod classify;
pub mod error;
pub mod extraction;
pub mod filters;
pub mod layout;
pub mod model;
pub mod projection;
pub mod store;

use std::path::{Path, PathBuf};

use classify::PassSummary;
use error::CtrError;
use extraction::TokenSource;
use filters::FilterSummary;
use layout::schema::LayoutDef;
use model::Token;
use projection::schema::ProjectionDef;
use projection::xlsx::XlsxTemplate;
use projection::{CellSink, ProjectionReport};
use serde::{Deserialize, Serialize};
use store::TagStore;

/// Outcome of ingesting, classifying and filtering one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagReport {
    /// Tokens written to the store.
    pub ingested: usize,
    pub pass: PassSummary,
    pub filters: FilterSummary,
}

/// Outcome of a full invoice-to-template run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub tag: TagReport,
    pub projection: ProjectionReport,
    pub output: PathBuf,
}

/// Store `tokens`, tag them against `layout`, then run the deletion and
/// quality filters.
///
/// An empty token set is [`CtrError::NoTokens`]; the store is left untouched.
pub fn tag_tokens(
    tokens: &[Token],
    store: &mut TagStore,
    layout: &LayoutDef,
) -> Result<TagReport, CtrError> {
    if tokens.is_empty() {
        return Err(CtrError::NoTokens("an empty token set".into()));
    }
    let ids = store.insert_tokens(tokens)?;
    let pass = classify::run_pass(store, layout)?;
    let filters = filters::apply(store)?;

    tracing::info!(
        "tagged {} of {} tokens, deleted {}, flagged {}",
        pass.tagged,
        ids.len(),
        filters.deleted,
        filters.flagged
    );
    Ok(TagReport {
        ingested: ids.len(),
        pass,
        filters,
    })
}

/// Extract tokens from a document with `source` and tag them.
pub fn tag_pdf(
    document: &[u8],
    source: &dyn TokenSource,
    store: &mut TagStore,
    layout: &LayoutDef,
) -> Result<TagReport, CtrError> {
    let tokens = source.extract_tokens(document)?;
    tracing::debug!(
        "{} extracted {} tokens",
        source.backend_name(),
        tokens.len()
    );
    if tokens.is_empty() {
        return Err(CtrError::NoTokens(format!(
            "{} (no words found in the document)",
            source.backend_name()
        )));
    }
    tag_tokens(&tokens, store, layout)
}

/// Project every labeled row in the store into `sink`.
pub fn project_store(
    store: &TagStore,
    projection: &ProjectionDef,
    sink: &mut dyn CellSink,
) -> Result<ProjectionReport, CtrError> {
    let rows = store.labeled_rows()?;
    Ok(projection::project(&rows, projection, sink))
}

/// Tag an invoice and write its fields into a copy of the CTR template.
///
/// Both inputs are checked before the store is touched; a missing one is
/// reported as [`CtrError::SourceNotFound`]. The template itself is never
/// written.
pub fn process_invoice(
    invoice: &Path,
    template: &Path,
    output: &Path,
    source: &dyn TokenSource,
    store: &mut TagStore,
    layout: &LayoutDef,
    projection: &ProjectionDef,
) -> Result<RunReport, CtrError> {
    for path in [invoice, template] {
        if !path.exists() {
            return Err(CtrError::SourceNotFound(path.to_path_buf()));
        }
    }
    if same_file(template, output) {
        return Err(CtrError::Template(format!(
            "output {} would overwrite the template",
            output.display()
        )));
    }

    let document = std::fs::read(invoice)?;
    let tag = tag_pdf(&document, source, store, layout)?;

    let mut workbook = XlsxTemplate::open(template)?;
    let projection = project_store(store, projection, &mut workbook)?;
    workbook.save(output)?;

    Ok(RunReport {
        tag,
        projection,
        output: output.to_path_buf(),
    })
}

/// True when both paths name the same file, comparing canonical forms when
/// they exist.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
