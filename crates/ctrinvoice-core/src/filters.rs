use crate::error::CtrError;
use crate::model::Field;
use crate::store::{TagStore, REVIEW_FLAG};
use serde::{Deserialize, Serialize};

/// Counts reported by the post-classification filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSummary {
    /// Tokens removed because they carried the "not applicable" sentinel.
    pub deleted: usize,
    /// Blank tokens flagged for review.
    pub flagged: usize,
}

/// Remove every token tagged with the "not applicable" sentinel.
pub fn delete_not_applicable(store: &TagStore) -> Result<usize, CtrError> {
    let n = store.delete_tagged(Field::NotApplicable)?;
    tracing::debug!("deleted {n} not-applicable tokens");
    Ok(n)
}

/// Flag tokens with empty or whitespace-only text for visual review.
///
/// Flagged tokens keep their tag and stay in the store.
pub fn flag_blank_tokens(store: &TagStore) -> Result<usize, CtrError> {
    let n = store.flag_blank_words(REVIEW_FLAG)?;
    tracing::debug!("flagged {n} blank tokens for review");
    Ok(n)
}

/// Run both filters, deletion first.
pub fn apply(store: &TagStore) -> Result<FilterSummary, CtrError> {
    let deleted = delete_not_applicable(store)?;
    let flagged = flag_blank_tokens(store)?;
    Ok(FilterSummary { deleted, flagged })
}
