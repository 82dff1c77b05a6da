pub mod json;
pub mod pdftotext;

use crate::error::CtrError;
use crate::model::Token;

/// Trait for token extraction backends.
pub trait TokenSource: Send + Sync {
    /// Extract positioned word tokens from document bytes, for every page.
    fn extract_tokens(&self, document: &[u8]) -> Result<Vec<Token>, CtrError>;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}
