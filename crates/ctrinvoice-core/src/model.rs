use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic field a token can be tagged with.
///
/// The set is closed: a stored tag is either absent, one of these fields, or
/// the [`Field::NotApplicable`] sentinel that marks a token for deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    InvoiceNumber,
    FederalId,
    ClientContract,
    ClientDpn,
    InvoiceEndDate,
    State,
    #[serde(rename = "NA")]
    NotApplicable,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::InvoiceNumber,
        Field::FederalId,
        Field::ClientContract,
        Field::ClientDpn,
        Field::InvoiceEndDate,
        Field::State,
        Field::NotApplicable,
    ];

    /// The tag string as stored in the tag store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::InvoiceNumber => "invoice_number",
            Field::FederalId => "federal_id",
            Field::ClientContract => "client_contract",
            Field::ClientDpn => "client_dpn",
            Field::InvoiceEndDate => "invoice_end_date",
            Field::State => "state",
            Field::NotApplicable => "NA",
        }
    }

    pub fn from_tag(s: &str) -> Option<Field> {
        let trimmed = s.trim();
        Field::ALL.into_iter().find(|f| f.as_str() == trimmed)
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Field::NotApplicable)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounding box in document units.
///
/// `x1 <= x2`. The vertical convention is bottom-left origin (y grows
/// upward), so `y1` is the bottom edge and `y2` the top edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    #[serde(default)]
    pub x1: f64,
    #[serde(default)]
    pub y1: f64,
    #[serde(default)]
    pub x2: f64,
    #[serde(default)]
    pub y2: f64,
}

impl BBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        BBox { x1, y1, x2, y2 }
    }
}

/// A unit of extracted text on a sheet (page), as produced by a token source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// 1-based sheet (page) number.
    #[serde(default)]
    pub sheet: u32,
    #[serde(default)]
    pub text: String,
    #[serde(flatten)]
    pub bbox: BBox,
}

impl Token {
    pub fn new(sheet: u32, text: impl Into<String>, bbox: BBox) -> Self {
        Token {
            sheet,
            text: text.into(),
            bbox,
        }
    }
}

/// A token as held by the tag store, with its row id and mutable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub id: i64,
    pub token: Token,
    pub tag: Option<Field>,
    /// Set by the quality filter on blank tokens.
    pub needs_review: bool,
}

/// Projection input: a tagged token read back out of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledRow {
    pub text: String,
    pub field: Field,
    pub sheet: u32,
}
