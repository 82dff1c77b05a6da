use crate::model::Field;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where each tagged field lands in the destination template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionDef {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub version: String,
    pub cells: Vec<CellRuleDef>,
}

impl ProjectionDef {
    pub fn rules_for(&self, field: Field) -> impl Iterator<Item = &CellRuleDef> {
        self.cells.iter().filter(move |c| c.field == field)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellRuleDef {
    pub field: Field,
    /// A1-style address on the first worksheet.
    pub cell: String,
    #[serde(default)]
    pub transform: Transform,
}

/// Presentation transform applied to the token text before it is written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    #[default]
    Identity,
    /// Exact lookup; unknown values map to `default`.
    Lookup {
        table: BTreeMap<String, String>,
        #[serde(default)]
        default: String,
    },
    /// Reparse a date written in `from` and format it as `to` (strftime syntax).
    Date { from: String, to: String },
}
