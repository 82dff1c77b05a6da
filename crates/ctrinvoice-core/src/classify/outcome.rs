use crate::classify::anchor::SheetAnchor;
use crate::model::Field;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// What one sheet contributed during a classification pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetSummary {
    pub sheet: u32,
    /// Anchor used for this sheet; `None` means the zero fallback was used.
    pub anchor: Option<SheetAnchor>,
    /// Tokens visited on this sheet.
    pub tokens: usize,
    /// Distinct fields tagged on this sheet.
    pub fields: BTreeSet<Field>,
}

/// A field that was tagged on more than one token of the same sheet.
///
/// Projection keeps the last one in store order; this is reported, not fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateField {
    pub sheet: u32,
    pub field: Field,
    pub row_ids: Vec<i64>,
}

/// Result of one classification pass over a tag store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassSummary {
    /// Name of the layout that was applied.
    pub layout_name: String,
    /// Tokens visited.
    pub tokens: usize,
    /// Tokens that received a tag.
    pub tagged: usize,
    pub sheets: Vec<SheetSummary>,
    pub duplicates: Vec<DuplicateField>,
    /// Required layout fields that no token received.
    pub missing_required: Vec<Field>,
}

impl PassSummary {
    /// Every field tagged anywhere in the document.
    pub fn fields(&self) -> BTreeSet<Field> {
        self.sheets
            .iter()
            .flat_map(|s| s.fields.iter().copied())
            .collect()
    }

    pub fn sheet(&self, sheet: u32) -> Option<&SheetSummary> {
        self.sheets.iter().find(|s| s.sheet == sheet)
    }
}

/// Collects duplicate hits as the pass walks a sheet.
#[derive(Debug, Default)]
pub(crate) struct FieldHits {
    hits: BTreeMap<Field, Vec<i64>>,
}

impl FieldHits {
    pub(crate) fn record(&mut self, field: Field, row_id: i64) {
        self.hits.entry(field).or_default().push(row_id);
    }

    pub(crate) fn clear(&mut self) {
        self.hits.clear();
    }

    pub(crate) fn fields(&self) -> BTreeSet<Field> {
        self.hits.keys().copied().collect()
    }

    pub(crate) fn duplicates(&self, sheet: u32) -> Vec<DuplicateField> {
        self.hits
            .iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(field, ids)| DuplicateField {
                sheet,
                field: *field,
                row_ids: ids.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_hits_duplicates() {
        let mut hits = FieldHits::default();
        hits.record(Field::State, 4);
        hits.record(Field::InvoiceNumber, 2);
        hits.record(Field::State, 9);

        let dups = hits.duplicates(1);
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].field, Field::State);
        assert_eq!(dups[0].row_ids, vec![4, 9]);
        assert_eq!(hits.fields().len(), 2);

        hits.clear();
        assert!(hits.fields().is_empty());
    }

    #[test]
    fn test_summary_fields_union() {
        let summary = PassSummary {
            sheets: vec![
                SheetSummary {
                    sheet: 1,
                    fields: BTreeSet::from([Field::State]),
                    ..Default::default()
                },
                SheetSummary {
                    sheet: 2,
                    fields: BTreeSet::from([Field::ClientDpn]),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(
            summary.fields(),
            BTreeSet::from([Field::State, Field::ClientDpn])
        );
        assert!(summary.sheet(2).is_some());
        assert!(summary.sheet(3).is_none());
    }
}
