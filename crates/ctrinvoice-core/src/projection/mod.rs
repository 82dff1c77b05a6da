pub mod builtin;
pub mod cell;
pub mod schema;
pub mod xlsx;

use crate::error::CtrError;
use crate::model::{Field, LabeledRow};
use cell::CellRef;
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use schema::{ProjectionDef, Transform};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

/// Destination of projected values.
pub trait CellSink {
    fn set_cell(&mut self, cell: CellRef, value: String);
}

impl CellSink for BTreeMap<CellRef, String> {
    fn set_cell(&mut self, cell: CellRef, value: String) {
        self.insert(cell, value);
    }
}

/// A field that could not be projected; its cell was left untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionIssue {
    pub field: Field,
    pub cell: String,
    pub text: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectionReport {
    pub projection_name: String,
    /// Final value of every written cell, keyed by A1 address.
    pub cells: BTreeMap<String, String>,
    /// Writes that replaced an earlier value for the same cell.
    pub overwritten: usize,
    pub issues: Vec<ProjectionIssue>,
}

/// Write tagged rows into `sink` according to `projection`.
///
/// Rows are written in the order given. When several rows carry the same
/// field, the later one overwrites the earlier one. A transform failure
/// leaves that cell alone and is recorded as an issue; it does not stop the
/// remaining rows.
pub fn project(
    rows: &[LabeledRow],
    projection: &ProjectionDef,
    sink: &mut dyn CellSink,
) -> ProjectionReport {
    let mut report = ProjectionReport {
        projection_name: projection.name.clone(),
        ..Default::default()
    };

    for row in rows {
        for rule in projection.rules_for(row.field) {
            let Some(cell) = CellRef::parse(&rule.cell) else {
                report.issues.push(ProjectionIssue {
                    field: row.field,
                    cell: rule.cell.clone(),
                    text: row.text.clone(),
                    reason: format!("invalid cell address '{}'", rule.cell),
                });
                continue;
            };

            match apply_transform(&rule.transform, &row.text) {
                Ok(value) => {
                    tracing::debug!("{} -> {cell} = '{value}'", row.field);
                    let key = cell.to_string();
                    if report.cells.insert(key, value.clone()).is_some() {
                        report.overwritten += 1;
                    }
                    sink.set_cell(cell, value);
                }
                Err(e) => {
                    tracing::warn!("{} not projected to {cell}: {e}", row.field);
                    report.issues.push(ProjectionIssue {
                        field: row.field,
                        cell: cell.to_string(),
                        text: row.text.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    tracing::info!(
        "projection '{}' wrote {} cells ({} issues)",
        projection.name,
        report.cells.len(),
        report.issues.len()
    );
    report
}

/// Apply a presentation transform to token text.
pub fn apply_transform(transform: &Transform, text: &str) -> Result<String, CtrError> {
    let text = text.trim();
    match transform {
        Transform::Identity => Ok(text.to_string()),
        Transform::Lookup { table, default } => {
            Ok(table.get(text).cloned().unwrap_or_else(|| default.clone()))
        }
        Transform::Date { from, to } => {
            let date = NaiveDate::parse_from_str(text, from).map_err(|_| CtrError::DateFormat {
                text: text.to_string(),
                format: from.clone(),
            })?;
            format_date(date, to).ok_or_else(|| CtrError::DateFormat {
                text: text.to_string(),
                format: to.clone(),
            })
        }
    }
}

/// Load a projection from a JSON file.
pub fn load_projection(path: &Path) -> Result<ProjectionDef, CtrError> {
    let content = std::fs::read_to_string(path).map_err(|e| CtrError::ProjectionLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let projection: ProjectionDef =
        serde_json::from_str(&content).map_err(|e| CtrError::ProjectionLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    validate_projection(&projection)?;
    Ok(projection)
}

/// Parse a projection from a JSON string (no file path context).
pub fn parse_projection_str(json: &str) -> Result<ProjectionDef, CtrError> {
    let projection: ProjectionDef = serde_json::from_str(json)?;
    validate_projection(&projection)?;
    Ok(projection)
}

/// Validate that a projection is well-formed.
pub fn validate_projection(projection: &ProjectionDef) -> Result<(), CtrError> {
    if projection.cells.is_empty() {
        return Err(CtrError::ProjectionInvalid("cells must not be empty".into()));
    }

    for rule in &projection.cells {
        if CellRef::parse(&rule.cell).is_none() {
            return Err(CtrError::ProjectionInvalid(format!(
                "field '{}' targets invalid cell '{}'",
                rule.field, rule.cell
            )));
        }
        if rule.field.is_sentinel() {
            return Err(CtrError::ProjectionInvalid(format!(
                "'{}' marks tokens for deletion and cannot be projected",
                rule.field
            )));
        }
        if let Transform::Date { from, to } = &rule.transform {
            for fmt in [from, to] {
                if !is_valid_date_format(fmt) {
                    return Err(CtrError::ProjectionInvalid(format!(
                        "field '{}' has invalid date format '{}'",
                        rule.field, fmt
                    )));
                }
            }
            if format_date(NaiveDate::default(), to).is_none() {
                return Err(CtrError::ProjectionInvalid(format!(
                    "field '{}' output format '{}' needs more than a calendar date",
                    rule.field, to
                )));
            }
        }
    }

    Ok(())
}

fn is_valid_date_format(fmt: &str) -> bool {
    !fmt.trim().is_empty() && StrftimeItems::new(fmt).all(|item| !matches!(item, Item::Error))
}

/// `None` when `fmt` asks for something a bare date cannot supply, such as
/// an hour or a time zone.
fn format_date(date: NaiveDate, fmt: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", date.format(fmt)).ok()?;
    Some(out)
}

/// Cells addressed by a projection, in worksheet order.
pub fn target_cells(projection: &ProjectionDef) -> Vec<CellRef> {
    let mut cells: Vec<CellRef> = projection
        .cells
        .iter()
        .filter_map(|c| CellRef::parse(&c.cell))
        .collect();
    cells.sort();
    cells.dedup();
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(field: Field, text: &str) -> LabeledRow {
        LabeledRow {
            text: text.into(),
            field,
            sheet: 1,
        }
    }

    fn duke() -> ProjectionDef {
        builtin::load_preset("duke-ctr").unwrap()
    }

    #[test]
    fn test_state_lookup() {
        let p = duke();
        let state = &p.rules_for(Field::State).next().unwrap().transform;
        let cases = [
            ("IN", "TD-IN"),
            ("KY", "TD-KY-OH"),
            ("OH", "TD-KY-OH"),
            ("NC", "TD-NC-SC"),
            ("SC", "TD-NC-SC"),
            ("FL", "TD-FL"),
            ("TX", ""),
        ];
        for (code, expected) in cases {
            assert_eq!(apply_transform(state, code).unwrap(), expected, "{code}");
        }
    }

    #[test]
    fn test_date_reformat() {
        let p = duke();
        let date = &p.rules_for(Field::InvoiceEndDate).next().unwrap().transform;
        assert_eq!(apply_transform(date, "31-Jan-2025").unwrap(), "01.31.2025");
        assert_eq!(apply_transform(date, " 05-Sep-2024 ").unwrap(), "09.05.2024");
    }

    #[test]
    fn test_date_format_error() {
        let p = duke();
        let date = &p.rules_for(Field::InvoiceEndDate).next().unwrap().transform;
        let err = apply_transform(date, "2025/01/31").unwrap_err();
        assert!(matches!(err, CtrError::DateFormat { .. }));
    }

    #[test]
    fn test_project_into_map() {
        let rows = vec![
            row(Field::InvoiceNumber, "INV-7"),
            row(Field::ClientContract, "4400012345"),
            row(Field::State, "OH"),
            row(Field::InvoiceEndDate, "31-Jan-2025"),
            row(Field::FederalId, "12-3456789"),
        ];
        let mut cells = BTreeMap::new();
        let report = project(&rows, &duke(), &mut cells);

        assert!(report.issues.is_empty());
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[&CellRef::new(4, 6)], "INV-7");
        assert_eq!(cells[&CellRef::new(4, 4)], "4400012345");
        assert_eq!(cells[&CellRef::new(4, 1)], "TD-KY-OH");
        assert_eq!(cells[&CellRef::new(4, 2)], "01.31.2025");
        assert_eq!(report.cells["A4"], "TD-KY-OH");
    }

    #[test]
    fn test_last_write_wins() {
        let rows = vec![row(Field::State, "KY"), row(Field::State, "FL")];
        let mut cells = BTreeMap::new();
        let report = project(&rows, &duke(), &mut cells);
        assert_eq!(cells[&CellRef::new(4, 1)], "TD-FL");
        assert_eq!(report.overwritten, 1);
    }

    #[test]
    fn test_bad_date_leaves_cell_and_continues() {
        let rows = vec![
            row(Field::InvoiceEndDate, "January 31"),
            row(Field::InvoiceNumber, "INV-7"),
        ];
        let mut cells = BTreeMap::new();
        let report = project(&rows, &duke(), &mut cells);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].field, Field::InvoiceEndDate);
        assert_eq!(report.issues[0].cell, "B4");
        assert!(!cells.contains_key(&CellRef::new(4, 2)));
        assert_eq!(cells[&CellRef::new(4, 6)], "INV-7");
    }

    #[test]
    fn test_invalid_projections_rejected() {
        let bad_cell = r#"{ "name": "x", "version": "1",
            "cells": [ { "field": "state", "cell": "4A" } ] }"#;
        let sentinel = r#"{ "name": "x", "version": "1",
            "cells": [ { "field": "NA", "cell": "A1" } ] }"#;
        let bad_date = r#"{ "name": "x", "version": "1",
            "cells": [ { "field": "invoice_end_date", "cell": "A1",
                         "transform": { "kind": "date", "from": "%d-%Q", "to": "%m" } } ] }"#;
        let empty = r#"{ "name": "x", "version": "1", "cells": [] }"#;
        for json in [bad_cell, sentinel, bad_date, empty] {
            assert!(parse_projection_str(json).is_err(), "{json}");
        }
    }

    #[test]
    fn test_time_fields_in_output_format_rejected() {
        let json = r#"{ "name": "x", "version": "1",
            "cells": [ { "field": "invoice_end_date", "cell": "B4",
                         "transform": { "kind": "date", "from": "%d-%b-%Y", "to": "%m.%d.%Y %H:%M" } } ] }"#;
        let err = parse_projection_str(json).unwrap_err();
        assert!(matches!(err, CtrError::ProjectionInvalid(_)));
    }

    #[test]
    fn test_unformattable_date_is_an_issue_not_a_panic() {
        let transform = Transform::Date {
            from: "%d-%b-%Y".into(),
            to: "%Y %z".into(),
        };
        let err = apply_transform(&transform, "31-Jan-2025").unwrap_err();
        assert!(matches!(err, CtrError::DateFormat { .. }));

        let projection = ProjectionDef {
            name: "unchecked".into(),
            description: None,
            version: "1".into(),
            cells: vec![schema::CellRuleDef {
                field: Field::InvoiceEndDate,
                cell: "B4".into(),
                transform,
            }],
        };
        let mut cells = BTreeMap::new();
        let report = project(&[row(Field::InvoiceEndDate, "31-Jan-2025")], &projection, &mut cells);
        assert_eq!(report.issues.len(), 1);
        assert!(cells.is_empty());
    }

    #[test]
    fn test_target_cells_sorted() {
        let cells: Vec<String> = target_cells(&duke()).iter().map(|c| c.to_string()).collect();
        assert_eq!(cells, vec!["A4", "B4", "D4", "F4"]);
    }
}
