use ctrinvoice_core::model::Token;
use ctrinvoice_core::projection::cell::CellRef;
use ctrinvoice_core::projection::schema::ProjectionDef;
use ctrinvoice_core::projection::ProjectionReport;
use ctrinvoice_core::TagReport;
use std::collections::BTreeMap;

pub fn print_tokens(tokens: &[Token]) {
    if tokens.is_empty() {
        println!("No tokens extracted.");
        return;
    }

    let mut sheet = 0;
    for t in tokens {
        if t.sheet != sheet {
            if sheet != 0 {
                println!();
            }
            sheet = t.sheet;
            println!("--- Sheet {} ---\n", sheet);
            println!(
                "  {:>8} {:>8} {:>8} {:>8}  Text",
                "x1", "y1", "x2", "y2"
            );
        }
        println!(
            "  {:>8.2} {:>8.2} {:>8.2} {:>8.2}  {}",
            t.bbox.x1, t.bbox.y1, t.bbox.x2, t.bbox.y2, t.text
        );
    }
}

pub fn print_tag_report(report: &TagReport) {
    let pass = &report.pass;
    println!("=== {} ===\n", pass.layout_name);
    println!(
        "  Tagged {} of {} token(s) on {} sheet(s)",
        pass.tagged,
        report.ingested,
        pass.sheets.len()
    );
    println!(
        "  Deleted {} not-applicable token(s), flagged {} blank token(s)\n",
        report.filters.deleted, report.filters.flagged
    );

    for sheet in &pass.sheets {
        let anchor = match sheet.anchor {
            Some(a) => format!("anchor ({}, {})", a.min_x, a.max_y),
            None => "no anchor, using (0, 0)".to_string(),
        };
        let fields: Vec<&str> = sheet.fields.iter().map(|f| f.as_str()).collect();
        let fields = if fields.is_empty() {
            "-".to_string()
        } else {
            fields.join(", ")
        };
        println!(
            "  Sheet {:<3} {:>5} token(s)  {:<28} {}",
            sheet.sheet, sheet.tokens, anchor, fields
        );
    }

    if !pass.duplicates.is_empty() {
        println!("\n  Tagged more than once (last one is projected):");
        for d in &pass.duplicates {
            let ids: Vec<String> = d.row_ids.iter().map(|id| id.to_string()).collect();
            println!("    sheet {} {} -> rows {}", d.sheet, d.field, ids.join(", "));
        }
    }

    if !pass.missing_required.is_empty() {
        let names: Vec<&str> = pass.missing_required.iter().map(|f| f.as_str()).collect();
        println!("\n  Missing fields: {}", names.join(", "));
    }
    println!();
}

pub fn print_projection_report(report: &ProjectionReport) {
    println!("=== {} ===\n", report.projection_name);

    if report.cells.is_empty() {
        println!("  No cells written.");
    }
    for (cell, value) in &report.cells {
        println!("  {:<6} {}", cell, value);
    }
    if report.overwritten > 0 {
        println!(
            "\n  {} write(s) replaced an earlier value for the same cell",
            report.overwritten
        );
    }

    if !report.issues.is_empty() {
        println!("\n  Left blank:");
        for issue in &report.issues {
            println!("    {:<6} {}: {}", issue.cell, issue.field, issue.reason);
        }
    }
    println!();
}

pub fn print_cells(projection: &ProjectionDef, values: &BTreeMap<CellRef, String>) {
    println!("=== {} ===\n", projection.name);

    for (cell, value) in values {
        let fields: Vec<&str> = projection
            .cells
            .iter()
            .filter(|c| CellRef::parse(&c.cell).as_ref() == Some(cell))
            .map(|c| c.field.as_str())
            .collect();
        let shown = if value.is_empty() { "(empty)" } else { value.as_str() };
        println!("  {:<6} {:<18} {}", cell.to_string(), fields.join(", "), shown);
    }
    println!();
}
