use ctrinvoice_core::error::CtrError;
use ctrinvoice_core::layout::builtin;
use ctrinvoice_core::layout::schema::{LayoutDef, TextMatch, Window};
use ctrinvoice_core::projection;
use std::collections::BTreeMap;
use std::path::Path;

pub fn list() -> Result<(), CtrError> {
    println!("Available layouts:\n");
    for name in builtin::PRESETS {
        let layout = builtin::load_preset(name)?;
        println!(
            "  {:<14} {} (v{}), {} rules",
            name,
            layout.name,
            layout.version,
            layout.rules.len()
        );
        if let Some(ref desc) = layout.description {
            println!("                 {}", desc);
        }
        println!();
    }

    println!("Available projections:\n");
    for name in projection::builtin::PRESETS {
        let p = projection::builtin::load_preset(name)?;
        println!("  {:<14} {} (v{}), {} cells", name, p.name, p.version, p.cells.len());
        if let Some(ref desc) = p.description {
            println!("                 {}", desc);
        }
        println!();
    }
    Ok(())
}

pub fn explain(preset: &str) -> Result<(), CtrError> {
    let layout = builtin::load_preset(preset)?;

    println!("{} (version {})\n", layout.name, layout.version);
    if let Some(ref desc) = layout.description {
        println!("{}\n", desc);
    }

    println!("Every sheet is anchored at its smallest x1 (minX) and largest y1 (maxY).");
    println!("Rules are tried in order; the first window a token falls into decides its tag.\n");

    let mut by_sheet: BTreeMap<u32, Vec<_>> = BTreeMap::new();
    for rule in &layout.rules {
        by_sheet.entry(rule.sheet).or_default().push(rule);
    }

    for (sheet, rules) in by_sheet {
        println!("Sheet {sheet}:");
        for rule in rules {
            println!("  {:<18} {}", rule.field.as_str(), describe_window(&rule.window));
            if let Some(TextMatch::OneOf(values)) = &rule.text {
                println!("  {:<18} text is one of {}", "", values.join(", "));
            }
            if let Some(ref note) = rule.note {
                println!("  {:<18} {}", "", note);
            }
        }
        println!();
    }
    println!("Tokens on sheets without rules are never tagged.");

    if !layout.required.is_empty() {
        let names: Vec<&str> = layout.required.iter().map(|f| f.as_str()).collect();
        println!("Expected fields: {}", names.join(", "));
    }
    println!();

    Ok(())
}

fn describe_window(window: &Window) -> String {
    match window {
        Window::Offset { dx, dy } => format!(
            "|minX - x1| in [{}, {}], |maxY - y1| in [{}, {}]",
            dx.min, dx.max, dy.min, dy.max
        ),
        Window::Rect {
            left,
            right,
            bottom,
            top,
        } => format!(
            "minX{left:+} < x1, x2 < minX{right:+}, maxY{bottom:+} < y1, y2 < maxY{top:+}"
        ),
    }
}

pub fn validate(file: &Path) -> Result<(), CtrError> {
    let layout = ctrinvoice_core::layout::load_layout(file)?;

    println!("Layout '{}' (v{}) is valid.", layout.name, layout.version);
    println!("  Rules: {}", layout.rules.len());

    let warnings = layout_warnings(&layout);
    if !warnings.is_empty() {
        println!("\nWarnings:");
        for w in &warnings {
            println!("  - {}", w);
        }
    }

    Ok(())
}

/// Problems that do not make a layout unusable.
fn layout_warnings(layout: &LayoutDef) -> Vec<String> {
    let mut warnings = Vec::new();
    for field in &layout.required {
        if !layout.rules.iter().any(|r| r.field == *field) {
            warnings.push(format!("required field '{}' has no rule", field));
        }
    }
    for (i, rule) in layout.rules.iter().enumerate() {
        let shadowed = layout.rules[..i].iter().any(|earlier| {
            earlier.sheet == rule.sheet && earlier.window == rule.window && earlier.text.is_none()
        });
        if shadowed {
            warnings.push(format!(
                "rule #{} ({}) can never match: an earlier rule has the same window",
                i + 1,
                rule.field
            ));
        }
    }
    warnings
}
