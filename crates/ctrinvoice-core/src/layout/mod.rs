pub mod builtin;
pub mod schema;

use crate::error::CtrError;
use schema::{LayoutDef, TextMatch, Window};
use std::path::Path;

/// Load a layout from a JSON file.
pub fn load_layout(path: &Path) -> Result<LayoutDef, CtrError> {
    let content = std::fs::read_to_string(path).map_err(|e| CtrError::LayoutLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_layout(&content, path)
}

/// Parse a layout from a JSON string.
pub fn parse_layout(json: &str, source: &Path) -> Result<LayoutDef, CtrError> {
    let layout: LayoutDef = serde_json::from_str(json).map_err(|e| CtrError::LayoutLoad {
        path: source.to_path_buf(),
        reason: e.to_string(),
    })?;
    validate_layout(&layout)?;
    Ok(layout)
}

/// Parse a layout from a JSON string (no file path context).
pub fn parse_layout_str(json: &str) -> Result<LayoutDef, CtrError> {
    let layout: LayoutDef = serde_json::from_str(json)?;
    validate_layout(&layout)?;
    Ok(layout)
}

/// Validate that a layout is well-formed.
pub fn validate_layout(layout: &LayoutDef) -> Result<(), CtrError> {
    if layout.rules.is_empty() {
        return Err(CtrError::LayoutInvalid("rules must not be empty".into()));
    }

    for (i, rule) in layout.rules.iter().enumerate() {
        let at = format!("rule #{} ({})", i + 1, rule.field);

        if rule.sheet == 0 {
            return Err(CtrError::LayoutInvalid(format!(
                "{at}: sheet numbers are 1-based"
            )));
        }

        match &rule.window {
            Window::Offset { dx, dy } => {
                for (axis, interval) in [("dx", dx), ("dy", dy)] {
                    if !(interval.min.is_finite() && interval.max.is_finite()) {
                        return Err(CtrError::LayoutInvalid(format!(
                            "{at}: {axis} bounds must be finite"
                        )));
                    }
                    if interval.min > interval.max {
                        return Err(CtrError::LayoutInvalid(format!(
                            "{at}: {axis} interval [{}, {}] is empty",
                            interval.min, interval.max
                        )));
                    }
                }
            }
            Window::Rect {
                left,
                right,
                bottom,
                top,
            } => {
                let bounds = [("left", left), ("right", right), ("bottom", bottom), ("top", top)];
                for (side, bound) in bounds {
                    if !bound.is_finite() {
                        return Err(CtrError::LayoutInvalid(format!(
                            "{at}: {side} bound must be finite"
                        )));
                    }
                }
                if left >= right {
                    return Err(CtrError::LayoutInvalid(format!(
                        "{at}: left ({left}) must be less than right ({right})"
                    )));
                }
                if bottom >= top {
                    return Err(CtrError::LayoutInvalid(format!(
                        "{at}: bottom ({bottom}) must be less than top ({top})"
                    )));
                }
            }
        }

        if let Some(TextMatch::OneOf(values)) = &rule.text {
            if values.is_empty() {
                return Err(CtrError::LayoutInvalid(format!(
                    "{at}: one_of must list at least one value"
                )));
            }
        }
    }

    Ok(())
}
