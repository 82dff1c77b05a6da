use crate::error::CtrError;
use crate::layout::schema::LayoutDef;

const BMCD_INVOICE_JSON: &str = include_str!("../../layouts/bmcd-invoice.json");

/// Available predefined layouts.
pub const PRESETS: &[&str] = &["bmcd-invoice"];

/// Load a predefined layout by name.
pub fn load_preset(name: &str) -> Result<LayoutDef, CtrError> {
    match name {
        "bmcd-invoice" => {
            let layout: LayoutDef = serde_json::from_str(BMCD_INVOICE_JSON)?;
            super::validate_layout(&layout)?;
            Ok(layout)
        }
        _ => Err(CtrError::LayoutInvalid(format!(
            "unknown preset '{}'. Available: {}",
            name,
            PRESETS.join(", ")
        ))),
    }
}
