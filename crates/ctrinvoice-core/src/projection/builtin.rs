use crate::error::CtrError;
use crate::projection::schema::ProjectionDef;

const DUKE_CTR_JSON: &str = include_str!("../../projections/duke-ctr.json");

/// Available predefined projections.
pub const PRESETS: &[&str] = &["duke-ctr"];

/// Load a predefined projection by name.
pub fn load_preset(name: &str) -> Result<ProjectionDef, CtrError> {
    match name {
        "duke-ctr" => {
            let projection: ProjectionDef = serde_json::from_str(DUKE_CTR_JSON)?;
            super::validate_projection(&projection)?;
            Ok(projection)
        }
        _ => Err(CtrError::ProjectionInvalid(format!(
            "unknown preset '{}'. Available: {}",
            name,
            PRESETS.join(", ")
        ))),
    }
}
