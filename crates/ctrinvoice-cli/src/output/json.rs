use ctrinvoice_core::error::CtrError;
use serde::Serialize;

pub fn print<T: Serialize + ?Sized>(value: &T) -> Result<(), CtrError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
