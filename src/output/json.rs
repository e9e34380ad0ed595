use anyhow::Result;
use serde::Serialize;

use crate::error::Error;

/// Pretty-print any serializable value as JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

/// JSON body describing a failed run: the stage that failed and why.
pub fn error_json(err: &Error) -> serde_json::Value {
    serde_json::json!({
        "ok": false,
        "stage": err.stage(),
        "error": err.to_string(),
    })
}
