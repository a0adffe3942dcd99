use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Print `data` as JSON or let `text` render it for humans
pub fn output<T: Serialize>(output_format: OutputFormat, data: &T, text: impl FnOnce(&T)) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let response = json!({ "success": true, "data": serde_json::to_value(data)? });
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => text(data),
    }
    Ok(())
}

/// Success line, with optional structured detail in JSON mode
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({ "success": true, "message": message });
            if let Some(data) = data {
                response["data"] = data;
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => println!("✓ {}", message),
    }
    Ok(())
}
