//! "validate" command: score an existing layout against Vastu rules

use std::error::Error;
use std::path::Path;

use serde_json::Value;

use crate::api::backend::{ValidateRequest, ValidationReport};
use crate::core::backend::BackendClient;
use crate::core::config::data::Config;

/// Accepts a bare room array, a generate response (`{"rooms": [...]}`), or a
/// response that nests it under `layout`. Top-level `constraints` are passed
/// through.
pub fn request_from_layout(document: Value) -> Result<ValidateRequest, String> {
    let constraints = document.get("constraints").cloned();
    let rooms = match document {
        Value::Array(rooms) => rooms,
        Value::Object(mut map) => {
            let nested = map
                .get_mut("layout")
                .and_then(|layout| layout.get_mut("rooms"))
                .map(Value::take);
            match map.remove("rooms").or(nested) {
                Some(Value::Array(rooms)) => rooms,
                _ => return Err("layout has no \"rooms\" array".to_string()),
            }
        }
        _ => return Err("expected a JSON array or object".to_string()),
    };
    if rooms.is_empty() {
        return Err("layout has no rooms".to_string());
    }
    Ok(ValidateRequest { rooms, constraints })
}

pub fn format_report(report: &ValidationReport) -> Vec<String> {
    let mut lines = vec![format!("Vastu score: {:.1}%", report.vastu_score)];
    let details = [
        ("Entrance compliance", report.entrance_compliance),
        ("Room placement", report.room_placement_score),
        ("Direction alignment", report.direction_alignment_score),
    ];
    for (label, score) in details {
        if let Some(score) = score {
            lines.push(format!("  {label}: {score:.1}%"));
        }
    }
    lines
}

pub async fn run_validate(path: &Path) -> Result<(), Box<dyn Error>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|err| format!("Failed to read {}: {err}", path.display()))?;
    let document: Value = serde_json::from_str(&contents)
        .map_err(|err| format!("Failed to parse {}: {err}", path.display()))?;
    let request = match request_from_layout(document) {
        Ok(request) => request,
        Err(err) => {
            eprintln!("❌ {}: {err}", path.display());
            std::process::exit(1);
        }
    };

    let config = Config::load()?;
    let backend = BackendClient::new(reqwest::Client::new(), config.backend_url());
    match backend.validate(&request).await {
        Ok(report) => {
            for line in format_report(&report) {
                println!("{line}");
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("❌ Validation failed: {err}");
            std::process::exit(1);
        }
    }
}
