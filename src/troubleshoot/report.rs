//! Diagnosis report formatting

use super::types::DiagnosisReport;
use crate::error::Result;

/// Render reports as plain text, one finding per line, in traversal order
pub fn format_text(reports: &[DiagnosisReport]) -> String {
    if reports.is_empty() {
        return "no issue found".to_string();
    }
    reports
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render reports as JSON
pub fn format_json(reports: &[DiagnosisReport], pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(reports)?
    } else {
        serde_json::to_string(reports)?
    };
    Ok(json)
}

/// Render reports as YAML
pub fn format_yaml(reports: &[DiagnosisReport]) -> Result<String> {
    Ok(serde_yaml::to_string(reports)?)
}
