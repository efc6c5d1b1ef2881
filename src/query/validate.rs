use super::types::ResponseFormat;

use std::collections::BTreeSet;

/// Checks that a response body is usable.
///
/// Overpass answers some server-side failures with a 200 and an error body (an HTML page
/// or a `remark` carrying "runtime error"), so a successful status is not enough.
pub fn validate_response(body: &str, format: ResponseFormat) -> Result<(), String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err("empty response".to_string());
    }

    match format {
        ResponseFormat::Json => {
            let value: serde_json::Value = serde_json::from_str(trimmed)
                .map_err(|e| format!("malformed JSON: {}", e))?;
            let object = value
                .as_object()
                .ok_or_else(|| "JSON response is not an object".to_string())?;

            if let Some(remark) = object.get("remark").and_then(|r| r.as_str()) {
                if is_runtime_error(remark) {
                    return Err(format!("server remark: {}", remark));
                }
            }
            Ok(())
        }
        ResponseFormat::Csv => {
            if trimmed.starts_with('<') {
                return Err("markup page instead of CSV".to_string());
            }
            if is_runtime_error(trimmed) {
                return Err("runtime error reported in CSV body".to_string());
            }
            let header = trimmed.lines().next().unwrap_or_default();
            if header.trim().is_empty() {
                return Err("missing CSV header".to_string());
            }
            Ok(())
        }
    }
}

fn is_runtime_error(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("runtime error") || lower.contains("timed out")
}

/// Extracts numeric ids from a CSV body, one id in the first column of each row.
///
/// Non-numeric rows (the `@id` header, blank lines) are skipped.
pub fn parse_csv_ids(body: &str) -> BTreeSet<u64> {
    body.lines()
        .filter_map(|line| {
            let first = line.split([',', '\t', ';']).next()?.trim();
            let first = first.trim_matches('"');
            let first = first.strip_prefix("relation/").unwrap_or(first);
            first.parse::<u64>().ok()
        })
        .collect()
}
