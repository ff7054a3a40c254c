//! Parsing helpers for datetimes and JSON arguments.

use chrono::{DateTime, NaiveDate, Utc};

use crate::errors::CliError;

/// Parse a datetime string (ISO-8601 or YYYY-MM-DD).
pub fn parse_datetime(value: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let naive = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| CliError::invalid_input(format!("Invalid date value: {}", value)))?;
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
    }

    Err(CliError::invalid_input(format!(
        "Invalid date/time (expected ISO-8601 or YYYY-MM-DD): {}",
        value
    ))
    .into())
}

/// Parse an optional datetime argument.
pub fn parse_optional_datetime(value: Option<&str>) -> anyhow::Result<Option<DateTime<Utc>>> {
    value.map(parse_datetime).transpose()
}

/// Parse a JSON object argument such as a chart config.
pub fn parse_json_object(value: &str) -> anyhow::Result<serde_json::Value> {
    let parsed: serde_json::Value = serde_json::from_str(value)
        .map_err(|e| CliError::invalid_input(format!("Invalid JSON: {}", e)))?;
    if !parsed.is_object() {
        return Err(CliError::invalid_input("Expected a JSON object").into());
    }
    Ok(parsed)
}
