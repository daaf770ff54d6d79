pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Render a JSON value as a single cell.
///
/// Status-tagged outcomes collapse to their payload: a defined IRR prints
/// its rate, an achieved payback its years, anything else its status (and
/// reason, when present).
pub(crate) fn format_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_scalar).collect();
            items.join(", ")
        }
        Value::Object(map) => match map.get("status").and_then(Value::as_str) {
            Some(status) => {
                let payload = map
                    .iter()
                    .find(|(k, _)| k.as_str() != "status")
                    .map(|(_, v)| format_scalar(v));
                match (status, payload) {
                    ("defined" | "achieved", Some(p)) => p,
                    (_, Some(p)) => format!("{status} ({p})"),
                    (_, None) => status.to_string(),
                }
            }
            None => serde_json::to_string(value).unwrap_or_default(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tagged_outcomes_collapse() {
        assert_eq!(format_scalar(&json!({"status": "defined", "rate": "0.1945"})), "0.1945");
        assert_eq!(
            format_scalar(&json!({"status": "undefined", "reason": "no_sign_change"})),
            "undefined (no_sign_change)"
        );
        assert_eq!(format_scalar(&json!({"status": "never"})), "never");
        assert_eq!(format_scalar(&json!({"status": "achieved", "years": "4.3"})), "4.3");
    }

    #[test]
    fn test_plain_values() {
        assert_eq!(format_scalar(&json!(null)), "-");
        assert_eq!(format_scalar(&json!(["0.3", "0.5"])), "0.3, 0.5");
        assert_eq!(format_scalar(&json!({"a": 1})), "{\"a\":1}");
    }
}
