use serde_json::Value;

use super::format_scalar;

/// Headline fields, most specific first. `npv` outranks `irr` because every
/// feasibility result carries it; `npv_mean` covers Monte Carlo output.
const PRIORITY_KEYS: [&str; 7] = [
    "npv",
    "base_npv",
    "npv_mean",
    "probability_weighted_npv",
    "occupancy_pct",
    "irr",
    "base_case_value",
];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        for key in &PRIORITY_KEYS {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_scalar(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_scalar(val));
            return;
        }
    }

    // Projection output is a bare array of years: report the final cumulative
    if let Value::Array(rows) = result_obj {
        if let Some(last) = rows.last().and_then(|r| r.get("cumulative_cashflow")) {
            println!("{}", format_scalar(last));
            return;
        }
    }

    println!("{}", format_scalar(result_obj));
}
