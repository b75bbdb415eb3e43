//! JSON-safe serialization of native database values.
//!
//! MySQL hands back fixed-point decimals, dates, and raw byte strings that
//! have no direct JSON representation. This module converts them into
//! primitives a browser client can consume: decimals become floats
//! (accepted precision loss), dates become ISO-8601 strings, and byte
//! sequences are decoded as UTF-8 with invalid sequences replaced rather
//! than failing.

use crate::database::result::{CellValue, QueryResult, Row};
use rust_decimal::prelude::ToPrimitive;
use serde_json::{json, Map, Value};

/// Recursion bound for nested JSON values. Database results are tree-shaped,
/// but depth is bounded anyway; deeper values degrade to their string form.
const MAX_DEPTH: usize = 32;

/// Convert a single cell into a JSON-safe value.
pub fn cell_to_json(value: &CellValue) -> Value {
    match value {
        CellValue::Null => Value::Null,
        CellValue::Bool(b) => json!(b),
        CellValue::Int(n) => json!(n),
        CellValue::UInt(n) => json!(n),
        CellValue::Float(f) => json!(f),
        // Precision loss accepted: 12.50 serializes as 12.5.
        CellValue::Decimal(d) => d
            .to_f64()
            .map(|f| json!(f))
            .unwrap_or_else(|| Value::String(d.to_string())),
        CellValue::String(s) => Value::String(s.clone()),
        CellValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
        CellValue::DateTime(dt) => Value::String(dt.to_rfc3339()),
        CellValue::Bytes(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
        CellValue::Json(v) => sanitize(v.clone(), 0),
    }
}

/// Convert a row into a JSON object keyed by column name.
pub fn row_to_json(row: &Row) -> Value {
    let map: Map<String, Value> = row
        .iter()
        .map(|(name, value)| (name.clone(), cell_to_json(value)))
        .collect();
    Value::Object(map)
}

/// Convert a full query result into `{columns, rows, row_count, ...}`.
pub fn result_to_json(result: &QueryResult) -> Value {
    let columns: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
    let rows: Vec<Value> = result.rows.iter().map(row_to_json).collect();
    let mut out = json!({
        "columns": columns,
        "rows": rows,
        "row_count": result.row_count,
        "execution_time_ms": result.execution_time_ms,
    });
    if let Some(truncated) = result.truncated {
        out["truncated"] = json!(truncated);
    }
    out
}

/// Recursively sanitize an arbitrary JSON value, bounding depth.
fn sanitize(value: Value, depth: usize) -> Value {
    if depth >= MAX_DEPTH {
        return Value::String(value.to_string());
    }
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| sanitize(item, depth + 1))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, sanitize(v, depth + 1)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_decimal_to_float() {
        let value = CellValue::Decimal(Decimal::from_str("12.50").unwrap());
        assert_eq!(cell_to_json(&value), json!(12.5));
    }

    #[test]
    fn test_date_to_iso_string() {
        let value = CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(cell_to_json(&value), json!("2024-01-01"));
    }

    #[test]
    fn test_datetime_to_iso_string() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 1, 12, 30, 0).unwrap();
        let rendered = cell_to_json(&CellValue::DateTime(dt));
        assert!(rendered.as_str().unwrap().starts_with("2024-01-01T12:30:00"));
    }

    #[test]
    fn test_invalid_utf8_never_fails() {
        let value = CellValue::Bytes(vec![0xff, 0xfe, b'h', b'i']);
        let rendered = cell_to_json(&value);
        let text = rendered.as_str().unwrap();
        assert!(text.ends_with("hi"));
        assert!(text.contains('\u{fffd}'));
    }

    #[test]
    fn test_null_passthrough() {
        assert_eq!(cell_to_json(&CellValue::Null), Value::Null);
    }

    #[test]
    fn test_row_to_json() {
        let mut row = Row::new();
        row.insert("price".into(), CellValue::Decimal(Decimal::new(1250, 2)));
        row.insert("name".into(), CellValue::String("widget".into()));
        let value = row_to_json(&row);
        assert_eq!(value["price"], json!(12.5));
        assert_eq!(value["name"], json!("widget"));
    }

    #[test]
    fn test_deep_nesting_degrades_to_string() {
        let mut value = json!(1);
        for _ in 0..40 {
            value = json!([value]);
        }
        // Must not overflow; the innermost layers collapse to a string.
        let sanitized = sanitize(value, 0);
        let mut current = &sanitized;
        let mut depth = 0;
        while let Value::Array(items) = current {
            current = &items[0];
            depth += 1;
        }
        assert!(current.is_string());
        assert!(depth <= MAX_DEPTH);
    }
}
