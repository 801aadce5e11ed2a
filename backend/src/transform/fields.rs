//! Field names and typed access to dynamic cells.
//!
//! Store rows are maps of field name to [`serde_json::Value`]. Everything the
//! assembler reads goes through the accessors here, which turn a cell into
//! the type the output schema needs or say why they could not.

use rust_decimal::Decimal;
use serde_json::{Number, Value};
use std::str::FromStr;

use crate::models::{RawTable, Row};

/// Replace every `.` in a field name with `_`.
///
/// Idempotent: the result never contains a `.`.
pub fn normalize_field_name(name: &str) -> String {
    name.replace('.', "_")
}

/// Apply [`normalize_field_name`] to the header and to every row of a table.
pub fn normalize_field_names(table: &mut RawTable) {
    if !table.columns.iter().any(|c| c.contains('.')) {
        return;
    }
    table.columns = table.columns.iter().map(|c| normalize_field_name(c)).collect();
    for row in &mut table.rows {
        let renamed: Row = std::mem::take(row)
            .into_iter()
            .map(|(k, v)| (normalize_field_name(&k), v))
            .collect();
        *row = renamed;
    }
}

/// First of `names` present in the row, with its value (which may be null).
pub fn lookup<'a>(row: &'a Row, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| row.get(*name))
}

/// First of `names` present in the table header.
pub fn resolve_column<'n>(table: &RawTable, names: &[&'n str]) -> Option<&'n str> {
    names.iter().copied().find(|name| table.has_column(name))
}

/// Why a cell could not be read as the wanted type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellError {
    /// Null, empty or absent
    Missing,
    /// Present but of the wrong type; carries the offending text
    Invalid(String),
}

/// Cell as text. Null stays `None`; numbers and booleans are rendered.
pub fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Cell as a whole number.
///
/// Accepts integers, floats with no fractional part (`2.0`) and text that
/// parses as either.
pub fn cell_integer(value: &Value) -> Result<i64, CellError> {
    match value {
        Value::Null => Err(CellError::Missing),
        Value::Number(n) => number_to_integer(n).ok_or_else(|| CellError::Invalid(n.to_string())),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Err(CellError::Missing);
            }
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().and_then(float_to_integer))
                .ok_or_else(|| CellError::Invalid(s.clone()))
        }
        other => Err(CellError::Invalid(other.to_string())),
    }
}

/// Cell as an exact decimal.
///
/// Floats go through their shortest text form, so `1500.1` stays `1500.1`
/// instead of picking up binary noise.
pub fn cell_decimal(value: &Value) -> Result<Decimal, CellError> {
    match value {
        Value::Null => Err(CellError::Missing),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Decimal::from(i)),
            None => parse_decimal(&n.to_string()).ok_or_else(|| CellError::Invalid(n.to_string())),
        },
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Err(CellError::Missing);
            }
            parse_decimal(trimmed).ok_or_else(|| CellError::Invalid(s.clone()))
        }
        other => Err(CellError::Invalid(other.to_string())),
    }
}

/// Canonical join key: `1`, `1.0` and `"1"` all become `"1"`.
pub fn join_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Number(n) => Some(match number_to_integer(n) {
            Some(i) => i.to_string(),
            None => n.to_string(),
        }),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            let canonical = trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().and_then(float_to_integer))
                .map_or_else(|| trimmed.to_string(), |i| i.to_string());
            Some(canonical)
        }
        other => Some(other.to_string()),
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn number_to_integer(n: &Number) -> Option<i64> {
    n.as_i64().or_else(|| n.as_f64().and_then(float_to_integer))
}

fn float_to_integer(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        Some(f as i64)
    } else {
        None
    }
}
