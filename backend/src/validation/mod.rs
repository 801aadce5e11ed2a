//! JSON Schema validation for assembled records.
//!
//! The schema is embedded at compile time from
//! `schemas/assembled-record.json` and pins the output contract: exactly
//! the thirteen output fields, their types, and which may be null.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use bikesales::validate_assembled_record;
//!
//! let record = json!({ "order_id": 1, "order_line": 1 });
//! assert!(validate_assembled_record(&record).is_err());
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::models::AssembledTable;

static ASSEMBLED_RECORD_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/assembled-record.json"))
        .expect("Invalid embedded schema")
});

/// Validate a JSON value against a JSON schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with every violation otherwise
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick true/false check.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// The embedded assembled-record schema.
pub fn assembled_record_schema() -> &'static Value {
    &ASSEMBLED_RECORD_SCHEMA
}

/// Validate one record (as JSON) against the output schema.
pub fn validate_assembled_record(data: &Value) -> Result<(), Vec<String>> {
    validate(&ASSEMBLED_RECORD_SCHEMA, data)
}

/// Quick check against the output schema.
pub fn is_valid_assembled_record(data: &Value) -> bool {
    is_valid(&ASSEMBLED_RECORD_SCHEMA, data)
}

/// Validate JSON records, returning (record index, errors) for the bad ones.
pub fn validate_records(records: &[Value]) -> Vec<(usize, Vec<String>)> {
    records
        .iter()
        .enumerate()
        .filter_map(|(i, record)| validate_assembled_record(record).err().map(|errs| (i, errs)))
        .collect()
}

/// Validate every record of an assembled table.
pub fn validate_table(table: &AssembledTable) -> Vec<(usize, Vec<String>)> {
    table
        .iter()
        .enumerate()
        .filter_map(|(i, record)| {
            let value = match serde_json::to_value(record) {
                Ok(value) => value,
                Err(e) => return Some((i, vec![e.to_string()])),
            };
            validate_assembled_record(&value).err().map(|errs| (i, errs))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssembledRecord, OUTPUT_COLUMNS};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn record() -> Value {
        json!({
            "order_id": 1,
            "order_line": 1,
            "order_date": "2015-06-01",
            "quantity": 2,
            "price": "1500.00",
            "total_revenue": "3000.00",
            "model": "Supersix Evo Hi-Mod Team",
            "category_1": "Road",
            "category_2": "Elite Road",
            "frame_material": "Carbon",
            "bikeshop_name": "Acme",
            "city": "Austin",
            "state": "TX"
        })
    }

    #[test]
    fn test_schema_lists_output_columns() {
        let required: Vec<&str> = assembled_record_schema()["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, OUTPUT_COLUMNS.to_vec());
    }

    #[test]
    fn test_valid_record() {
        assert!(is_valid_assembled_record(&record()));
    }

    #[test]
    fn test_nulls_allowed_in_joined_fields() {
        let mut r = record();
        for field in ["model", "category_1", "category_2", "frame_material", "bikeshop_name", "city", "state"] {
            r[field] = Value::Null;
        }
        assert!(is_valid_assembled_record(&r));
    }

    #[test]
    fn test_invalid_records() {
        let mut r = record();
        r["quantity"] = json!(-1);
        assert!(!is_valid_assembled_record(&r));

        let mut r = record();
        r["order_date"] = json!("06/01/2015");
        assert!(!is_valid_assembled_record(&r));

        let mut r = record();
        r["order.id"] = json!(1);
        assert!(!is_valid_assembled_record(&r));
    }

    #[test]
    fn test_missing_fields_reported() {
        let errors = validate_assembled_record(&json!({ "order_id": 1 })).unwrap_err();
        assert!(!errors.is_empty());
        let bad = validate_records(&[record(), json!({})]);
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].0, 1);
    }

    #[test]
    fn test_serialized_records_validate() {
        let table = AssembledTable::new(vec![AssembledRecord {
            order_id: 5,
            order_line: 1,
            order_date: NaiveDate::from_ymd_opt(2011, 1, 7).unwrap(),
            quantity: 1,
            price: Decimal::new(8155, 1),
            total_revenue: Decimal::new(8155, 1),
            model: None,
            category_1: None,
            category_2: None,
            frame_material: None,
            bikeshop_name: Some("Acme".into()),
            city: Some("Austin".into()),
            state: Some("TX".into()),
        }]);
        assert!(validate_table(&table).is_empty());
    }
}
