//! Domain models for the bike sales assembly pipeline.
//!
//! - [`RawTable`] - A record set as read from the store (dynamic cells)
//! - [`RowKey`] - Identity of a transaction row
//! - [`AssembledRecord`] - One denormalized, cleaned order line
//! - [`AssembledTable`] - The ordered output of an assembly run
//! - [`OUTPUT_COLUMNS`] - The fixed output schema

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A single row: field name to dynamically typed cell.
pub type Row = Map<String, Value>;

// =============================================================================
// Output Schema
// =============================================================================

/// Output fields, in the order every consumer sees them.
pub const OUTPUT_COLUMNS: [&str; 13] = [
    "order_id",
    "order_line",
    "order_date",
    "quantity",
    "price",
    "total_revenue",
    "model",
    "category_1",
    "category_2",
    "frame_material",
    "bikeshop_name",
    "city",
    "state",
];

// =============================================================================
// Raw Record Sets
// =============================================================================

/// A record set read in full from the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    /// Record set name in the store
    pub name: String,
    /// Column names, in store order
    pub columns: Vec<String>,
    /// Rows, each keyed by column name
    pub rows: Vec<Row>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row given as values in column order.
    ///
    /// Missing trailing values become null; extra values are ignored.
    pub fn push_values(&mut self, values: Vec<Value>) {
        let mut values = values.into_iter();
        let row: Row = self
            .columns
            .iter()
            .map(|col| (col.clone(), values.next().unwrap_or(Value::Null)))
            .collect();
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Remove a column from the header and from every row.
    ///
    /// Returns whether the column was present.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let before = self.columns.len();
        self.columns.retain(|c| c != name);
        if self.columns.len() == before {
            return false;
        }
        for row in &mut self.rows {
            row.remove(name);
        }
        true
    }
}

// =============================================================================
// Row Identity
// =============================================================================

/// Identity of a transaction row.
///
/// `position` is the zero-based index in the transaction set; the order
/// identifiers are `None` when they are themselves missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowKey {
    pub position: usize,
    pub order_id: Option<i64>,
    pub order_line: Option<i64>,
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<i64>| v.map_or_else(|| "?".to_string(), |v| v.to_string());
        write!(
            f,
            "order_id={}, order_line={} (row {})",
            show(self.order_id),
            show(self.order_line),
            self.position
        )
    }
}

// =============================================================================
// Assembled Output
// =============================================================================

/// One order line joined with its product and shop, cleaned.
///
/// Field order matches [`OUTPUT_COLUMNS`]. Joined fields are `None` when the
/// product or shop lookup found nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledRecord {
    pub order_id: i64,
    pub order_line: i64,
    pub order_date: NaiveDate,
    pub quantity: i64,
    pub price: Decimal,
    pub total_revenue: Decimal,
    pub model: Option<String>,
    pub category_1: Option<String>,
    pub category_2: Option<String>,
    pub frame_material: Option<String>,
    pub bikeshop_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

impl AssembledRecord {
    /// Cells as text, in [`OUTPUT_COLUMNS`] order. Nulls become empty strings.
    pub fn to_text_row(&self) -> Vec<String> {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        vec![
            self.order_id.to_string(),
            self.order_line.to_string(),
            self.order_date.format("%Y-%m-%d").to_string(),
            self.quantity.to_string(),
            self.price.to_string(),
            self.total_revenue.to_string(),
            text(&self.model),
            text(&self.category_1),
            text(&self.category_2),
            text(&self.frame_material),
            text(&self.bikeshop_name),
            text(&self.city),
            text(&self.state),
        ]
    }

    /// Look up a field by output column name.
    pub fn get(&self, column: &str) -> Option<Value> {
        let text = |v: &Option<String>| v.clone().map_or(Value::Null, Value::String);
        let value = match column {
            "order_id" => Value::from(self.order_id),
            "order_line" => Value::from(self.order_line),
            "order_date" => Value::String(self.order_date.format("%Y-%m-%d").to_string()),
            "quantity" => Value::from(self.quantity),
            "price" => Value::String(self.price.to_string()),
            "total_revenue" => Value::String(self.total_revenue.to_string()),
            "model" => text(&self.model),
            "category_1" => text(&self.category_1),
            "category_2" => text(&self.category_2),
            "frame_material" => text(&self.frame_material),
            "bikeshop_name" => text(&self.bikeshop_name),
            "city" => text(&self.city),
            "state" => text(&self.state),
            _ => return None,
        };
        Some(value)
    }
}

/// The ordered result of an assembly run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssembledTable {
    pub records: Vec<AssembledRecord>,
}

impl AssembledTable {
    pub fn new(records: Vec<AssembledRecord>) -> Self {
        Self { records }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        &OUTPUT_COLUMNS
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AssembledRecord> {
        self.records.iter()
    }

    /// One column across all records.
    pub fn column(&self, name: &str) -> Option<Vec<Value>> {
        if !OUTPUT_COLUMNS.contains(&name) {
            return None;
        }
        self.records.iter().map(|r| r.get(name)).collect()
    }
}

impl<'a> IntoIterator for &'a AssembledTable {
    type Item = &'a AssembledRecord;
    type IntoIter = std::slice::Iter<'a, AssembledRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> AssembledRecord {
        AssembledRecord {
            order_id: 1,
            order_line: 1,
            order_date: NaiveDate::from_ymd_opt(2015, 6, 1).unwrap(),
            quantity: 2,
            price: Decimal::new(150000, 2),
            total_revenue: Decimal::new(300000, 2),
            model: Some("Supersix Evo Hi-Mod Team".into()),
            category_1: Some("Road".into()),
            category_2: Some("Elite Road".into()),
            frame_material: Some("Carbon".into()),
            bikeshop_name: Some("Acme".into()),
            city: Some("Austin".into()),
            state: None,
        }
    }

    #[test]
    fn test_serialized_field_order_matches_output_columns() {
        let json = serde_json::to_value(record()).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        // serde_json::Map is sorted unless preserve_order is on, so compare as sets
        let mut expected: Vec<&str> = OUTPUT_COLUMNS.to_vec();
        let mut actual = keys.clone();
        expected.sort();
        actual.sort();
        assert_eq!(actual, expected);
        assert_eq!(json["order_date"], "2015-06-01");
        assert_eq!(json["total_revenue"], "3000.00");
        assert_eq!(json["state"], Value::Null);
    }

    #[test]
    fn test_text_row_follows_column_order() {
        let row = record().to_text_row();
        assert_eq!(row.len(), OUTPUT_COLUMNS.len());
        assert_eq!(row[2], "2015-06-01");
        assert_eq!(row[5], "3000.00");
        assert_eq!(row[12], "");
    }

    #[test]
    fn test_get_by_column_name() {
        let r = record();
        assert_eq!(r.get("category_2"), Some(json!("Elite Road")));
        assert_eq!(r.get("quantity"), Some(json!(2)));
        assert_eq!(r.get("bike_id"), None);
    }

    #[test]
    fn test_drop_column() {
        let mut table = RawTable::new("bikes", vec!["index".into(), "bike.id".into()]);
        table.push_values(vec![json!(0), json!(1)]);
        assert!(table.drop_column("index"));
        assert!(!table.drop_column("index"));
        assert_eq!(table.columns, vec!["bike.id"]);
        assert!(!table.rows[0].contains_key("index"));
    }

    #[test]
    fn test_row_key_display() {
        let key = RowKey { position: 0, order_id: None, order_line: Some(4) };
        assert_eq!(key.to_string(), "order_id=?, order_line=4 (row 0)");
    }
}
