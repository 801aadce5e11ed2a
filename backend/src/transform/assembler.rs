//! The data assembler: three normalized record sets in, one sales table out.
//!
//! # Example
//!
//! ```rust,ignore
//! use bikesales::{assemble, AssemblerConfig, RowPolicy, SqliteStore, StoreConfig};
//!
//! let store = SqliteStore::new(StoreConfig::with_path("bike_orders_database.sqlite"));
//! let assembly = assemble(&store, &AssemblerConfig::default())?;
//! let table = assembly.into_table(RowPolicy::SkipAndLog)?;
//! println!("{} order lines", table.len());
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::dates::parse_order_date;
use super::fields::{
    cell_decimal, cell_integer, cell_text, lookup, normalize_field_names, resolve_column,
    CellError,
};
use super::join::{left_join, LookupIndex};
use super::split::{split_segments, DESCRIPTION_SEPARATOR, LOCATION_SEPARATOR};
use crate::api::logs::{log_info, log_success, log_warning};
use crate::config::AssemblerConfig;
use crate::error::{AssembleResult, ConnectionResult, RowError, RowResult};
use crate::models::{AssembledRecord, AssembledTable, RawTable, Row, RowKey};
use crate::store::RecordSource;

// Source fields, after `.` -> `_` normalization
const ORDER_ID: &str = "order_id";
const ORDER_LINE: &str = "order_line";
const ORDER_DATE: &[&str] = &["order_date", "date"];
const QUANTITY: &str = "quantity";
const PRICE: &str = "price";
const PRODUCT_ID: &[&str] = &["product_id"];
const CUSTOMER_ID: &[&str] = &["customer_id"];
const BIKE_ID: &[&str] = &["bike_id"];
const BIKESHOP_ID: &[&str] = &["bikeshop_id"];
const MODEL: &[&str] = &["model"];
const DESCRIPTION: &[&str] = &["description"];
const SHOP_NAME: &[&str] = &["bikeshop_name", "name"];
const LOCATION: &[&str] = &["location"];

/// How row errors are handled when turning an [`Assembly`] into a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowPolicy {
    /// Fail with the first bad row.
    #[default]
    Abort,
    /// Log bad rows and leave them out.
    #[serde(alias = "skip")]
    SkipAndLog,
}

/// Outcome of assembling every transaction.
///
/// `rows` has one entry per transaction, in transaction order.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub rows: Vec<RowResult<AssembledRecord>>,
    /// Data-quality notes that did not fail a row
    pub warnings: Vec<String>,
}

impl Assembly {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &AssembledRecord> {
        self.rows.iter().filter_map(|r| r.as_ref().ok())
    }

    pub fn errors(&self) -> impl Iterator<Item = &RowError> {
        self.rows.iter().filter_map(|r| r.as_ref().err())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// Check if every transaction assembled cleanly
    pub fn is_ok(&self) -> bool {
        self.rows.iter().all(Result::is_ok)
    }

    /// Split into good records and row errors, both in transaction order.
    pub fn into_parts(self) -> (AssembledTable, Vec<RowError>) {
        let mut records = Vec::with_capacity(self.rows.len());
        let mut errors = Vec::new();
        for row in self.rows {
            match row {
                Ok(record) => records.push(record),
                Err(err) => errors.push(err),
            }
        }
        (AssembledTable::new(records), errors)
    }

    /// Apply a [`RowPolicy`].
    pub fn into_table(self, policy: RowPolicy) -> AssembleResult<AssembledTable> {
        let (table, errors) = self.into_parts();
        match policy {
            RowPolicy::Abort => match errors.into_iter().next() {
                Some(err) => Err(err.into()),
                None => Ok(table),
            },
            RowPolicy::SkipAndLog => {
                report_skipped(&errors);
                Ok(table)
            }
        }
    }
}

/// Assembles order lines with their product and shop.
#[derive(Debug, Clone, Default)]
pub struct DataAssembler {
    config: AssemblerConfig,
}

impl DataAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Read the three record sets from `source` and assemble them.
    ///
    /// Opens exactly one connection and releases it before returning, on
    /// success and on failure. Only connection problems fail the call; row
    /// problems are reported per row in the [`Assembly`].
    pub fn assemble(&self, source: &dyn RecordSource) -> ConnectionResult<Assembly> {
        log_info(format!("📖 Reading record sets from {}", source.describe()));

        let tables = &self.config.tables;
        let mut session = source.open()?;
        let products = session.read_table(&tables.products)?;
        let shops = session.read_table(&tables.shops)?;
        let transactions = session.read_table(&tables.transactions)?;
        session.close()?;

        log_success(format!(
            "Read {} products, {} shops, {} transactions",
            products.len(),
            shops.len(),
            transactions.len()
        ));

        Ok(self.assemble_tables(products, shops, transactions))
    }

    /// Assemble record sets that are already in memory.
    pub fn assemble_tables(
        &self,
        mut products: RawTable,
        mut shops: RawTable,
        mut transactions: RawTable,
    ) -> Assembly {
        let mut warnings = Vec::new();

        for table in [&mut products, &mut shops, &mut transactions] {
            table.drop_column(&self.config.index_column);
            normalize_field_names(table);
        }

        let required: &[&[&str]] = &[
            &[ORDER_ID],
            &[ORDER_LINE],
            ORDER_DATE,
            &[QUANTITY],
            PRODUCT_ID,
            CUSTOMER_ID,
        ];
        check_columns(&transactions, required, &mut warnings);
        check_columns(&products, &[BIKE_ID], &mut warnings);
        check_columns(&shops, &[BIKESHOP_ID], &mut warnings);

        let product_key = resolve_column(&products, BIKE_ID).unwrap_or(BIKE_ID[0]);
        let shop_key = resolve_column(&shops, BIKESHOP_ID).unwrap_or(BIKESHOP_ID[0]);
        let product_index = LookupIndex::build(&products, product_key);
        let shop_index = LookupIndex::build(&shops, shop_key);
        note_duplicates(&products, &product_index, &mut warnings);
        note_duplicates(&shops, &shop_index, &mut warnings);

        let product_rows = left_join(&transactions, PRODUCT_ID, &product_index);
        let shop_rows = left_join(&transactions, CUSTOMER_ID, &shop_index);

        // Per-line price wins over the catalog price when the order lines carry one
        let price_from_transaction = transactions.has_column(PRICE);

        log_info("⚙️  Assembling order lines...");
        let rows: Vec<RowResult<AssembledRecord>> = transactions
            .rows
            .iter()
            .zip(product_rows)
            .zip(shop_rows)
            .enumerate()
            .map(|(position, ((txn, product), shop))| {
                let line = JoinedLine {
                    position,
                    transaction: txn,
                    product,
                    shop,
                    price_from_transaction,
                };
                line.assemble(&mut warnings)
            })
            .collect();

        let assembly = Assembly { rows, warnings };
        let errors = assembly.error_count();
        if errors == 0 {
            log_success(format!("Assembled {} order lines", assembly.len()));
        } else {
            log_warning(format!(
                "Assembled {} order lines, {} with data-quality errors",
                assembly.len(),
                errors
            ));
        }
        for warning in assembly.warnings.iter().take(5) {
            log_warning(format!("• {}", warning));
        }
        if assembly.warnings.len() > 5 {
            log_warning(format!("... +{} more warnings", assembly.warnings.len() - 5));
        }
        assembly
    }
}

/// Read the three record sets from `source` and assemble them.
pub fn assemble(source: &dyn RecordSource, config: &AssemblerConfig) -> ConnectionResult<Assembly> {
    DataAssembler::new(config.clone()).assemble(source)
}

/// Assemble and apply `policy` in one step.
pub fn assemble_table(
    source: &dyn RecordSource,
    config: &AssemblerConfig,
    policy: RowPolicy,
) -> AssembleResult<AssembledTable> {
    assemble(source, config)?.into_table(policy)
}

/// One transaction with whatever the joins found for it.
struct JoinedLine<'a> {
    position: usize,
    transaction: &'a Row,
    product: Option<&'a Row>,
    shop: Option<&'a Row>,
    price_from_transaction: bool,
}

impl JoinedLine<'_> {
    fn key(&self) -> RowKey {
        let id = |field: &str| self.transaction.get(field).and_then(|v| cell_integer(v).ok());
        RowKey {
            position: self.position,
            order_id: id(ORDER_ID),
            order_line: id(ORDER_LINE),
        }
    }

    fn assemble(&self, warnings: &mut Vec<String>) -> RowResult<AssembledRecord> {
        let key = self.key();
        let txn = self.transaction;

        let order_id = require_integer(&key, txn.get(ORDER_ID), ORDER_ID)?;
        let order_line = require_integer(&key, txn.get(ORDER_LINE), ORDER_LINE)?;

        let date_text = lookup(txn, ORDER_DATE)
            .and_then(cell_text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| RowError::schema(&key, "order_date", "is missing"))?;
        let order_date = parse_order_date(&date_text).ok_or_else(|| {
            RowError::parse(
                &key,
                "order_date",
                date_text.as_str(),
                "is not a year-first calendar date",
            )
        })?;

        let quantity = require_integer(&key, txn.get(QUANTITY), QUANTITY)?;
        if quantity < 0 {
            return Err(RowError::schema(&key, QUANTITY, format!("is negative ({})", quantity)));
        }

        let price_cell = if self.price_from_transaction {
            txn.get(PRICE)
        } else {
            self.product.and_then(|p| p.get(PRICE))
        };
        let price = match price_cell.map(cell_decimal) {
            Some(Ok(price)) => price,
            Some(Err(CellError::Invalid(raw))) => {
                return Err(RowError::schema(&key, PRICE, format!("is not numeric ('{}')", raw)));
            }
            Some(Err(CellError::Missing)) | None => {
                let message = if self.product.is_none() && !self.price_from_transaction {
                    "is missing (no matching product)"
                } else {
                    "is missing"
                };
                return Err(RowError::schema(&key, PRICE, message));
            }
        };
        if price.is_sign_negative() && !price.is_zero() {
            return Err(RowError::schema(&key, PRICE, format!("is negative ({})", price)));
        }

        let total_revenue = Decimal::from(quantity)
            .checked_mul(price)
            .ok_or_else(|| RowError::schema(&key, "total_revenue", "overflows"))?;

        let product_text =
            |names: &[&str]| self.product.and_then(|p| lookup(p, names)).and_then(cell_text);
        let shop_text =
            |names: &[&str]| self.shop.and_then(|s| lookup(s, names)).and_then(cell_text);

        let description = product_text(DESCRIPTION);
        let categories = split_segments(description.as_deref(), DESCRIPTION_SEPARATOR, 3)
            .map_err(|e| {
                RowError::parse(
                    &key,
                    "description",
                    description.clone().unwrap_or_default(),
                    format!(
                        "has {} segments separated by '{}', expected {}",
                        e.found, DESCRIPTION_SEPARATOR, e.expected
                    ),
                )
            })?;
        if categories.is_short() {
            warnings.push(format!(
                "{}: description '{}' is missing {} of 3 segments",
                key,
                description.as_deref().unwrap_or_default(),
                categories.missing
            ));
        }

        let location = shop_text(LOCATION);
        let place = split_segments(location.as_deref(), LOCATION_SEPARATOR, 2).map_err(|e| {
            RowError::parse(
                &key,
                "location",
                location.clone().unwrap_or_default(),
                format!(
                    "has {} segments separated by '{}', expected {}",
                    e.found, LOCATION_SEPARATOR, e.expected
                ),
            )
        })?;
        if place.is_short() {
            warnings.push(format!(
                "{}: location '{}' is missing {} of 2 segments",
                key,
                location.as_deref().unwrap_or_default(),
                place.missing
            ));
        }

        Ok(AssembledRecord {
            order_id,
            order_line,
            order_date,
            quantity,
            price,
            total_revenue,
            model: product_text(MODEL),
            category_1: categories.get(0),
            category_2: categories.get(1),
            frame_material: categories.get(2),
            bikeshop_name: shop_text(SHOP_NAME),
            city: place.get(0),
            state: place.get(1),
        })
    }
}

fn require_integer(key: &RowKey, cell: Option<&serde_json::Value>, field: &str) -> RowResult<i64> {
    match cell.map(cell_integer) {
        Some(Ok(value)) => Ok(value),
        Some(Err(CellError::Invalid(raw))) => Err(RowError::schema(
            key,
            field,
            format!("is not an integer ('{}')", raw),
        )),
        Some(Err(CellError::Missing)) | None => Err(RowError::schema(key, field, "is missing")),
    }
}

fn check_columns(table: &RawTable, required: &[&[&str]], warnings: &mut Vec<String>) {
    for names in required {
        if resolve_column(table, names).is_none() {
            warnings.push(format!("record set '{}' has no '{}' column", table.name, names[0]));
        }
    }
}

fn note_duplicates(table: &RawTable, index: &LookupIndex<'_>, warnings: &mut Vec<String>) {
    if !index.duplicates.is_empty() {
        warnings.push(format!(
            "record set '{}' repeats keys {:?}; the first row of each is used",
            table.name, index.duplicates
        ));
    }
}

/// Log the rows a [`RowPolicy::SkipAndLog`] run leaves out.
pub fn report_skipped(errors: &[RowError]) {
    if errors.is_empty() {
        return;
    }
    log_warning(format!("{} order lines skipped", errors.len()));
    for err in errors.iter().take(10) {
        log_warning(format!("• {}", err));
    }
    if errors.len() > 10 {
        log_warning(format!("... +{}", errors.len() - 10));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::error::{AssembleError, ConnectionError};
    use crate::store::{MemoryStore, SqliteStore};
    use chrono::NaiveDate;
    use serde_json::{json, Value};

    fn products(rows: &[(Value, &str, &str)]) -> RawTable {
        let mut t = RawTable::new(
            "bikes",
            vec!["index".into(), "bike.id".into(), "model".into(), "description".into()],
        );
        for (i, (id, model, description)) in rows.iter().enumerate() {
            t.push_values(vec![json!(i), id.clone(), json!(model), json!(description)]);
        }
        t
    }

    fn shops(rows: &[(Value, &str, &str)]) -> RawTable {
        let mut t = RawTable::new(
            "bikeshops",
            vec!["index".into(), "bikeshop.id".into(), "bikeshop.name".into(), "location".into()],
        );
        for (i, (id, name, location)) in rows.iter().enumerate() {
            t.push_values(vec![json!(i), id.clone(), json!(name), json!(location)]);
        }
        t
    }

    /// (order_id, order_line, product_id, customer_id, date, quantity, price)
    type Line = (i64, i64, Value, Value, Value, Value, Value);

    fn orderlines(rows: &[Line]) -> RawTable {
        let mut t = RawTable::new(
            "orderlines",
            vec![
                "index".into(),
                "order.id".into(),
                "order.line".into(),
                "order.date".into(),
                "customer.id".into(),
                "product.id".into(),
                "quantity".into(),
                "price".into(),
            ],
        );
        for (i, (id, line, product, customer, date, quantity, price)) in rows.iter().enumerate() {
            t.push_values(vec![
                json!(i),
                json!(id),
                json!(line),
                date.clone(),
                customer.clone(),
                product.clone(),
                quantity.clone(),
                price.clone(),
            ]);
        }
        t
    }

    fn acme_store(date: &str) -> MemoryStore {
        MemoryStore::new()
            .with_table(products(&[(json!(1), "Supersix Evo Hi-Mod Team", "Road - Elite Road - Carbon")]))
            .with_table(shops(&[(json!(1), "Acme", "Austin, TX")]))
            .with_table(orderlines(&[(
                1,
                1,
                json!(1),
                json!(1),
                json!(date),
                json!(2),
                json!("1500.00"),
            )]))
    }

    #[test]
    fn test_single_order_scenario() {
        let store = acme_store("2015-06-01");
        let table = assemble_table(&store, &AssemblerConfig::default(), RowPolicy::Abort).unwrap();

        assert_eq!(table.len(), 1);
        let r = &table.records[0];
        assert_eq!(r.order_id, 1);
        assert_eq!(r.order_line, 1);
        assert_eq!(r.order_date, NaiveDate::from_ymd_opt(2015, 6, 1).unwrap());
        assert_eq!(r.quantity, 2);
        assert_eq!(r.price, Decimal::new(150000, 2));
        assert_eq!(r.total_revenue, Decimal::new(300000, 2));
        assert_eq!(r.model.as_deref(), Some("Supersix Evo Hi-Mod Team"));
        assert_eq!(r.category_1.as_deref(), Some("Road"));
        assert_eq!(r.category_2.as_deref(), Some("Elite Road"));
        assert_eq!(r.frame_material.as_deref(), Some("Carbon"));
        assert_eq!(r.bikeshop_name.as_deref(), Some("Acme"));
        assert_eq!(r.city.as_deref(), Some("Austin"));
        assert_eq!(r.state.as_deref(), Some("TX"));

        // One connection, released
        assert_eq!(store.sessions_opened(), 1);
        assert_eq!(store.sessions_open(), 0);
    }

    #[test]
    fn test_malformed_date_names_the_row() {
        let store = acme_store("not-a-date");
        let assembly = assemble(&store, &AssemblerConfig::default()).unwrap();
        assert_eq!(assembly.len(), 1);

        let err = assembly.errors().next().unwrap().clone();
        assert!(err.is_parse());
        assert_eq!(err.field(), "order_date");
        assert_eq!(err.key().order_id, Some(1));
        assert_eq!(err.key().order_line, Some(1));

        match assembly.into_table(RowPolicy::Abort) {
            Err(AssembleError::Row(row)) => assert_eq!(row, err),
            other => panic!("expected row error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_row_does_not_abort_assembly() {
        let store = MemoryStore::new()
            .with_table(products(&[(json!(1), "Trail 5", "Mountain - Sport - Aluminum")]))
            .with_table(shops(&[(json!(1), "Acme", "Austin, TX")]))
            .with_table(orderlines(&[
                (1, 1, json!(1), json!(1), json!("2011-01-07"), json!(1), json!(815)),
                (1, 2, json!(1), json!(1), json!("2011-01-07"), json!("lots"), json!(815)),
                (2, 1, json!(1), json!(1), json!("2011-01-10"), json!(3), json!(815)),
            ]));

        let assembly = assemble(&store, &AssemblerConfig::default()).unwrap();
        assert_eq!(assembly.len(), 3);
        assert_eq!(assembly.error_count(), 1);
        let err = assembly.errors().next().unwrap();
        assert!(err.is_schema());
        assert_eq!(err.field(), "quantity");
        assert_eq!(err.key().order_line, Some(2));

        let table = assembly.into_table(RowPolicy::SkipAndLog).unwrap();
        let ids: Vec<(i64, i64)> = table.iter().map(|r| (r.order_id, r.order_line)).collect();
        assert_eq!(ids, vec![(1, 1), (2, 1)]);
    }

    #[test]
    fn test_unmatched_product_yields_nulls() {
        let store = MemoryStore::new()
            .with_table(products(&[(json!(1), "Trail 5", "Mountain - Sport - Aluminum")]))
            .with_table(shops(&[(json!(1), "Acme", "Austin, TX")]))
            .with_table(orderlines(&[(
                7,
                3,
                json!(404),
                json!(1),
                json!("2012-03-04"),
                json!(4),
                json!(250.5),
            )]));

        let table = assemble_table(&store, &AssemblerConfig::default(), RowPolicy::Abort).unwrap();
        let r = &table.records[0];
        assert_eq!(r.model, None);
        assert_eq!(r.category_1, None);
        assert_eq!(r.category_2, None);
        assert_eq!(r.frame_material, None);
        assert_eq!((r.order_id, r.order_line, r.quantity), (7, 3, 4));
        assert_eq!(r.total_revenue, Decimal::new(10020, 1));
        assert_eq!(r.bikeshop_name.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_unmatched_shop_yields_nulls() {
        let store = MemoryStore::new()
            .with_table(products(&[(json!(1), "Trail 5", "Mountain - Sport - Aluminum")]))
            .with_table(shops(&[(json!(1), "Acme", "Austin, TX")]))
            .with_table(orderlines(&[(
                1,
                1,
                json!(1),
                json!(55),
                json!("2015-06-01"),
                json!(1),
                json!(10),
            )]));

        let table = assemble_table(&store, &AssemblerConfig::default(), RowPolicy::Abort).unwrap();
        let r = &table.records[0];
        assert_eq!((r.bikeshop_name.clone(), r.city.clone(), r.state.clone()), (None, None, None));
        assert_eq!(r.category_1.as_deref(), Some("Mountain"));
    }

    #[test]
    fn test_row_count_and_order_preserved() {
        let lines: Vec<Line> = (0..50)
            .map(|i| {
                (
                    100 - i,
                    1 + i % 3,
                    json!(1 + i % 4),
                    json!(1 + i % 5),
                    json!("2013-05-06"),
                    json!(i % 7),
                    json!(100 + i),
                )
            })
            .collect();
        let store = MemoryStore::new()
            .with_table(products(&[
                (json!(1), "A", "Road - Elite Road - Carbon"),
                (json!(2), "B", "Mountain - Trail - Aluminum"),
            ]))
            .with_table(shops(&[(json!(1), "Acme", "Austin, TX"), (json!(2), "Bolt", "Dallas, TX")]))
            .with_table(orderlines(&lines));

        let table = assemble_table(&store, &AssemblerConfig::default(), RowPolicy::Abort).unwrap();
        assert_eq!(table.len(), lines.len());
        for (record, line) in table.iter().zip(&lines) {
            assert_eq!(record.order_id, line.0);
            assert_eq!(record.total_revenue, Decimal::from(record.quantity) * record.price);
        }
    }

    #[test]
    fn test_revenue_is_exact() {
        let store = MemoryStore::new()
            .with_table(products(&[(json!(1), "A", "Road - Elite Road - Carbon")]))
            .with_table(shops(&[(json!(1), "Acme", "Austin, TX")]))
            .with_table(orderlines(&[(1, 1, json!(1), json!(1), json!("2015-06-01"), json!(3), json!(0.1))]));

        let table = assemble_table(&store, &AssemblerConfig::default(), RowPolicy::Abort).unwrap();
        assert_eq!(table.records[0].total_revenue, Decimal::new(3, 1));
    }

    #[test]
    fn test_price_from_product_when_lines_have_none() {
        let mut bikes = products(&[(json!(1), "Jekyll Carbon 2", "Mountain - Over Mountain - Carbon")]);
        bikes.columns.push("price".into());
        bikes.rows[0].insert("price".into(), json!(6070));

        let mut lines = orderlines(&[
            (1, 1, json!(1), json!(1), json!("2011-01-07"), json!(2), Value::Null),
            (1, 2, json!(9), json!(1), json!("2011-01-07"), json!(2), Value::Null),
        ]);
        lines.drop_column("price");

        let store = MemoryStore::new()
            .with_table(bikes)
            .with_table(shops(&[(json!(1), "Acme", "Austin, TX")]))
            .with_table(lines);

        let assembly = assemble(&store, &AssemblerConfig::default()).unwrap();
        let first = assembly.rows[0].as_ref().unwrap();
        assert_eq!(first.price, Decimal::from(6070));
        assert_eq!(first.total_revenue, Decimal::from(12140));

        // No product, no price: a schema error on that row
        let err = assembly.rows[1].as_ref().unwrap_err();
        assert!(err.is_schema());
        assert_eq!(err.field(), "price");
    }

    #[test]
    fn test_extra_segments_are_parse_errors() {
        let store = MemoryStore::new()
            .with_table(products(&[(json!(1), "A", "Road - Elite Road - Carbon - Special")]))
            .with_table(shops(&[(json!(1), "Acme", "Austin, TX")]))
            .with_table(orderlines(&[(1, 1, json!(1), json!(1), json!("2015-06-01"), json!(1), json!(1))]));

        let assembly = assemble(&store, &AssemblerConfig::default()).unwrap();
        let err = assembly.rows[0].as_ref().unwrap_err();
        assert!(err.is_parse());
        assert_eq!(err.field(), "description");
    }

    #[test]
    fn test_short_segments_pad_and_warn() {
        let store = MemoryStore::new()
            .with_table(products(&[(json!(1), "A", "Road - Elite Road")]))
            .with_table(shops(&[(json!(1), "Acme", "Austin")]))
            .with_table(orderlines(&[(1, 1, json!(1), json!(1), json!("2015-06-01"), json!(1), json!(1))]));

        let assembly = assemble(&store, &AssemblerConfig::default()).unwrap();
        assert_eq!(assembly.warnings.len(), 2);
        let r = assembly.rows[0].as_ref().unwrap();
        assert_eq!(r.category_2.as_deref(), Some("Elite Road"));
        assert_eq!(r.frame_material, None);
        assert_eq!(r.city.as_deref(), Some("Austin"));
        assert_eq!(r.state, None);
    }

    #[test]
    fn test_negative_and_missing_numbers() {
        let store = MemoryStore::new()
            .with_table(products(&[(json!(1), "A", "Road - Elite Road - Carbon")]))
            .with_table(shops(&[(json!(1), "Acme", "Austin, TX")]))
            .with_table(orderlines(&[
                (1, 1, json!(1), json!(1), json!("2015-06-01"), json!(-1), json!(1)),
                (1, 2, json!(1), json!(1), json!("2015-06-01"), Value::Null, json!(1)),
                (1, 3, json!(1), json!(1), json!("2015-06-01"), json!(1), json!("n/a")),
                (1, 4, json!(1), json!(1), Value::Null, json!(1), json!(1)),
            ]));

        let assembly = assemble(&store, &AssemblerConfig::default()).unwrap();
        let fields: Vec<&str> = assembly.errors().map(|e| e.field()).collect();
        assert_eq!(fields, vec!["quantity", "quantity", "price", "order_date"]);
        assert!(assembly.errors().all(|e| e.is_schema()));
    }

    #[test]
    fn test_connection_failure_is_fatal() {
        let store = MemoryStore::unavailable();
        let result = assemble_table(&store, &AssemblerConfig::default(), RowPolicy::SkipAndLog);
        assert!(matches!(result, Err(AssembleError::Connection(ConnectionError::Unavailable(_)))));
    }

    #[test]
    fn test_missing_record_set_releases_connection() {
        let store = MemoryStore::new()
            .with_table(products(&[(json!(1), "A", "Road - Elite Road - Carbon")]))
            .with_table(shops(&[(json!(1), "Acme", "Austin, TX")]));

        let result = assemble(&store, &AssemblerConfig::default());
        assert!(matches!(result, Err(ConnectionError::MissingTable(name)) if name == "orderlines"));
        assert_eq!(store.sessions_opened(), 1);
        assert_eq!(store.sessions_open(), 0);
    }

    #[test]
    fn test_assemble_from_sqlite() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = SqliteStore::new(StoreConfig::with_path(dir.path().join("bike_orders.sqlite")));

        let mut bikes = products(&[(json!(1), "Supersix Evo Hi-Mod Team", "Road - Elite Road - Carbon")]);
        bikes.drop_column("index");
        let mut bikeshops = shops(&[(json!(1), "Acme", "Austin, TX")]);
        bikeshops.drop_column("index");
        let mut lines = orderlines(&[(
            1,
            1,
            json!(1),
            json!(1),
            json!("2015-06-01 00:00:00"),
            json!(2),
            json!(1500.0),
        )]);
        lines.drop_column("index");

        for table in [&bikes, &bikeshops, &lines] {
            store.import_table(table, Some("index")).unwrap();
        }

        let table = assemble_table(&store, &AssemblerConfig::default(), RowPolicy::Abort).unwrap();
        assert_eq!(table.len(), 1);
        let r = &table.records[0];
        assert_eq!(r.order_date, NaiveDate::from_ymd_opt(2015, 6, 1).unwrap());
        assert_eq!(r.total_revenue, Decimal::from(3000));
        assert_eq!(r.city.as_deref(), Some("Austin"));
    }
}
