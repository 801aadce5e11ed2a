//! SQLite-backed store.
//!
//! Reads open the database read-only, so a missing file is a connection
//! error rather than a freshly created empty database. Imports are the only
//! write path and open the file read-write.

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use serde_json::{Number, Value};
use std::time::Duration;

use super::{quote_identifier, validate_table_name, RecordSource, SourceSession};
use crate::config::StoreConfig;
use crate::error::{ConnectionError, ConnectionResult, ImportError, ImportResult};
use crate::models::RawTable;

/// A SQLite database file holding the record sets.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    config: StoreConfig,
}

impl SqliteStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn connect(&self, flags: OpenFlags) -> ConnectionResult<Connection> {
        let conn = Connection::open_with_flags(&self.config.database, flags).map_err(|source| {
            ConnectionError::Open {
                target: self.describe(),
                source,
            }
        })?;
        conn.busy_timeout(Duration::from_millis(self.config.busy_timeout_ms))
            .map_err(|source| ConnectionError::Open {
                target: self.describe(),
                source,
            })?;
        Ok(conn)
    }

    /// Create or replace a record set from a raw table.
    ///
    /// When `index_column` is given and not already a column, a leading
    /// zero-based positional column of that name is written too, matching
    /// what dataframe writers put in front of every table.
    pub fn import_table(&self, table: &RawTable, index_column: Option<&str>) -> ImportResult<usize> {
        validate_table_name(&table.name)?;
        if table.columns.is_empty() {
            return Err(ImportError::EmptyInput);
        }

        let index_column = index_column.filter(|name| !table.has_column(name));
        let write_err = |source| ImportError::Write {
            table: table.name.clone(),
            source,
        };

        let mut conn = self.connect(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let tx = conn.transaction().map_err(write_err)?;

        let mut column_defs = Vec::new();
        let mut column_names = Vec::new();
        if let Some(index) = index_column {
            column_defs.push(format!("{} INTEGER", quote_identifier(index)));
            column_names.push(quote_identifier(index));
        }
        for column in &table.columns {
            column_defs.push(format!(
                "{} {}",
                quote_identifier(column),
                column_affinity(table, column)
            ));
            column_names.push(quote_identifier(column));
        }

        let quoted_table = quote_identifier(&table.name);
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table}; CREATE TABLE {table} ({defs});",
            table = quoted_table,
            defs = column_defs.join(", ")
        ))
        .map_err(write_err)?;

        let placeholders = vec!["?"; column_names.len()].join(", ");
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quoted_table,
            column_names.join(", "),
            placeholders
        );

        {
            let mut stmt = tx.prepare(&insert).map_err(write_err)?;
            for (position, row) in table.rows.iter().enumerate() {
                let mut values = Vec::with_capacity(column_names.len());
                if index_column.is_some() {
                    values.push(SqlValue::Integer(position as i64));
                }
                for column in &table.columns {
                    values.push(to_sql_value(row.get(column).unwrap_or(&Value::Null)));
                }
                stmt.execute(rusqlite::params_from_iter(values))
                    .map_err(write_err)?;
            }
        }

        tx.commit().map_err(write_err)?;
        Ok(table.rows.len())
    }
}

impl RecordSource for SqliteStore {
    fn describe(&self) -> String {
        format!("sqlite:///{}", self.config.database.display())
    }

    fn open(&self) -> ConnectionResult<Box<dyn SourceSession + '_>> {
        let conn = self.connect(OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)?;
        Ok(Box::new(SqliteSession { conn }))
    }
}

/// An open read-only connection. Dropping it closes the connection.
struct SqliteSession {
    conn: Connection,
}

impl SqliteSession {
    fn table_exists(&self, name: &str) -> ConnectionResult<bool> {
        self.conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map(|found| found.is_some())
            .map_err(|source| ConnectionError::Read {
                table: name.to_string(),
                source,
            })
    }
}

impl SourceSession for SqliteSession {
    fn read_table(&mut self, name: &str) -> ConnectionResult<RawTable> {
        validate_table_name(name)?;
        if !self.table_exists(name)? {
            return Err(ConnectionError::MissingTable(name.to_string()));
        }

        let read_err = |source| ConnectionError::Read {
            table: name.to_string(),
            source,
        };

        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {}", quote_identifier(name)))
            .map_err(read_err)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut table = RawTable::new(name, columns);
        let width = table.columns.len();

        let mut rows = stmt.query([]).map_err(read_err)?;
        while let Some(row) = rows.next().map_err(read_err)? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(to_json_value(row.get_ref(i).map_err(read_err)?));
            }
            table.push_values(values);
        }

        Ok(table)
    }

    fn list_tables(&mut self) -> ConnectionResult<Vec<String>> {
        let read_err = |source| ConnectionError::Read {
            table: "sqlite_master".to_string(),
            source,
        };
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .map_err(read_err)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(read_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_err)?;
        Ok(names)
    }

    fn close(self: Box<Self>) -> ConnectionResult<()> {
        self.conn
            .close()
            .map_err(|(_conn, source)| ConnectionError::Close(source))
    }
}

/// Convert a SQLite cell to a JSON value.
fn to_json_value(cell: ValueRef<'_>) -> Value {
    match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        // No record set stores binary data; keep it visible as hex
        ValueRef::Blob(bytes) => {
            Value::String(bytes.iter().map(|b| format!("{:02x}", b)).collect())
        }
    }
}

/// Convert a JSON value to a SQLite parameter.
fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map_or(SqlValue::Null, SqlValue::Real),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Column type from the values it holds.
fn column_affinity(table: &RawTable, column: &str) -> &'static str {
    let mut affinity = "INTEGER";
    let mut seen = false;
    for value in table.rows.iter().filter_map(|row| row.get(column)) {
        match value {
            Value::Null => continue,
            Value::Number(n) if n.is_i64() => {}
            Value::Number(_) => affinity = "REAL",
            _ => return "TEXT",
        }
        seen = true;
    }
    if seen {
        affinity
    } else {
        "TEXT"
    }
}
