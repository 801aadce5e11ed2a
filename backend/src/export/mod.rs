//! Writing the assembled table.
//!
//! CSV output has one header row with the fixed output columns; null cells
//! are empty. JSON output is an array of records.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::ExportResult;
use crate::models::{AssembledTable, OUTPUT_COLUMNS};

/// Output format for the assembled table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

/// Write `table` as CSV to any writer.
pub fn write_csv<W: Write>(table: &AssembledTable, writer: W) -> ExportResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(OUTPUT_COLUMNS)?;
    for record in table {
        csv.write_record(record.to_text_row())?;
    }
    csv.flush()?;
    Ok(())
}

/// Write `table` as a pretty JSON array to any writer.
pub fn write_json<W: Write>(table: &AssembledTable, mut writer: W) -> ExportResult<()> {
    serde_json::to_writer_pretty(&mut writer, table)?;
    writeln!(writer)?;
    Ok(())
}

/// Write `table` in `format` to any writer.
pub fn write_table<W: Write>(table: &AssembledTable, format: OutputFormat, writer: W) -> ExportResult<()> {
    match format {
        OutputFormat::Csv => write_csv(table, writer),
        OutputFormat::Json => write_json(table, writer),
    }
}

/// Write `table` in `format` to a file.
pub fn save_table(table: &AssembledTable, format: OutputFormat, path: &Path) -> ExportResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_table(table, format, &mut writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssembledRecord;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn table() -> AssembledTable {
        AssembledTable::new(vec![AssembledRecord {
            order_id: 1,
            order_line: 2,
            order_date: NaiveDate::from_ymd_opt(2011, 1, 7).unwrap(),
            quantity: 1,
            price: Decimal::from(6070),
            total_revenue: Decimal::from(6070),
            model: Some("Jekyll Carbon 2".into()),
            category_1: Some("Mountain".into()),
            category_2: Some("Over Mountain".into()),
            frame_material: Some("Carbon".into()),
            bikeshop_name: Some("Ithaca Mountain Climbers".into()),
            city: Some("Ithaca".into()),
            state: None,
        }])
    }

    #[test]
    fn test_csv_header_and_nulls() {
        let mut out = Vec::new();
        write_csv(&table(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "order_id,order_line,order_date,quantity,price,total_revenue,model,\
             category_1,category_2,frame_material,bikeshop_name,city,state"
        );
        assert_eq!(
            lines.next().unwrap(),
            "1,2,2011-01-07,1,6070,6070,Jekyll Carbon 2,Mountain,Over Mountain,Carbon,\
             Ithaca Mountain Climbers,Ithaca,"
        );
    }

    #[test]
    fn test_json_array() {
        let mut out = Vec::new();
        write_table(&table(), OutputFormat::Json, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(value[0]["bikeshop_name"], "Ithaca Mountain Climbers");
        assert_eq!(value[0]["state"], serde_json::Value::Null);
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bikes_wrangled.csv");
        save_table(&table(), OutputFormat::Csv, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
