//! CSV to record set parser with encoding and delimiter auto-detection.
//!
//! Feeds `bikesales import`, which loads raw exports into the store. Cells
//! that look like numbers become JSON numbers; empty cells become null.

use serde_json::{Number, Value};
use std::path::Path;

use crate::models::RawTable;

/// CSV parsing error with context
#[derive(Debug, Clone)]
pub struct CsvError {
    pub line: usize,
    pub column: Option<String>,
    pub value: Option<String>,
    pub message: String,
}

impl std::fmt::Display for CsvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.column, &self.value) {
            (Some(col), Some(val)) => {
                write!(f, "Line {}, column '{}' (value '{}'): {}", self.line, col, val, self.message)
            }
            (Some(col), None) => {
                write!(f, "Line {}, column '{}': {}", self.line, col, self.message)
            }
            _ => {
                write!(f, "Line {}: {}", self.line, self.message)
            }
        }
    }
}

impl std::error::Error for CsvError {}

impl CsvError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column: None,
            value: None,
            message: message.into(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed record set
    pub table: RawTable,
    /// Detected encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        // UTF-8 and anything unknown: lossy UTF-8
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
///
/// Commas win ties: location and description values never contain
/// semicolons or tabs, but a header line might have none of either.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Type a raw CSV cell.
pub fn parse_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }

    let has_leading_zero = trimmed.len() > 1
        && trimmed.starts_with('0')
        && !trimmed.starts_with("0.");
    if !has_leading_zero {
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::from(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if let Some(n) = Number::from_f64(f) {
                if f.is_finite() {
                    return Value::Number(n);
                }
            }
        }
    }

    Value::String(trimmed.to_string())
}

/// Parse CSV text into a record set named `name`.
///
/// # Example
/// ```ignore
/// use bikesales::parser::parse_str;
///
/// let table = parse_str("bikeshops", "bikeshop.id,location\n1,\"Ithaca, NY\"", ',').unwrap();
/// assert_eq!(table.rows[0]["location"], "Ithaca, NY");
/// ```
pub fn parse_str(name: &str, content: &str, delimiter: char) -> Result<RawTable, CsvError> {
    let delimiter = u8::try_from(delimiter)
        .map_err(|_| CsvError::new(0, format!("Delimiter '{}' is not a single byte", delimiter)))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CsvError::new(1, format!("Cannot read header: {}", e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::new(1, "No headers found"));
    }

    let mut table = RawTable::new(name, headers);

    for (idx, record) in reader.records().enumerate() {
        let line = idx + 2; // +1 for 0-index, +1 for header
        let record = record.map_err(|e| CsvError::new(line, format!("Cannot read line: {}", e)))?;

        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        if record.len() > table.columns.len() {
            return Err(CsvError::new(
                line,
                format!("{} values for {} columns", record.len(), table.columns.len()),
            )
            .with_value(record.iter().collect::<Vec<_>>().join(",")));
        }

        table.push_values(record.iter().map(parse_cell).collect());
    }

    Ok(table)
}

/// Parse CSV file with auto-detection of encoding and delimiter.
///
/// The record set is named after the file stem unless `name` is given.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P, name: Option<&str>) -> Result<ParseResult, CsvError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| CsvError::new(0, format!("Cannot read file: {}", e)))?;

    let name = name
        .map(str::to_string)
        .or_else(|| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .unwrap_or_else(|| "imported".to_string());

    parse_bytes_auto(&name, &bytes)
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(name: &str, bytes: &[u8]) -> Result<ParseResult, CsvError> {
    if bytes.is_empty() {
        return Err(CsvError::new(1, "Empty CSV file"));
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    let table = parse_str(name, &content, delimiter)?;

    Ok(ParseResult {
        table,
        encoding,
        delimiter,
    })
}
