//! REST API types.
//!
//! Records are sent with their output column names, so consumers address
//! fields exactly as they would in the CSV export.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::RowError;
use crate::models::{AssembledTable, OUTPUT_COLUMNS};
use crate::transform::Assembly;

/// Response for `GET /api/orderlines`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembleResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Status: "ready" or "warning"
    pub status: String,

    /// Output columns, in order
    pub columns: Vec<String>,

    /// Assembled records
    pub records: AssembledTable,

    /// Row errors, in transaction order
    pub issues: Vec<RowError>,

    /// Metadata about the run
    pub metadata: ResponseMetadata,
}

/// Metadata about an assembly run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    /// Transactions read
    pub total_rows: usize,

    /// Records returned
    pub assembled: usize,

    /// Rows left out because of data-quality errors
    pub skipped: usize,

    /// Data-quality notes that did not fail a row
    pub warnings: Vec<String>,
}

impl AssembleResponse {
    /// Build a response from the split outcome of a run over `total_rows` transactions.
    pub fn new(
        total_rows: usize,
        records: AssembledTable,
        issues: Vec<RowError>,
        warnings: Vec<String>,
    ) -> Self {
        AssembleResponse {
            job_id: Uuid::new_v4().to_string(),
            status: if issues.is_empty() && warnings.is_empty() { "ready" } else { "warning" }
                .to_string(),
            columns: OUTPUT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            metadata: ResponseMetadata {
                total_rows,
                assembled: records.len(),
                skipped: issues.len(),
                warnings,
            },
            records,
            issues,
        }
    }
}

impl From<Assembly> for AssembleResponse {
    fn from(mut assembly: Assembly) -> Self {
        let total_rows = assembly.len();
        let warnings = std::mem::take(&mut assembly.warnings);
        let (records, issues) = assembly.into_parts();
        AssembleResponse::new(total_rows, records, issues, warnings)
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "records": [],
    })
}

/// Create an error response for a row that aborted the run
pub fn row_error_response(error: &RowError) -> Value {
    let mut response = error_response(&error.to_string());
    response["issue"] = serde_json::to_value(error).unwrap_or(Value::Null);
    response
}
