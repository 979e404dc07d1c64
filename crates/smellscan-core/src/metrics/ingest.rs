use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::metrics::table::{CLASS_COLUMN, FILE_COLUMN, MetricsTable, Value};

/// File name the metrics extractor writes its per-class table to.
pub const CLASS_METRICS_FILE: &str = "class.csv";

/// Read the extractor's per-class CSV into a [`MetricsTable`].
///
/// Row order of the file is preserved. A missing or zero-byte file, a
/// file without the `class`/`file` columns and a non-rectangular file are
/// all `IngestFailure`. A header with no data rows is a valid empty table.
pub fn ingest(path: &Path) -> Result<MetricsTable> {
    let file = File::open(path).map_err(|e| PipelineError::ingest(path, e.to_string()))?;
    let table = ingest_reader(file).map_err(|reason| PipelineError::ingest(path, reason))?;
    debug!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns().len(),
        "ingested metrics table"
    );
    Ok(table)
}

/// Parse CSV from any reader. Errors are returned as plain reasons so the
/// caller can attach the path.
pub fn ingest_reader<R: Read>(reader: R) -> std::result::Result<MetricsTable, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| format!("reading header: {e}"))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err("file is empty".to_string());
    }

    let identity: Vec<bool> = headers
        .iter()
        .map(|h| h == CLASS_COLUMN || h == FILE_COLUMN)
        .collect();

    let mut rows = Vec::new();
    for (row_no, record) in reader.records().enumerate() {
        let record = record.map_err(|e| format!("row {row_no}: {e}"))?;
        let values = record
            .iter()
            .zip(&identity)
            .map(|(cell, &is_identity)| {
                if is_identity {
                    Value::Text(cell.to_string())
                } else {
                    Value::parse(cell)
                }
            })
            .collect();
        rows.push(values);
    }

    MetricsTable::new(headers, rows).map_err(|e| e.to_string())
}
