//! Metrics Ingestor: the extractor's per-class CSV as a typed table.

pub mod ingest;
pub mod table;

pub use ingest::{CLASS_METRICS_FILE, ingest};
pub use table::{MetricsRow, MetricsTable, RowId, Value};
