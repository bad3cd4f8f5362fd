//! Bar data ingestion, persistence and record shaping

pub mod error;
pub mod ingest;
pub mod nested;
pub mod parquet;
pub mod record;
pub mod synthetic;

pub use error::DataError;
pub use ingest::{ingest_path, ingest_reader, normalize_header, IngestOptions, IngestReport};
pub use nested::{write_jsonl, NestedRecord, NestedRecordBuilder};
pub use parquet::{read_nested_parquet, read_parquet, write_nested_parquet, write_parquet};
pub use record::{bars_of, BarRecord, BAR_COLUMNS};
pub use synthetic::SyntheticBars;

use std::path::Path;

/// Load bar records by file extension: `.parquet` is read back,
/// `.txt`/`.csv` are ingested.
pub fn load_records(path: &Path, opts: &IngestOptions) -> Result<IngestReport, DataError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "parquet" | "pq" => {
            let records = read_parquet(path)?;
            let insane_rows = records.iter().filter(|r| !r.bar.is_sane()).count();
            if opts.reject_insane && insane_rows > 0 {
                let row = records
                    .iter()
                    .position(|r| !r.bar.is_sane())
                    .map_or(0, |i| i + 1);
                return Err(DataError::InsaneBar { row });
            }
            Ok(IngestReport {
                records,
                insane_rows,
                dropped_columns: Vec::new(),
            })
        }
        "txt" | "csv" => ingest_path(path, opts),
        _ => Err(DataError::UnsupportedFormat(path.display().to_string())),
    }
}
