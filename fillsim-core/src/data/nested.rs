//! Bundle selected columns of each bar record into one nested record.
//!
//! Downstream analytics want a fixed set of named values per bar (for
//! example `open, high, low, last, fvh, fvl`) regardless of what else the
//! source file carried.

use super::error::DataError;
use super::ingest::normalize_header;
use super::record::BarRecord;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Selected columns of one bar, keyed by column name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedRecord {
    pub timestamp: NaiveDateTime,
    pub fields: BTreeMap<String, f64>,
    /// Columns not selected, kept when the builder passes them through.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub passthrough: BTreeMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct NestedRecordBuilder {
    columns: Vec<String>,
    passthrough: bool,
}

impl NestedRecordBuilder {
    /// Column names are normalized the same way ingested headers are.
    /// `timestamp`/`datetime` are accepted and always carried on the record.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            columns: columns
                .into_iter()
                .map(|c| normalize_header(c.as_ref()))
                .filter(|c| !c.is_empty() && c != "timestamp" && c != "datetime")
                .collect(),
            passthrough: false,
        }
    }

    pub fn with_passthrough(mut self, passthrough: bool) -> Self {
        self.passthrough = passthrough;
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Build one nested record per input record.
    ///
    /// Fails on the first record missing a selected column.
    pub fn build(&self, records: &[BarRecord]) -> Result<Vec<NestedRecord>, DataError> {
        records.iter().map(|r| self.build_one(r)).collect()
    }

    fn build_one(&self, record: &BarRecord) -> Result<NestedRecord, DataError> {
        let mut fields = BTreeMap::new();
        for column in &self.columns {
            let value = record
                .get(column)
                .ok_or_else(|| DataError::MissingColumn(column.clone()))?;
            fields.insert(column.clone(), value);
        }

        let passthrough = if self.passthrough {
            record
                .extra
                .iter()
                .filter(|(name, _)| !fields.contains_key(*name))
                .map(|(name, value)| (name.clone(), *value))
                .collect()
        } else {
            BTreeMap::new()
        };

        Ok(NestedRecord {
            timestamp: record.bar.timestamp,
            fields,
            passthrough,
        })
    }
}

/// Write nested records as JSON lines.
pub fn write_jsonl(path: &Path, records: &[NestedRecord]) -> Result<(), DataError> {
    let file = File::create(path).map_err(|e| DataError::io(path, e))?;
    let mut out = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n").map_err(|e| DataError::io(path, e))?;
    }
    out.flush().map_err(|e| DataError::io(path, e))?;
    Ok(())
}
