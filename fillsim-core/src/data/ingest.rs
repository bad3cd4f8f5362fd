//! Ingestion of delimited bar exports (Sierra Chart style text files, CSV).
//!
//! Headers are normalized (trimmed, lowercased, inner whitespace to `_`),
//! so `" Date", " Time", " Open"` become `date`, `time`, `open`. The
//! timestamp comes from a `datetime`/`timestamp` column or from separate
//! `date` + `time` columns. Every other numeric column is kept as an extra.

use super::error::DataError;
use super::record::{BarRecord, BAR_COLUMNS};
use crate::domain::Bar;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

const DATE_FORMATS: [&str; 3] = ["%Y/%m/%d", "%Y-%m-%d", "%m/%d/%Y"];
const TIME_FORMATS: [&str; 3] = ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

/// Options controlling ingestion.
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// Fail on bars whose prices are out of order instead of keeping them.
    pub reject_insane: bool,
    /// Field delimiter.
    pub delimiter: u8,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            reject_insane: false,
            delimiter: b',',
        }
    }
}

/// Ingested records plus what was noticed along the way.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Records sorted by timestamp.
    pub records: Vec<BarRecord>,
    /// Bars failing [`Bar::is_sane`] that were kept.
    pub insane_rows: usize,
    /// Extra columns dropped because they held non-numeric values.
    pub dropped_columns: Vec<String>,
}

enum TimeColumns {
    Combined(usize),
    Split { date: usize, time: usize },
}

/// Normalize a raw header: `" Last Price "` → `"last_price"`.
pub fn normalize_header(raw: &str) -> String {
    raw.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Ingest a bar export from disk.
pub fn ingest_path(path: &Path, opts: &IngestOptions) -> Result<IngestReport, DataError> {
    let file = File::open(path).map_err(|e| DataError::io(path, e))?;
    let report = ingest_reader(file, opts)?;
    debug!(
        path = %path.display(),
        rows = report.records.len(),
        insane = report.insane_rows,
        "ingested bar file"
    );
    Ok(report)
}

/// Ingest a bar export from any reader.
pub fn ingest_reader<R: Read>(reader: R, opts: &IngestOptions) -> Result<IngestReport, DataError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(opts.delimiter)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(normalize_header).collect();
    let position = |name: &str| headers.iter().position(|h| h == name);
    let require = |name: &str| position(name).ok_or_else(|| DataError::MissingColumn(name.into()));

    let price_idx = [
        require("open")?,
        require("high")?,
        require("low")?,
        require("last")?,
    ];

    let combined = position("datetime").or_else(|| position("timestamp"));
    let time_cols = match (combined, position("date"), position("time")) {
        (Some(idx), _, _) => TimeColumns::Combined(idx),
        (None, Some(date), Some(time)) => TimeColumns::Split { date, time },
        (None, None, _) => return Err(DataError::MissingColumn("date".into())),
        (None, Some(_), None) => return Err(DataError::MissingColumn("time".into())),
    };

    let mut used: BTreeSet<usize> = price_idx.iter().copied().collect();
    match time_cols {
        TimeColumns::Combined(idx) => {
            used.insert(idx);
        }
        TimeColumns::Split { date, time } => {
            used.insert(date);
            used.insert(time);
        }
    }
    let extra_cols: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter(|(idx, name)| !used.contains(idx) && !name.is_empty())
        .map(|(idx, name)| (idx, name.as_str()))
        .collect();

    let mut records = Vec::new();
    let mut insane_rows = 0;
    let mut dropped: BTreeSet<String> = BTreeSet::new();

    for (i, result) in rdr.records().enumerate() {
        let row = i + 1;
        let rec = result?;
        let field = |idx: usize| rec.get(idx).unwrap_or("");

        let mut prices = [0.0; 4];
        for (slot, (&idx, name)) in prices.iter_mut().zip(price_idx.iter().zip(BAR_COLUMNS)) {
            *slot = parse_price(field(idx), row, name)?;
        }

        let timestamp = match time_cols {
            TimeColumns::Combined(idx) => parse_datetime(field(idx), row)?,
            TimeColumns::Split { date, time } => parse_date_time(field(date), field(time), row)?,
        };

        let bar = Bar::new(prices[0], prices[1], prices[2], prices[3], timestamp);
        if !bar.is_sane() {
            if opts.reject_insane {
                return Err(DataError::InsaneBar { row });
            }
            insane_rows += 1;
        }

        let mut extra = BTreeMap::new();
        for &(idx, name) in &extra_cols {
            let raw = field(idx);
            if raw.is_empty() || dropped.contains(name) {
                continue;
            }
            match raw.parse::<f64>() {
                Ok(value) => {
                    extra.insert(name.to_string(), value);
                }
                Err(_) => {
                    dropped.insert(name.to_string());
                }
            }
        }

        records.push(BarRecord { bar, extra });
    }

    // A column is numeric only if every value parsed.
    if !dropped.is_empty() {
        warn!(columns = ?dropped, "dropping non-numeric columns");
        for record in &mut records {
            record.extra.retain(|name, _| !dropped.contains(name));
        }
    }

    records.sort_by_key(|r| r.bar.timestamp);

    Ok(IngestReport {
        records,
        insane_rows,
        dropped_columns: dropped.into_iter().collect(),
    })
}

fn parse_price(raw: &str, row: usize, column: &str) -> Result<f64, DataError> {
    raw.parse::<f64>().map_err(|_| DataError::ParseField {
        row,
        column: column.into(),
        value: raw.into(),
    })
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}

fn parse_date_time(date: &str, time: &str, row: usize) -> Result<NaiveDateTime, DataError> {
    match (parse_date(date), parse_time(time)) {
        (Some(d), Some(t)) => Ok(d.and_time(t)),
        _ => Err(DataError::ParseTimestamp {
            row,
            value: format!("{date} {time}"),
        }),
    }
}

/// `2025-09-22 17:00:00`, `2025-09-22T17:00:00.5` or a bare date (midnight).
fn parse_datetime(raw: &str, row: usize) -> Result<NaiveDateTime, DataError> {
    let mut parts = raw.splitn(2, |c: char| c == ' ' || c == 'T');
    let date = parts.next().unwrap_or("");
    match parts.next() {
        Some(time) => parse_date_time(date, time.trim(), row),
        None => parse_date(date)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| DataError::ParseTimestamp {
                row,
                value: raw.into(),
            }),
    }
}
