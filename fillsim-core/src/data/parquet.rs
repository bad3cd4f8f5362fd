//! Parquet persistence for bar records and nested records.
//!
//! Layout: one row per bar, `timestamp` (Datetime ms), `open`, `high`,
//! `low`, `last`, then one nullable `f64` column per extra.
//!
//! Nested layout: `timestamp`, a `fields` struct column holding the
//! selected columns, and a `passthrough` struct column when any record
//! carries passthrough values.
//!
//! Writes are atomic (write to .tmp, rename into place). Loads validate
//! the required columns and a non-zero row count.

use super::error::DataError;
use super::nested::NestedRecord;
use super::record::{BarRecord, BAR_COLUMNS};
use crate::domain::Bar;
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::debug;

const TIMESTAMP: &str = "timestamp";
const FIELDS: &str = "fields";
const PASSTHROUGH: &str = "passthrough";

/// Write bar records to a Parquet file.
pub fn write_parquet(path: &Path, records: &[BarRecord]) -> Result<(), DataError> {
    if records.is_empty() {
        return Err(DataError::ValidationError("no bars to write".into()));
    }

    let mut df = records_to_dataframe(records)?;
    write_frame(path, &mut df)?;

    debug!(path = %path.display(), rows = records.len(), "wrote parquet");
    Ok(())
}

/// Load bar records from a Parquet file written by [`write_parquet`].
pub fn read_parquet(path: &Path) -> Result<Vec<BarRecord>, DataError> {
    let df = read_frame(path)?;

    for col_name in std::iter::once(TIMESTAMP).chain(BAR_COLUMNS) {
        if df.column(col_name).is_err() {
            return Err(DataError::MissingColumn(col_name.into()));
        }
    }

    dataframe_to_records(&df)
}

/// Write nested records to a Parquet file, selected columns bundled in a
/// `fields` struct column.
pub fn write_nested_parquet(path: &Path, records: &[NestedRecord]) -> Result<(), DataError> {
    if records.is_empty() {
        return Err(DataError::ValidationError("no nested records to write".into()));
    }

    let timestamps: Vec<i64> = records.iter().map(|r| to_millis(&r.timestamp)).collect();
    let mut columns = vec![Column::new(TIMESTAMP.into(), timestamps)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .map_err(|e| DataError::ParquetError(format!("timestamp cast: {e}")))?];

    columns.push(struct_column(FIELDS, records, |r| &r.fields)?.ok_or_else(|| {
        DataError::ValidationError("nested records carry no fields".into())
    })?);
    if let Some(pass) = struct_column(PASSTHROUGH, records, |r| &r.passthrough)? {
        columns.push(pass);
    }

    let mut df = DataFrame::new(columns)
        .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))?;
    write_frame(path, &mut df)?;

    debug!(path = %path.display(), rows = records.len(), "wrote nested parquet");
    Ok(())
}

/// Load nested records from a Parquet file written by [`write_nested_parquet`].
pub fn read_nested_parquet(path: &Path) -> Result<Vec<NestedRecord>, DataError> {
    let df = read_frame(path)?;
    let map_err = |e: PolarsError| DataError::ParquetError(format!("column read: {e}"));

    let timestamps = df
        .column(TIMESTAMP)
        .map_err(|_| DataError::MissingColumn(TIMESTAMP.into()))?
        .cast(&DataType::Int64)
        .map_err(map_err)?;
    let ts_ca = timestamps.i64().map_err(map_err)?;

    let fields_col = df
        .column(FIELDS)
        .map_err(|_| DataError::MissingColumn(FIELDS.into()))?;
    let fields = struct_values(fields_col)?;
    let passthrough = match df.column(PASSTHROUGH) {
        Ok(col) => struct_values(col)?,
        Err(_) => Vec::new(),
    };

    (0..df.height())
        .map(|i| {
            let ms = ts_ca
                .get(i)
                .ok_or_else(|| DataError::ParquetError(format!("null timestamp at row {i}")))?;
            let timestamp = from_millis(ms).ok_or_else(|| {
                DataError::ParquetError(format!("timestamp out of range at row {i}"))
            })?;
            Ok(NestedRecord {
                timestamp,
                fields: row_of(&fields, i),
                passthrough: row_of(&passthrough, i),
            })
        })
        .collect()
}

fn write_frame(path: &Path, df: &mut DataFrame) -> Result<(), DataError> {
    let tmp = path.with_extension("parquet.tmp");
    let file = fs::File::create(&tmp).map_err(|e| DataError::io(&tmp, e))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    fs::rename(&tmp, path).map_err(|e| DataError::io(path, e))?;
    Ok(())
}

fn read_frame(path: &Path) -> Result<DataFrame, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::io(path, e))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::ValidationError("empty parquet file".into()));
    }
    Ok(df)
}

/// One struct column over the union of keys in `pick(record)`; absent
/// keys become nulls. `None` when no record has any key.
fn struct_column<'a, F>(
    name: &str,
    records: &'a [NestedRecord],
    pick: F,
) -> Result<Option<Column>, DataError>
where
    F: Fn(&'a NestedRecord) -> &'a BTreeMap<String, f64>,
{
    let keys: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| pick(r).keys().map(String::as_str))
        .collect();
    if keys.is_empty() {
        return Ok(None);
    }

    let inner: Vec<Column> = keys
        .into_iter()
        .map(|key| {
            let values: Vec<Option<f64>> =
                records.iter().map(|r| pick(r).get(key).copied()).collect();
            Column::new(key.into(), values)
        })
        .collect();
    let frame = DataFrame::new(inner)
        .map_err(|e| DataError::ParquetError(format!("{name} struct: {e}")))?;
    Ok(Some(frame.into_struct(name.into()).into_series().into()))
}

fn struct_values(column: &Column) -> Result<Vec<(String, Vec<Option<f64>>)>, DataError> {
    let map_err = |e: PolarsError| DataError::ParquetError(format!("struct read: {e}"));
    let ca = column.as_materialized_series().struct_().map_err(map_err)?;
    ca.fields_as_series()
        .into_iter()
        .map(|field| {
            let cast = field.cast(&DataType::Float64).map_err(map_err)?;
            let values = cast.f64().map_err(map_err)?.into_iter().collect();
            Ok((field.name().to_string(), values))
        })
        .collect()
}

fn row_of(columns: &[(String, Vec<Option<f64>>)], i: usize) -> BTreeMap<String, f64> {
    columns
        .iter()
        .filter_map(|(name, values)| values[i].map(|v| (name.clone(), v)))
        .collect()
}

fn to_millis(ts: &NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_millis()
}

fn from_millis(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

fn records_to_dataframe(records: &[BarRecord]) -> Result<DataFrame, DataError> {
    let timestamps: Vec<i64> = records.iter().map(|r| to_millis(&r.bar.timestamp)).collect();
    let opens: Vec<f64> = records.iter().map(|r| r.bar.open).collect();
    let highs: Vec<f64> = records.iter().map(|r| r.bar.high).collect();
    let lows: Vec<f64> = records.iter().map(|r| r.bar.low).collect();
    let lasts: Vec<f64> = records.iter().map(|r| r.bar.last).collect();

    let mut columns = vec![
        Column::new(TIMESTAMP.into(), timestamps)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(|e| DataError::ParquetError(format!("timestamp cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("last".into(), lasts),
    ];

    let extra_keys: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.extra.keys().map(String::as_str))
        .collect();
    for key in extra_keys {
        let values: Vec<Option<f64>> = records.iter().map(|r| r.extra.get(key).copied()).collect();
        columns.push(Column::new(key.into(), values));
    }

    DataFrame::new(columns).map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn dataframe_to_records(df: &DataFrame) -> Result<Vec<BarRecord>, DataError> {
    let map_err = |e: PolarsError| DataError::ParquetError(format!("column read: {e}"));

    let timestamps = df
        .column(TIMESTAMP)
        .map_err(map_err)?
        .cast(&DataType::Int64)
        .map_err(map_err)?;
    let ts_ca = timestamps.i64().map_err(map_err)?;
    let open_ca = df.column("open").map_err(map_err)?.f64().map_err(map_err)?;
    let high_ca = df.column("high").map_err(map_err)?.f64().map_err(map_err)?;
    let low_ca = df.column("low").map_err(map_err)?.f64().map_err(map_err)?;
    let last_ca = df.column("last").map_err(map_err)?.f64().map_err(map_err)?;

    let mut extras: Vec<(String, Vec<Option<f64>>)> = Vec::new();
    for column in df.get_columns() {
        let name = column.name().as_str();
        if name == TIMESTAMP || BAR_COLUMNS.contains(&name) {
            continue;
        }
        let cast = column.cast(&DataType::Float64).map_err(map_err)?;
        let values: Vec<Option<f64>> = cast.f64().map_err(map_err)?.into_iter().collect();
        extras.push((name.to_string(), values));
    }

    let n = df.height();
    let mut records = Vec::with_capacity(n);
    for i in 0..n {
        let ms = ts_ca
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null timestamp at row {i}")))?;
        let timestamp = from_millis(ms)
            .ok_or_else(|| DataError::ParquetError(format!("timestamp out of range at row {i}")))?;

        let bar = Bar::new(
            open_ca.get(i).unwrap_or(f64::NAN),
            high_ca.get(i).unwrap_or(f64::NAN),
            low_ca.get(i).unwrap_or(f64::NAN),
            last_ca.get(i).unwrap_or(f64::NAN),
            timestamp,
        );

        records.push(BarRecord {
            bar,
            extra: row_of(&extras, i),
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn sample_records() -> Vec<BarRecord> {
        let start = NaiveDate::from_ymd_opt(2025, 9, 22)
            .unwrap()
            .and_hms_opt(17, 0, 0)
            .unwrap();
        (0..5)
            .map(|i| {
                let base = 100.0 + i as f64;
                let record = BarRecord::new(Bar::new(
                    base,
                    base + 2.0,
                    base - 1.0,
                    base + 1.0,
                    start + Duration::minutes(5 * i),
                ))
                .with_extra("volume", 10.0 * i as f64);
                if i % 2 == 0 {
                    record.with_extra("fvh", base + 3.0)
                } else {
                    record
                }
            })
            .collect()
    }

    #[test]
    fn write_and_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.parquet");
        let records = sample_records();

        write_parquet(&path, &records).unwrap();
        let loaded = read_parquet(&path).unwrap();

        assert_eq!(loaded, records);
        assert!(!path.with_extension("parquet.tmp").exists());
    }

    #[test]
    fn write_rejects_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_parquet(&dir.path().join("empty.parquet"), &[]).unwrap_err();
        assert!(matches!(err, DataError::ValidationError(_)));
    }

    #[test]
    fn nested_records_without_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let nested = vec![NestedRecord {
            timestamp: sample_records()[0].bar.timestamp,
            fields: BTreeMap::new(),
            passthrough: BTreeMap::new(),
        }];
        let err = write_nested_parquet(&dir.path().join("n.parquet"), &nested).unwrap_err();
        assert!(matches!(err, DataError::ValidationError(_)));
    }

    #[test]
    fn bar_file_is_not_nested() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.parquet");
        write_parquet(&path, &sample_records()).unwrap();
        let err = read_nested_parquet(&path).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn(ref c) if c == "fields"));
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_parquet(&dir.path().join("nope.parquet")).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }
}
