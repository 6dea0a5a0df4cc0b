//! CSV file data adapter.
//!
//! Price files: `date,open,high,low,close[,...]`. Tick files:
//! `datetime,bid,ask[,...]`. Columns are positional; the header row is
//! skipped and extra columns are ignored.

use crate::domain::error::TicksimError;
use crate::domain::price_series::{PriceBar, PriceSeries};
use crate::domain::tick::{TickMatrix, TickRow};
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS[.f]` and the `T`-separated form.
pub(crate) fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    pub fn read_prices(path: &Path) -> Result<PriceSeries, TicksimError> {
        let mut bars = Vec::new();
        for_each_record(path, |record| {
            bars.push(PriceBar {
                timestamp: timestamp_field(record, 0, "date")?,
                open: field(record, 1, "open")?,
                high: field(record, 2, "high")?,
                low: field(record, 3, "low")?,
                close: field(record, 4, "close")?,
            });
            Ok(())
        })?;

        bars.sort_by_key(|b| b.timestamp);
        PriceSeries::new(bars)
    }

    pub fn read_ticks(path: &Path) -> Result<TickMatrix, TicksimError> {
        let mut ticks = TickMatrix::default();
        for_each_record(path, |record| {
            ticks.push(TickRow {
                datetime: timestamp_field(record, 0, "datetime")?,
                bid: field(record, 1, "bid")?,
                ask: field(record, 2, "ask")?,
            });
            Ok(())
        })?;
        Ok(ticks)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_prices(&self, name: &str) -> Result<PriceSeries, TicksimError> {
        Self::read_prices(&self.csv_path(name))
    }

    fn fetch_ticks(&self, name: &str) -> Result<TickMatrix, TicksimError> {
        Self::read_ticks(&self.csv_path(name))
    }
}

fn for_each_record<F>(path: &Path, mut f: F) -> Result<(), TicksimError>
where
    F: FnMut(&csv::StringRecord) -> Result<(), TicksimError>,
{
    let content = fs::read_to_string(path).map_err(|e| TicksimError::Database {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    for result in rdr.records() {
        let record = result.map_err(|e| TicksimError::Database {
            reason: format!("CSV parse error in {}: {}", path.display(), e),
        })?;
        f(&record)?;
    }
    Ok(())
}

fn raw_field<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<&'r str, TicksimError> {
    record.get(index).ok_or_else(|| TicksimError::Database {
        reason: format!("missing {} column", name),
    })
}

fn field<T>(record: &csv::StringRecord, index: usize, name: &str) -> Result<T, TicksimError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw_field(record, index, name)?
        .trim()
        .parse()
        .map_err(|e| TicksimError::Database {
            reason: format!("invalid {} value: {}", name, e),
        })
}

fn timestamp_field(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<NaiveDateTime, TicksimError> {
    let raw = raw_field(record, index, name)?;
    parse_timestamp(raw).ok_or_else(|| TicksimError::Database {
        reason: format!("invalid {} format: '{}'", name, raw),
    })
}
