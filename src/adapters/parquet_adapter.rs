//! Parquet file data adapter.
//!
//! Same positional layout as the CSV adapter: column 0 is the timestamp,
//! followed by `open, high, low, close` for prices or `bid, ask` for ticks.
//! Timestamp columns may be any Arrow timestamp unit or ISO-8601 strings;
//! price columns are cast to `Float64`.

use crate::domain::error::TicksimError;
use crate::domain::price_series::{PriceBar, PriceSeries};
use crate::domain::tick::{TickMatrix, TickRow};
use crate::ports::data_port::DataPort;
use arrow::array::{Array, Float64Array, TimestampNanosecondArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::path::{Path, PathBuf};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

pub struct ParquetAdapter {
    base_path: PathBuf,
}

impl ParquetAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn read_prices(path: &Path) -> Result<PriceSeries, TicksimError> {
        let mut bars = Vec::new();
        for batch in read_batches(path)? {
            let timestamps = timestamp_column(&batch, 0, path)?;
            let open = float_column(&batch, 1, path)?;
            let high = float_column(&batch, 2, path)?;
            let low = float_column(&batch, 3, path)?;
            let close = float_column(&batch, 4, path)?;
            for i in 0..batch.num_rows() {
                bars.push(PriceBar {
                    timestamp: timestamp_at(&timestamps, i, path)?,
                    open: float_at(&open, i, path)?,
                    high: float_at(&high, i, path)?,
                    low: float_at(&low, i, path)?,
                    close: float_at(&close, i, path)?,
                });
            }
        }

        bars.sort_by_key(|b| b.timestamp);
        PriceSeries::new(bars)
    }

    pub fn read_ticks(path: &Path) -> Result<TickMatrix, TicksimError> {
        let mut ticks = TickMatrix::default();
        for batch in read_batches(path)? {
            let datetimes = timestamp_column(&batch, 0, path)?;
            let bids = float_column(&batch, 1, path)?;
            let asks = float_column(&batch, 2, path)?;
            for i in 0..batch.num_rows() {
                ticks.push(TickRow {
                    datetime: timestamp_at(&datetimes, i, path)?,
                    bid: float_at(&bids, i, path)?,
                    ask: float_at(&asks, i, path)?,
                });
            }
        }
        Ok(ticks)
    }
}

impl DataPort for ParquetAdapter {
    fn fetch_prices(&self, name: &str) -> Result<PriceSeries, TicksimError> {
        Self::read_prices(&self.base_path.join(name))
    }

    fn fetch_ticks(&self, name: &str) -> Result<TickMatrix, TicksimError> {
        Self::read_ticks(&self.base_path.join(name))
    }
}

fn invalid(path: &Path, reason: impl Into<String>) -> TicksimError {
    TicksimError::InvalidDataset {
        source_name: path.display().to_string(),
        reason: reason.into(),
    }
}

fn read_batches(path: &Path) -> Result<Vec<RecordBatch>, TicksimError> {
    let file = File::open(path).map_err(|e| TicksimError::Database {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;

    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .and_then(|builder| builder.build())
        .map_err(|e| invalid(path, e.to_string()))?;

    reader
        .map(|batch| batch.map_err(|e| invalid(path, e.to_string())))
        .collect()
}

fn column_at<'b>(
    batch: &'b RecordBatch,
    index: usize,
    path: &Path,
) -> Result<&'b arrow::array::ArrayRef, TicksimError> {
    if index >= batch.num_columns() {
        return Err(invalid(
            path,
            format!("expected at least {} columns, found {}", index + 1, batch.num_columns()),
        ));
    }
    Ok(batch.column(index))
}

fn timestamp_column(
    batch: &RecordBatch,
    index: usize,
    path: &Path,
) -> Result<TimestampNanosecondArray, TicksimError> {
    let column = column_at(batch, index, path)?;
    let casted = cast(column, &DataType::Timestamp(TimeUnit::Nanosecond, None))
        .map_err(|e| invalid(path, format!("column {index} is not a timestamp: {e}")))?;
    casted
        .as_any()
        .downcast_ref::<TimestampNanosecondArray>()
        .cloned()
        .ok_or_else(|| invalid(path, format!("column {index} is not a timestamp")))
}

fn float_column(
    batch: &RecordBatch,
    index: usize,
    path: &Path,
) -> Result<Float64Array, TicksimError> {
    let column = column_at(batch, index, path)?;
    let casted = cast(column, &DataType::Float64)
        .map_err(|e| invalid(path, format!("column {index} is not numeric: {e}")))?;
    casted
        .as_any()
        .downcast_ref::<Float64Array>()
        .cloned()
        .ok_or_else(|| invalid(path, format!("column {index} is not numeric")))
}

fn timestamp_at(
    array: &TimestampNanosecondArray,
    row: usize,
    path: &Path,
) -> Result<NaiveDateTime, TicksimError> {
    if array.is_null(row) {
        return Err(invalid(path, format!("null timestamp at row {row}")));
    }
    let nanos = array.value(row);
    DateTime::from_timestamp(
        nanos.div_euclid(NANOS_PER_SECOND),
        nanos.rem_euclid(NANOS_PER_SECOND) as u32,
    )
    .map(|dt| dt.naive_utc())
    .ok_or_else(|| invalid(path, format!("timestamp out of range at row {row}")))
}

fn float_at(array: &Float64Array, row: usize, path: &Path) -> Result<f64, TicksimError> {
    if array.is_null(row) {
        return Err(invalid(path, format!("null price at row {row}")));
    }
    Ok(array.value(row))
}
