//! Dataset construction: every supported source normalized to a
//! [`TickMatrix`] or [`PriceSeries`].

use crate::adapters::csv_adapter::CsvAdapter;
use crate::domain::error::TicksimError;
use crate::domain::price_series::PriceSeries;
use crate::domain::settings::{DataSettings, SourceKind};
use crate::domain::tick::TickMatrix;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use std::path::PathBuf;

/// Where a tick matrix comes from.
#[derive(Debug, Clone)]
pub enum DataSource {
    /// Table read through the configured relational port.
    Sql(String),
    Csv(PathBuf),
    Parquet(PathBuf),
    /// In-memory asset: close becomes bid, open becomes ask.
    Series(PriceSeries),
}

impl DataSource {
    pub fn describe(&self) -> String {
        match self {
            DataSource::Sql(table) => format!("table {}", table),
            DataSource::Csv(path) | DataSource::Parquet(path) => path.display().to_string(),
            DataSource::Series(series) => format!("in-memory series of {} bars", series.len()),
        }
    }
}

/// Materialize the tick matrix for `source`.
///
/// `Sql` sources need a relational `port`; file sources are read directly.
pub fn load_ticks(
    source: &DataSource,
    port: Option<&dyn DataPort>,
) -> Result<TickMatrix, TicksimError> {
    let ticks = match source {
        DataSource::Sql(table) => port
            .ok_or_else(|| TicksimError::InvalidDataset {
                source_name: table.clone(),
                reason: "no database configured".to_string(),
            })?
            .fetch_ticks(table)?,
        DataSource::Csv(path) => CsvAdapter::read_ticks(path)?,
        DataSource::Parquet(path) => read_parquet_ticks(path)?,
        DataSource::Series(series) => TickMatrix::from_price_series(series),
    };

    tracing::info!(source = %source.describe(), rows = ticks.len(), "loaded tick matrix");
    Ok(ticks)
}

#[cfg(feature = "parquet")]
fn read_parquet_ticks(path: &std::path::Path) -> Result<TickMatrix, TicksimError> {
    crate::adapters::parquet_adapter::ParquetAdapter::read_ticks(path)
}

#[cfg(not(feature = "parquet"))]
fn read_parquet_ticks(path: &std::path::Path) -> Result<TickMatrix, TicksimError> {
    Err(TicksimError::InvalidDataset {
        source_name: path.display().to_string(),
        reason: "built without the 'parquet' feature".to_string(),
    })
}

/// Open the data port named by `[data] source`.
pub fn open_data_port(
    settings: &DataSettings,
    config: &dyn ConfigPort,
) -> Result<Box<dyn DataPort>, TicksimError> {
    let base_path = PathBuf::from(settings.base_path.as_deref().unwrap_or("."));
    match settings.source {
        SourceKind::Csv => Ok(Box::new(CsvAdapter::new(base_path))),
        SourceKind::Parquet => open_parquet(base_path),
        SourceKind::Sqlite => open_sqlite(config),
        SourceKind::Postgres => open_postgres(config),
    }
}

/// Tick source for a run: the configured tick dataset, or the price series
/// itself when none is configured so candidate positions line up with rows.
pub fn tick_source(settings: &DataSettings, prices: &PriceSeries) -> DataSource {
    let Some(name) = settings.ticks.as_ref() else {
        return DataSource::Series(prices.clone());
    };
    let base_path = PathBuf::from(settings.base_path.as_deref().unwrap_or("."));
    match settings.source {
        SourceKind::Csv => DataSource::Csv(base_path.join(name)),
        SourceKind::Parquet => DataSource::Parquet(base_path.join(name)),
        SourceKind::Sqlite | SourceKind::Postgres => DataSource::Sql(name.clone()),
    }
}

#[cfg(feature = "parquet")]
fn open_parquet(base_path: PathBuf) -> Result<Box<dyn DataPort>, TicksimError> {
    Ok(Box::new(
        crate::adapters::parquet_adapter::ParquetAdapter::new(base_path),
    ))
}

#[cfg(not(feature = "parquet"))]
fn open_parquet(_base_path: PathBuf) -> Result<Box<dyn DataPort>, TicksimError> {
    Err(missing_feature("parquet"))
}

#[cfg(feature = "sqlite")]
fn open_sqlite(config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, TicksimError> {
    Ok(Box::new(
        crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?,
    ))
}

#[cfg(not(feature = "sqlite"))]
fn open_sqlite(_config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, TicksimError> {
    Err(missing_feature("sqlite"))
}

#[cfg(feature = "postgres")]
fn open_postgres(config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, TicksimError> {
    Ok(Box::new(
        crate::adapters::postgres_adapter::PostgresAdapter::from_config(config)?,
    ))
}

#[cfg(not(feature = "postgres"))]
fn open_postgres(_config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, TicksimError> {
    Err(missing_feature("postgres"))
}

#[cfg(not(all(feature = "parquet", feature = "sqlite", feature = "postgres")))]
fn missing_feature(name: &str) -> TicksimError {
    TicksimError::ConfigInvalid {
        section: "data".to_string(),
        key: "source".to_string(),
        reason: format!("ticksim was built without the '{}' feature", name),
    }
}
