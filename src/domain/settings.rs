//! Explicit run settings built from a [`ConfigPort`].
//!
//! Nothing here is cached globally; callers build the settings once and pass
//! them into the filter, simulator and adapters.

use crate::domain::checker::Direction;
use crate::domain::error::TicksimError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_MOVING_AVERAGE_PERIOD: usize = 20;
pub const DEFAULT_CHUNK_SIZE: usize = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Look-back used when a rule names an indicator without a period.
    pub moving_average_period: usize,
    /// Rows scanned per window by the boundary checker.
    pub chunk_size: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            moving_average_period: DEFAULT_MOVING_AVERAGE_PERIOD,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TicksimError> {
        let moving_average_period = positive(
            config,
            "moving_average_period",
            DEFAULT_MOVING_AVERAGE_PERIOD,
        )?;
        let chunk_size = positive(config, "chunk_size", DEFAULT_CHUNK_SIZE)?;
        Ok(Self {
            moving_average_period,
            chunk_size,
        })
    }
}

fn positive(config: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, TicksimError> {
    let value = config.get_int("engine", key, default as i64);
    if value < 1 {
        return Err(TicksimError::ConfigInvalid {
            section: "engine".into(),
            key: key.into(),
            reason: format!("{} must be at least 1", key),
        });
    }
    Ok(value as usize)
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategySettings {
    pub filters: String,
    pub direction: Direction,
    pub take_profit: Option<f64>,
    pub stop_loss: Option<f64>,
}

impl StrategySettings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TicksimError> {
        let filters = config.get_string("strategy", "filters").unwrap_or_default();
        let direction = config
            .get_string("strategy", "direction")
            .ok_or_else(|| TicksimError::ConfigMissing {
                section: "strategy".into(),
                key: "direction".into(),
            })?
            .parse::<Direction>()?;

        Ok(Self {
            filters,
            direction,
            take_profit: optional_distance(config, "take_profit")?,
            stop_loss: optional_distance(config, "stop_loss")?,
        })
    }
}

/// Absent keys stay absent; present keys must parse as a number.
fn optional_distance(config: &dyn ConfigPort, key: &str) -> Result<Option<f64>, TicksimError> {
    match config.get_string("strategy", key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| TicksimError::ConfigInvalid {
                section: "strategy".into(),
                key: key.into(),
                reason: format!("'{}' is not a number", raw.trim()),
            }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Csv,
    Sqlite,
    Postgres,
    Parquet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub source: SourceKind,
    pub base_path: Option<String>,
    pub prices: String,
    pub ticks: Option<String>,
}

impl DataSettings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TicksimError> {
        let raw_source = config
            .get_string("data", "source")
            .unwrap_or_else(|| "csv".to_string());
        let source = match raw_source.trim().to_lowercase().as_str() {
            "csv" => SourceKind::Csv,
            "sqlite" | "sql" => SourceKind::Sqlite,
            "postgres" | "postgresql" => SourceKind::Postgres,
            "parquet" => SourceKind::Parquet,
            other => {
                return Err(TicksimError::ConfigInvalid {
                    section: "data".into(),
                    key: "source".into(),
                    reason: format!("unsupported source '{}'", other),
                });
            }
        };

        let prices = config
            .get_string("data", "prices")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| TicksimError::ConfigMissing {
                section: "data".into(),
                key: "prices".into(),
            })?;

        Ok(Self {
            source,
            base_path: config.get_string("data", "base_path"),
            prices: prices.trim().to_string(),
            ticks: config
                .get_string("data", "ticks")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        })
    }
}
