//! SQLite data adapter.
//!
//! Price tables: `(date TEXT, open, high, low, close)`. Tick tables:
//! `(datetime TEXT, bid, ask)` read back in insertion order. Table names come
//! from configuration and are validated before being spliced into SQL.

use crate::adapters::validate_table_name;
use crate::adapters::csv_adapter::parse_timestamp;
use crate::domain::error::TicksimError;
use crate::domain::price_series::{PriceBar, PriceSeries};
use crate::domain::tick::{TickMatrix, TickRow};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use chrono::NaiveDateTime;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TicksimError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| TicksimError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| TicksimError::Database {
                    reason: e.to_string(),
                })?;

        tracing::debug!(path = %db_path, pool_size, "opened sqlite pool");
        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, TicksimError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| TicksimError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>, TicksimError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| TicksimError::Database {
                reason: e.to_string(),
            })
    }

    pub fn initialize_price_table(&self, table: &str) -> Result<(), TicksimError> {
        let table = validate_table_name(table)?;
        self.connection()?
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    date TEXT PRIMARY KEY,
                    open REAL NOT NULL,
                    high REAL NOT NULL,
                    low REAL NOT NULL,
                    close REAL NOT NULL
                );"
            ))
            .map_err(|e: rusqlite::Error| TicksimError::DatabaseQuery {
                reason: e.to_string(),
            })
    }

    pub fn initialize_tick_table(&self, table: &str) -> Result<(), TicksimError> {
        let table = validate_table_name(table)?;
        self.connection()?
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    datetime TEXT NOT NULL,
                    bid REAL NOT NULL,
                    ask REAL NOT NULL
                );"
            ))
            .map_err(|e: rusqlite::Error| TicksimError::DatabaseQuery {
                reason: e.to_string(),
            })
    }

    pub fn insert_bars(&self, table: &str, bars: &[PriceBar]) -> Result<(), TicksimError> {
        let table = validate_table_name(table)?;
        let mut conn = self.connection()?;

        let tx =
            conn.transaction()
                .map_err(|e: rusqlite::Error| TicksimError::DatabaseQuery {
                    reason: e.to_string(),
                })?;

        let sql = format!(
            "INSERT OR REPLACE INTO {table} (date, open, high, low, close)
             VALUES (?1, ?2, ?3, ?4, ?5)"
        );
        for bar in bars {
            tx.execute(
                &sql,
                params![
                    bar.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close
                ],
            )
            .map_err(|e: rusqlite::Error| TicksimError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        }

        tx.commit()
            .map_err(|e: rusqlite::Error| TicksimError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        Ok(())
    }

    pub fn insert_ticks(&self, table: &str, ticks: &TickMatrix) -> Result<(), TicksimError> {
        let table = validate_table_name(table)?;
        let mut conn = self.connection()?;

        let tx =
            conn.transaction()
                .map_err(|e: rusqlite::Error| TicksimError::DatabaseQuery {
                    reason: e.to_string(),
                })?;

        let sql = format!("INSERT INTO {table} (datetime, bid, ask) VALUES (?1, ?2, ?3)");
        for row in (0..ticks.len()).filter_map(|i| ticks.row(i)) {
            tx.execute(
                &sql,
                params![
                    row.datetime.format(TIMESTAMP_FORMAT).to_string(),
                    row.bid,
                    row.ask
                ],
            )
            .map_err(|e: rusqlite::Error| TicksimError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        }

        tx.commit()
            .map_err(|e: rusqlite::Error| TicksimError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        Ok(())
    }
}

fn timestamp_column(row: &rusqlite::Row<'_>, index: usize) -> rusqlite::Result<NaiveDateTime> {
    let text: String = row.get(index)?;
    parse_timestamp(&text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            rusqlite::types::Type::Text,
            format!("invalid timestamp '{}'", text).into(),
        )
    })
}

impl DataPort for SqliteAdapter {
    fn fetch_prices(&self, name: &str) -> Result<PriceSeries, TicksimError> {
        let table = validate_table_name(name)?;
        let conn = self.connection()?;

        let query = format!("SELECT date, open, high, low, close FROM {table} ORDER BY date ASC");
        let mut stmt =
            conn.prepare(&query)
                .map_err(|e: rusqlite::Error| TicksimError::DatabaseQuery {
                    reason: e.to_string(),
                })?;

        let rows = stmt
            .query_map([], |row| {
                Ok(PriceBar {
                    timestamp: timestamp_column(row, 0)?,
                    open: row.get(1)?,
                    high: row.get(2)?,
                    low: row.get(3)?,
                    close: row.get(4)?,
                })
            })
            .map_err(|e: rusqlite::Error| TicksimError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut bars = Vec::new();
        for row in rows {
            bars.push(
                row.map_err(|e: rusqlite::Error| TicksimError::DatabaseQuery {
                    reason: e.to_string(),
                })?,
            );
        }

        // text ordering breaks down for mixed date/datetime formats
        bars.sort_by_key(|b| b.timestamp);
        PriceSeries::new(bars)
    }

    fn fetch_ticks(&self, name: &str) -> Result<TickMatrix, TicksimError> {
        let table = validate_table_name(name)?;
        let conn = self.connection()?;

        let query = format!("SELECT datetime, bid, ask FROM {table} ORDER BY rowid ASC");
        let mut stmt =
            conn.prepare(&query)
                .map_err(|e: rusqlite::Error| TicksimError::DatabaseQuery {
                    reason: e.to_string(),
                })?;

        let rows = stmt
            .query_map([], |row| {
                Ok(TickRow {
                    datetime: timestamp_column(row, 0)?,
                    bid: row.get(1)?,
                    ask: row.get(2)?,
                })
            })
            .map_err(|e: rusqlite::Error| TicksimError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut ticks = TickMatrix::default();
        for row in rows {
            ticks.push(
                row.map_err(|e: rusqlite::Error| TicksimError::DatabaseQuery {
                    reason: e.to_string(),
                })?,
            );
        }

        Ok(ticks)
    }
}
