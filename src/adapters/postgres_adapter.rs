//! PostgreSQL data adapter.
//!
//! Reads the same table shapes as the SQLite adapter. Tick rows are ordered
//! by `datetime` since PostgreSQL has no stable insertion order.

use crate::adapters::validate_table_name;
use crate::domain::error::TicksimError;
use crate::domain::price_series::{PriceBar, PriceSeries};
use crate::domain::tick::{TickMatrix, TickRow};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use postgres::{Client, NoTls, Row};
use std::cell::RefCell;

pub struct PostgresAdapter {
    client: RefCell<Client>,
}

impl PostgresAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TicksimError> {
        let connection_string = config
            .get_string("postgres", "connection_string")
            .ok_or_else(|| TicksimError::ConfigMissing {
                section: "postgres".into(),
                key: "connection_string".into(),
            })?;

        let client =
            Client::connect(&connection_string, NoTls).map_err(|e| TicksimError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client: RefCell::new(client),
        })
    }

    fn query(&self, sql: &str) -> Result<Vec<Row>, TicksimError> {
        self.client
            .borrow_mut()
            .query(sql, &[])
            .map_err(|e| TicksimError::DatabaseQuery {
                reason: e.to_string(),
            })
    }
}

fn column<'a, T: postgres::types::FromSql<'a>>(row: &'a Row, index: usize) -> Result<T, TicksimError> {
    row.try_get(index).map_err(|e| TicksimError::DatabaseQuery {
        reason: e.to_string(),
    })
}

impl DataPort for PostgresAdapter {
    fn fetch_prices(&self, name: &str) -> Result<PriceSeries, TicksimError> {
        let table = validate_table_name(name)?;
        let sql = format!(
            "SELECT date::timestamp, \
                    open::double precision, high::double precision, \
                    low::double precision, close::double precision \
             FROM {table} \
             ORDER BY date ASC"
        );

        let bars = self
            .query(&sql)?
            .iter()
            .map(|row| {
                Ok(PriceBar {
                    timestamp: column(row, 0)?,
                    open: column(row, 1)?,
                    high: column(row, 2)?,
                    low: column(row, 3)?,
                    close: column(row, 4)?,
                })
            })
            .collect::<Result<Vec<_>, TicksimError>>()?;

        PriceSeries::new(bars)
    }

    fn fetch_ticks(&self, name: &str) -> Result<TickMatrix, TicksimError> {
        let table = validate_table_name(name)?;
        let sql = format!(
            "SELECT datetime::timestamp, bid::double precision, ask::double precision \
             FROM {table} \
             ORDER BY datetime ASC"
        );

        let mut ticks = TickMatrix::default();
        for row in self.query(&sql)?.iter() {
            ticks.push(TickRow {
                datetime: column(row, 0)?,
                bid: column(row, 1)?,
                ask: column(row, 2)?,
            });
        }
        Ok(ticks)
    }
}
