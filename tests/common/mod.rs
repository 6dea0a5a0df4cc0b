#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use ticksim::domain::error::TicksimError;
pub use ticksim::domain::price_series::{PriceBar, PriceSeries};
pub use ticksim::domain::tick::{TickMatrix, TickRow};
use ticksim::ports::data_port::DataPort;

pub struct MockDataPort {
    pub prices: HashMap<String, PriceSeries>,
    pub ticks: HashMap<String, TickMatrix>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            ticks: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_prices(mut self, name: &str, series: PriceSeries) -> Self {
        self.prices.insert(name.to_string(), series);
        self
    }

    pub fn with_ticks(mut self, name: &str, ticks: TickMatrix) -> Self {
        self.ticks.insert(name.to_string(), ticks);
        self
    }

    pub fn with_error(mut self, name: &str, reason: &str) -> Self {
        self.errors.insert(name.to_string(), reason.to_string());
        self
    }

    fn check_error(&self, name: &str) -> Result<(), TicksimError> {
        match self.errors.get(name) {
            Some(reason) => Err(TicksimError::Database {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(&self, name: &str) -> Result<PriceSeries, TicksimError> {
        self.check_error(name)?;
        self.prices
            .get(name)
            .cloned()
            .ok_or_else(|| TicksimError::InvalidDataset {
                source_name: name.to_string(),
                reason: "no such dataset".to_string(),
            })
    }

    fn fetch_ticks(&self, name: &str) -> Result<TickMatrix, TicksimError> {
        self.check_error(name)?;
        self.ticks
            .get(name)
            .cloned()
            .ok_or_else(|| TicksimError::InvalidDataset {
                source_name: name.to_string(),
                reason: "no such dataset".to_string(),
            })
    }
}

pub fn timestamp(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::days(day as i64)
}

pub fn make_bar(day: u32, open: f64, close: f64) -> PriceBar {
    PriceBar {
        timestamp: timestamp(day),
        open,
        high: open.max(close) + 1.0,
        low: open.min(close) - 1.0,
        close,
    }
}

/// One bar per `(open, close)` pair on consecutive days.
pub fn make_series(bars: &[(f64, f64)]) -> PriceSeries {
    let bars = bars
        .iter()
        .enumerate()
        .map(|(i, &(open, close))| make_bar(i as u32, open, close))
        .collect();
    PriceSeries::new(bars).unwrap()
}

/// Series whose opens trail closes by a fixed half point.
pub fn series_from_closes(closes: &[f64]) -> PriceSeries {
    let pairs: Vec<(f64, f64)> = closes.iter().map(|&c| (c - 0.5, c)).collect();
    make_series(&pairs)
}

/// One tick per `(bid, ask)` pair, one second apart.
pub fn make_ticks(rows: &[(f64, f64)]) -> TickMatrix {
    TickMatrix::from_rows(rows.iter().enumerate().map(|(i, &(bid, ask))| TickRow {
        datetime: timestamp(0) + chrono::Duration::seconds(i as i64),
        bid,
        ask,
    }))
}

/// Five-row reference matrix: `(100,101) (102,103) (99,100) (105,106) (98,99)`.
pub fn reference_ticks() -> TickMatrix {
    make_ticks(&[
        (100.0, 101.0),
        (102.0, 103.0),
        (99.0, 100.0),
        (105.0, 106.0),
        (98.0, 99.0),
    ])
}
