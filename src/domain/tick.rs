//! Tick matrix: the bid/ask substrate the outcome simulator walks.
//!
//! Stored column-wise so the boundary scan reads one contiguous slice. Row
//! order is the processing order and is never re-sorted.

use crate::domain::price_series::PriceSeries;
use chrono::NaiveDateTime;

pub const DATETIME_INDEX: usize = 0;
pub const BID_INDEX: usize = 1;
pub const ASK_INDEX: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct TickRow {
    pub datetime: NaiveDateTime,
    pub bid: f64,
    pub ask: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickMatrix {
    datetimes: Vec<NaiveDateTime>,
    bids: Vec<f64>,
    asks: Vec<f64>,
}

impl TickMatrix {
    pub fn from_rows(rows: impl IntoIterator<Item = TickRow>) -> Self {
        let mut matrix = TickMatrix::default();
        for row in rows {
            matrix.push(row);
        }
        matrix
    }

    /// In-memory asset adapter: dates -> datetime, close -> bid, open -> ask.
    pub fn from_price_series(series: &PriceSeries) -> Self {
        Self::from_rows(series.bars().iter().map(|bar| TickRow {
            datetime: bar.timestamp,
            bid: bar.close,
            ask: bar.open,
        }))
    }

    pub fn push(&mut self, row: TickRow) {
        self.datetimes.push(row.datetime);
        self.bids.push(row.bid);
        self.asks.push(row.ask);
    }

    pub fn len(&self) -> usize {
        self.bids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }

    pub fn bids(&self) -> &[f64] {
        &self.bids
    }

    pub fn asks(&self) -> &[f64] {
        &self.asks
    }

    pub fn datetimes(&self) -> &[NaiveDateTime] {
        &self.datetimes
    }

    /// Price column by positional index (`BID_INDEX` or `ASK_INDEX`).
    pub fn price_column(&self, index: usize) -> Option<&[f64]> {
        match index {
            BID_INDEX => Some(&self.bids),
            ASK_INDEX => Some(&self.asks),
            _ => None,
        }
    }

    pub fn row(&self, index: usize) -> Option<TickRow> {
        Some(TickRow {
            datetime: *self.datetimes.get(index)?,
            bid: self.bids[index],
            ask: self.asks[index],
        })
    }
}
