//! Boundary scan over the tick matrix.
//!
//! The up scan always reads bids against `entry + take_profit`; the down scan
//! always reads asks against `entry - |stop_loss|`. Both are run for every
//! candidate regardless of trade direction, and the classifier decides which
//! touch means profit. Chunking bounds each pass over memory and never
//! changes the answer.

use crate::domain::error::TicksimError;
use crate::domain::tick::{ASK_INDEX, BID_INDEX, TickMatrix};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = TicksimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(Direction::Buy),
            "sell" => Ok(Direction::Sell),
            _ => Err(TicksimError::UnknownDirection {
                value: s.trim().to_string(),
            }),
        }
    }
}

/// First offset from `starting_index` at which the boundary for `direction`
/// is touched, or `None` if the matrix runs out first.
///
/// `Buy` scans bids for `bid >= entry_price + take_profit`; `Sell` scans asks
/// for `ask <= entry_price - |stop_loss|`. An absent distance is never
/// touched.
pub fn checker(
    ticks: &TickMatrix,
    direction: Direction,
    starting_index: usize,
    entry_price: f64,
    take_profit: Option<f64>,
    stop_loss: Option<f64>,
    chunk_size: usize,
) -> Option<usize> {
    let (column, threshold) = match direction {
        Direction::Buy => (BID_INDEX, entry_price + take_profit?),
        Direction::Sell => (ASK_INDEX, entry_price - stop_loss?.abs()),
    };
    let touched = |price: f64| match direction {
        Direction::Buy => price >= threshold,
        Direction::Sell => price <= threshold,
    };

    let prices = ticks.price_column(column)?.get(starting_index..)?;
    let chunk_size = chunk_size.max(1);

    prices
        .chunks(chunk_size)
        .enumerate()
        .find_map(|(n, chunk)| {
            chunk
                .iter()
                .position(|&p| touched(p))
                .map(|i| n * chunk_size + i)
        })
}
