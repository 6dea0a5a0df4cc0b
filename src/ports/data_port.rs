//! Data access port trait.
//!
//! Implementations materialize a named dataset fully before returning; the
//! simulator never streams rows.

use crate::domain::error::TicksimError;
use crate::domain::price_series::PriceSeries;
use crate::domain::tick::TickMatrix;

pub trait DataPort {
    /// Load an OHLC price series, ordered by timestamp.
    fn fetch_prices(&self, name: &str) -> Result<PriceSeries, TicksimError>;

    /// Load a tick matrix in stored row order.
    fn fetch_ticks(&self, name: &str) -> Result<TickMatrix, TicksimError>;
}
