//! Moving-average indicators over close prices.
//!
//! - `IndicatorPoint`: a single point in an indicator time series
//! - `IndicatorType`: indicator identity + look-back period
//! - `IndicatorSeries`: a time series of indicator values, positionally
//!   aligned with the price series it was computed from

pub mod ema;
pub mod sma;
pub mod wma;

use crate::domain::price_series::PriceSeries;
use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub valid: bool,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Wma(usize),
    Ema(usize),
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorType {
    pub fn period(&self) -> usize {
        match self {
            IndicatorType::Sma(p) | IndicatorType::Wma(p) | IndicatorType::Ema(p) => *p,
        }
    }

    pub fn calculate(&self, series: &PriceSeries) -> IndicatorSeries {
        match *self {
            IndicatorType::Sma(period) => sma::calculate_sma(series.bars(), period),
            IndicatorType::Wma(period) => wma::calculate_wma(series.bars(), period),
            IndicatorType::Ema(period) => ema::calculate_ema(series.bars(), period),
        }
    }
}

impl IndicatorSeries {
    /// Dense column with warm-up points as `NaN`, so comparisons against
    /// them never hold.
    pub fn to_column(&self) -> Vec<f64> {
        self.values
            .iter()
            .map(|p| if p.valid { p.value } else { f64::NAN })
            .collect()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Wma(period) => write!(f, "WMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
        }
    }
}
