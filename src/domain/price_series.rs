//! OHLC price series for a single instrument.
//!
//! Positions are 0-based and are the only addressing scheme the filter and
//! simulator use; timestamps are carried for reporting.

use crate::domain::error::TicksimError;
use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl PriceBar {
    /// close - open
    pub fn returns(&self) -> f64 {
        self.close - self.open
    }
}

/// Raw columns addressable by name in rules and by the sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawColumn {
    Dates,
    Open,
    High,
    Low,
    Close,
    Returns,
}

impl RawColumn {
    pub fn name(&self) -> &'static str {
        match self {
            RawColumn::Dates => "DATES",
            RawColumn::Open => "OPEN",
            RawColumn::High => "HIGH",
            RawColumn::Low => "LOW",
            RawColumn::Close => "CLOSE",
            RawColumn::Returns => "RETURNS",
        }
    }
}

impl fmt::Display for RawColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RawColumn {
    type Err = TicksimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DATES" => Ok(RawColumn::Dates),
            "OPEN" => Ok(RawColumn::Open),
            "HIGH" => Ok(RawColumn::High),
            "LOW" => Ok(RawColumn::Low),
            "CLOSE" => Ok(RawColumn::Close),
            "RETURNS" => Ok(RawColumn::Returns),
            _ => Err(TicksimError::UnknownColumn {
                name: s.trim().to_string(),
            }),
        }
    }
}

/// Immutable, strictly time-ordered table of price bars.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<PriceBar>) -> Result<Self, TicksimError> {
        if let Some(i) = bars
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(TicksimError::InvalidSeries {
                reason: format!(
                    "timestamps not strictly increasing at position {} ({} after {})",
                    i + 1,
                    bars[i + 1].timestamp,
                    bars[i].timestamp
                ),
            });
        }
        Ok(Self { bars })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<f64> {
        self.column(RawColumn::Close)
    }

    /// Materialize a raw column. `Dates` resolves to UNIX seconds.
    pub fn column(&self, column: RawColumn) -> Vec<f64> {
        self.bars
            .iter()
            .map(|bar| match column {
                RawColumn::Dates => bar.timestamp.and_utc().timestamp() as f64,
                RawColumn::Open => bar.open,
                RawColumn::High => bar.high,
                RawColumn::Low => bar.low,
                RawColumn::Close => bar.close,
                RawColumn::Returns => bar.returns(),
            })
            .collect()
    }

    pub fn last(&self, column: RawColumn) -> Option<f64> {
        self.column(column).last().copied()
    }

    /// Returns sorted ascending.
    pub fn return_distribution(&self) -> Vec<f64> {
        let mut returns = self.column(RawColumn::Returns);
        returns.sort_by(|a, b| a.total_cmp(b));
        returns
    }

    /// Population standard deviation of close - open.
    pub fn returns_std(&self) -> f64 {
        population_std(&self.column(RawColumn::Returns))
    }
}

pub(crate) fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    variance.sqrt()
}
