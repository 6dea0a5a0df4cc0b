//! Technical-column resolution.
//!
//! A rule operand names either a raw price column or a moving average over
//! closes. Resolution is stateless; indicators are recomputed on each call.

use crate::domain::error::TicksimError;
use crate::domain::indicator::IndicatorType;
use crate::domain::price_series::{PriceSeries, RawColumn};
use crate::domain::settings::EngineSettings;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Sma,
    Wma,
    Ema,
}

impl IndicatorKind {
    pub fn with_period(self, period: usize) -> IndicatorType {
        match self {
            IndicatorKind::Sma => IndicatorType::Sma(period),
            IndicatorKind::Wma => IndicatorType::Wma(period),
            IndicatorKind::Ema => IndicatorType::Ema(period),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    Raw(RawColumn),
    Indicator(IndicatorKind),
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Raw(column) => write!(f, "{}", column),
            Element::Indicator(IndicatorKind::Sma) => f.write_str("SMA"),
            Element::Indicator(IndicatorKind::Wma) => f.write_str("WMA"),
            Element::Indicator(IndicatorKind::Ema) => f.write_str("EMA"),
        }
    }
}

impl FromStr for Element {
    type Err = TicksimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SMA" => Ok(Element::Indicator(IndicatorKind::Sma)),
            "WMA" => Ok(Element::Indicator(IndicatorKind::Wma)),
            "EMA" => Ok(Element::Indicator(IndicatorKind::Ema)),
            _ => s.parse::<RawColumn>().map(Element::Raw),
        }
    }
}

/// Resolve one operand column, aligned positionally with `series`.
///
/// Raw columns are returned as-is and ignore `period`. Indicators use
/// `period`, falling back to the configured moving-average period; their
/// warm-up positions are `NaN`.
pub fn technical_column(
    series: &PriceSeries,
    element: Element,
    period: Option<usize>,
    settings: &EngineSettings,
) -> Vec<f64> {
    match element {
        Element::Raw(column) => series.column(column),
        Element::Indicator(kind) => {
            let period = period.unwrap_or(settings.moving_average_period);
            if period == 0 {
                return vec![f64::NAN; series.len()];
            }
            kind.with_period(period).calculate(series).to_column()
        }
    }
}

/// Resolve an operand given by name, reporting unknown names.
pub fn resolve_column(
    series: &PriceSeries,
    name: &str,
    period: Option<usize>,
    settings: &EngineSettings,
) -> Result<Vec<f64>, TicksimError> {
    let element = name.parse::<Element>().inspect_err(|err| {
        tracing::error!("cannot resolve column: {err}");
    })?;
    Ok(technical_column(series, element, period, settings))
}
