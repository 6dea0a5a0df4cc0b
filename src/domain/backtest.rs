//! Trade outcome simulation.
//!
//! Each candidate enters on the tick after its signal, both boundary scans
//! run from the entry tick, and the first touch decides the result. Running
//! out of ticks for an entry ends the whole run early; it is not an error.

use crate::domain::checker::{Direction, checker};
use crate::domain::error::TicksimError;
use crate::domain::settings::EngineSettings;
use crate::domain::tick::TickMatrix;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRequest {
    pub starting_indexes: Vec<usize>,
    pub directions: Vec<Direction>,
    /// One value per candidate, or a single value applied to all.
    pub take_profits: Vec<Option<f64>>,
    /// One value per candidate, or a single value applied to all.
    pub stop_losses: Vec<Option<f64>>,
}

impl BacktestRequest {
    /// Same direction and distances for every candidate.
    pub fn uniform(
        starting_indexes: Vec<usize>,
        direction: Direction,
        take_profit: Option<f64>,
        stop_loss: Option<f64>,
    ) -> Self {
        let directions = vec![direction; starting_indexes.len()];
        Self {
            starting_indexes,
            directions,
            take_profits: vec![take_profit],
            stop_losses: vec![stop_loss],
        }
    }

    pub fn len(&self) -> usize {
        self.starting_indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starting_indexes.is_empty()
    }

    pub fn validate(&self) -> Result<(), TicksimError> {
        let expected = self.len();
        if self.directions.len() != expected {
            return Err(TicksimError::LengthMismatch {
                field: "directions".into(),
                expected,
                actual: self.directions.len(),
            });
        }
        for (field, len) in [
            ("take_profits", self.take_profits.len()),
            ("stop_losses", self.stop_losses.len()),
        ] {
            if len != expected && len != 1 {
                return Err(TicksimError::LengthMismatch {
                    field: field.into(),
                    expected,
                    actual: len,
                });
            }
        }
        Ok(())
    }

    fn take_profit(&self, candidate: usize) -> Option<f64> {
        broadcast(&self.take_profits, candidate)
    }

    fn stop_loss(&self, candidate: usize) -> Option<f64> {
        broadcast(&self.stop_losses, candidate)
    }
}

fn broadcast(values: &[Option<f64>], candidate: usize) -> Option<f64> {
    match values {
        [single] => *single,
        _ => values.get(candidate).copied().flatten(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Closed,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeResult {
    Profit,
    Loss,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Bid reached `entry + take_profit`.
    Upper,
    /// Ask reached `entry - |stop_loss|`.
    Lower,
}

/// The boundary touched first. An unresolved scan counts as never touched,
/// so a resolved side always beats an unresolved one; on equal offsets the
/// lower boundary wins.
pub fn first_touch(up: Option<usize>, down: Option<usize>) -> Option<(Boundary, usize)> {
    match (up, down) {
        (None, None) => None,
        (Some(u), None) => Some((Boundary::Upper, u)),
        (None, Some(d)) => Some((Boundary::Lower, d)),
        (Some(u), Some(d)) if u < d => Some((Boundary::Upper, u)),
        (Some(_), Some(d)) => Some((Boundary::Lower, d)),
    }
}

/// Classify a trade from the two scan offsets.
///
/// | direction | upper first   | lower first   | neither          |
/// |-----------|---------------|---------------|------------------|
/// | BUY       | PROFIT/CLOSED | LOSS/CLOSED   | PENDING/PENDING  |
/// | SELL      | LOSS/CLOSED   | PROFIT/CLOSED | PENDING/PENDING  |
pub fn classify(
    direction: Direction,
    up: Option<usize>,
    down: Option<usize>,
) -> (TradeResult, TradeStatus) {
    let Some((boundary, _)) = first_touch(up, down) else {
        return (TradeResult::Pending, TradeStatus::Pending);
    };
    let result = match (direction, boundary) {
        (Direction::Buy, Boundary::Upper) | (Direction::Sell, Boundary::Lower) => {
            TradeResult::Profit
        }
        (Direction::Buy, Boundary::Lower) | (Direction::Sell, Boundary::Upper) => {
            TradeResult::Loss
        }
    };
    (result, TradeStatus::Closed)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub direction: Direction,
    pub entry_point: f64,
    pub entry_point_index: usize,
    pub take_profit: Option<f64>,
    pub stop_loss: Option<f64>,
    pub price_close: Option<f64>,
    pub price_close_index: Option<usize>,
    pub time_opening: Option<NaiveDateTime>,
    pub time_closing: Option<NaiveDateTime>,
    pub status: TradeStatus,
    pub result: TradeResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Completed,
    /// The entry tick of `candidate` lies past the end of the tick matrix.
    DataExhausted { candidate: usize },
    /// Cancellation was observed before `candidate` was simulated.
    Cancelled { candidate: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestOutcome {
    pub records: Vec<TradeRecord>,
    pub termination: Termination,
}

/// Cooperative cancellation flag, checked between candidates.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Simulate every candidate in order.
///
/// Malformed requests abort with an error before any candidate runs.
pub fn run_backtest(
    request: &BacktestRequest,
    ticks: &TickMatrix,
    settings: &EngineSettings,
    cancel: Option<&CancelToken>,
) -> Result<BacktestOutcome, TicksimError> {
    request.validate().inspect_err(|err| {
        tracing::error!("rejecting backtest request: {err}");
    })?;

    tracing::info!(
        candidates = request.len(),
        ticks = ticks.len(),
        "starting backtest"
    );

    let mut records = Vec::with_capacity(request.len());
    let mut termination = Termination::Completed;

    for (candidate, &signal_index) in request.starting_indexes.iter().enumerate() {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            tracing::info!(candidate, "backtest cancelled");
            termination = Termination::Cancelled { candidate };
            break;
        }

        let Some(entry_index) = signal_index.checked_add(1).filter(|&i| i < ticks.len()) else {
            tracing::warn!(
                candidate,
                signal_index,
                ticks = ticks.len(),
                "ran out of data, dropping remaining candidates"
            );
            termination = Termination::DataExhausted { candidate };
            break;
        };

        records.push(simulate_trade(
            ticks,
            request.directions[candidate],
            entry_index,
            request.take_profit(candidate),
            request.stop_loss(candidate),
            settings.chunk_size,
        ));
    }

    tracing::info!(
        trades = records.len(),
        termination = ?termination,
        "backtest finished"
    );
    Ok(BacktestOutcome {
        records,
        termination,
    })
}

fn simulate_trade(
    ticks: &TickMatrix,
    direction: Direction,
    entry_index: usize,
    take_profit: Option<f64>,
    stop_loss: Option<f64>,
    chunk_size: usize,
) -> TradeRecord {
    let time_opening = ticks.row(entry_index).map(|row| row.datetime);
    let entry_point = match direction {
        Direction::Buy => ticks.bids()[entry_index],
        Direction::Sell => ticks.asks()[entry_index],
    };

    let up = checker(
        ticks,
        Direction::Buy,
        entry_index,
        entry_point,
        take_profit,
        stop_loss,
        chunk_size,
    );
    let down = checker(
        ticks,
        Direction::Sell,
        entry_index,
        entry_point,
        take_profit,
        stop_loss,
        chunk_size,
    );
    let (result, status) = classify(direction, up, down);

    let close = first_touch(up, down).and_then(|(boundary, offset)| {
        let index = entry_index + offset;
        let row = ticks.row(index)?;
        let price = match boundary {
            Boundary::Upper => row.bid,
            Boundary::Lower => row.ask,
        };
        Some((price, index, row.datetime))
    });
    if close.is_none() {
        tracing::debug!(entry_index, %direction, "trade still pending at end of data");
    }

    TradeRecord {
        direction,
        entry_point,
        entry_point_index: entry_index,
        take_profit,
        stop_loss,
        price_close: close.map(|(price, _, _)| price),
        price_close_index: close.map(|(_, index, _)| index),
        time_opening,
        time_closing: close.map(|(_, _, time)| time),
        status,
        result,
    }
}

/// Aggregate counts over a set of trade records.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TradeSummary {
    pub total: usize,
    pub profits: usize,
    pub losses: usize,
    pub pending: usize,
}

impl TradeSummary {
    pub fn from_records(records: &[TradeRecord]) -> Self {
        records.iter().fold(Self::default(), |mut summary, record| {
            summary.total += 1;
            match record.result {
                TradeResult::Profit => summary.profits += 1,
                TradeResult::Loss => summary.losses += 1,
                TradeResult::Pending => summary.pending += 1,
            }
            summary
        })
    }

    pub fn closed(&self) -> usize {
        self.profits + self.losses
    }

    /// Profits over closed trades; `None` when nothing closed.
    pub fn win_ratio(&self) -> Option<f64> {
        match self.closed() {
            0 => None,
            closed => Some(self.profits as f64 / closed as f64),
        }
    }
}
