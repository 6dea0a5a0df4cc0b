//! Integration tests.
//!
//! Tests cover:
//! - Full filter + simulate pipeline with a mock data port
//! - The five-row reference tick matrix, including the one-sided touch policy
//! - Early termination on data exhaustion and cancellation
//! - Request validation (mismatched vector lengths)
//! - CSV and seeded SQLite datasets feeding the same pipeline

mod common;

use common::*;
use ticksim::adapters::file_config_adapter::FileConfigAdapter;
use ticksim::cli::{RunSettings, run_backtest_pipeline};
use ticksim::domain::backtest::{
    BacktestRequest, CancelToken, Termination, TradeRecord, TradeResult, TradeStatus,
    TradeSummary, run_backtest,
};
use ticksim::domain::checker::Direction;
use ticksim::domain::error::TicksimError;
use ticksim::domain::filter::filter_dataset;
use ticksim::domain::rule_parser::parse_rules;
use ticksim::domain::settings::EngineSettings;

/// closes `[10, 11, 10.5, 12, 13, 11]`, opens half a point below.
/// `CLOSE > SMA(2)` selects positions 1, 3 and 4.
fn pipeline_series() -> PriceSeries {
    series_from_closes(&[10.0, 11.0, 10.5, 12.0, 13.0, 11.0])
}

fn settings_from(ini: &str) -> RunSettings {
    let config = FileConfigAdapter::from_string(ini).unwrap();
    RunSettings::from_config(&config).unwrap()
}

const PIPELINE_INI: &str = r#"
[engine]
chunk_size = 2

[strategy]
filters = CLOSE > SMA(2)
direction = buy
take_profit = 1
stop_loss = 1

[data]
source = csv
prices = prices
"#;

mod full_pipeline {
    use super::*;

    #[test]
    fn filter_then_simulate_with_mock_port() {
        let port = MockDataPort::new().with_prices("prices", pipeline_series());
        let settings = settings_from(PIPELINE_INI);

        let outcome = run_backtest_pipeline(&port, &settings).unwrap();
        assert_eq!(outcome.termination, Termination::Completed);
        assert_eq!(outcome.records.len(), 3);

        let profit = &outcome.records[0];
        assert_eq!(profit.entry_point_index, 2);
        assert_eq!(profit.entry_point, 10.5);
        assert_eq!(profit.result, TradeResult::Profit);
        assert_eq!(profit.price_close, Some(12.0));
        assert_eq!(profit.price_close_index, Some(3));

        let loss = &outcome.records[1];
        assert_eq!(loss.entry_point_index, 4);
        assert_eq!(loss.result, TradeResult::Loss);
        assert_eq!(loss.price_close, Some(10.5));
        assert_eq!(loss.price_close_index, Some(5));

        let pending = &outcome.records[2];
        assert_eq!(pending.entry_point_index, 5);
        assert_eq!(pending.result, TradeResult::Pending);
        assert_eq!(pending.status, TradeStatus::Pending);
        assert_eq!(pending.time_closing, None);

        let summary = TradeSummary::from_records(&outcome.records);
        assert_eq!((summary.profits, summary.losses, summary.pending), (1, 1, 1));
        assert_eq!(summary.win_ratio(), Some(0.5));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn configured_ticks_come_from_the_port() {
        let port = MockDataPort::new()
            .with_prices("bars", series_from_closes(&[1.0, 2.0, 3.0]))
            .with_ticks("ticks", reference_ticks());
        let settings = settings_from(
            "[strategy]\ndirection = buy\ntake_profit = 3\nstop_loss = 5\n\n[data]\nsource = sqlite\nprices = bars\nticks = ticks\n",
        );

        let outcome = run_backtest_pipeline(&port, &settings).unwrap();
        // candidates 0, 1, 2 enter at ticks 1, 2, 3
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.records[0].entry_point, 102.0);
        assert_eq!(outcome.records[0].result, TradeResult::Profit);
        assert_eq!(outcome.termination, Termination::Completed);
    }

    #[test]
    fn port_error_aborts_run() {
        let port = MockDataPort::new().with_error("prices", "connection refused");
        let settings = settings_from(PIPELINE_INI);

        let result = run_backtest_pipeline(&port, &settings);
        assert!(matches!(result, Err(TicksimError::Database { reason }) if reason == "connection refused"));
    }

    #[test]
    fn no_candidates_yields_no_records() {
        let port = MockDataPort::new().with_prices("prices", pipeline_series());
        let settings = settings_from(
            "[strategy]\nfilters = CLOSE < OPEN\ndirection = sell\n\n[data]\nprices = prices\n",
        );

        let outcome = run_backtest_pipeline(&port, &settings).unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.termination, Termination::Completed);
    }
}

mod five_row_matrix {
    use super::*;

    fn run_single(direction: Direction, take_profit: f64, stop_loss: f64) -> Vec<TradeRecord> {
        let request =
            BacktestRequest::uniform(vec![0], direction, Some(take_profit), Some(stop_loss));
        run_backtest(&request, &reference_ticks(), &EngineSettings::default(), None)
            .unwrap()
            .records
    }

    #[test]
    fn buy_enters_at_next_bid_and_closes_on_upper_touch() {
        let records = run_single(Direction::Buy, 3.0, 5.0);
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.entry_point_index, 1);
        assert_eq!(record.entry_point, 102.0);
        // bid 105 at row 3 reaches 102 + 3; no ask reaches 97
        assert_eq!(record.result, TradeResult::Profit);
        assert_eq!(record.status, TradeStatus::Closed);
        assert_eq!(record.price_close_index, Some(3));
        assert_eq!(record.price_close, Some(105.0));
        assert_eq!(record.time_opening, Some(timestamp(0) + chrono::Duration::seconds(1)));
        assert_eq!(record.time_closing, Some(timestamp(0) + chrono::Duration::seconds(3)));
    }

    #[test]
    fn untouched_boundaries_stay_pending() {
        let records = run_single(Direction::Buy, 10.0, 10.0);
        assert_eq!(records[0].result, TradeResult::Pending);
        assert_eq!(records[0].status, TradeStatus::Pending);
        assert_eq!(records[0].price_close, None);
        assert_eq!(records[0].price_close_index, None);
    }

    #[test]
    fn sell_enters_at_next_ask() {
        // entry 103: no bid reaches 106 and no ask falls to 98
        let records = run_single(Direction::Sell, 3.0, 5.0);
        assert_eq!(records[0].entry_point, 103.0);
        assert_eq!(records[0].result, TradeResult::Pending);
    }

    #[test]
    fn sell_closes_as_loss_on_upper_touch() {
        // entry 103: bid 105 at row 3 reaches 103 + 2
        let records = run_single(Direction::Sell, 2.0, 50.0);
        assert_eq!(records[0].result, TradeResult::Loss);
        assert_eq!(records[0].price_close_index, Some(3));
    }

    #[test]
    fn sell_closes_as_profit_on_lower_touch() {
        // entry 103: ask 100 at row 2 falls to 103 - 3
        let records = run_single(Direction::Sell, 50.0, -3.0);
        assert_eq!(records[0].result, TradeResult::Profit);
        assert_eq!(records[0].price_close, Some(100.0));
        assert_eq!(records[0].stop_loss, Some(-3.0));
    }
}

mod termination {
    use super::*;

    #[test]
    fn entry_past_last_tick_stops_the_run() {
        let request = BacktestRequest::uniform(vec![0, 2, 4, 1], Direction::Buy, Some(1.0), Some(1.0));
        let outcome =
            run_backtest(&request, &reference_ticks(), &EngineSettings::default(), None).unwrap();

        assert_eq!(outcome.termination, Termination::DataExhausted { candidate: 2 });
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[1].entry_point_index, 3);
    }

    #[test]
    fn cancelled_token_stops_before_first_candidate() {
        let token = CancelToken::new();
        let shared = token.clone();
        shared.cancel();

        let request = BacktestRequest::uniform(vec![0, 1], Direction::Buy, Some(1.0), Some(1.0));
        let outcome = run_backtest(
            &request,
            &reference_ticks(),
            &EngineSettings::default(),
            Some(&token),
        )
        .unwrap();

        assert_eq!(outcome.termination, Termination::Cancelled { candidate: 0 });
        assert!(outcome.records.is_empty());
    }
}

mod request_validation {
    use super::*;

    #[test]
    fn direction_length_mismatch_aborts() {
        let request = BacktestRequest {
            starting_indexes: vec![0, 1],
            directions: vec![Direction::Buy],
            take_profits: vec![Some(1.0)],
            stop_losses: vec![Some(1.0)],
        };
        let result = run_backtest(&request, &reference_ticks(), &EngineSettings::default(), None);
        match result {
            Err(TicksimError::LengthMismatch { field, expected, actual }) => {
                assert_eq!(field, "directions");
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("expected LengthMismatch, got {other:?}"),
        }
    }

    #[test]
    fn per_candidate_distances_must_match() {
        let request = BacktestRequest {
            starting_indexes: vec![0, 1, 2],
            directions: vec![Direction::Sell; 3],
            take_profits: vec![Some(1.0), Some(2.0)],
            stop_losses: vec![None],
        };
        let result = run_backtest(&request, &reference_ticks(), &EngineSettings::default(), None);
        assert!(matches!(
            result,
            Err(TicksimError::LengthMismatch { field, .. }) if field == "take_profits"
        ));
    }

    #[test]
    fn per_candidate_distances_are_used_in_order() {
        let request = BacktestRequest {
            starting_indexes: vec![0, 0],
            directions: vec![Direction::Buy, Direction::Buy],
            take_profits: vec![Some(3.0), Some(10.0)],
            stop_losses: vec![Some(5.0), Some(10.0)],
        };
        let outcome =
            run_backtest(&request, &reference_ticks(), &EngineSettings::default(), None).unwrap();
        assert_eq!(outcome.records[0].result, TradeResult::Profit);
        assert_eq!(outcome.records[1].result, TradeResult::Pending);
    }

    #[test]
    fn unknown_column_in_filter_is_rejected() {
        let err = parse_rules("CLOSE > RSI(14)").unwrap_err();
        assert_eq!(err.position, 8);
    }
}

mod datasets {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use ticksim::adapters::csv_adapter::CsvAdapter;

    #[test]
    fn csv_files_feed_the_pipeline() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("prices.csv"),
            "date,open,high,low,close\n\
             2024-01-01,9.5,11,9,10\n\
             2024-01-02,10.5,12,10,11\n\
             2024-01-03,10,11,9.5,10.5\n\
             2024-01-04,11.5,13,11,12\n\
             2024-01-05,12.5,14,12,13\n\
             2024-01-06,10.5,13,10,11\n",
        )
        .unwrap();

        let port = CsvAdapter::new(dir.path().to_path_buf());
        let mut settings = settings_from(PIPELINE_INI);
        settings.data.prices = "prices.csv".to_string();
        let outcome = run_backtest_pipeline(&port, &settings).unwrap();

        let results: Vec<TradeResult> = outcome.records.iter().map(|r| r.result).collect();
        assert_eq!(
            results,
            vec![TradeResult::Profit, TradeResult::Loss, TradeResult::Pending]
        );
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn seeded_sqlite_matches_mock_port() {
        use ticksim::adapters::sqlite_adapter::SqliteAdapter;
        use ticksim::ports::data_port::DataPort;

        let series = pipeline_series();
        let sqlite = SqliteAdapter::in_memory().unwrap();
        sqlite.initialize_price_table("prices").unwrap();
        sqlite.insert_bars("prices", series.bars()).unwrap();
        sqlite.initialize_tick_table("ticks").unwrap();
        sqlite
            .insert_ticks("ticks", &TickMatrix::from_price_series(&series))
            .unwrap();

        assert_eq!(sqlite.fetch_prices("prices").unwrap(), series);

        let mock = MockDataPort::new().with_prices("prices", series.clone());
        let settings = settings_from(PIPELINE_INI);
        let from_mock = run_backtest_pipeline(&mock, &settings).unwrap();

        let mut settings = settings_from(PIPELINE_INI);
        settings.data.ticks = Some("ticks".to_string());
        settings.data.source = ticksim::domain::settings::SourceKind::Sqlite;
        let from_sqlite = run_backtest_pipeline(&sqlite, &settings).unwrap();

        assert_eq!(from_mock.records, from_sqlite.records);
    }

    #[test]
    fn filter_results_are_ascending_positions() {
        let rules = parse_rules("CLOSE > SMA(2), CLOSE > OPEN").unwrap();
        let candidates = filter_dataset(&pipeline_series(), &rules, &EngineSettings::default());
        assert_eq!(candidates, vec![1, 3, 4]);
    }
}
