//! Core domain types and logic.

pub mod backtest;
pub mod checker;
pub mod column;
pub mod config_validation;
pub mod error;
pub mod filter;
pub mod indicator;
pub mod price_series;
pub mod rule;
pub mod rule_parser;
pub mod sampling;
pub mod settings;
pub mod tick;
