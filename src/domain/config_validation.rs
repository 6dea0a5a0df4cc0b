//! Configuration validation.
//!
//! Validates every section before a run starts so that a malformed file
//! fails fast with the offending section and key.

use crate::domain::error::TicksimError;
use crate::domain::rule_parser::parse_rules;
use crate::domain::settings::{DataSettings, EngineSettings, SourceKind, StrategySettings};
use crate::ports::config_port::ConfigPort;

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), TicksimError> {
    for key in ["moving_average_period", "chunk_size"] {
        validate_integer(config, "engine", key)?;
    }
    EngineSettings::from_config(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), TicksimError> {
    let strategy = StrategySettings::from_config(config)?;

    if let Some(take_profit) = strategy.take_profit {
        if take_profit < 0.0 {
            return Err(TicksimError::ConfigInvalid {
                section: "strategy".to_string(),
                key: "take_profit".to_string(),
                reason: "take_profit must be non-negative".to_string(),
            });
        }
    }

    parse_rules(&strategy.filters).inspect_err(|e| {
        tracing::error!("invalid filters:\n{}", e.display_with_context(&strategy.filters));
    })?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), TicksimError> {
    let data = DataSettings::from_config(config)?;

    match data.source {
        SourceKind::Csv => Ok(()),
        SourceKind::Sqlite => require_feature(cfg!(feature = "sqlite"), "sqlite"),
        SourceKind::Parquet => require_feature(cfg!(feature = "parquet"), "parquet"),
        SourceKind::Postgres => {
            require_feature(cfg!(feature = "postgres"), "postgres")?;
            match config.get_string("postgres", "connection_string") {
                Some(s) if !s.trim().is_empty() => Ok(()),
                _ => Err(TicksimError::ConfigMissing {
                    section: "postgres".to_string(),
                    key: "connection_string".to_string(),
                }),
            }
        }
    }
}

fn validate_integer(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), TicksimError> {
    match config.get_string(section, key) {
        Some(raw) if raw.trim().parse::<i64>().is_err() => Err(TicksimError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("'{}' is not an integer", raw.trim()),
        }),
        _ => Ok(()),
    }
}

fn require_feature(enabled: bool, name: &str) -> Result<(), TicksimError> {
    if enabled {
        return Ok(());
    }
    Err(TicksimError::ConfigInvalid {
        section: "data".to_string(),
        key: "source".to_string(),
        reason: format!("ticksim was built without the '{}' feature", name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn valid_config_passes() {
        let config = make_config(
            r#"
[engine]
moving_average_period = 14
chunk_size = 5000

[strategy]
filters = SMA(5) > SMA(20), CLOSE > OPEN
direction = buy
take_profit = 0.002
stop_loss = 0.001

[data]
source = csv
base_path = data
prices = eurusd_daily.csv
"#,
        );
        assert!(validate_engine_config(&config).is_ok());
        assert!(validate_strategy_config(&config).is_ok());
        assert!(validate_data_config(&config).is_ok());
    }

    #[test]
    fn non_integer_engine_value_fails() {
        let config = make_config("[engine]\nchunk_size = lots\n");
        let err = validate_engine_config(&config).unwrap_err();
        assert!(matches!(err, TicksimError::ConfigInvalid { key, .. } if key == "chunk_size"));
    }

    #[test]
    fn zero_period_fails() {
        let config = make_config("[engine]\nmoving_average_period = 0\n");
        let err = validate_engine_config(&config).unwrap_err();
        assert!(
            matches!(err, TicksimError::ConfigInvalid { key, .. } if key == "moving_average_period")
        );
    }

    #[test]
    fn bad_filter_fails_with_parse_error() {
        let config = make_config("[strategy]\ndirection = sell\nfilters = CLOSE <> OPEN\n");
        let err = validate_strategy_config(&config).unwrap_err();
        match err {
            TicksimError::RuleParse(e) => assert_eq!(e.position, 6),
            other => panic!("expected RuleParse, got {other:?}"),
        }
    }

    #[test]
    fn empty_filter_list_is_valid() {
        let config = make_config("[strategy]\ndirection = sell\n");
        assert!(validate_strategy_config(&config).is_ok());
    }

    #[test]
    fn negative_take_profit_fails() {
        let config = make_config("[strategy]\ndirection = buy\ntake_profit = -1\n");
        let err = validate_strategy_config(&config).unwrap_err();
        assert!(matches!(err, TicksimError::ConfigInvalid { key, .. } if key == "take_profit"));
    }

    #[test]
    fn negative_stop_loss_is_accepted() {
        let config = make_config("[strategy]\ndirection = buy\nstop_loss = -0.5\n");
        assert!(validate_strategy_config(&config).is_ok());
    }

    #[test]
    fn missing_direction_fails() {
        let config = make_config("[strategy]\nfilters = CLOSE > OPEN\n");
        let err = validate_strategy_config(&config).unwrap_err();
        assert!(matches!(err, TicksimError::ConfigMissing { key, .. } if key == "direction"));
    }

    #[test]
    fn postgres_requires_connection_string() {
        let config = make_config("[data]\nsource = postgres\nprices = bars\n");
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, TicksimError::ConfigInvalid { .. } | TicksimError::ConfigMissing { .. }));
    }
}
