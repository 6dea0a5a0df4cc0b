//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::dataset::{load_ticks, open_data_port, tick_source};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{
    BacktestOutcome, BacktestRequest, Termination, TradeRecord, TradeSummary, run_backtest,
};
use crate::domain::config_validation::{
    validate_data_config, validate_engine_config, validate_strategy_config,
};
use crate::domain::error::TicksimError;
use crate::domain::filter::filter_dataset;
use crate::domain::price_series::{PriceSeries, RawColumn};
use crate::domain::rule::ComparisonRule;
use crate::domain::rule_parser::parse_rules;
use crate::domain::sampling::{SamplePaths, SamplingMethod, sample_paths};
use crate::domain::settings::{DataSettings, EngineSettings, StrategySettings};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "ticksim", about = "Rule-filtered trade outcome simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Filter the price series and simulate a trade at every candidate
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Trade records CSV; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the candidate positions selected by the configured filters
    Filter {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Generate synthetic continuations of the price series
    Sample {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long, default_value = "normal")]
        method: String,
        #[arg(long)]
        steps: usize,
        #[arg(long)]
        samples: usize,
        #[arg(long, default_value = "CLOSE")]
        column: String,
        #[arg(long)]
        seed: Option<u64>,
        /// Paths CSV, one row per path; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file and its filter rules
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest { config, output } => run_backtest_command(&config, output.as_deref()),
        Command::Filter { config } => run_filter(&config),
        Command::Sample {
            config,
            method,
            steps,
            samples,
            column,
            seed,
            output,
        } => run_sample(
            &config,
            &SampleArgs {
                method,
                steps,
                samples,
                column,
                seed,
            },
            output.as_deref(),
        ),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Everything a run needs, built and validated from one config file.
pub struct RunSettings {
    pub engine: EngineSettings,
    pub strategy: StrategySettings,
    pub data: DataSettings,
    pub rules: Vec<ComparisonRule>,
}

impl RunSettings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TicksimError> {
        validate_engine_config(config)?;
        validate_strategy_config(config)?;
        validate_data_config(config)?;

        let strategy = StrategySettings::from_config(config)?;
        let rules = parse_rules(&strategy.filters)?;
        Ok(Self {
            engine: EngineSettings::from_config(config)?,
            data: DataSettings::from_config(config)?,
            strategy,
            rules,
        })
    }
}

/// Fetch prices, filter, load ticks and simulate every candidate.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    settings: &RunSettings,
) -> Result<BacktestOutcome, TicksimError> {
    let prices = data_port.fetch_prices(&settings.data.prices)?;
    let candidates = filter_dataset(&prices, &settings.rules, &settings.engine);
    eprintln!(
        "Filtered {} bars: {} candidates",
        prices.len(),
        candidates.len()
    );

    let ticks = load_ticks(&tick_source(&settings.data, &prices), Some(data_port))?;

    let request = BacktestRequest::uniform(
        candidates,
        settings.strategy.direction,
        settings.strategy.take_profit,
        settings.strategy.stop_loss,
    );
    run_backtest(&request, &ticks, &settings.engine, None)
}

fn prepare(config_path: &Path) -> Result<(RunSettings, Box<dyn DataPort>), ExitCode> {
    eprintln!("Loading config from {}", config_path.display());
    let config = load_config(config_path)?;

    let settings = RunSettings::from_config(&config).map_err(|e| report(&e))?;
    let data_port = open_data_port(&settings.data, &config).map_err(|e| report(&e))?;
    Ok((settings, data_port))
}

fn report(err: &TicksimError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

fn run_backtest_command(config_path: &Path, output_path: Option<&Path>) -> ExitCode {
    let (settings, data_port) = match prepare(config_path) {
        Ok(prepared) => prepared,
        Err(code) => return code,
    };

    let outcome = match run_backtest_pipeline(data_port.as_ref(), &settings) {
        Ok(o) => o,
        Err(e) => return report(&e),
    };

    if let Err(e) = write_records(&outcome.records, output_path) {
        return report(&e);
    }

    let summary = TradeSummary::from_records(&outcome.records);
    eprintln!("\n=== Backtest Results ===");
    eprintln!("Direction:        {}", settings.strategy.direction);
    eprintln!("Total Trades:     {}", summary.total);
    eprintln!("Profit:           {}", summary.profits);
    eprintln!("Loss:             {}", summary.losses);
    eprintln!("Pending:          {}", summary.pending);
    match summary.win_ratio() {
        Some(ratio) => eprintln!("Win Rate:         {:.1}%", ratio * 100.0),
        None => eprintln!("Win Rate:         n/a"),
    }
    match outcome.termination {
        Termination::Completed => {}
        Termination::DataExhausted { candidate } => {
            eprintln!("Stopped early: ran out of ticks at candidate {candidate}");
        }
        Termination::Cancelled { candidate } => {
            eprintln!("Cancelled at candidate {candidate}");
        }
    }
    if let Some(path) = output_path {
        eprintln!("\nTrades written to: {}", path.display());
    }
    ExitCode::SUCCESS
}

fn write_records(records: &[TradeRecord], output_path: Option<&Path>) -> Result<(), TicksimError> {
    fn write_all<W: io::Write>(
        mut writer: csv::Writer<W>,
        records: &[TradeRecord],
    ) -> csv::Result<()> {
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    let result = match output_path {
        Some(path) => csv::Writer::from_path(path).and_then(|w| write_all(w, records)),
        None => write_all(csv::Writer::from_writer(io::stdout()), records),
    };
    result.map_err(csv_error)
}

fn csv_error(err: csv::Error) -> TicksimError {
    match err.into_kind() {
        csv::ErrorKind::Io(e) => TicksimError::Io(e),
        other => TicksimError::Io(io::Error::other(format!("{other:?}"))),
    }
}

fn run_filter(config_path: &Path) -> ExitCode {
    let (settings, data_port) = match prepare(config_path) {
        Ok(prepared) => prepared,
        Err(code) => return code,
    };

    let prices = match data_port.fetch_prices(&settings.data.prices) {
        Ok(p) => p,
        Err(e) => return report(&e),
    };

    let candidates = filter_dataset(&prices, &settings.rules, &settings.engine);
    for index in &candidates {
        println!("{index}");
    }
    eprintln!("{} of {} bars selected", candidates.len(), prices.len());
    ExitCode::SUCCESS
}

/// Sampler arguments as given on the command line.
#[derive(Debug, Clone)]
pub struct SampleArgs {
    pub method: String,
    pub steps: usize,
    pub samples: usize,
    pub column: String,
    pub seed: Option<u64>,
}

/// Draw paths for `args`; `Ok(None)` when the request is out of range.
pub fn sample_from_args(
    prices: &PriceSeries,
    args: &SampleArgs,
) -> Result<Option<SamplePaths>, TicksimError> {
    let method: SamplingMethod = args.method.parse()?;
    let column: RawColumn = args.column.parse()?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    Ok(sample_paths(
        prices,
        method,
        args.steps,
        column,
        args.samples,
        &mut rng,
    ))
}

fn run_sample(config_path: &Path, args: &SampleArgs, output_path: Option<&Path>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let prices = match validate_data_config(&config)
        .and_then(|()| DataSettings::from_config(&config))
        .and_then(|data| open_data_port(&data, &config)?.fetch_prices(&data.prices))
    {
        Ok(p) => p,
        Err(e) => return report(&e),
    };

    let paths = match sample_from_args(&prices, args) {
        Ok(Some(paths)) => paths,
        Ok(None) => {
            eprintln!(
                "no result: steps must be in [2, 255), samples in [1, 10000), and the series non-empty"
            );
            return ExitCode::SUCCESS;
        }
        Err(e) => return report(&e),
    };

    let (samples, steps) = paths.shape();
    eprintln!("Generated {samples} {} paths of {steps} steps", args.method);

    let result = match output_path {
        Some(path) => csv::Writer::from_path(path).and_then(|w| write_paths(w, &paths)),
        None => write_paths(csv::Writer::from_writer(io::stdout()), &paths),
    };
    if let Err(e) = result {
        return report(&csv_error(e));
    }
    ExitCode::SUCCESS
}

fn write_paths<W: io::Write>(mut writer: csv::Writer<W>, paths: &SamplePaths) -> csv::Result<()> {
    for path in &paths.paths {
        writer.write_record(path.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let settings = match RunSettings::from_config(&config) {
        Ok(s) => s,
        Err(e) => return report(&e),
    };

    eprintln!("\nEngine:");
    eprintln!(
        "  moving_average_period: {}",
        settings.engine.moving_average_period
    );
    eprintln!("  chunk_size:            {}", settings.engine.chunk_size);

    eprintln!("\nStrategy:");
    eprintln!("  direction:   {}", settings.strategy.direction);
    eprintln!("  take_profit: {}", describe_distance(settings.strategy.take_profit));
    eprintln!("  stop_loss:   {}", describe_distance(settings.strategy.stop_loss));

    eprintln!("\nFilters ({}):", settings.rules.len());
    if settings.rules.is_empty() {
        eprintln!("  (none, every bar is a candidate)");
    }
    for rule in &settings.rules {
        eprintln!("  {}", rule);
    }

    eprintln!("\nConfiguration is valid");
    ExitCode::SUCCESS
}

fn describe_distance(distance: Option<f64>) -> String {
    distance.map_or_else(|| "none".to_string(), |d| d.to_string())
}
