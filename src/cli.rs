//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::text_report_adapter::TextReportAdapter;
use crate::domain::backtest::{run_strategy, BacktestConfig};
use crate::domain::comparison::run_comparison;
use crate::domain::config_validation::{
    data_dir, load_backtest_config, load_strategy_config, strategy_from_section,
};
use crate::domain::error::StratlabError;
use crate::domain::metrics::MetricsReport;
use crate::domain::price_series::PriceSeries;
use crate::domain::strategy::{StrategyConfig, StrategyKind, StrategyRegistry};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceDataPort;
use crate::ports::report_port::ReportPort;

/// Fewest bars for which metrics are defined.
const MIN_BARS: usize = 2;

#[derive(Parser, Debug)]
#[command(name = "stratlab", about = "Backtest technical trading strategies on daily prices")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one strategy and print its metrics
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Strategy name or key; defaults to `[strategy] name`
        #[arg(short, long)]
        strategy: Option<String>,
        #[arg(long)]
        symbol: Option<String>,
        /// Write the full timeline as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run every registered strategy and compare metrics side by side
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        /// Comma-separated strategy names or keys to compare instead of all
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,
        /// Write the comparison table as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List available strategies and their default parameters
    Strategies,
    /// List symbols with price files in the configured data directory
    Symbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file without running anything
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            strategy,
            symbol,
            output,
        } => run_backtest(
            &config,
            strategy.as_deref(),
            symbol.as_deref(),
            output.as_deref(),
        ),
        Command::Compare {
            config,
            symbol,
            only,
            output,
        } => run_compare(&config, symbol.as_deref(), &only, output.as_deref()),
        Command::Strategies => {
            print!("{}", render_strategy_list(&StrategyRegistry::with_defaults()));
            Ok(())
        }
        Command::Symbols { config } => run_symbols(&config),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, StratlabError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

/// Fetch the configured symbol over the configured date range.
fn load_series(
    config: &dyn ConfigPort,
    bt_config: &BacktestConfig,
) -> Result<PriceSeries, StratlabError> {
    let data_port = CsvAdapter::new(PathBuf::from(data_dir(config)));
    let series = data_port.fetch_prices(
        &bt_config.symbol,
        bt_config.start_date,
        bt_config.end_date,
    )?;

    if series.len() < MIN_BARS {
        return Err(StratlabError::InsufficientData {
            symbol: bt_config.symbol.clone(),
            bars: series.len(),
            minimum: MIN_BARS,
        });
    }
    info!(
        symbol = %bt_config.symbol,
        bars = series.len(),
        first = ?series.first_date(),
        last = ?series.last_date(),
        "price data loaded"
    );
    Ok(series)
}

fn run_backtest(
    config_path: &Path,
    strategy_override: Option<&str>,
    symbol_override: Option<&str>,
    output_path: Option<&Path>,
) -> Result<(), StratlabError> {
    // Stage 1: config
    let adapter = load_config(config_path)?;
    let bt_config = load_backtest_config(&adapter, symbol_override)?;
    let strategy = load_strategy_config(&adapter, strategy_override)?;
    info!(strategy = %strategy, "strategy selected");

    // Stage 2: data
    let series = load_series(&adapter, &bt_config)?;

    // Stage 3: run and measure
    let run = run_strategy(&series, &strategy, bt_config.initial_capital)?;
    let metrics = MetricsReport::compute(&run.timeline, bt_config.risk_free_rate);
    if !metrics.is_available() {
        warn!(strategy = %run.name, "metrics unavailable for this run");
    }

    // Stage 4: reports
    TextReportAdapter::new(bt_config.risk_free_rate).write_run(&series, &run, &metrics)?;
    if let Some(path) = output_path {
        CsvReportAdapter::new(path.to_path_buf()).write_run(&series, &run, &metrics)?;
    }
    Ok(())
}

fn run_compare(
    config_path: &Path,
    symbol_override: Option<&str>,
    only: &[String],
    output_path: Option<&Path>,
) -> Result<(), StratlabError> {
    let adapter = load_config(config_path)?;
    let bt_config = load_backtest_config(&adapter, symbol_override)?;
    let registry = comparison_registry(&adapter)?;
    let configs = select_strategies(&registry, only)?;
    let series = load_series(&adapter, &bt_config)?;

    info!(strategies = configs.len(), "running comparison");
    let (_, table) = run_comparison(
        &series,
        &configs,
        bt_config.initial_capital,
        bt_config.risk_free_rate,
    );

    TextReportAdapter::new(bt_config.risk_free_rate).write_comparison(&series, &table)?;
    if let Some(path) = output_path {
        CsvReportAdapter::new(path.to_path_buf()).write_comparison(&series, &table)?;
    }
    Ok(())
}

/// The named strategies in the order given, or the whole registry when no
/// names are given.
fn select_strategies(
    registry: &StrategyRegistry,
    names: &[String],
) -> Result<Vec<StrategyConfig>, StratlabError> {
    if names.is_empty() {
        return Ok(registry.iter().cloned().collect());
    }
    let mut selected: Vec<StrategyConfig> = Vec::with_capacity(names.len());
    for name in names {
        let config = registry.lookup(name.trim())?;
        if !selected.iter().any(|c| c.kind() == config.kind()) {
            selected.push(config.clone());
        }
    }
    Ok(selected)
}

/// Every strategy at its defaults, except the one named in `[strategy]`,
/// which takes the section's parameters.
fn comparison_registry(config: &dyn ConfigPort) -> Result<StrategyRegistry, StratlabError> {
    let mut registry = StrategyRegistry::with_defaults();
    if let Some(name) = config.get_string("strategy", "name") {
        let kind = StrategyKind::parse(&name).ok_or(StratlabError::UnknownStrategy { name })?;
        registry.register(strategy_from_section(config, kind)?);
    }
    Ok(registry)
}

fn run_validate(config_path: &Path) -> Result<(), StratlabError> {
    let adapter = load_config(config_path)?;

    let bt_config = load_backtest_config(&adapter, None)?;
    println!("[backtest] OK");
    println!("  symbol:          {}", bt_config.symbol);
    println!(
        "  period:          {} to {}",
        bt_config
            .start_date
            .map_or("start of data".to_string(), |d| d.to_string()),
        bt_config
            .end_date
            .map_or("end of data".to_string(), |d| d.to_string())
    );
    println!("  initial capital: {}", bt_config.initial_capital);
    println!("  risk-free rate:  {}", bt_config.risk_free_rate);
    println!("[data] dir = {}", data_dir(&adapter));

    if adapter.get_string("strategy", "name").is_some() {
        let strategy = load_strategy_config(&adapter, None)?;
        println!("[strategy] OK: {}", strategy);
    } else {
        println!("[strategy] not set (compare runs every strategy at its defaults)");
    }
    Ok(())
}

fn run_symbols(config_path: &Path) -> Result<(), StratlabError> {
    let adapter = load_config(config_path)?;
    let dir = data_dir(&adapter);
    let symbols = CsvAdapter::new(PathBuf::from(&dir)).list_symbols()?;
    if symbols.is_empty() {
        warn!(dir = %dir, "no price files found");
    }
    for symbol in symbols {
        println!("{}", symbol);
    }
    Ok(())
}

/// One line per strategy: key, parameters, then the indicators it computes.
pub fn render_strategy_list(registry: &StrategyRegistry) -> String {
    let mut out = String::new();
    for strategy in registry.iter() {
        let line = format!("{:<14}{}", strategy.kind().key(), strategy);
        let indicators: Vec<String> = strategy
            .indicator_types()
            .iter()
            .map(|t| t.to_string())
            .collect();
        if indicators.is_empty() {
            out.push_str(&format!("{}\n", line));
        } else {
            out.push_str(&format!("{:<56}  {}\n", line, indicators.join(", ")));
        }
    }
    out
}
