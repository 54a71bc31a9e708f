//! Backtest parameters and the single-strategy run.

use crate::domain::error::StratlabError;
use crate::domain::indicator::IndicatorColumn;
use crate::domain::price_series::PriceSeries;
use crate::domain::simulation::{simulate, PortfolioTimeline};
use crate::domain::strategy::StrategyConfig;
use chrono::NaiveDate;
use tracing::debug;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub symbol: String,
    /// Inclusive bounds; `None` leaves that side of the series unbounded.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub initial_capital: f64,
    pub risk_free_rate: f64,
}

/// A strategy applied to one series: its indicators, signals and the
/// simulated timeline. Owns its data; the source series is not retained.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyRun {
    pub name: String,
    pub config: StrategyConfig,
    pub indicators: Vec<IndicatorColumn>,
    pub timeline: PortfolioTimeline,
}

pub fn run_strategy(
    series: &PriceSeries,
    config: &StrategyConfig,
    initial_capital: f64,
) -> Result<StrategyRun, StratlabError> {
    let output = config.generate_signal(series);
    let timeline = simulate(series, &output.signals, initial_capital)?;

    debug!(
        strategy = config.name(),
        symbol = series.symbol(),
        bars = series.len(),
        final_value = timeline.final_value(),
        "strategy run complete"
    );

    Ok(StrategyRun {
        name: config.name().to_string(),
        config: config.clone(),
        indicators: output.indicators,
        timeline,
    })
}
