//! Configuration validation.
//!
//! Reads the `[data]`, `[backtest]` and `[strategy]` sections through a
//! [`ConfigPort`] and turns them into typed domain values, rejecting
//! anything out of range before a run starts.

use crate::domain::backtest::{BacktestConfig, DEFAULT_INITIAL_CAPITAL, DEFAULT_RISK_FREE_RATE};
use crate::domain::error::StratlabError;
use crate::domain::strategy::{
    BollingerParams, CrossoverParams, MacdParams, RsiParams, StochasticParams, StrategyConfig,
    StrategyKind,
};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DEFAULT_DATA_DIR: &str = "data";

/// Directory holding `<SYMBOL>.csv` files.
pub fn data_dir(config: &dyn ConfigPort) -> String {
    config
        .get_string("data", "dir")
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
}

/// Build the backtest parameters. `symbol_override` (from the command line)
/// takes precedence over `[backtest] symbol`.
pub fn load_backtest_config(
    config: &dyn ConfigPort,
    symbol_override: Option<&str>,
) -> Result<BacktestConfig, StratlabError> {
    let symbol = symbol_override
        .map(str::to_string)
        .or_else(|| config.get_string("backtest", "symbol"))
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StratlabError::ConfigMissing {
            section: "backtest".to_string(),
            key: "symbol".to_string(),
        })?;

    let initial_capital = validate_initial_capital(config)?;
    let risk_free_rate = validate_risk_free_rate(config)?;
    let (start_date, end_date) = validate_dates(config)?;

    Ok(BacktestConfig {
        symbol,
        start_date,
        end_date,
        initial_capital,
        risk_free_rate,
    })
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<f64, StratlabError> {
    let value = config.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL);
    if !(value > 0.0 && value.is_finite()) {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(value)
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<f64, StratlabError> {
    let value = config.get_double("backtest", "risk_free_rate", DEFAULT_RISK_FREE_RATE);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(value)
}

fn validate_dates(
    config: &dyn ConfigPort,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), StratlabError> {
    let start = parse_date(config.get_string("backtest", "start_date"), "start_date")?;
    let end = parse_date(config.get_string("backtest", "end_date"), "end_date")?;

    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(invalid(
                "backtest",
                "start_date",
                "start_date must not be after end_date",
            ));
        }
    }
    Ok((start, end))
}

fn parse_date(value: Option<String>, field: &str) -> Result<Option<NaiveDate>, StratlabError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                invalid(
                    "backtest",
                    field,
                    &format!("invalid {} format, expected YYYY-MM-DD", field),
                )
            }),
    }
}

/// Build the strategy named in `[strategy] name`, taking any parameters
/// present in the section and defaults for the rest.
///
/// `name_override` selects a different strategy; the section's parameters
/// are only applied when it names the same strategy as the section.
pub fn load_strategy_config(
    config: &dyn ConfigPort,
    name_override: Option<&str>,
) -> Result<StrategyConfig, StratlabError> {
    let configured = config.get_string("strategy", "name");
    let name = name_override
        .map(str::to_string)
        .or_else(|| configured.clone())
        .ok_or_else(|| StratlabError::ConfigMissing {
            section: "strategy".to_string(),
            key: "name".to_string(),
        })?;
    let kind =
        StrategyKind::parse(&name).ok_or_else(|| StratlabError::UnknownStrategy { name })?;

    let section_kind = configured.as_deref().and_then(StrategyKind::parse);
    if section_kind == Some(kind) {
        strategy_from_section(config, kind)
    } else {
        Ok(kind.default_config())
    }
}

/// Parameters for `kind` from `[strategy]`, falling back to its defaults.
pub fn strategy_from_section(
    config: &dyn ConfigPort,
    kind: StrategyKind,
) -> Result<StrategyConfig, StratlabError> {
    let strategy = match kind.default_config() {
        StrategyConfig::BuyAndHold => StrategyConfig::BuyAndHold,
        StrategyConfig::SmaCrossover(d) => StrategyConfig::SmaCrossover(crossover(config, d)?),
        StrategyConfig::EmaCrossover(d) => StrategyConfig::EmaCrossover(crossover(config, d)?),
        StrategyConfig::Rsi(d) => {
            let (oversold, overbought) = thresholds(config, d.oversold, d.overbought)?;
            StrategyConfig::Rsi(RsiParams {
                window: window(config, "window", d.window)?,
                oversold,
                overbought,
            })
        }
        StrategyConfig::Macd(d) => StrategyConfig::Macd(MacdParams {
            fast: window(config, "fast", d.fast)?,
            slow: window(config, "slow", d.slow)?,
            signal: window(config, "signal", d.signal)?,
        }),
        StrategyConfig::BollingerBands(d) => {
            let std_dev = config.get_double("strategy", "std_dev", d.std_dev);
            if !(std_dev > 0.0 && std_dev.is_finite()) {
                return Err(invalid("strategy", "std_dev", "std_dev must be positive"));
            }
            StrategyConfig::BollingerBands(BollingerParams {
                window: window(config, "window", d.window)?,
                std_dev,
            })
        }
        StrategyConfig::Stochastic(d) => {
            let (oversold, overbought) = thresholds(config, d.oversold, d.overbought)?;
            StrategyConfig::Stochastic(StochasticParams {
                k_window: window(config, "k_window", d.k_window)?,
                d_window: window(config, "d_window", d.d_window)?,
                oversold,
                overbought,
            })
        }
    };
    Ok(strategy)
}

fn crossover(
    config: &dyn ConfigPort,
    defaults: CrossoverParams,
) -> Result<CrossoverParams, StratlabError> {
    Ok(CrossoverParams {
        short_window: window(config, "short_window", defaults.short_window)?,
        long_window: window(config, "long_window", defaults.long_window)?,
    })
}

fn window(config: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, StratlabError> {
    let value = config.get_int("strategy", key, default as i64);
    if value < 1 {
        return Err(invalid(
            "strategy",
            key,
            &format!("{} must be at least 1", key),
        ));
    }
    usize::try_from(value).map_err(|_| invalid("strategy", key, "window out of range"))
}

fn thresholds(
    config: &dyn ConfigPort,
    oversold_default: f64,
    overbought_default: f64,
) -> Result<(f64, f64), StratlabError> {
    let oversold = config.get_double("strategy", "oversold", oversold_default);
    let overbought = config.get_double("strategy", "overbought", overbought_default);

    for (key, value) in [("oversold", oversold), ("overbought", overbought)] {
        if !(0.0..=100.0).contains(&value) {
            return Err(invalid(
                "strategy",
                key,
                &format!("{} must be between 0 and 100", key),
            ));
        }
    }
    if oversold >= overbought {
        return Err(invalid(
            "strategy",
            "oversold",
            "oversold must be below overbought",
        ));
    }
    Ok((oversold, overbought))
}

fn invalid(section: &str, key: &str, reason: &str) -> StratlabError {
    StratlabError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
