//! Strategy configuration, signal generation and the strategy registry.
//!
//! Strategies form a closed set of variants. Each carries its own typed
//! parameters and turns a price series into one signal per bar plus the
//! indicator columns it computed along the way.

use crate::domain::error::StratlabError;
use crate::domain::indicator::{
    calculate_bollinger, calculate_ema, calculate_macd, calculate_rsi, calculate_sma,
    calculate_stochastic, IndicatorColumn, IndicatorType, IndicatorValue,
};
use crate::domain::price_series::PriceSeries;
use crate::domain::signal::{hold_last_signal, Signal};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossoverParams {
    pub short_window: usize,
    pub long_window: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiParams {
    pub window: usize,
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self {
            window: 14,
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerParams {
    pub window: usize,
    pub std_dev: f64,
}

impl Default for BollingerParams {
    fn default() -> Self {
        Self {
            window: 20,
            std_dev: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochasticParams {
    pub k_window: usize,
    pub d_window: usize,
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for StochasticParams {
    fn default() -> Self {
        Self {
            k_window: 14,
            d_window: 3,
            oversold: 20.0,
            overbought: 80.0,
        }
    }
}

/// Identity of a strategy, independent of its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    BuyAndHold,
    SmaCrossover,
    EmaCrossover,
    Rsi,
    Macd,
    BollingerBands,
    Stochastic,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 7] = [
        StrategyKind::BuyAndHold,
        StrategyKind::SmaCrossover,
        StrategyKind::EmaCrossover,
        StrategyKind::Rsi,
        StrategyKind::Macd,
        StrategyKind::BollingerBands,
        StrategyKind::Stochastic,
    ];

    /// Display name used as the registry key and in reports.
    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::BuyAndHold => "Buy and Hold",
            StrategyKind::SmaCrossover => "SMA Crossover",
            StrategyKind::EmaCrossover => "EMA Crossover",
            StrategyKind::Rsi => "RSI",
            StrategyKind::Macd => "MACD",
            StrategyKind::BollingerBands => "Bollinger Bands",
            StrategyKind::Stochastic => "Stochastic",
        }
    }

    /// Short identifier accepted on the command line and in config files.
    pub fn key(self) -> &'static str {
        match self {
            StrategyKind::BuyAndHold => "buy_and_hold",
            StrategyKind::SmaCrossover => "sma",
            StrategyKind::EmaCrossover => "ema",
            StrategyKind::Rsi => "rsi",
            StrategyKind::Macd => "macd",
            StrategyKind::BollingerBands => "bollinger",
            StrategyKind::Stochastic => "stochastic",
        }
    }

    /// Resolve a display name or key, ignoring case, spaces, dashes and
    /// underscores.
    pub fn parse(input: &str) -> Option<Self> {
        let wanted = normalize(input);
        Self::ALL
            .into_iter()
            .find(|k| normalize(k.name()) == wanted || normalize(k.key()) == wanted)
    }

    pub fn default_config(self) -> StrategyConfig {
        match self {
            StrategyKind::BuyAndHold => StrategyConfig::BuyAndHold,
            StrategyKind::SmaCrossover => StrategyConfig::SmaCrossover(CrossoverParams {
                short_window: 20,
                long_window: 50,
            }),
            StrategyKind::EmaCrossover => StrategyConfig::EmaCrossover(CrossoverParams {
                short_window: 12,
                long_window: 26,
            }),
            StrategyKind::Rsi => StrategyConfig::Rsi(RsiParams::default()),
            StrategyKind::Macd => StrategyConfig::Macd(MacdParams::default()),
            StrategyKind::BollingerBands => {
                StrategyConfig::BollingerBands(BollingerParams::default())
            }
            StrategyKind::Stochastic => StrategyConfig::Stochastic(StochasticParams::default()),
        }
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// A strategy together with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyConfig {
    BuyAndHold,
    SmaCrossover(CrossoverParams),
    EmaCrossover(CrossoverParams),
    Rsi(RsiParams),
    Macd(MacdParams),
    BollingerBands(BollingerParams),
    Stochastic(StochasticParams),
}

/// Signal column plus the indicator columns that produced it, both aligned
/// with the input series.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalOutput {
    pub signals: Vec<Signal>,
    pub indicators: Vec<IndicatorColumn>,
}

impl StrategyConfig {
    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategyConfig::BuyAndHold => StrategyKind::BuyAndHold,
            StrategyConfig::SmaCrossover(_) => StrategyKind::SmaCrossover,
            StrategyConfig::EmaCrossover(_) => StrategyKind::EmaCrossover,
            StrategyConfig::Rsi(_) => StrategyKind::Rsi,
            StrategyConfig::Macd(_) => StrategyKind::Macd,
            StrategyConfig::BollingerBands(_) => StrategyKind::BollingerBands,
            StrategyConfig::Stochastic(_) => StrategyKind::Stochastic,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Indicators this strategy needs, in the order their columns appear.
    pub fn indicator_types(&self) -> Vec<IndicatorType> {
        match *self {
            StrategyConfig::BuyAndHold => vec![],
            StrategyConfig::SmaCrossover(p) => {
                vec![IndicatorType::Sma(p.short_window), IndicatorType::Sma(p.long_window)]
            }
            StrategyConfig::EmaCrossover(p) => {
                vec![IndicatorType::Ema(p.short_window), IndicatorType::Ema(p.long_window)]
            }
            StrategyConfig::Rsi(p) => vec![IndicatorType::Rsi(p.window)],
            StrategyConfig::Macd(p) => vec![IndicatorType::Macd {
                fast: p.fast,
                slow: p.slow,
                signal: p.signal,
            }],
            StrategyConfig::BollingerBands(p) => vec![IndicatorType::Bollinger {
                period: p.window,
                stddev_mult_x100: (p.std_dev * 100.0).round().max(0.0) as u32,
            }],
            StrategyConfig::Stochastic(p) => vec![IndicatorType::Stochastic {
                k_period: p.k_window,
                d_period: p.d_window,
            }],
        }
    }

    /// Map the series to one signal per bar. Bars whose indicators are still
    /// warming up yield `Neutral`; this never fails.
    pub fn generate_signal(&self, series: &PriceSeries) -> SignalOutput {
        let bars = series.bars();
        match *self {
            StrategyConfig::BuyAndHold => SignalOutput {
                signals: vec![Signal::Long; bars.len()],
                indicators: vec![],
            },
            StrategyConfig::SmaCrossover(p) => {
                let short = calculate_sma(bars, p.short_window).simple_values();
                let long = calculate_sma(bars, p.long_window).simple_values();
                crossover(short, long, "SMA_Short", "SMA_Long")
            }
            StrategyConfig::EmaCrossover(p) => {
                let short = calculate_ema(bars, p.short_window).simple_values();
                let long = calculate_ema(bars, p.long_window).simple_values();
                crossover(short, long, "EMA_Short", "EMA_Long")
            }
            StrategyConfig::Rsi(p) => {
                let rsi = calculate_rsi(bars, p.window).simple_values();
                let triggers: Vec<Signal> = rsi
                    .iter()
                    .map(|v| match *v {
                        Some(r) if r < p.oversold => Signal::Long,
                        Some(r) if r > p.overbought => Signal::Short,
                        _ => Signal::Neutral,
                    })
                    .collect();
                SignalOutput {
                    signals: hold_last_signal(&triggers),
                    indicators: vec![IndicatorColumn::new("RSI", rsi)],
                }
            }
            StrategyConfig::Macd(p) => {
                let macd = calculate_macd(bars, p.fast, p.slow, p.signal);
                let line = macd.column(|v| match v {
                    IndicatorValue::Macd { line, .. } => Some(*line),
                    _ => None,
                });
                let signal = macd.column(|v| match v {
                    IndicatorValue::Macd { signal, .. } => Some(*signal),
                    _ => None,
                });
                let histogram = macd.column(|v| match v {
                    IndicatorValue::Macd { histogram, .. } => Some(*histogram),
                    _ => None,
                });
                let signals = line
                    .iter()
                    .zip(&signal)
                    .map(|(&l, &s)| Signal::from_comparison(l, s))
                    .collect();
                SignalOutput {
                    signals,
                    indicators: vec![
                        IndicatorColumn::new("MACD", line),
                        IndicatorColumn::new("MACD_Signal", signal),
                        IndicatorColumn::new("MACD_Hist", histogram),
                    ],
                }
            }
            StrategyConfig::BollingerBands(p) => {
                let bands = calculate_bollinger(bars, p.window, p.std_dev);
                let upper = bands.column(|v| match v {
                    IndicatorValue::Bollinger { upper, .. } => Some(*upper),
                    _ => None,
                });
                let lower = bands.column(|v| match v {
                    IndicatorValue::Bollinger { lower, .. } => Some(*lower),
                    _ => None,
                });
                let middle = bands.column(|v| match v {
                    IndicatorValue::Bollinger { middle, .. } => Some(*middle),
                    _ => None,
                });
                // When the bands collapse, close touches both; the sell side wins.
                let triggers: Vec<Signal> = bars
                    .iter()
                    .enumerate()
                    .map(|(i, bar)| match (upper[i], lower[i]) {
                        (Some(hi), _) if bar.close >= hi => Signal::Short,
                        (_, Some(lo)) if bar.close <= lo => Signal::Long,
                        _ => Signal::Neutral,
                    })
                    .collect();
                SignalOutput {
                    signals: hold_last_signal(&triggers),
                    indicators: vec![
                        IndicatorColumn::new("BB_High", upper),
                        IndicatorColumn::new("BB_Low", lower),
                        IndicatorColumn::new("BB_Mid", middle),
                    ],
                }
            }
            StrategyConfig::Stochastic(p) => {
                let stoch = calculate_stochastic(bars, p.k_window, p.d_window);
                let k = stoch.column(|v| match v {
                    IndicatorValue::Stochastic { k, .. } => Some(*k),
                    _ => None,
                });
                let d = stoch.column(|v| match v {
                    IndicatorValue::Stochastic { d, .. } => Some(*d),
                    _ => None,
                });
                let triggers: Vec<Signal> = k
                    .iter()
                    .zip(&d)
                    .map(|(&k, &d)| match (k, d) {
                        (Some(k), Some(d)) if k > d && k < p.oversold => Signal::Long,
                        (Some(k), Some(d)) if k < d && k > p.overbought => Signal::Short,
                        _ => Signal::Neutral,
                    })
                    .collect();
                SignalOutput {
                    signals: hold_last_signal(&triggers),
                    indicators: vec![
                        IndicatorColumn::new("Stoch_K", k),
                        IndicatorColumn::new("Stoch_D", d),
                    ],
                }
            }
        }
    }
}

fn crossover(
    short: Vec<Option<f64>>,
    long: Vec<Option<f64>>,
    short_name: &str,
    long_name: &str,
) -> SignalOutput {
    let signals = short
        .iter()
        .zip(&long)
        .map(|(&s, &l)| Signal::from_comparison(s, l))
        .collect();
    SignalOutput {
        signals,
        indicators: vec![
            IndicatorColumn::new(short_name, short),
            IndicatorColumn::new(long_name, long),
        ],
    }
}

impl fmt::Display for StrategyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyConfig::BuyAndHold => write!(f, "{}", self.name()),
            StrategyConfig::SmaCrossover(p) | StrategyConfig::EmaCrossover(p) => write!(
                f,
                "{} (short={}, long={})",
                self.name(),
                p.short_window,
                p.long_window
            ),
            StrategyConfig::Rsi(p) => write!(
                f,
                "RSI (window={}, oversold={}, overbought={})",
                p.window, p.oversold, p.overbought
            ),
            StrategyConfig::Macd(p) => write!(
                f,
                "MACD (fast={}, slow={}, signal={})",
                p.fast, p.slow, p.signal
            ),
            StrategyConfig::BollingerBands(p) => write!(
                f,
                "Bollinger Bands (window={}, std_dev={})",
                p.window, p.std_dev
            ),
            StrategyConfig::Stochastic(p) => write!(
                f,
                "Stochastic (k={}, d={}, oversold={}, overbought={})",
                p.k_window, p.d_window, p.oversold, p.overbought
            ),
        }
    }
}

/// Named strategies in insertion order. Registering a strategy whose name is
/// already present replaces it in place.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    entries: Vec<StrategyConfig>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every strategy with its default parameters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in StrategyKind::ALL {
            registry.register(kind.default_config());
        }
        registry
    }

    pub fn register(&mut self, config: StrategyConfig) {
        match self.entries.iter_mut().find(|c| c.kind() == config.kind()) {
            Some(slot) => *slot = config,
            None => self.entries.push(config),
        }
    }

    pub fn get(&self, name: &str) -> Option<&StrategyConfig> {
        let kind = StrategyKind::parse(name)?;
        self.entries.iter().find(|c| c.kind() == kind)
    }

    pub fn lookup(&self, name: &str) -> Result<&StrategyConfig, StratlabError> {
        self.get(name).ok_or_else(|| StratlabError::UnknownStrategy {
            name: name.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &StrategyConfig> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(StrategyConfig::name).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
