//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters
//! - `IndicatorSeries`: A time series of indicator values
//! - `IndicatorColumn`: A named, flattened column attached to a strategy run
//!
//! Every `calculate_*` function returns exactly one point per input bar, so
//! series can be zipped with the price table by position. Points inside the
//! warmup window (or whose value came out non-finite) are marked invalid.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stochastic;

pub use bollinger::calculate_bollinger;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use stochastic::calculate_stochastic;

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Stochastic {
        k: f64,
        d: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Stochastic {
        k_period: usize,
        d_period: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Project one field out of every point. Invalid points and non-finite
    /// values become `None`.
    pub fn column<F>(&self, pick: F) -> Vec<Option<f64>>
    where
        F: Fn(&IndicatorValue) -> Option<f64>,
    {
        self.values
            .iter()
            .map(|p| {
                if !p.valid {
                    return None;
                }
                pick(&p.value).filter(|v| v.is_finite())
            })
            .collect()
    }

    /// Values of a single-output indicator (SMA, EMA, RSI).
    pub fn simple_values(&self) -> Vec<Option<f64>> {
        self.column(|v| match v {
            IndicatorValue::Simple(x) => Some(*x),
            _ => None,
        })
    }
}

/// A named indicator column as carried on a strategy run.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl IndicatorColumn {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Exponentially weighted recursion seeded with the first observation and
/// never adjusted for the start of the series:
/// `out[0] = x[0]`, `out[i] = alpha * x[i] + (1 - alpha) * out[i-1]`.
///
/// Leading non-finite inputs are skipped; the recursion starts at the first
/// finite value and every earlier slot is NaN.
pub(crate) fn ewm(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    let mut prev: Option<f64> = None;
    for (i, &x) in values.iter().enumerate() {
        let next = match prev {
            None if x.is_finite() => x,
            None => continue,
            Some(p) if x.is_finite() => alpha * x + (1.0 - alpha) * p,
            Some(p) => p,
        };
        out[i] = next;
        prev = Some(next);
    }
    out
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Stochastic { k_period, d_period } => {
                write!(f, "STOCHASTIC({},{})", k_period, d_period)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}
