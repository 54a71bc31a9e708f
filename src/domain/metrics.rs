//! Performance metrics over a simulated timeline, and their safe formatting.

use crate::domain::simulation::PortfolioTimeline;
use std::fmt;

pub(crate) const TRADING_DAYS_PER_YEAR: f64 = 252.0;

pub const NOT_AVAILABLE: &str = "N/A";

/// Report rows, in display order.
pub const METRIC_NAMES: [&str; 14] = [
    "Initial Value",
    "Final Value",
    "Total Return",
    "Annualized Return",
    "Annualized Volatility",
    "Sharpe Ratio",
    "Sortino Ratio",
    "Max Drawdown",
    "Calmar Ratio",
    "Win Rate",
    "Average Win",
    "Average Loss",
    "Profit Factor",
    "Trade Count",
];

/// Raw, unformatted statistics. Returns are fractions (0.1 = 10%) except
/// `win_rate`, which is already a percentage.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub initial_value: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub calmar_ratio: f64,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: f64,
    pub trade_count: usize,
}

impl Metrics {
    /// `None` when the timeline has fewer than two finite portfolio values
    /// or no finite strategy returns.
    pub fn compute(timeline: &PortfolioTimeline, risk_free_rate: f64) -> Option<Self> {
        let returns: Vec<f64> = timeline
            .strategy_returns()
            .into_iter()
            .filter(|r| r.is_finite())
            .collect();
        if returns.is_empty() {
            return None;
        }

        let values: Vec<f64> = timeline
            .portfolio_values()
            .into_iter()
            .filter(|v| v.is_finite())
            .collect();
        if values.len() < 2 {
            return None;
        }

        let initial_value = values[0];
        let final_value = values[values.len() - 1];

        let total_return = if initial_value > 0.0 {
            final_value / initial_value - 1.0
        } else {
            0.0
        };

        let period_count = timeline.len() as f64;
        let annualized_return = if period_count > 0.0 && total_return > -1.0 {
            (1.0 + total_return).powf(TRADING_DAYS_PER_YEAR / period_count) - 1.0
        } else {
            0.0
        };

        let annualized_volatility = sample_stddev(&returns)
            .filter(|sd| *sd > 0.0)
            .map(|sd| sd * TRADING_DAYS_PER_YEAR.sqrt())
            .unwrap_or(0.0);

        let excess_return = annualized_return - risk_free_rate;
        let sharpe_ratio = if annualized_volatility > 0.0 {
            excess_return / annualized_volatility
        } else {
            0.0
        };

        let losses: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
        let gains: Vec<f64> = returns.iter().copied().filter(|r| *r > 0.0).collect();

        let sortino_ratio = sample_stddev(&losses)
            .filter(|sd| *sd > 0.0)
            .map(|sd| excess_return / (sd * TRADING_DAYS_PER_YEAR.sqrt()))
            .unwrap_or(0.0);

        let max_drawdown = max_drawdown(&returns);
        let calmar_ratio = if max_drawdown != 0.0 {
            annualized_return / max_drawdown.abs()
        } else {
            0.0
        };

        let win_rate = gains.len() as f64 / returns.len() as f64 * 100.0;
        let avg_win = mean(&gains).unwrap_or(0.0);
        let avg_loss = mean(&losses).unwrap_or(0.0);

        let gain_sum: f64 = gains.iter().sum();
        let loss_sum: f64 = losses.iter().sum();
        let profit_factor = if loss_sum != 0.0 {
            (gain_sum / loss_sum).abs()
        } else {
            0.0
        };

        Some(Metrics {
            initial_value,
            final_value,
            total_return,
            annualized_return,
            annualized_volatility,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            calmar_ratio,
            win_rate,
            avg_win,
            avg_loss,
            profit_factor,
            trade_count: trade_count(timeline),
        })
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator); undefined below two points.
pub(crate) fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    let sd = var.sqrt();
    sd.is_finite().then_some(sd)
}

/// Worst peak-to-trough decline of the compounded return path, in [-1, 0].
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut cumulative = 1.0_f64;
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;

    for r in returns.iter().filter(|r| r.is_finite()) {
        cumulative *= 1.0 + r;
        peak = peak.max(cumulative);
        let dd = (cumulative - peak) / peak;
        if dd.is_finite() && dd < worst {
            worst = dd;
        }
    }
    worst.clamp(-1.0, 0.0)
}

/// Periods whose position differs from the previous period's, counting only
/// pairs where both positions are defined.
pub fn trade_count(timeline: &PortfolioTimeline) -> usize {
    timeline
        .rows
        .windows(2)
        .filter(|w| matches!((w[0].position, w[1].position), (Some(a), Some(b)) if a != b))
        .count()
}

/// A formatted metric or the unavailable sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricValue {
    Value(String),
    NotAvailable,
}

impl MetricValue {
    pub fn is_available(&self) -> bool {
        matches!(self, MetricValue::Value(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            MetricValue::Value(s) => s,
            MetricValue::NotAvailable => NOT_AVAILABLE,
        }
    }

    /// Recover the displayed number (grouping commas and `%` stripped).
    pub fn parse_number(&self) -> Option<f64> {
        match self {
            MetricValue::Value(s) => s.trim_end_matches('%').replace(',', "").parse().ok(),
            MetricValue::NotAvailable => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// How a number is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricFormat {
    /// `12,345.67`
    Money,
    /// Fraction rendered as `12.34%`.
    Percent,
    /// `1.23`
    Ratio,
    /// Already a percentage, one decimal: `55.0%`.
    WinRate,
    /// `42`
    Count,
}

/// Format `value`, or return the sentinel when it is absent or non-finite.
pub fn safe_format(value: Option<f64>, format: MetricFormat) -> MetricValue {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return MetricValue::NotAvailable;
    };
    let text = match format {
        MetricFormat::Money => group_thousands(v),
        MetricFormat::Percent => format!("{:.2}%", v * 100.0),
        MetricFormat::Ratio => format!("{:.2}", v),
        MetricFormat::WinRate => format!("{:.1}%", v),
        MetricFormat::Count => format!("{:.0}", v),
    };
    MetricValue::Value(text)
}

fn group_thousands(v: f64) -> String {
    let fixed = format!("{:.2}", v.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if v < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac_part}")
}

/// Ordered metric name → formatted value. Empty when metrics are unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetricsReport {
    entries: Vec<(&'static str, MetricValue)>,
}

impl MetricsReport {
    pub fn compute(timeline: &PortfolioTimeline, risk_free_rate: f64) -> Self {
        Metrics::compute(timeline, risk_free_rate)
            .map(|m| Self::from_metrics(&m))
            .unwrap_or_default()
    }

    pub fn from_metrics(m: &Metrics) -> Self {
        use MetricFormat::*;
        let cells = [
            (m.initial_value, Money),
            (m.final_value, Money),
            (m.total_return, Percent),
            (m.annualized_return, Percent),
            (m.annualized_volatility, Percent),
            (m.sharpe_ratio, Ratio),
            (m.sortino_ratio, Ratio),
            (m.max_drawdown, Percent),
            (m.calmar_ratio, Ratio),
            (m.win_rate, WinRate),
            (m.avg_win, Percent),
            (m.avg_loss, Percent),
            (m.profit_factor, Ratio),
            (m.trade_count as f64, Count),
        ];
        let entries = METRIC_NAMES
            .iter()
            .zip(cells)
            .map(|(name, (value, format))| (*name, safe_format(Some(value), format)))
            .collect();
        Self { entries }
    }

    pub fn is_available(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &MetricValue)> {
        self.entries.iter().map(|(n, v)| (*n, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
