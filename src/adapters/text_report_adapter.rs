//! Plain-text report adapter implementing ReportPort.
//!
//! Renders the instrument header, metric table, monthly returns grid,
//! benchmark comparison and recent trades, then prints to stdout.

use crate::domain::analytics::{
    benchmark_curve, drawdown_series, monthly_returns, rolling_sharpe, rolling_volatility,
    trade_markers, MonthlyReturn, TradeSide, DEFAULT_SHARPE_WINDOW, DEFAULT_VOLATILITY_WINDOW,
};
use crate::domain::backtest::StrategyRun;
use crate::domain::comparison::ComparisonTable;
use crate::domain::error::StratlabError;
use crate::domain::metrics::{safe_format, MetricFormat, MetricsReport, NOT_AVAILABLE};
use crate::domain::price_series::PriceSeries;
use crate::ports::report_port::ReportPort;
use std::collections::BTreeMap;
use std::fmt::Write as _;

const RECENT_TRADES: usize = 10;
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub struct TextReportAdapter {
    risk_free_rate: f64,
}

impl TextReportAdapter {
    pub fn new(risk_free_rate: f64) -> Self {
        Self { risk_free_rate }
    }

    pub fn render_run(
        &self,
        series: &PriceSeries,
        run: &StrategyRun,
        metrics: &MetricsReport,
    ) -> String {
        let mut out = String::new();
        render_header(&mut out, series);
        let _ = writeln!(out, "Strategy: {}", run.config);
        let _ = writeln!(out);

        if !metrics.is_available() {
            let _ = writeln!(out, "Metrics: {}", NOT_AVAILABLE);
            return out;
        }

        let _ = writeln!(out, "Performance");
        for (name, value) in metrics.iter() {
            let _ = writeln!(out, "  {:<24}{:>16}", name, value);
        }
        let _ = writeln!(out);

        self.render_risk(&mut out, run);
        render_monthly_grid(&mut out, &monthly_returns(&run.timeline));
        render_trades(&mut out, run);
        out
    }

    fn render_risk(&self, out: &mut String, run: &StrategyRun) {
        let timeline = &run.timeline;
        let benchmark = benchmark_curve(timeline)
            .last()
            .and_then(|p| p.value);
        let worst_drawdown = drawdown_series(timeline)
            .iter()
            .filter_map(|p| p.value)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))));
        let latest_vol = rolling_volatility(timeline, DEFAULT_VOLATILITY_WINDOW)
            .last()
            .and_then(|p| p.value);
        let latest_sharpe = rolling_sharpe(timeline, DEFAULT_SHARPE_WINDOW, self.risk_free_rate)
            .last()
            .and_then(|p| p.value);

        let _ = writeln!(out, "Benchmark & risk");
        let _ = writeln!(
            out,
            "  {:<24}{:>16}",
            "Strategy Final Value",
            safe_format(timeline.final_value(), MetricFormat::Money)
        );
        let _ = writeln!(
            out,
            "  {:<24}{:>16}",
            "Buy & Hold Final Value",
            safe_format(benchmark, MetricFormat::Money)
        );
        let _ = writeln!(
            out,
            "  {:<24}{:>16}",
            "Worst Drawdown",
            safe_format(worst_drawdown.map(|v| v / 100.0), MetricFormat::Percent)
        );
        let _ = writeln!(
            out,
            "  {:<24}{:>16}",
            format!("Volatility ({}d)", DEFAULT_VOLATILITY_WINDOW),
            safe_format(latest_vol.map(|v| v / 100.0), MetricFormat::Percent)
        );
        let _ = writeln!(
            out,
            "  {:<24}{:>16}",
            format!("Sharpe ({}d)", DEFAULT_SHARPE_WINDOW),
            safe_format(latest_sharpe, MetricFormat::Ratio)
        );
        let _ = writeln!(out);
    }

    pub fn render_comparison(&self, series: &PriceSeries, table: &ComparisonTable) -> String {
        let mut out = String::new();
        render_header(&mut out, series);

        if table.is_empty() {
            let _ = writeln!(out, "No strategy produced metrics.");
        } else {
            let width = table
                .rows
                .iter()
                .map(|r| r.strategy.len())
                .max()
                .unwrap_or(0)
                .max("Strategy".len())
                + 2;

            let _ = write!(out, "{:<width$}", "Strategy");
            for column in &table.columns {
                let _ = write!(out, "{:>col$}", column, col = column.len().max(12) + 2);
            }
            let _ = writeln!(out);

            for row in &table.rows {
                let _ = write!(out, "{:<width$}", row.strategy);
                for column in &table.columns {
                    let cell = row
                        .report
                        .get(column)
                        .map_or(NOT_AVAILABLE, |v| v.as_str());
                    let _ = write!(out, "{:>col$}", cell, col = column.len().max(12) + 2);
                }
                let _ = writeln!(out);
            }
        }

        if !table.failures.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Excluded");
            for (name, reason) in &table.failures {
                let _ = writeln!(out, "  {}: {}", name, reason);
            }
        }
        out
    }
}

fn render_header(out: &mut String, series: &PriceSeries) {
    let info = series.info();
    let title = match &info.name {
        Some(name) => format!("{} ({})", name, series.symbol()),
        None => series.symbol().to_string(),
    };
    let _ = writeln!(out, "{}", title);

    let mut details = Vec::new();
    if let Some(sector) = &info.sector {
        details.push(format!("Sector: {}", sector));
    }
    if let Some(industry) = &info.industry {
        details.push(format!("Industry: {}", industry));
    }
    if let Some(exchange) = &info.exchange {
        details.push(format!("Exchange: {}", exchange));
    }
    if let Some(currency) = &info.currency {
        details.push(format!("Currency: {}", currency));
    }
    if info.market_cap.is_some() {
        details.push(format!("Market cap: {}", info.format_market_cap()));
    }
    if !details.is_empty() {
        let _ = writeln!(out, "{}", details.join(" | "));
    }

    if let (Some(first), Some(last)) = (series.first_date(), series.last_date()) {
        let _ = writeln!(out, "Period: {} to {} ({} bars)", first, last, series.len());
    }
    let _ = writeln!(out);
}

fn render_monthly_grid(out: &mut String, returns: &[MonthlyReturn]) {
    if returns.is_empty() {
        return;
    }

    let mut years: BTreeMap<i32, [Option<f64>; 12]> = BTreeMap::new();
    for r in returns {
        let entry = years.entry(r.year).or_insert([None; 12]);
        entry[(r.month - 1) as usize] = Some(r.return_pct);
    }

    let _ = writeln!(out, "Monthly returns (%)");
    let _ = write!(out, "  {:<6}", "Year");
    for m in MONTHS {
        let _ = write!(out, "{:>8}", m);
    }
    let _ = writeln!(out);

    for (year, months) in &years {
        let _ = write!(out, "  {:<6}", year);
        for value in months {
            match value {
                Some(v) if v.is_finite() => {
                    let _ = write!(out, "{:>8.2}", v);
                }
                _ => {
                    let _ = write!(out, "{:>8}", "");
                }
            }
        }
        let _ = writeln!(out);
    }
    let _ = writeln!(out);
}

fn render_trades(out: &mut String, run: &StrategyRun) {
    let markers = trade_markers(&run.timeline);
    if markers.is_empty() {
        let _ = writeln!(out, "No position changes.");
        return;
    }

    let skip = markers.len().saturating_sub(RECENT_TRADES);
    let _ = writeln!(
        out,
        "Position changes ({} total, last {} shown)",
        markers.len(),
        markers.len() - skip
    );
    for marker in &markers[skip..] {
        let side = match marker.side {
            TradeSide::Buy => "BUY ",
            TradeSide::Sell => "SELL",
        };
        let _ = writeln!(
            out,
            "  {}  {}  {}",
            marker.date,
            side,
            safe_format(Some(marker.close), MetricFormat::Money)
        );
    }
}

impl ReportPort for TextReportAdapter {
    fn write_run(
        &self,
        series: &PriceSeries,
        run: &StrategyRun,
        metrics: &MetricsReport,
    ) -> Result<(), StratlabError> {
        print!("{}", self.render_run(series, run, metrics));
        Ok(())
    }

    fn write_comparison(
        &self,
        series: &PriceSeries,
        table: &ComparisonTable,
    ) -> Result<(), StratlabError> {
        print!("{}", self.render_comparison(series, table));
        Ok(())
    }
}
