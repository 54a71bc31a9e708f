//! Side-by-side comparison of several strategies on one series.

use crate::domain::backtest::{run_strategy, StrategyRun};
use crate::domain::error::StratlabError;
use crate::domain::metrics::{MetricValue, MetricsReport, METRIC_NAMES};
use crate::domain::price_series::PriceSeries;
use crate::domain::simulation::PortfolioTimeline;
use crate::domain::strategy::StrategyConfig;
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use tracing::{info, warn};

/// Strategy rows × metric columns, in insertion order. Strategies that
/// failed, or whose metrics are unavailable, are listed in `failures`
/// and left out of `rows`.
#[derive(Debug, Clone, Default)]
pub struct ComparisonTable {
    pub columns: Vec<&'static str>,
    pub rows: Vec<ComparisonRow>,
    pub failures: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct ComparisonRow {
    pub strategy: String,
    pub report: MetricsReport,
}

impl ComparisonTable {
    pub fn strategy_names(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.strategy.as_str()).collect()
    }

    pub fn cell(&self, strategy: &str, metric: &str) -> Option<&MetricValue> {
        self.rows
            .iter()
            .find(|r| r.strategy == strategy)
            .and_then(|r| r.report.get(metric))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Compute metrics for every entry. A failed entry is logged and recorded
/// against its own name without affecting the others.
pub fn compare_strategies<I>(entries: I, risk_free_rate: f64) -> ComparisonTable
where
    I: IntoIterator<Item = (String, Result<PortfolioTimeline, StratlabError>)>,
{
    let mut table = ComparisonTable {
        columns: METRIC_NAMES.to_vec(),
        ..ComparisonTable::default()
    };

    for (name, outcome) in entries {
        let timeline = match outcome {
            Ok(timeline) => timeline,
            Err(e) => {
                warn!(strategy = %name, error = %e, "strategy failed, excluded from comparison");
                table.failures.push((name, e.to_string()));
                continue;
            }
        };

        let report = MetricsReport::compute(&timeline, risk_free_rate);
        if !report.is_available() {
            warn!(strategy = %name, rows = timeline.len(), "metrics unavailable, excluded from comparison");
            table
                .failures
                .push((name, "metrics unavailable".to_string()));
            continue;
        }
        table.rows.push(ComparisonRow {
            strategy: name,
            report,
        });
    }

    info!(
        compared = table.rows.len(),
        failed = table.failures.len(),
        "comparison complete"
    );
    table
}

/// Run each configuration against the same series in parallel. Results come
/// back in input order; a panic inside one strategy becomes that strategy's
/// `StrategyFailed` error.
pub fn run_strategies(
    series: &PriceSeries,
    configs: &[StrategyConfig],
    initial_capital: f64,
) -> Vec<(String, Result<StrategyRun, StratlabError>)> {
    configs
        .par_iter()
        .map(|config| {
            let name = config.name().to_string();
            let outcome = run_isolated(&name, || run_strategy(series, config, initial_capital));
            (name, outcome)
        })
        .collect()
}

/// Run `job`, turning a panic into `StrategyFailed` for `name`.
pub(crate) fn run_isolated<T, F>(name: &str, job: F) -> Result<T, StratlabError>
where
    F: FnOnce() -> Result<T, StratlabError>,
{
    panic::catch_unwind(AssertUnwindSafe(job)).unwrap_or_else(|payload| {
        let reason = panic_message(payload.as_ref());
        warn!(strategy = name, reason = %reason, "strategy panicked");
        Err(StratlabError::StrategyFailed {
            name: name.to_string(),
            reason,
        })
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

/// Run every configuration and tabulate the results.
pub fn run_comparison(
    series: &PriceSeries,
    configs: &[StrategyConfig],
    initial_capital: f64,
    risk_free_rate: f64,
) -> (Vec<StrategyRun>, ComparisonTable) {
    let results = run_strategies(series, configs, initial_capital);

    let mut runs = Vec::with_capacity(results.len());
    let entries: Vec<(String, Result<PortfolioTimeline, StratlabError>)> = results
        .into_iter()
        .map(|(name, outcome)| {
            let timeline = outcome.map(|run| {
                let timeline = run.timeline.clone();
                runs.push(run);
                timeline
            });
            (name, timeline)
        })
        .collect();

    (runs, compare_strategies(entries, risk_free_rate))
}
