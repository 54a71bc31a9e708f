//! Derived series over a finished timeline: drawdown curve, monthly returns,
//! rolling risk, benchmark and trade markers.

use crate::domain::metrics::{sample_stddev, TRADING_DAYS_PER_YEAR};
use crate::domain::simulation::PortfolioTimeline;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

pub const DEFAULT_VOLATILITY_WINDOW: usize = 30;
pub const DEFAULT_SHARPE_WINDOW: usize = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct DatedValue {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyReturn {
    pub year: i32,
    pub month: u32,
    /// Compounded strategy return over the month, in percent.
    pub return_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeMarker {
    pub date: NaiveDate,
    pub close: f64,
    pub side: TradeSide,
}

/// Percent below the running peak of the compounded strategy returns.
pub fn drawdown_series(timeline: &PortfolioTimeline) -> Vec<DatedValue> {
    let mut cumulative = 1.0_f64;
    let mut peak = f64::NEG_INFINITY;
    timeline
        .rows
        .iter()
        .map(|row| {
            cumulative *= 1.0 + row.strategy_return;
            peak = peak.max(cumulative);
            let dd = (cumulative - peak) / peak * 100.0;
            DatedValue {
                date: row.date,
                value: dd.is_finite().then_some(dd),
            }
        })
        .collect()
}

/// Strategy returns compounded within each calendar month, oldest first.
pub fn monthly_returns(timeline: &PortfolioTimeline) -> Vec<MonthlyReturn> {
    let mut months: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for row in &timeline.rows {
        let growth = months
            .entry((row.date.year(), row.date.month()))
            .or_insert(1.0);
        *growth *= 1.0 + row.strategy_return;
    }

    months
        .into_iter()
        .map(|((year, month), growth)| MonthlyReturn {
            year,
            month,
            return_pct: (growth - 1.0) * 100.0,
        })
        .collect()
}

/// Annualized rolling volatility of strategy returns, in percent. Undefined
/// until a full window is available.
pub fn rolling_volatility(timeline: &PortfolioTimeline, window: usize) -> Vec<DatedValue> {
    rolling(timeline, window, |w| {
        sample_stddev(w).map(|sd| sd * TRADING_DAYS_PER_YEAR.sqrt() * 100.0)
    })
}

/// Rolling Sharpe ratio: annualized mean return minus `risk_free_rate`, over
/// annualized volatility, per full window.
pub fn rolling_sharpe(
    timeline: &PortfolioTimeline,
    window: usize,
    risk_free_rate: f64,
) -> Vec<DatedValue> {
    rolling(timeline, window, |w| {
        let annual_return = w.iter().sum::<f64>() / w.len() as f64 * TRADING_DAYS_PER_YEAR;
        let annual_vol = sample_stddev(w)? * TRADING_DAYS_PER_YEAR.sqrt();
        let sharpe = (annual_return - risk_free_rate) / annual_vol;
        sharpe.is_finite().then_some(sharpe)
    })
}

fn rolling<F>(timeline: &PortfolioTimeline, window: usize, stat: F) -> Vec<DatedValue>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let returns = timeline.strategy_returns();
    timeline
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let value = if window > 0 && i + 1 >= window {
                stat(&returns[i + 1 - window..=i])
            } else {
                None
            };
            DatedValue {
                date: row.date,
                value,
            }
        })
        .collect()
}

/// Buy-and-hold value path: `initial_capital * Close[t] / Close[0]`.
pub fn benchmark_curve(timeline: &PortfolioTimeline) -> Vec<DatedValue> {
    let first_close = timeline.rows.first().map(|r| r.close);
    timeline
        .rows
        .iter()
        .map(|row| {
            let value = first_close
                .map(|c0| timeline.initial_capital * row.close / c0)
                .filter(|v| v.is_finite());
            DatedValue {
                date: row.date,
                value,
            }
        })
        .collect()
}

/// Points where the held position rises (buy) or falls (sell). Rows whose
/// own or previous position is undefined are skipped.
pub fn trade_markers(timeline: &PortfolioTimeline) -> Vec<TradeMarker> {
    timeline
        .rows
        .windows(2)
        .filter_map(|w| {
            let (prev, curr) = (w[0].position?, w[1].position?);
            let side = match curr.as_i8().cmp(&prev.as_i8()) {
                std::cmp::Ordering::Greater => TradeSide::Buy,
                std::cmp::Ordering::Less => TradeSide::Sell,
                std::cmp::Ordering::Equal => return None,
            };
            Some(TradeMarker {
                date: w[1].date,
                close: w[1].close,
                side,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use crate::domain::price_series::PriceSeries;
    use crate::domain::signal::Signal::{self, *};
    use crate::domain::simulation::simulate;
    use approx::assert_relative_eq;

    fn timeline(dates: &[NaiveDate], prices: &[f64], signals: &[Signal]) -> PortfolioTimeline {
        let bars = dates
            .iter()
            .zip(prices)
            .map(|(&d, &c)| OhlcvBar::from_close(d, c))
            .collect();
        let series = PriceSeries::new("AN", bars).unwrap();
        simulate(&series, signals, 1000.0).unwrap()
    }

    fn days(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    #[test]
    fn drawdown_tracks_peak() {
        let t = timeline(&days(4), &[100.0, 110.0, 88.0, 99.0], &[Long; 4]);
        let dd = drawdown_series(&t);

        assert_eq!(dd[0].value, Some(0.0));
        assert_eq!(dd[1].value, Some(0.0));
        assert_relative_eq!(dd[2].value.unwrap(), -20.0, epsilon = 1e-9);
        assert_relative_eq!(dd[3].value.unwrap(), -10.0, epsilon = 1e-9);
    }

    #[test]
    fn monthly_returns_compound_within_month() {
        let dates = [
            NaiveDate::from_ymd_opt(2024, 1, 30).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 2).unwrap(),
        ];
        let t = timeline(&dates, &[100.0, 110.0, 121.0, 108.9], &[Long; 4]);
        let months = monthly_returns(&t);

        assert_eq!(months.len(), 2);
        assert_eq!((months[0].year, months[0].month), (2024, 1));
        assert_relative_eq!(months[0].return_pct, 10.0, epsilon = 1e-9);
        // +10% then -10%
        assert_relative_eq!(months[1].return_pct, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn monthly_returns_empty() {
        let t = PortfolioTimeline {
            initial_capital: 1.0,
            rows: vec![],
        };
        assert!(monthly_returns(&t).is_empty());
    }

    #[test]
    fn rolling_volatility_needs_full_window() {
        let prices = [100.0, 101.0, 99.0, 102.0, 100.0];
        let t = timeline(&days(5), &prices, &[Long; 5]);
        let vol = rolling_volatility(&t, 3);

        assert!(vol[0].value.is_none());
        assert!(vol[1].value.is_none());
        let w = &t.strategy_returns()[0..3];
        let mean = w.iter().sum::<f64>() / 3.0;
        let sd = (w.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / 2.0).sqrt();
        assert_relative_eq!(vol[2].value.unwrap(), sd * 252f64.sqrt() * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn full_window_volatility_matches_metrics() {
        let prices = [100.0, 103.0, 98.0, 104.0, 101.0, 107.0];
        let t = timeline(&days(6), &prices, &[Long; 6]);
        let metrics = crate::domain::metrics::Metrics::compute(&t, 0.0).unwrap();

        let vol = rolling_volatility(&t, t.len());
        assert_relative_eq!(
            vol[5].value.unwrap(),
            metrics.annualized_volatility * 100.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn rolling_sharpe_undefined_for_flat_window() {
        let t = timeline(&days(4), &[10.0; 4], &[Long; 4]);
        assert!(rolling_sharpe(&t, 2, 0.02).iter().all(|p| p.value.is_none()));
        assert!(rolling_sharpe(&t, 0, 0.02).iter().all(|p| p.value.is_none()));
    }

    #[test]
    fn benchmark_scales_by_first_close() {
        let t = timeline(&days(3), &[50.0, 75.0, 25.0], &[Short; 3]);
        let b = benchmark_curve(&t);
        assert_eq!(
            b.iter().map(|p| p.value).collect::<Vec<_>>(),
            vec![Some(1000.0), Some(1500.0), Some(500.0)]
        );
    }

    #[test]
    fn markers_follow_position_changes() {
        let t = timeline(
            &days(6),
            &[10.0, 11.0, 12.0, 13.0, 14.0, 15.0],
            &[Long, Long, Short, Neutral, Neutral, Long],
        );
        // positions: -, L, L, S, N, N
        let markers = trade_markers(&t);

        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].side, TradeSide::Sell);
        assert_eq!(markers[0].date, days(6)[3]);
        assert_eq!(markers[1].side, TradeSide::Buy);
        assert_eq!(markers[1].close, 14.0);
    }
}
