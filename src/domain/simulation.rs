//! Position simulation: lag signals into positions and compound returns.
//!
//! `Position[t]` is `Signal[t-1]`, so the position held over a period is
//! always decided from information available at the previous close.

use crate::domain::error::StratlabError;
use crate::domain::price_series::PriceSeries;
use crate::domain::signal::Signal;
use chrono::NaiveDate;
use tracing::warn;

/// One row of the simulated timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineRow {
    pub date: NaiveDate,
    pub close: f64,
    pub signal: Signal,
    /// `None` on the first row, where no prior signal exists.
    pub position: Option<Signal>,
    /// `None` on the first row and wherever the previous close is unusable.
    pub period_return: Option<f64>,
    /// Position × period return with undefined contributions counted as 0.
    pub strategy_return: f64,
    pub cumulative_return: f64,
    pub portfolio_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioTimeline {
    pub initial_capital: f64,
    pub rows: Vec<TimelineRow>,
}

impl PortfolioTimeline {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    pub fn strategy_returns(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.strategy_return).collect()
    }

    pub fn portfolio_values(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.portfolio_value).collect()
    }

    pub fn positions(&self) -> Vec<Option<Signal>> {
        self.rows.iter().map(|r| r.position).collect()
    }

    pub fn final_value(&self) -> Option<f64> {
        self.rows.last().map(|r| r.portfolio_value)
    }
}

/// `Close[t] / Close[t-1] - 1`, undefined when the previous close is not
/// positive or the ratio is not finite.
pub fn period_return(prev_close: f64, close: f64) -> Option<f64> {
    if prev_close <= 0.0 || !prev_close.is_finite() {
        return None;
    }
    let r = close / prev_close - 1.0;
    r.is_finite().then_some(r)
}

/// Run the signal column against the series.
///
/// The output has one row per bar with the same dates. A non-positive
/// `initial_capital` is simulated as given.
pub fn simulate(
    series: &PriceSeries,
    signals: &[Signal],
    initial_capital: f64,
) -> Result<PortfolioTimeline, StratlabError> {
    let bars = series.bars();
    if signals.len() != bars.len() {
        return Err(StratlabError::LengthMismatch {
            what: "signal",
            expected: bars.len(),
            actual: signals.len(),
        });
    }
    if initial_capital <= 0.0 {
        warn!(
            symbol = series.symbol(),
            initial_capital, "simulating with non-positive initial capital"
        );
    }

    let mut rows = Vec::with_capacity(bars.len());
    let mut cumulative = 1.0_f64;

    for (i, bar) in bars.iter().enumerate() {
        let (position, period_ret) = if i == 0 {
            (None, None)
        } else {
            (
                Some(signals[i - 1]),
                period_return(bars[i - 1].close, bar.close),
            )
        };

        let strategy_return = match (position, period_ret) {
            (Some(p), Some(r)) => {
                let contribution = p.as_f64() * r;
                if contribution.is_finite() { contribution } else { 0.0 }
            }
            _ => 0.0,
        };

        cumulative *= 1.0 + strategy_return;
        rows.push(TimelineRow {
            date: bar.date,
            close: bar.close,
            signal: signals[i],
            position,
            period_return: period_ret,
            strategy_return,
            cumulative_return: cumulative,
            portfolio_value: initial_capital * cumulative,
        });
    }

    Ok(PortfolioTimeline {
        initial_capital,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use Signal::*;

    fn series(prices: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars = prices
            .iter()
            .enumerate()
            .map(|(i, &c)| OhlcvBar::from_close(start + chrono::Duration::days(i as i64), c))
            .collect();
        PriceSeries::new("SIM", bars).unwrap()
    }

    #[test]
    fn long_compounds_price_path() {
        let timeline = simulate(&series(&[100.0, 110.0, 121.0]), &[Long; 3], 1000.0).unwrap();

        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.rows[0].position, None);
        assert_eq!(timeline.rows[0].strategy_return, 0.0);
        assert_relative_eq!(timeline.rows[1].strategy_return, 0.1, epsilon = 1e-12);
        assert_relative_eq!(timeline.rows[2].cumulative_return, 1.21, epsilon = 1e-12);
        assert_relative_eq!(timeline.final_value().unwrap(), 1210.0, epsilon = 1e-9);
    }

    #[test]
    fn position_lags_signal() {
        let timeline = simulate(
            &series(&[100.0, 110.0, 99.0, 99.0]),
            &[Neutral, Long, Short, Long],
            100.0,
        )
        .unwrap();

        assert_eq!(
            timeline.positions(),
            vec![None, Some(Neutral), Some(Long), Some(Short)]
        );
        assert_eq!(timeline.rows[1].strategy_return, 0.0);
        assert_relative_eq!(timeline.rows[2].strategy_return, -0.1, epsilon = 1e-12);
        assert_eq!(timeline.rows[3].strategy_return, 0.0);
    }

    #[test]
    fn short_earns_negated_return() {
        let timeline = simulate(&series(&[100.0, 90.0]), &[Short, Short], 100.0).unwrap();
        assert_relative_eq!(timeline.rows[1].strategy_return, 0.1, epsilon = 1e-12);
        assert_relative_eq!(timeline.rows[1].portfolio_value, 110.0, epsilon = 1e-9);
    }

    #[test]
    fn non_positive_previous_close_contributes_nothing() {
        let timeline = simulate(&series(&[0.0, 10.0, 11.0]), &[Long; 3], 100.0).unwrap();
        assert_eq!(timeline.rows[1].period_return, None);
        assert_eq!(timeline.rows[1].strategy_return, 0.0);
        assert_relative_eq!(timeline.rows[2].strategy_return, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn zero_capital_is_simulated() {
        let timeline = simulate(&series(&[1.0, 2.0]), &[Long; 2], 0.0).unwrap();
        assert_eq!(timeline.portfolio_values(), vec![0.0, 0.0]);
        assert_relative_eq!(timeline.rows[1].cumulative_return, 2.0);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let err = simulate(&series(&[1.0, 2.0, 3.0]), &[Long; 2], 100.0).unwrap_err();
        assert!(matches!(
            err,
            StratlabError::LengthMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn empty_series_yields_empty_timeline() {
        let empty = PriceSeries::new("E", vec![]).unwrap();
        let timeline = simulate(&empty, &[], 100.0).unwrap();
        assert!(timeline.is_empty());
        assert_eq!(timeline.final_value(), None);
    }

    fn signal_strategy() -> impl Strategy<Value = Signal> {
        prop_oneof![Just(Short), Just(Neutral), Just(Long)]
    }

    proptest! {
        #[test]
        fn changing_a_signal_never_moves_its_own_period(
            prices in prop::collection::vec(1.0f64..500.0, 2..40),
            seed in prop::collection::vec(signal_strategy(), 40),
            idx in 0usize..40,
            replacement in signal_strategy(),
        ) {
            let s = series(&prices);
            let signals: Vec<Signal> = seed[..prices.len()].to_vec();
            let t = idx % prices.len();
            let mut altered = signals.clone();
            altered[t] = replacement;

            let a = simulate(&s, &signals, 1000.0).unwrap();
            let b = simulate(&s, &altered, 1000.0).unwrap();

            for k in 0..=t {
                prop_assert_eq!(a.rows[k].position, b.rows[k].position);
                prop_assert_eq!(a.rows[k].strategy_return, b.rows[k].strategy_return);
                prop_assert_eq!(a.rows[k].portfolio_value, b.rows[k].portfolio_value);
            }
        }

        #[test]
        fn output_aligns_with_input(
            prices in prop::collection::vec(0.5f64..200.0, 0..60),
        ) {
            let s = series(&prices);
            let timeline = simulate(&s, &vec![Long; prices.len()], 50.0).unwrap();
            prop_assert_eq!(timeline.dates(), s.dates());
        }
    }
}
