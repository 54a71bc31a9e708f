//! Stochastic oscillator (%K / %D).
//!
//! %K = 100 * (C - lowest low over k bars) / (highest high over k bars - lowest low)
//! %D = SMA(d) of %K
//!
//! %K is undefined when the k-bar range is zero. A point is valid only when
//! both %K and %D are defined, i.e. from bar (k-1) + (d-1) onward.
//! Bars without high/low use their close.

use crate::domain::indicator::sma::rolling_mean;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_stochastic(bars: &[OhlcvBar], k_period: usize, d_period: usize) -> IndicatorSeries {
    let k_line = percent_k(bars, k_period);
    let d_line = rolling_mean(&k_line, d_period);

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let k = k_line[i];
            let d = d_line[i];
            IndicatorPoint {
                date: bar.date,
                valid: k.is_finite() && d.is_some(),
                value: IndicatorValue::Stochastic {
                    k,
                    d: d.unwrap_or(f64::NAN),
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Stochastic { k_period, d_period },
        values,
    }
}

/// Raw %K with NaN where undefined.
fn percent_k(bars: &[OhlcvBar], k_period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; bars.len()];
    if k_period == 0 {
        return out;
    }

    for i in (k_period - 1)..bars.len() {
        let window = &bars[i + 1 - k_period..=i];
        let lowest = window
            .iter()
            .map(OhlcvBar::low_or_close)
            .fold(f64::INFINITY, f64::min);
        let highest = window
            .iter()
            .map(OhlcvBar::high_or_close)
            .fold(f64::NEG_INFINITY, f64::max);

        let range = highest - lowest;
        if range > 0.0 && range.is_finite() {
            out[i] = 100.0 * (bars[i].close - lowest) / range;
        }
    }
    out
}
