//! Bollinger Bands indicator.
//!
//! - Middle: SMA over n closes
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the population standard deviation (divides by N, not N-1).
//! Warmup: first (period-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_bollinger(bars: &[OhlcvBar], period: usize, multiplier: f64) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let warmup = period.saturating_sub(1);

    for i in 0..bars.len() {
        let date = bars[i].date;
        let in_range = period > 0 && i >= warmup;

        let bands = if in_range {
            let window = &bars[i + 1 - period..=i];
            band_values(window.iter().map(|b| b.close), period, multiplier)
        } else {
            None
        };

        let (upper, middle, lower) = bands.unwrap_or((0.0, 0.0, 0.0));
        values.push(IndicatorPoint {
            date,
            valid: bands.is_some(),
            value: IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            },
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Bollinger {
            period,
            stddev_mult_x100: (multiplier * 100.0).round().max(0.0) as u32,
        },
        values,
    }
}

fn band_values(
    window: impl Iterator<Item = f64> + Clone,
    period: usize,
    multiplier: f64,
) -> Option<(f64, f64, f64)> {
    let n = period as f64;
    let middle: f64 = window.clone().sum::<f64>() / n;
    let variance: f64 = window
        .map(|close| {
            let diff = close - middle;
            diff * diff
        })
        .sum::<f64>()
        / n;

    let stddev = variance.sqrt();
    let upper = middle + multiplier * stddev;
    let lower = middle - multiplier * stddev;

    (upper.is_finite() && lower.is_finite()).then_some((upper, middle, lower))
}
