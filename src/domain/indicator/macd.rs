//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow), defined once both EMAs are
//! Signal Line = EMA(signal) of MACD Line, seeded at the first defined line value
//! Histogram = MACD Line - Signal Line
//!
//! A point is valid once the signal line is: max(fast, slow) - 1 + signal - 1 bars.

use crate::domain::indicator::ema::ema_raw;
use crate::domain::indicator::{ewm, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_macd(
    bars: &[OhlcvBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };

    if fast == 0 || slow == 0 || signal_period == 0 {
        let values = bars
            .iter()
            .map(|b| IndicatorPoint {
                date: b.date,
                valid: false,
                value: IndicatorValue::Macd {
                    line: 0.0,
                    signal: 0.0,
                    histogram: 0.0,
                },
            })
            .collect();
        return IndicatorSeries {
            indicator_type,
            values,
        };
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema_fast = ema_raw(&closes, fast);
    let ema_slow = ema_raw(&closes, slow);
    let line_warmup = fast.max(slow) - 1;

    let macd_line: Vec<f64> = (0..bars.len())
        .map(|i| {
            if i >= line_warmup {
                ema_fast[i] - ema_slow[i]
            } else {
                f64::NAN
            }
        })
        .collect();

    let signal_line = ewm(&macd_line, 2.0 / (signal_period as f64 + 1.0));
    let signal_warmup = line_warmup + signal_period - 1;

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let line = macd_line[i];
            let signal = signal_line[i];
            let histogram = line - signal;
            IndicatorPoint {
                date: bar.date,
                valid: i >= signal_warmup && histogram.is_finite(),
                value: IndicatorValue::Macd {
                    line,
                    signal,
                    histogram,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}
