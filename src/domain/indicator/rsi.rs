//! RSI (Relative Strength Index) indicator implementation.
//!
//! Uses Wilder's smoothing (alpha = 1/n) for average gain/loss:
//! - Bar 0 has no prior close and contributes a zero gain and a zero loss
//! - avg[i] = (avg[i-1] * (n-1) + current) / n, seeded with bar 0
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{ewm, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        let values: Vec<IndicatorPoint> = bars
            .iter()
            .map(|b| IndicatorPoint {
                date: b.date,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            })
            .collect();

        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values,
        };
    }

    let mut gains: Vec<f64> = Vec::with_capacity(bars.len());
    let mut losses: Vec<f64> = Vec::with_capacity(bars.len());
    gains.push(0.0);
    losses.push(0.0);

    for i in 1..bars.len() {
        let change = bars[i].close - bars[i - 1].close;
        gains.push(if change > 0.0 { change } else { 0.0 });
        losses.push(if change < 0.0 { -change } else { 0.0 });
    }

    let alpha = 1.0 / period as f64;
    let avg_gains = ewm(&gains, alpha);
    let avg_losses = ewm(&losses, alpha);

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let avg_gain = avg_gains[i];
            let avg_loss = avg_losses[i];
            let rsi = if avg_loss == 0.0 {
                100.0
            } else {
                100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
            };
            IndicatorPoint {
                date: bar.date,
                valid: i + 1 >= period && rsi.is_finite(),
                value: IndicatorValue::Simple(rsi),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}
