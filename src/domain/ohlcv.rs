//! OHLCV bar representation.

use chrono::NaiveDate;

/// One dated price record. Only `close` is mandatory; non-equity instruments
/// (indices, FX) often arrive without open/high/low or volume.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<f64>,
}

impl OhlcvBar {
    /// Bar carrying only a closing price.
    pub fn from_close(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }

    /// High, or close when the source had no high.
    pub fn high_or_close(&self) -> f64 {
        self.high.unwrap_or(self.close)
    }

    /// Low, or close when the source had no low.
    pub fn low_or_close(&self) -> f64 {
        self.low.unwrap_or(self.close)
    }
}
