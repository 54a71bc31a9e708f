//! Validated, date-ordered price table plus display metadata.

use crate::domain::error::StratlabError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

/// Descriptive metadata about the instrument. Used for display only; the
/// engine never reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecurityInfo {
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub market_cap: Option<f64>,
}

impl SecurityInfo {
    /// Market cap abbreviated as `1.23T`, `4.56B` or `7.89M`; "N/A" when
    /// absent or non-positive.
    pub fn format_market_cap(&self) -> String {
        match self.market_cap {
            Some(cap) if cap.is_finite() && cap > 0.0 => {
                if cap >= 1e12 {
                    format!("{:.2}T", cap / 1e12)
                } else if cap >= 1e9 {
                    format!("{:.2}B", cap / 1e9)
                } else {
                    format!("{:.2}M", cap / 1e6)
                }
            }
            _ => "N/A".to_string(),
        }
    }
}

/// Ordered price history for one instrument.
///
/// Dates are strictly increasing and every present price or volume is a
/// finite, non-negative number; the constructor rejects anything else so
/// that every consumer can index by position without re-checking.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<OhlcvBar>,
    info: SecurityInfo,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<OhlcvBar>) -> Result<Self, StratlabError> {
        for bar in &bars {
            check_bar_values(bar)?;
        }
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(StratlabError::InvalidPriceSeries {
                    reason: format!(
                        "dates must be strictly increasing ({} follows {})",
                        pair[1].date, pair[0].date
                    ),
                });
            }
        }
        Ok(Self {
            symbol: symbol.into(),
            bars,
            info: SecurityInfo::default(),
        })
    }

    /// Sorts by date first, then validates. Duplicate dates are still an error.
    pub fn from_unsorted(
        symbol: impl Into<String>,
        mut bars: Vec<OhlcvBar>,
    ) -> Result<Self, StratlabError> {
        bars.sort_by_key(|b| b.date);
        Self::new(symbol, bars)
    }

    pub fn with_info(mut self, info: SecurityInfo) -> Self {
        self.info = info;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn info(&self) -> &SecurityInfo {
        &self.info
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }
}

fn check_bar_values(bar: &OhlcvBar) -> Result<(), StratlabError> {
    let fields = [
        ("close", Some(bar.close)),
        ("open", bar.open),
        ("high", bar.high),
        ("low", bar.low),
        ("volume", bar.volume),
    ];
    for (field, value) in fields {
        let Some(v) = value else { continue };
        if !v.is_finite() || v < 0.0 {
            return Err(StratlabError::InvalidPriceSeries {
                reason: format!(
                    "{} on {} must be a non-negative number, got {}",
                    field, bar.date, v
                ),
            });
        }
    }
    Ok(())
}
