//! CSV file price adapter.
//!
//! Reads `<base>/<SYMBOL>.csv` with a `date,open,high,low,close,volume`
//! header. Blank cells are absent values; only `date` and `close` are
//! required. An optional `<base>/<SYMBOL>.info` INI file with an `[info]`
//! section supplies display metadata.

use crate::domain::error::StratlabError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::price_series::{PriceSeries, SecurityInfo};
use crate::ports::data_port::PriceDataPort;
use chrono::NaiveDate;
use configparser::ini::Ini;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    fn info_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.info", symbol))
    }

    fn read_info(&self, symbol: &str) -> Result<SecurityInfo, StratlabError> {
        let path = self.info_path(symbol);
        if !path.exists() {
            return Ok(SecurityInfo::default());
        }

        let mut ini = Ini::new();
        ini.load(&path).map_err(|e| StratlabError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let text = |key: &str| ini.get("info", key).filter(|v| !v.trim().is_empty());
        Ok(SecurityInfo {
            name: text("name"),
            sector: text("sector"),
            industry: text("industry"),
            currency: text("currency"),
            exchange: text("exchange"),
            market_cap: ini.getfloat("info", "market_cap").ok().flatten(),
        })
    }
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn optional_value(
    record: &csv::StringRecord,
    index: Option<usize>,
    column: &str,
    line: u64,
) -> Result<Option<f64>, StratlabError> {
    let Some(raw) = index.and_then(|i| record.get(i)).map(str::trim) else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }
    let value = raw.parse::<f64>().map_err(|e| StratlabError::DataSource {
        reason: format!("line {}: invalid {} value '{}': {}", line, column, raw, e),
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(StratlabError::DataSource {
            reason: format!(
                "line {}: {} must be a non-negative number, got '{}'",
                line, column, raw
            ),
        });
    }
    Ok(Some(value))
}

impl PriceDataPort for CsvAdapter {
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceSeries, StratlabError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| StratlabError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| StratlabError::DataSource {
                reason: format!("CSV header error: {}", e),
            })?
            .clone();

        let idx: Vec<Option<usize>> = COLUMNS.iter().map(|c| column_index(&headers, c)).collect();
        let (Some(date_idx), Some(close_idx)) = (idx[0], idx[4]) else {
            return Err(StratlabError::DataSource {
                reason: format!("{} must have date and close columns", path.display()),
            });
        };

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| StratlabError::DataSource {
                reason: format!("CSV parse error: {}", e),
            })?;
            let line = record.position().map_or(0, |p| p.line());

            let date_str = record.get(date_idx).unwrap_or("").trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                StratlabError::DataSource {
                    reason: format!("line {}: invalid date '{}': {}", line, date_str, e),
                }
            })?;

            if start_date.is_some_and(|s| date < s) || end_date.is_some_and(|e| date > e) {
                continue;
            }

            let close = optional_value(&record, Some(close_idx), "close", line)?.ok_or_else(
                || StratlabError::DataSource {
                    reason: format!("line {}: missing close value", line),
                },
            )?;

            bars.push(OhlcvBar {
                date,
                open: optional_value(&record, idx[1], "open", line)?,
                high: optional_value(&record, idx[2], "high", line)?,
                low: optional_value(&record, idx[3], "low", line)?,
                close,
                volume: optional_value(&record, idx[5], "volume", line)?,
            });
        }

        if bars.is_empty() {
            return Err(StratlabError::NoData {
                symbol: symbol.to_string(),
            });
        }

        debug!(symbol, bars = bars.len(), path = %path.display(), "loaded price data");
        let info = self.read_info(symbol)?;
        Ok(PriceSeries::from_unsorted(symbol, bars)?.with_info(info))
    }

    fn list_symbols(&self) -> Result<Vec<String>, StratlabError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| StratlabError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StratlabError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
