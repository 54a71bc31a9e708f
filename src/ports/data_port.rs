//! Price data access port.

use crate::domain::error::StratlabError;
use crate::domain::price_series::PriceSeries;
use chrono::NaiveDate;

pub trait PriceDataPort {
    /// Bars for `symbol` between the inclusive bounds, oldest first. `None`
    /// leaves that side unbounded. An empty result is `NoData`.
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceSeries, StratlabError>;

    fn list_symbols(&self) -> Result<Vec<String>, StratlabError>;
}
