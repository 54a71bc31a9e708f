//! Report output port.

use crate::domain::backtest::StrategyRun;
use crate::domain::comparison::ComparisonTable;
use crate::domain::error::StratlabError;
use crate::domain::metrics::MetricsReport;
use crate::domain::price_series::PriceSeries;

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write_run(
        &self,
        series: &PriceSeries,
        run: &StrategyRun,
        metrics: &MetricsReport,
    ) -> Result<(), StratlabError>;

    fn write_comparison(
        &self,
        series: &PriceSeries,
        table: &ComparisonTable,
    ) -> Result<(), StratlabError>;
}
