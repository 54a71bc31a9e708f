//! CSV export of a run's timeline or a comparison table.

use crate::domain::backtest::StrategyRun;
use crate::domain::comparison::ComparisonTable;
use crate::domain::error::StratlabError;
use crate::domain::metrics::{MetricsReport, NOT_AVAILABLE};
use crate::domain::price_series::PriceSeries;
use crate::ports::report_port::ReportPort;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

pub struct CsvReportAdapter {
    output_path: PathBuf,
}

impl CsvReportAdapter {
    pub fn new(output_path: PathBuf) -> Self {
        Self { output_path }
    }

    fn create_writer(&self) -> Result<csv::Writer<std::fs::File>, StratlabError> {
        csv::Writer::from_path(&self.output_path).map_err(csv_error)
    }
}

fn csv_error(e: csv::Error) -> StratlabError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => StratlabError::Io(io),
        other => StratlabError::Io(std::io::Error::other(format!("{:?}", other))),
    }
}

fn optional(value: Option<f64>) -> String {
    value
        .filter(|v| v.is_finite())
        .map(|v| v.to_string())
        .unwrap_or_default()
}

/// One row per bar: price, signal, position, returns, value, then every
/// indicator column the strategy computed.
pub fn write_timeline<W: Write>(
    writer: &mut csv::Writer<W>,
    run: &StrategyRun,
) -> Result<(), csv::Error> {
    let mut header = vec![
        "date",
        "close",
        "signal",
        "position",
        "period_return",
        "strategy_return",
        "cumulative_return",
        "portfolio_value",
    ];
    header.extend(run.indicators.iter().map(|c| c.name.as_str()));
    writer.write_record(&header)?;

    for (i, row) in run.timeline.rows.iter().enumerate() {
        let mut record = vec![
            row.date.to_string(),
            row.close.to_string(),
            row.signal.to_string(),
            row.position.map(|p| p.to_string()).unwrap_or_default(),
            optional(row.period_return),
            row.strategy_return.to_string(),
            row.cumulative_return.to_string(),
            row.portfolio_value.to_string(),
        ];
        record.extend(
            run.indicators
                .iter()
                .map(|c| optional(c.values.get(i).copied().flatten())),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Header `strategy,<metric names...>`, one row per compared strategy.
pub fn write_comparison_table<W: Write>(
    writer: &mut csv::Writer<W>,
    table: &ComparisonTable,
) -> Result<(), csv::Error> {
    let mut header = vec!["strategy"];
    header.extend(table.columns.iter().copied());
    writer.write_record(&header)?;

    for row in &table.rows {
        let mut record = vec![row.strategy.as_str()];
        record.extend(
            table
                .columns
                .iter()
                .map(|c| row.report.get(c).map_or(NOT_AVAILABLE, |v| v.as_str())),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write_run(
        &self,
        _series: &PriceSeries,
        run: &StrategyRun,
        _metrics: &MetricsReport,
    ) -> Result<(), StratlabError> {
        let mut writer = self.create_writer()?;
        write_timeline(&mut writer, run).map_err(csv_error)?;
        info!(path = %self.output_path.display(), rows = run.timeline.len(), "timeline exported");
        Ok(())
    }

    fn write_comparison(
        &self,
        _series: &PriceSeries,
        table: &ComparisonTable,
    ) -> Result<(), StratlabError> {
        let mut writer = self.create_writer()?;
        write_comparison_table(&mut writer, table).map_err(csv_error)?;
        info!(path = %self.output_path.display(), rows = table.rows.len(), "comparison exported");
        Ok(())
    }
}
