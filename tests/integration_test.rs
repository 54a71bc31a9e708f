//! Integration tests for the backtest pipeline.
//!
//! Tests cover:
//! - Data port -> strategy -> simulation -> metrics through a mock port
//! - Compounding and zero-trade behaviour of the simulator
//! - Positions never depend on the current or later closes
//! - Metric bounds and formatting
//! - Comparison isolation of failing strategies
//! - Text and CSV report ports

mod common;

use approx::assert_relative_eq;
use common::*;
use proptest::prelude::*;
use stratlab::adapters::csv_report_adapter::CsvReportAdapter;
use stratlab::adapters::text_report_adapter::TextReportAdapter;
use stratlab::domain::backtest::run_strategy;
use stratlab::domain::comparison::{compare_strategies, run_comparison, run_strategies};
use stratlab::domain::error::StratlabError;
use stratlab::domain::metrics::{
    max_drawdown, safe_format, trade_count, MetricFormat, Metrics, MetricsReport, METRIC_NAMES,
};
use stratlab::domain::signal::Signal;
use stratlab::domain::simulation::simulate;
use stratlab::domain::strategy::{StrategyConfig, StrategyKind, StrategyRegistry};
use stratlab::ports::data_port::PriceDataPort;
use stratlab::ports::report_port::ReportPort;

mod full_backtest_pipeline {
    use super::*;

    #[test]
    fn mock_port_to_metrics() {
        let port = MockPriceDataPort::new().with_bars("ACME", bars_from_closes(&wavy_closes(150)));
        let series = port.fetch_prices("ACME", None, None).unwrap();
        assert_eq!(series.len(), 150);

        let run = run_strategy(&series, &StrategyKind::SmaCrossover.default_config(), 10_000.0)
            .unwrap();
        assert_eq!(run.timeline.len(), series.len());
        assert_eq!(run.timeline.dates(), series.dates());

        let metrics = MetricsReport::compute(&run.timeline, 0.02);
        assert!(metrics.is_available());
        assert_eq!(metrics.len(), METRIC_NAMES.len());
        assert_eq!(metrics.get("Initial Value").unwrap().as_str(), "10,000.00");
    }

    #[test]
    fn date_range_is_applied_by_port() {
        let port = MockPriceDataPort::new().with_bars("ACME", bars_from_closes(&wavy_closes(30)));
        let series = port
            .fetch_prices("ACME", Some(date(2024, 1, 5)), Some(date(2024, 1, 14)))
            .unwrap();
        assert_eq!(series.len(), 10);
        assert_eq!(series.first_date(), Some(date(2024, 1, 5)));
        assert_eq!(series.last_date(), Some(date(2024, 1, 14)));
    }

    #[test]
    fn unsorted_bars_are_ordered() {
        let port = MockPriceDataPort::new().with_bars(
            "ACME",
            vec![
                make_bar("2024-01-03", 12.0),
                make_bar("2024-01-01", 10.0),
                make_bar("2024-01-02", 11.0),
            ],
        );
        let series = port.fetch_prices("ACME", None, None).unwrap();
        assert_eq!(series.closes(), vec![10.0, 11.0, 12.0]);
    }

    #[test]
    fn port_errors_propagate() {
        let port = MockPriceDataPort::new().with_error("BAD", "connection refused");
        assert!(matches!(
            port.fetch_prices("BAD", None, None),
            Err(StratlabError::DataSource { .. })
        ));
        assert!(matches!(
            port.fetch_prices("MISSING", None, None),
            Err(StratlabError::NoData { .. })
        ));
    }

    #[test]
    fn every_registered_strategy_runs() {
        let series = series_from_closes("ACME", &wavy_closes(120));
        for config in StrategyRegistry::with_defaults().iter() {
            let run = run_strategy(&series, config, 5_000.0).unwrap();
            assert_eq!(run.timeline.len(), 120, "{}", run.name);
            assert_eq!(run.timeline.rows[0].position, None, "{}", run.name);
            for column in &run.indicators {
                assert_eq!(column.values.len(), 120, "{} {}", run.name, column.name);
            }
        }
    }
}

mod simulation_invariants {
    use super::*;

    #[test]
    fn buy_and_hold_compounds() {
        let series = series_from_closes("ACME", &[100.0, 110.0, 121.0]);
        let run = run_strategy(&series, &StrategyConfig::BuyAndHold, 10_000.0).unwrap();

        let values = run.timeline.portfolio_values();
        assert_relative_eq!(values[0], 10_000.0);
        assert_relative_eq!(values[1], 11_000.0, epsilon = 1e-9);
        assert_relative_eq!(values[2], 12_100.0, epsilon = 1e-9);

        let metrics = Metrics::compute(&run.timeline, 0.0).unwrap();
        assert_relative_eq!(metrics.total_return, 0.21, epsilon = 1e-12);
        assert_eq!(metrics.trade_count, 0);
        assert_relative_eq!(metrics.max_drawdown, 0.0);
    }

    #[test]
    fn neutral_signals_keep_capital_flat() {
        let series = series_from_closes("ACME", &wavy_closes(40));
        let signals = vec![Signal::Neutral; series.len()];
        let timeline = simulate(&series, &signals, 2_500.0).unwrap();

        assert!(timeline
            .portfolio_values()
            .iter()
            .all(|v| (*v - 2_500.0).abs() < 1e-9));
        assert_eq!(trade_count(&timeline), 0);
    }

    #[test]
    fn short_position_gains_on_decline() {
        let series = series_from_closes("ACME", &[100.0, 90.0]);
        let timeline = simulate(&series, &[Signal::Short, Signal::Short], 1_000.0).unwrap();
        assert_relative_eq!(timeline.rows[1].strategy_return, 0.1, epsilon = 1e-12);
        assert_relative_eq!(timeline.final_value().unwrap(), 1_100.0, epsilon = 1e-9);
    }

    #[test]
    fn signal_length_must_match() {
        let series = series_from_closes("ACME", &[1.0, 2.0, 3.0]);
        assert!(matches!(
            simulate(&series, &[Signal::Long], 100.0),
            Err(StratlabError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn single_bar_has_no_metrics() {
        let series = series_from_closes("ONE", &[50.0]);
        let run = run_strategy(&series, &StrategyConfig::BuyAndHold, 1_000.0).unwrap();
        let report = MetricsReport::compute(&run.timeline, 0.02);
        assert!(!report.is_available());
        assert!(report.is_empty());
    }
}

mod no_look_ahead {
    use super::*;

    const BARS: usize = 120;

    fn positions_for(closes: &[f64], config: &StrategyConfig) -> Vec<Option<Signal>> {
        let series = series_from_closes("ACME", closes);
        run_strategy(&series, config, 10_000.0)
            .unwrap()
            .timeline
            .positions()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn later_prices_never_move_earlier_positions(
            t in 1usize..BARS,
            factor in 0.2f64..3.0,
        ) {
            let base = wavy_closes(BARS);
            let mut shifted = base.clone();
            for close in &mut shifted[t..] {
                *close *= factor;
            }

            for config in StrategyRegistry::with_defaults().iter() {
                let before = positions_for(&base, config);
                let after = positions_for(&shifted, config);
                prop_assert_eq!(&before[..=t], &after[..=t], "{} at t={}", config.name(), t);
            }
        }
    }

    #[test]
    fn large_shocks_at_fixed_points() {
        let base = wavy_closes(BARS);
        for t in [30, 60, 90] {
            let mut shifted = base.clone();
            for close in &mut shifted[t..] {
                *close *= 1.7;
            }
            for config in StrategyRegistry::with_defaults().iter() {
                let before = positions_for(&base, config);
                let after = positions_for(&shifted, config);
                assert_eq!(before[..=t], after[..=t], "{} at t={}", config.name(), t);
            }
        }
    }
}

mod metric_formatting {
    use super::*;

    #[test]
    fn formats_and_parses_back() {
        let money = safe_format(Some(12_345.678), MetricFormat::Money);
        assert_eq!(money.as_str(), "12,345.68");
        assert_relative_eq!(money.parse_number().unwrap(), 12_345.68);

        let pct = safe_format(Some(0.1234), MetricFormat::Percent);
        assert_eq!(pct.as_str(), "12.34%");
        assert_relative_eq!(pct.parse_number().unwrap(), 12.34);

        assert_eq!(safe_format(Some(55.0), MetricFormat::WinRate).as_str(), "55.0%");
        assert_eq!(safe_format(Some(1.234), MetricFormat::Ratio).as_str(), "1.23");
        assert_eq!(safe_format(Some(7.0), MetricFormat::Count).as_str(), "7");
    }

    #[test]
    fn non_finite_is_not_available() {
        for v in [None, Some(f64::NAN), Some(f64::INFINITY)] {
            let formatted = safe_format(v, MetricFormat::Ratio);
            assert!(!formatted.is_available());
            assert_eq!(formatted.as_str(), "N/A");
        }
    }

    proptest! {
        #[test]
        fn drawdown_is_bounded(returns in proptest::collection::vec(-0.99f64..1.0, 1..200)) {
            let dd = max_drawdown(&returns);
            prop_assert!((-1.0..=0.0).contains(&dd));
        }
    }
}

mod strategy_comparison {
    use super::*;

    #[test]
    fn failed_strategy_is_excluded() {
        let series = series_from_closes("ACME", &wavy_closes(80));
        let good = run_strategy(&series, &StrategyConfig::BuyAndHold, 1_000.0).unwrap();
        let table = compare_strategies(
            vec![
                ("Buy and Hold".to_string(), Ok(good.timeline)),
                (
                    "Broken".to_string(),
                    Err(StratlabError::StrategyFailed {
                        name: "Broken".into(),
                        reason: "bad input".into(),
                    }),
                ),
            ],
            0.02,
        );

        assert_eq!(table.strategy_names(), vec!["Buy and Hold"]);
        assert_eq!(table.failures.len(), 1);
        assert_eq!(table.failures[0].0, "Broken");
        assert!(table.cell("Broken", "Total Return").is_none());
        assert!(table.cell("Buy and Hold", "Total Return").is_some());
    }

    #[test]
    fn unavailable_timeline_is_excluded() {
        let short = series_from_closes("ACME", &[10.0]);
        let run = run_strategy(&short, &StrategyConfig::BuyAndHold, 1_000.0).unwrap();
        let table = compare_strategies(vec![("Buy and Hold".to_string(), Ok(run.timeline))], 0.02);
        assert!(table.is_empty());
        assert_eq!(table.failures.len(), 1);
    }

    #[test]
    fn parallel_runs_keep_input_order() {
        let series = series_from_closes("ACME", &wavy_closes(100));
        let configs: Vec<StrategyConfig> =
            StrategyRegistry::with_defaults().iter().cloned().collect();
        let results = run_strategies(&series, &configs, 10_000.0);

        let names: Vec<&str> = results.iter().map(|(n, _)| n.as_str()).collect();
        let expected: Vec<&str> = configs.iter().map(|c| c.name()).collect();
        assert_eq!(names, expected);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
    }

    #[test]
    fn comparison_accounts_for_every_strategy() {
        let series = series_from_closes("ACME", &wavy_closes(150));
        let configs: Vec<StrategyConfig> =
            StrategyRegistry::with_defaults().iter().cloned().collect();
        let (runs, table) = run_comparison(&series, &configs, 10_000.0, 0.02);

        assert_eq!(runs.len(), configs.len());
        assert_eq!(table.rows.len() + table.failures.len(), configs.len());
        assert!(table.strategy_names().contains(&"Buy and Hold"));
        assert_eq!(table.columns.len(), METRIC_NAMES.len());
    }
}

mod report_ports {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn csv_timeline_has_row_per_bar() {
        let series = series_from_closes("ACME", &wavy_closes(60));
        let run = run_strategy(&series, &StrategyKind::Macd.default_config(), 10_000.0).unwrap();
        let metrics = MetricsReport::compute(&run.timeline, 0.02);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("timeline.csv");
        CsvReportAdapter::new(path.clone())
            .write_run(&series, &run, &metrics)
            .unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert!(headers.iter().any(|h| h == "MACD_Signal"));
        assert_eq!(reader.records().count(), 60);
    }

    #[test]
    fn text_comparison_lists_strategies() {
        let series = series_from_closes("ACME", &wavy_closes(120));
        let configs = vec![
            StrategyKind::BuyAndHold.default_config(),
            StrategyKind::EmaCrossover.default_config(),
        ];
        let (_, table) = run_comparison(&series, &configs, 10_000.0, 0.02);
        let text = TextReportAdapter::new(0.02).render_comparison(&series, &table);

        assert!(text.starts_with("ACME"));
        assert!(text.contains("Buy and Hold"));
        assert!(text.contains("EMA Crossover"));
        assert!(text.contains("Sharpe Ratio"));
    }
}
