//! Core domain types and logic.

pub mod ohlcv;
pub mod price_series;
pub mod indicator;
pub mod signal;
pub mod strategy;
pub mod simulation;
pub mod backtest;
pub mod metrics;
pub mod comparison;
pub mod analytics;
pub mod config_validation;
pub mod error;
