//! Core domain types and logic.

pub mod ohlcv;
pub mod history;
pub mod indicator;
pub mod indicator_helpers;
pub mod signal;
pub mod backtest;
pub mod features;
pub mod model;
pub mod report;
pub mod retry;
pub mod pipeline;
pub mod config_validation;
pub mod error;
