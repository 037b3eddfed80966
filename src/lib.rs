//! ensemble-trader: RSI/moving-average backtester with a stacked ML classifier
//! scoring next-day moves.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
