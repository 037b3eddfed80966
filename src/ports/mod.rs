//! Port traits at the edge of the domain.

pub mod config_port;
pub mod data_port;
pub mod notifier_port;
pub mod trade_log_port;
