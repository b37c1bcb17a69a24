//! Logging and metrics setup shared by the tally binary.

mod logging;
mod prometheus;

pub use logging::{LogArgs, build_filter, init_logging};
pub use prometheus::{MetricsArgs, install_prometheus};
