//! Prometheus exporter.

use std::net::SocketAddr;

use clap::Args;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Metrics exporter configuration.
#[derive(Debug, Args, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[command(next_help_heading = "Metrics")]
#[serde(default)]
pub struct MetricsArgs {
    /// Serve Prometheus metrics on this address. Disabled when unset.
    #[arg(long = "metrics.addr", value_name = "SOCKET")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addr: Option<SocketAddr>,
}

/// Install the global Prometheus recorder and its HTTP listener.
///
/// Does nothing when no address is configured; the `metrics` macros then
/// record into the no-op recorder. Must be called from within a tokio runtime.
pub fn install_prometheus(args: &MetricsArgs) -> eyre::Result<()> {
    let Some(addr) = args.addr else {
        return Ok(());
    };

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| eyre::eyre!("failed to install prometheus exporter: {e}"))?;

    info!(%addr, "Serving Prometheus metrics");
    Ok(())
}
