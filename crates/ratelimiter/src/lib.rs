//! Rate-limited dispatch of outbound requests.
//!
//! A [`DispatcherService`] owns a [`FixedWindow`] budget and releases queued
//! requests to a [`Transport`] in strict submission order, at most `limit`
//! per `interval`. Producers talk to it through cloneable
//! [`DispatcherHandle`]s; each submission yields a [`DispatchTicket`] that
//! resolves once that request has been delivered or has failed.
//!
//! Failed deliveries are not retried and never hold up the queue.

mod error;
mod handle;
mod metrics;
mod service;
mod window;

use std::time::Duration;

use async_trait::async_trait;

pub use error::{DispatchError, TransportError};
pub use handle::{DispatchTicket, DispatcherHandle};
pub use service::DispatcherService;
pub use window::FixedWindow;

/// Default number of requests per window.
pub const DEFAULT_LIMIT: u32 = 5;

/// Default window length.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Request budget for a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Requests admitted per window.
    pub limit: u32,
    /// Window length.
    pub interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl DispatcherConfig {
    pub fn new(limit: u32, interval: Duration) -> Self {
        Self { limit, interval }
    }
}

/// Outbound delivery mechanism (e.g. a webhook POST).
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Request payload handed to the transport.
    type Request: Send + 'static;

    async fn deliver(&self, request: Self::Request) -> Result<(), TransportError>;
}
