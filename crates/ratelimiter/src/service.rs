//! Dispatcher service actor (runs in its own tokio task).

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::error::DispatchError;
use crate::handle::DispatcherHandle;
use crate::metrics::DispatcherMetrics;
use crate::window::FixedWindow;
use crate::{DispatcherConfig, Transport};

/// A queued request and where to report its outcome.
pub(crate) struct DispatchRequest<R> {
    pub(crate) request: R,
    pub(crate) response_tx: oneshot::Sender<Result<(), DispatchError>>,
}

/// Releases queued requests to the transport under a fixed-window budget.
///
/// The budget is owned by this task alone, so producers on any thread share
/// one serialized view of it. Each release is delivered in its own task: a
/// slow or failing delivery does not delay the next release.
pub struct DispatcherService<T: Transport> {
    request_rx: mpsc::UnboundedReceiver<DispatchRequest<T::Request>>,
    transport: Arc<T>,
    window: FixedWindow,
    metrics: DispatcherMetrics,
}

impl<T: Transport> DispatcherService<T> {
    /// Create a service and the handle feeding it.
    pub fn new(config: DispatcherConfig, transport: T) -> (Self, DispatcherHandle<T::Request>) {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let metrics = DispatcherMetrics::default();

        let service = Self {
            request_rx,
            transport: Arc::new(transport),
            window: FixedWindow::new(config.limit, config.interval),
            metrics: metrics.clone(),
        };
        (service, DispatcherHandle::new(request_tx, metrics))
    }

    /// Create a service and spawn it on the current tokio runtime.
    pub fn spawn(config: DispatcherConfig, transport: T) -> DispatcherHandle<T::Request> {
        let (service, handle) = Self::new(config, transport);
        tokio::spawn(service.run());
        handle
    }

    /// Run the dispatch loop.
    ///
    /// This method runs until all handles are dropped and the queue is empty.
    pub async fn run(mut self) {
        while let Some(request) = self.request_rx.recv().await {
            self.wait_for_budget().await;
            self.metrics.released();
            self.release(request);
        }
        debug!("Dispatcher service shutting down");
    }

    /// Convert self into a spawnable future.
    pub async fn into_task(self) {
        self.run().await;
    }

    async fn wait_for_budget(&mut self) {
        let mut throttled = false;
        while let Err(wait) = self.window.try_acquire(Instant::now()) {
            if !throttled {
                trace!(?wait, "Dispatch budget exhausted, waiting for window reset");
                self.metrics.throttled_total.increment(1);
                throttled = true;
            }
            tokio::time::sleep(wait).await;
        }
    }

    fn release(&self, request: DispatchRequest<T::Request>) {
        let transport = Arc::clone(&self.transport);
        let metrics = self.metrics.clone();

        tokio::spawn(async move {
            let DispatchRequest {
                request,
                response_tx,
            } = request;

            let result = transport.deliver(request).await;
            match &result {
                Ok(()) => {
                    metrics.sent_total.increment(1);
                    trace!("Request delivered");
                }
                Err(error) => {
                    metrics.failed_total.increment(1);
                    warn!(%error, "Dispatch failed");
                }
            }

            let _ = response_tx.send(result.map_err(DispatchError::from));
        });
    }
}
