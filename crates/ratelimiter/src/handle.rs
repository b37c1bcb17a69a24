//! Cloneable handle for submitting requests to the dispatcher service.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};

use crate::error::DispatchError;
use crate::metrics::DispatcherMetrics;
use crate::service::DispatchRequest;

/// Cloneable handle for queueing requests on a [`DispatcherService`](crate::DispatcherService).
pub struct DispatcherHandle<R> {
    request_tx: mpsc::UnboundedSender<DispatchRequest<R>>,
    metrics: DispatcherMetrics,
}

impl<R> Clone for DispatcherHandle<R> {
    fn clone(&self) -> Self {
        Self {
            request_tx: self.request_tx.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<R> std::fmt::Debug for DispatcherHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherHandle")
            .field("closed", &self.request_tx.is_closed())
            .finish()
    }
}

impl<R: Send + 'static> DispatcherHandle<R> {
    pub(crate) fn new(
        request_tx: mpsc::UnboundedSender<DispatchRequest<R>>,
        metrics: DispatcherMetrics,
    ) -> Self {
        Self {
            request_tx,
            metrics,
        }
    }

    /// Queue a request. Its place in the FIFO is fixed when this returns;
    /// the ticket resolves once the request was delivered or failed.
    pub fn send(&self, request: R) -> DispatchTicket {
        let (response_tx, response_rx) = oneshot::channel();

        match self.request_tx.send(DispatchRequest {
            request,
            response_tx,
        }) {
            Ok(()) => {
                self.metrics.enqueued();
                DispatchTicket::pending(response_rx)
            }
            Err(_) => DispatchTicket::failed(DispatchError::ServiceStopped),
        }
    }

    /// Requests queued but not yet handed to the transport.
    pub fn queue_len(&self) -> usize {
        self.metrics.queue_len()
    }

    /// Returns true once the service has stopped accepting requests.
    pub fn is_closed(&self) -> bool {
        self.request_tx.is_closed()
    }
}

/// Completion of one dispatched request.
#[must_use = "a ticket does nothing unless awaited; drop it explicitly to fire and forget"]
pub struct DispatchTicket {
    state: TicketState,
}

enum TicketState {
    Pending(oneshot::Receiver<Result<(), DispatchError>>),
    Failed(Option<DispatchError>),
}

impl DispatchTicket {
    fn pending(rx: oneshot::Receiver<Result<(), DispatchError>>) -> Self {
        Self {
            state: TicketState::Pending(rx),
        }
    }

    fn failed(error: DispatchError) -> Self {
        Self {
            state: TicketState::Failed(Some(error)),
        }
    }
}

impl Future for DispatchTicket {
    type Output = Result<(), DispatchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            TicketState::Pending(rx) => Pin::new(rx)
                .poll(cx)
                .map(|res| res.unwrap_or(Err(DispatchError::ServiceStopped))),
            TicketState::Failed(error) => {
                Poll::Ready(Err(error.take().unwrap_or(DispatchError::ServiceStopped)))
            }
        }
    }
}
