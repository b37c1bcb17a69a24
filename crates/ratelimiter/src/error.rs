//! Dispatch error types.

/// Errors reported by a [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The remote end answered with a non-success status.
    #[error("http status {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never got an answer.
    #[error("network error: {0}")]
    Network(String),

    /// The request could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),
}

/// Errors resolved through a [`DispatchTicket`](crate::DispatchTicket).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// Delivery was attempted and failed. Not retried.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The dispatcher service is gone.
    #[error("dispatcher stopped")]
    ServiceStopped,
}
