use permit_gate::GateError;
use permit_gate::WindowError;
use tower::BoxError;

/// Errors produced while admitting and dispatching a request.
///
/// Every variant is scoped to the call that produced it. Nothing is retried
/// internally; the caller decides what to do next.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The payload or signature cannot be put on the wire as-is.
    ///
    /// This is a problem with the caller's data and will not go away on retry.
    #[error("request cannot be serialized: {0}")]
    Serialization(String),

    /// The transport failed (connection refused, timeout, interrupted).
    #[error("transport failure: {0}")]
    Transport(#[source] BoxError),

    /// The admission gate was shut down before or while waiting for a permit.
    #[error("admission gate has been shut down")]
    Shutdown,

    /// The caller cancelled the request while it was waiting for a permit.
    #[error("request cancelled while waiting for admission")]
    Cancelled,
}

impl DispatchError {
    /// A short, stable name for the failure, used as a metric attribute.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Serialization(_) => "serialization",
            Self::Transport(_) => "transport",
            Self::Shutdown => "shutdown",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<GateError> for DispatchError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Shutdown => Self::Shutdown,
            GateError::Cancelled => Self::Cancelled,
        }
    }
}

/// Errors produced while turning a [`crate::ClientConfig`] into a client.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid rate window: {0}")]
    Window(#[from] WindowError),

    #[error("limit must be greater than zero")]
    ZeroLimit,

    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}
