use metarpc_integration::TransportError;
use thiserror::Error;

/// Error taxonomy for the client. These are kinds, not wire types: every
/// facade layer preserves the kind end to end so a caller can always tell a
/// business rejection from a transport failure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClientError {
    /// Caught before sending: missing symbol, non-positive volume, malformed
    /// time range. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation attempted with no session and connect refused.
    /// Non-retriable from within one call.
    #[error("not connected")]
    NotConnected,

    /// Connect protocol reached the server but credentials/cluster were
    /// rejected. Non-retriable.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// Channel-level failure the reconnect executor may retry.
    #[error("transport: {0}")]
    TransportTransient(#[from] TransportError),

    /// The reply's tagged union carried an `error` payload: broker or
    /// terminal-side rejection, code and message preserved verbatim.
    /// Non-retriable; surfaced to the caller.
    #[error("remote error {code}: {message}")]
    RemoteError { code: i32, message: String },

    /// A trade returned a non-success return code - distinguishes a broker
    /// decision from a transport error. Never triggers retry.
    #[error("broker rejected order (retcode {retcode}): {description}")]
    BrokerRejected { retcode: u32, description: String },

    /// A trade mutation whose acknowledgement was lost. Carries whatever
    /// ticket is known so the caller can reconcile idempotently. Never
    /// retried automatically.
    #[error("indeterminate order outcome (ticket={ticket:?}): {reason}")]
    IndeterminateOrder {
        ticket: Option<u64>,
        reason: String,
    },

    /// The caller's deadline was crossed during the RPC or the retry sleep.
    #[error("deadline exceeded, last cause: {last_cause}")]
    Timeout { last_cause: String },

    /// Caller-initiated cancellation observed at a suspension point.
    #[error("cancelled")]
    Cancelled,
}

impl ClientError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Whether the reconnect executor should retry this error. Only
    /// transport-level transience is retriable; everything else - including
    /// a `RemoteError` or `BrokerRejected` - is surfaced immediately.
    pub fn is_retriable(&self) -> bool {
        matches!(self, ClientError::TransportTransient(inner) if inner.is_transient())
    }

    /// Wraps an underlying error with the name of the high-level (Sugar)
    /// operation that failed, without hiding the original kind.
    pub fn in_operation(self, operation: &'static str) -> Self {
        match self {
            ClientError::RemoteError { code, message } => ClientError::RemoteError {
                code,
                message: format!("{operation}: {message}"),
            },
            ClientError::ConnectFailed(message) => {
                ClientError::ConnectFailed(format!("{operation}: {message}"))
            }
            other => other,
        }
    }
}

impl From<tonic::Status> for ClientError {
    fn from(status: tonic::Status) -> Self {
        ClientError::TransportTransient(TransportError::from(status))
    }
}

impl From<metarpc_proto::Error> for ClientError {
    /// Converts a reply's tagged-union error payload (every reply carries `oneof { data, error }`) into a `RemoteError`.
    fn from(error: metarpc_proto::Error) -> Self {
        ClientError::RemoteError {
            code: error.code,
            message: error.message,
        }
    }
}

/// A reply arrived with neither `data` nor `error` set - a malformed
/// response rather than a legitimate business outcome.
pub fn empty_reply() -> ClientError {
    ClientError::RemoteError {
        code: -1,
        message: "reply carried neither data nor error".to_string(),
    }
}
