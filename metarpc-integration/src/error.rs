use thiserror::Error;
use tonic::Code;

/// Transport-level failure surfaced by a gRPC call, independent of whatever
/// business payload the call's tagged-union reply carries.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("gRPC channel construction failed: {0}")]
    Configuration(String),

    #[error("gRPC status {code:?}: {message}")]
    Status { code: Code, message: String },

    #[error("stream ended unexpectedly")]
    StreamClosed,
}

impl From<tonic::transport::Error> for TransportError {
    fn from(error: tonic::transport::Error) -> Self {
        Self::Configuration(error.to_string())
    }
}

impl From<tonic::Status> for TransportError {
    fn from(status: tonic::Status) -> Self {
        Self::Status {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

/// Classification of a [`TransportError`] used by the reconnect executor and
/// stream manager to decide whether a failure is safe to mask with a retry.
///
/// The exact set of wire codes that should be treated as transient is not
/// fully enumerated by the schema and must be derived empirically; this is
/// the single place that table lives.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TransportErrorKind {
    /// Channel-level failure: unavailable, reset, broken stream, or an
    /// instance identifier the gateway no longer recognises. Safe to retry
    /// after reconnecting.
    Transient,
    /// Anything else: caller-visible and never retried by the transport
    /// layer itself.
    Terminal,
}

impl TransportError {
    pub fn classify(&self) -> TransportErrorKind {
        match self {
            TransportError::Configuration(_) => TransportErrorKind::Terminal,
            TransportError::StreamClosed => TransportErrorKind::Transient,
            TransportError::Status { code, message } => classify_status(*code, message),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.classify() == TransportErrorKind::Transient
    }
}

fn classify_status(code: Code, message: &str) -> TransportErrorKind {
    match code {
        Code::Unavailable
        | Code::Aborted
        | Code::Cancelled
        | Code::DeadlineExceeded
        | Code::ResourceExhausted
        | Code::Internal => TransportErrorKind::Transient,
        // The gateway returns NotFound with this message when the instance
        // identifier it was given has expired or was never issued - a
        // reconnect (which mints a fresh identifier) resolves it.
        Code::NotFound if message.contains("terminal instance") => TransportErrorKind::Transient,
        _ => TransportErrorKind::Terminal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_is_transient() {
        let error = TransportError::Status {
            code: Code::Unavailable,
            message: "connection reset".into(),
        };
        assert_eq!(error.classify(), TransportErrorKind::Transient);
    }

    #[test]
    fn invalid_argument_is_terminal() {
        let error = TransportError::Status {
            code: Code::InvalidArgument,
            message: "bad symbol".into(),
        };
        assert_eq!(error.classify(), TransportErrorKind::Terminal);
    }

    #[test]
    fn unrecognised_instance_is_transient() {
        let error = TransportError::Status {
            code: Code::NotFound,
            message: "terminal instance not found".into(),
        };
        assert_eq!(error.classify(), TransportErrorKind::Transient);
    }
}
