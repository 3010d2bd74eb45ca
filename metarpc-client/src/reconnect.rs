use crate::{error::ClientError, session::Session, transport::Transport};
use metarpc_integration::backoff::{Backoff, BackoffPolicy};
use std::{future::Future, time::Duration};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

/// Makes every unary operation appear to succeed whenever the transport is
/// merely flaky. Wraps an operation descriptor - a pure function
/// from `(current stubs, instance id)` to a typed response - with a
/// retry-on-transient-failure loop that re-establishes the [`Session`]
/// before each retry.
#[derive(Clone)]
pub struct ReconnectExecutor {
    session: Session,
    default_deadline: Duration,
}

impl ReconnectExecutor {
    pub fn new(session: Session, default_deadline: Duration) -> Self {
        Self {
            session,
            default_deadline,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs `descriptor` against a connected transport, retrying on
    /// transient transport failure until `deadline` (or the executor's
    /// default) elapses or `cancel` fires.
    pub async fn execute<F, Fut, T>(
        &self,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
        mut descriptor: F,
    ) -> Result<T, ClientError>
    where
        F: FnMut(Transport, Uuid) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let deadline = deadline.unwrap_or(self.default_deadline);
        let start = Instant::now();
        let mut backoff = Backoff::from(BackoffPolicy::default());
        let mut last_cause: Option<ClientError> = None;

        loop {
            if cancel.is_cancelled() {
                return Err(ClientError::Cancelled);
            }

            if start.elapsed() >= deadline {
                return Err(timeout(last_cause));
            }

            let connected = tokio::select! {
                result = self.session.ensure_connected() => result,
                _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            };

            let (transport, instance_id) = match connected {
                Ok(pair) => pair,
                Err(error) if error.is_retriable() => {
                    warn!(?error, "ensure_connected failed transiently, retrying");
                    last_cause = Some(error);
                    if !backoff.sleep(cancel).await {
                        return Err(ClientError::Cancelled);
                    }
                    continue;
                }
                Err(error) => return Err(error),
            };

            let outcome = tokio::select! {
                result = descriptor(transport, instance_id) => result,
                _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(ClientError::Cancelled) => return Err(ClientError::Cancelled),
                Err(error) if error.is_retriable() => {
                    debug!(?error, "operation failed transiently, reconnecting");
                    self.session.mark_disconnected().await;
                    last_cause = Some(error);

                    if start.elapsed() >= deadline {
                        return Err(timeout(last_cause));
                    }
                    if !backoff.sleep(cancel).await {
                        return Err(ClientError::Cancelled);
                    }
                    continue;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

fn timeout(last_cause: Option<ClientError>) -> ClientError {
    ClientError::Timeout {
        last_cause: last_cause
            .map(|error| error.to_string())
            .unwrap_or_else(|| "deadline exceeded before any attempt completed".to_string()),
    }
}
