use crate::{error::ClientError, reconnect::ReconnectExecutor, transport::Transport};
use futures::future::BoxFuture;
use metarpc_integration::backoff::{Backoff, BackoffPolicy};
use std::{
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    task::{Context, Poll},
};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Depth of a stream's consumer data queue. No silent drops: the
/// supervising task always `.await`s delivery, so a full queue
/// backpressures the transport read loop rather than discarding messages.
const DATA_QUEUE_CAPACITY: usize = 256;

/// One of the two lazy sequences a stream exposes: data items
/// carried on `data`, at most one terminal error carried on `errors`.
/// Exactly one of the two ever produces output for a given stream.
pub struct StreamHandle<T> {
    pub data: mpsc::Receiver<T>,
    pub errors: ErrorOnce,
    generation: Arc<AtomicU64>,
}

impl<T> StreamHandle<T> {
    /// Generation counter, incremented once per re-subscribe after a
    /// transient drop. Exposed for tests and diagnostics; zero means the
    /// stream has never dropped.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

/// A future yielding the stream's terminal error exactly once: a stream can
/// have at most one terminal failure, so this is never polled again after
/// resolving.
pub struct ErrorOnce(oneshot::Receiver<ClientError>);

impl std::future::Future for ErrorOnce {
    type Output = Option<ClientError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx).map(Result::ok)
    }
}

type SubscribeFn<Args, Msg> =
    Arc<dyn Fn(Transport, Uuid, Args) -> BoxFuture<'static, Result<tonic::Streaming<Msg>, ClientError>> + Send + Sync>;
type ExtractFn<Msg, T> = Arc<dyn Fn(Msg) -> Result<T, ClientError> + Send + Sync>;

/// Owns every long-lived server-push stream's lifecycle: one
/// supervising task per active stream, re-subscribing after transport drops
/// and demultiplexing messages into the consumer's queue.
#[derive(Clone)]
pub struct StreamManager {
    executor: ReconnectExecutor,
    registry: Arc<Mutex<Vec<tokio::task::JoinHandle<()>>>>,
}

impl StreamManager {
    pub fn new(executor: ReconnectExecutor) -> Self {
        Self {
            executor,
            registry: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Starts a stream with the given arguments. `subscribe` opens the
    /// underlying server-push handle for the current instance identifier;
    /// `extract` unwraps each message's tagged union into a typed item or a
    /// terminal [`ClientError`].
    pub async fn start<Args, Msg, T>(
        &self,
        args: Args,
        cancel: CancellationToken,
        subscribe: impl Fn(Transport, Uuid, Args) -> BoxFuture<'static, Result<tonic::Streaming<Msg>, ClientError>>
            + Send
            + Sync
            + 'static,
        extract: impl Fn(Msg) -> Result<T, ClientError> + Send + Sync + 'static,
    ) -> StreamHandle<T>
    where
        Args: Clone + Send + 'static,
        Msg: Send + 'static,
        T: Send + 'static,
    {
        let (data_tx, data_rx) = mpsc::channel(DATA_QUEUE_CAPACITY);
        let (error_tx, error_rx) = oneshot::channel();
        let generation = Arc::new(AtomicU64::new(0));

        let task = tokio::spawn(supervise(
            self.executor.clone(),
            args,
            Arc::new(subscribe) as SubscribeFn<Args, Msg>,
            Arc::new(extract) as ExtractFn<Msg, T>,
            data_tx,
            error_tx,
            generation.clone(),
            cancel,
        ));

        self.registry.lock().await.push(task);
        self.reap_finished().await;

        StreamHandle {
            data: data_rx,
            errors: ErrorOnce(error_rx),
            generation,
        }
    }

    async fn reap_finished(&self) {
        let mut guard = self.registry.lock().await;
        guard.retain(|handle| !handle.is_finished());
    }

    /// Cancels every supervising task this manager owns. Called when the
    /// owning Account is closed ("Closing the Account closes all supervising tasks and their handles").
    pub async fn close_all(&self) {
        let handles = std::mem::take(&mut *self.registry.lock().await);
        for handle in handles {
            handle.abort();
        }
    }
}

async fn supervise<Args, Msg, T>(
    executor: ReconnectExecutor,
    args: Args,
    subscribe: SubscribeFn<Args, Msg>,
    extract: ExtractFn<Msg, T>,
    data_tx: mpsc::Sender<T>,
    error_tx: oneshot::Sender<ClientError>,
    generation: Arc<AtomicU64>,
    cancel: CancellationToken,
) where
    Args: Clone + Send + 'static,
    Msg: Send + 'static,
    T: Send + 'static,
{
    let mut backoff = Backoff::from(BackoffPolicy::default());
    let mut first_attempt = true;

    loop {
        if cancel.is_cancelled() {
            return;
        }

        let connected = tokio::select! {
            result = executor.session().ensure_connected() => result,
            _ = cancel.cancelled() => return,
        };

        let (transport, instance_id) = match connected {
            Ok(pair) => pair,
            Err(error) if error.is_retriable() => {
                warn!(?error, "stream could not reconnect session, backing off");
                if !backoff.sleep(&cancel).await {
                    return;
                }
                continue;
            }
            Err(error) => {
                let _ = error_tx.send(error);
                return;
            }
        };

        let stream = tokio::select! {
            result = subscribe(transport, instance_id, args.clone()) => result,
            _ = cancel.cancelled() => return,
        };

        let mut stream = match stream {
            Ok(stream) => stream,
            Err(error) if error.is_retriable() => {
                executor.session().mark_disconnected().await;
                warn!(?error, "stream subscribe failed transiently, retrying");
                if !backoff.sleep(&cancel).await {
                    return;
                }
                continue;
            }
            Err(error) => {
                let _ = error_tx.send(error);
                return;
            }
        };

        if !first_attempt {
            generation.fetch_add(1, Ordering::AcqRel);
            info!(generation = generation.load(Ordering::Acquire), "stream re-subscribed");
        }
        first_attempt = false;
        backoff.reset();

        loop {
            let next = tokio::select! {
                message = stream.message() => message,
                _ = cancel.cancelled() => return,
            };

            match next {
                Ok(Some(message)) => match extract(message) {
                    Ok(item) => {
                        if data_tx.send(item).await.is_err() {
                            // consumer dropped the handle; safe to stop.
                            return;
                        }
                    }
                    Err(error) => {
                        let _ = error_tx.send(error);
                        return;
                    }
                },
                Ok(None) => {
                    executor.session().mark_disconnected().await;
                    warn!("stream closed by broker, will re-subscribe");
                    break;
                }
                Err(status) => {
                    let error = ClientError::from(status);
                    if error.is_retriable() {
                        executor.session().mark_disconnected().await;
                        warn!(?error, "stream dropped, will re-subscribe");
                        break;
                    }
                    let _ = error_tx.send(error);
                    return;
                }
            }
        }

        if !backoff.sleep(&cancel).await {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_starts_at_zero() {
        let generation = Arc::new(AtomicU64::new(0));
        assert_eq!(generation.load(Ordering::Acquire), 0);
    }
}
