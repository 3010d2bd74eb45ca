mod account_info;
mod market_info;
mod streams;
mod support;
mod symbol_info;
mod trading;

use crate::{config::Config, error::ClientError, reconnect::ReconnectExecutor, session::Session, stream_manager::StreamManager};
use std::time::Duration;

/// Fallback deadline used only if a call somehow reaches the
/// [`ReconnectExecutor`] with no deadline at all; every [`Account`] method
/// below supplies its own per-call-kind default before that can happen.
/// Streams have no deadline of their own - they run until cancelled or they
/// fail terminally.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Account-property queries, symbol-property queries, tick queries, and
/// depth-of-market snapshots: short, single round-trip reads.
pub const DEADLINE_INFO: Duration = Duration::from_secs(3);

/// Listings: open positions, pending orders, recent deal history.
pub const DEADLINE_LISTING: Duration = Duration::from_secs(5);

/// Bulk history: a full month or an arbitrary caller-chosen range.
pub const DEADLINE_HISTORY: Duration = Duration::from_secs(30);

/// Trading mutations (send/modify/close) and their prechecks
/// (check/calc-margin/calc-profit). Never extended past this by retry -
/// mutations use [`Account::order_send`]-style single-attempt dispatch.
pub const DEADLINE_TRADE: Duration = Duration::from_secs(20);

/// Walking the full symbol universe (many sequential `symbol_name`/
/// `symbol_params` calls composed by a caller or a higher facade).
pub const DEADLINE_SYMBOLS_ALL: Duration = Duration::from_secs(15);

/// Low-level facade: one method per remote operation, each a
/// thin wrapper that injects the current instance identifier, runs the call
/// through the [`ReconnectExecutor`], and unwraps the reply's tagged union.
/// Return types here are the generated protobuf DTOs verbatim; the
/// [`crate::service::Service`] facade is where native Rust types appear.
#[derive(Clone)]
pub struct Account {
    pub(crate) executor: ReconnectExecutor,
    pub(crate) streams: StreamManager,
}

impl Account {
    /// Builds a session for `config` without connecting; the first call
    /// (or an explicit [`Account::ping`]) triggers the connect protocol.
    pub fn new(config: Config) -> Self {
        let session = Session::new(config);
        let executor = ReconnectExecutor::new(session, DEFAULT_DEADLINE);
        let streams = StreamManager::new(executor.clone());
        Self { executor, streams }
    }

    /// Convenience constructor matching [`Account::new`] followed by an
    /// eager connect, for callers who want connect failures surfaced
    /// immediately rather than on first use.
    pub async fn connect(config: Config) -> Result<Self, ClientError> {
        let account = Self::new(config);
        account.executor.session().ensure_connected().await?;
        Ok(account)
    }

    pub async fn close(&self) {
        self.streams.close_all().await;
        self.executor.session().close().await;
    }

    pub async fn is_connected(&self) -> bool {
        self.executor.session().is_connected().await
    }

    /// Runs the connect protocol if not already connected, surfacing a
    /// `ConnectFailed`/`TransportTransient` immediately instead of waiting
    /// for the first real operation to discover it.
    pub async fn ensure_connected(&self) -> Result<(), ClientError> {
        self.executor.session().ensure_connected().await.map(|_| ())
    }
}
