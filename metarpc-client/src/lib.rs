//! Client core for a remote MetaTrader 5 terminal exposed over the MetaRPC
//! gateway.
//!
//! Three layers, each usable on its own:
//!
//! - [`account::Account`] - one method per remote operation, thin over the
//!   generated protobuf stubs.
//! - [`service::Service`] - the same operations in native Rust types, with
//!   per-call deadlines and broker-rejection translation.
//! - [`sugar::Sugar`] - composed, opinionated helpers (risk sizing, market
//!   orders from pips, history windows, health checks) built on top of
//!   [`service::Service`].
//!
//! All three share one [`session::Session`] and [`reconnect::ReconnectExecutor`],
//! so a transient transport failure anywhere is retried transparently
//! without the caller observing a dropped connection.

pub mod account;
pub mod config;
pub mod domain;
pub mod error;
pub mod reconnect;
pub mod retcode;
pub mod service;
pub mod session;
pub mod stream_manager;
pub mod sugar;
pub mod symbol;
pub mod transport;

pub use account::Account;
pub use config::{Config, Credentials, ServerBinding};
pub use error::ClientError;
pub use service::Service;
pub use sugar::Sugar;

pub use metarpc_proto as proto;
