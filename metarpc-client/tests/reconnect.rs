mod support;

use metarpc_client::{
    account::Account,
    config::{Config, Credentials, ServerBinding},
};
use std::sync::atomic::Ordering;
use support::spawn_mock_gateway;
use tokio_util::sync::CancellationToken;

fn test_config(addr: std::net::SocketAddr) -> Config {
    let credentials = Credentials::new(1, "password".to_string(), ServerBinding::host_port("127.0.0.1", addr.port()));
    Config::new(credentials).with_tls(false)
}

/// a unary call survives a bounded run of transient
/// transport failures and returns the same result a healthy gateway would.
#[tokio::test]
async fn ping_retries_through_transient_unavailable() {
    let (addr, state) = spawn_mock_gateway().await;
    state.ping_failures_remaining.store(2, Ordering::SeqCst);

    let account = Account::new(test_config(addr));
    let cancel = CancellationToken::new();

    let result = account.ping(&cancel, None).await;

    assert_eq!(result, Ok(true));
    assert!(state.ping_calls.load(Ordering::SeqCst) >= 3);
}

/// cancelling before the call starts never reaches the
/// network.
#[tokio::test]
async fn ping_observes_pre_cancelled_token() {
    let (addr, _state) = spawn_mock_gateway().await;
    let account = Account::new(test_config(addr));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = account.ping(&cancel, None).await;

    assert_eq!(result, Err(metarpc_client::ClientError::Cancelled));
}

/// a dial failure against an address nothing is listening on is a
/// configuration-shaped failure, not a transient one - it is surfaced
/// immediately rather than retried until the deadline.
#[tokio::test]
async fn ping_against_unreachable_endpoint_fails_fast() {
    let unused_addr = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let account = Account::new(test_config(unused_addr));
    let cancel = CancellationToken::new();

    let result = account.ping(&cancel, Some(std::time::Duration::from_secs(5))).await;

    assert!(matches!(result, Err(metarpc_client::ClientError::ConnectFailed(_))));
}
