mod support;

use metarpc_client::{
    account::Account,
    config::{Config, Credentials, ServerBinding},
    service::Service,
    sugar::Sugar,
};
use support::{open_position, spawn_mock_gateway};
use tokio_util::sync::CancellationToken;

fn test_config(addr: std::net::SocketAddr) -> Config {
    let credentials = Credentials::new(1, "password".to_string(), ServerBinding::host_port("127.0.0.1", addr.port()));
    Config::new(credentials).with_tls(false)
}

/// `close_all_positions` reports how many positions it actually closed, and
/// calling it again once the book is flat is a no-op that reports zero.
#[tokio::test]
async fn close_all_positions_is_idempotent() {
    let (addr, state) = spawn_mock_gateway().await;
    state
        .positions
        .lock()
        .unwrap()
        .extend([open_position(1, "EURUSD", 0.1), open_position(2, "GBPUSD", 0.2)]);

    let sugar = Sugar::new(Service::new(Account::new(test_config(addr))));
    let cancel = CancellationToken::new();

    let first = sugar.close_all_positions(&cancel, None).await.unwrap();
    assert_eq!(first, 2);
    assert!(state.positions.lock().unwrap().is_empty());

    let second = sugar.close_all_positions(&cancel, None).await.unwrap();
    assert_eq!(second, 0);
}
