use metarpc_proto::{
    account_helper_client::AccountHelperClient, account_information_client::AccountInformationClient,
    connection_client::ConnectionClient, market_info_client::MarketInfoClient,
    streaming_client::StreamingClient, subscription_client::SubscriptionClient,
    symbol_info_client::SymbolInfoClient, trade_functions_client::TradeFunctionsClient,
};
use std::time::Duration;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};

use crate::error::ClientError;

/// Owns exactly one secure multiplexed channel to the gateway endpoint and
/// one stub per remote service group. Reconnect rotates this one
/// object rather than N independent client handles.
#[derive(Debug, Clone)]
pub struct Transport {
    pub connection: ConnectionClient<Channel>,
    pub account_helper: AccountHelperClient<Channel>,
    pub account_information: AccountInformationClient<Channel>,
    pub symbol_info: SymbolInfoClient<Channel>,
    pub market_info: MarketInfoClient<Channel>,
    pub trade_functions: TradeFunctionsClient<Channel>,
    pub streaming: StreamingClient<Channel>,
    pub subscription: SubscriptionClient<Channel>,
}

impl Transport {
    /// Opens the channel and constructs every stub. Fails with a
    /// configuration-error kind when the endpoint is malformed or the TLS
    /// material cannot be loaded; all other failures surface only through
    /// operation calls made on the returned stubs.
    pub async fn connect(endpoint: &str, connect_timeout: Duration, tls: bool) -> Result<Self, ClientError> {
        let scheme = if tls { "https" } else { "http" };
        let uri = format!("{scheme}://{endpoint}");
        let mut endpoint = Endpoint::from_shared(uri)
            .map_err(|error| ClientError::ConnectFailed(format!("malformed endpoint: {error}")))?
            .connect_timeout(connect_timeout)
            .tcp_keepalive(Some(Duration::from_secs(30)));

        if tls {
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new().with_native_roots())
                .map_err(|error| ClientError::ConnectFailed(format!("TLS setup failed: {error}")))?;
        }

        let channel = endpoint
            .connect()
            .await
            .map_err(|error| ClientError::ConnectFailed(error.to_string()))?;

        Ok(Self {
            connection: ConnectionClient::new(channel.clone()),
            account_helper: AccountHelperClient::new(channel.clone()),
            account_information: AccountInformationClient::new(channel.clone()),
            symbol_info: SymbolInfoClient::new(channel.clone()),
            market_info: MarketInfoClient::new(channel.clone()),
            trade_functions: TradeFunctionsClient::new(channel.clone()),
            streaming: StreamingClient::new(channel.clone()),
            subscription: SubscriptionClient::new(channel),
        })
    }
}
