use super::{support::unwrap_body, Account, DEADLINE_INFO};
use crate::error::ClientError;
use metarpc_proto::{
    market_book_add_reply, market_book_get_reply, market_book_release_reply, symbol_info_tick_reply, MarketBookGetData,
    MarketBookRequest, SymbolTickRequest, TickData,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn require_symbol(symbol: &str) -> Result<(), ClientError> {
    if symbol.trim().is_empty() {
        return Err(ClientError::invalid_argument("symbol must not be empty"));
    }
    Ok(())
}

impl Account {
    pub async fn symbol_info_tick(
        &self,
        symbol: &str,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<TickData, ClientError> {
        require_symbol(symbol)?;
        let deadline = Some(deadline.unwrap_or(DEADLINE_INFO));
        let symbol = symbol.to_string();
        self.executor
            .execute(cancel, deadline, move |mut transport, instance_id| {
                let symbol = symbol.clone();
                async move {
                    let reply = transport
                        .market_info
                        .symbol_info_tick(SymbolTickRequest {
                            terminal_instance_guid: instance_id.to_string(),
                            symbol,
                        })
                        .await?
                        .into_inner();
                    unwrap_body!(reply.body, symbol_info_tick_reply::Body)
                }
            })
            .await
    }

    pub async fn market_book_add(
        &self,
        symbol: &str,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<bool, ClientError> {
        self.market_book_request(symbol, cancel, deadline, |mut transport, request| async move {
            let reply = transport.market_info.market_book_add(request).await?.into_inner();
            unwrap_body!(reply.body, market_book_add_reply::Body)
        })
        .await
    }

    pub async fn market_book_release(
        &self,
        symbol: &str,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<bool, ClientError> {
        self.market_book_request(symbol, cancel, deadline, |mut transport, request| async move {
            let reply = transport.market_info.market_book_release(request).await?.into_inner();
            unwrap_body!(reply.body, market_book_release_reply::Body)
        })
        .await
    }

    pub async fn market_book_get(
        &self,
        symbol: &str,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<MarketBookGetData, ClientError> {
        self.market_book_request(symbol, cancel, deadline, |mut transport, request| async move {
            let reply = transport.market_info.market_book_get(request).await?.into_inner();
            unwrap_body!(reply.body, market_book_get_reply::Body)
        })
        .await
    }

    async fn market_book_request<F, Fut, T>(
        &self,
        symbol: &str,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
        call: F,
    ) -> Result<T, ClientError>
    where
        F: Fn(crate::transport::Transport, MarketBookRequest) -> Fut,
        Fut: std::future::Future<Output = Result<T, ClientError>>,
    {
        require_symbol(symbol)?;
        let deadline = Some(deadline.unwrap_or(DEADLINE_INFO));
        let symbol = symbol.to_string();
        self.executor
            .execute(cancel, deadline, move |transport, instance_id| {
                let request = MarketBookRequest {
                    terminal_instance_guid: instance_id.to_string(),
                    symbol: symbol.clone(),
                };
                call(transport, request)
            })
            .await
    }
}
