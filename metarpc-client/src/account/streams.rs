use super::{support::unwrap_body, Account};
use crate::{error::ClientError, stream_manager::StreamHandle, transport::Transport};
use futures::FutureExt;
use metarpc_proto::{
    market_depth_reply, on_account_property_reply, on_symbol_tick_reply, on_trade_reply, on_trade_transaction_reply,
    positions_and_orders_tickets_reply, AccountPropertyData, MarketBookGetData, MarketDepthRequest,
    OnSymbolTickRequest, PositionData, PositionsAndOrdersTicketsData, TerminalRequest, TickData,
    TradeTransactionData,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

impl Account {
    /// Long-lived tick stream for the given symbols.
    /// Transparently re-subscribes after a transport drop; the returned
    /// handle's generation counter advances by one per re-subscribe.
    pub async fn on_symbol_tick(&self, symbols: Vec<String>, cancel: CancellationToken) -> StreamHandle<TickData> {
        self.streams
            .start(
                symbols,
                cancel,
                |mut transport: Transport, instance_id: Uuid, symbols: Vec<String>| {
                    async move {
                        let stream = transport
                            .streaming
                            .on_symbol_tick(OnSymbolTickRequest {
                                terminal_instance_guid: instance_id.to_string(),
                                symbols,
                            })
                            .await?
                            .into_inner();
                        Ok(stream)
                    }
                    .boxed()
                },
                |message| unwrap_body!(message.body, on_symbol_tick_reply::Body),
            )
            .await
    }

    /// Fires once per open-position change (fill, modify, close).
    pub async fn on_trade(&self, cancel: CancellationToken) -> StreamHandle<PositionData> {
        self.streams
            .start(
                (),
                cancel,
                |mut transport: Transport, instance_id: Uuid, ()| {
                    terminal_stream(instance_id, move |request| async move {
                        transport.streaming.on_trade(request).await.map(tonic::Response::into_inner)
                    })
                },
                |message| unwrap_body!(message.body, on_trade_reply::Body),
            )
            .await
    }

    /// Fires whenever the set of live position or pending-order tickets
    /// changes - a cheap way to detect new/closed positions without polling.
    pub async fn on_positions_and_pending_orders_tickets(
        &self,
        cancel: CancellationToken,
    ) -> StreamHandle<PositionsAndOrdersTicketsData> {
        self.streams
            .start(
                (),
                cancel,
                |mut transport: Transport, instance_id: Uuid, ()| {
                    terminal_stream(instance_id, move |request| async move {
                        transport
                            .streaming
                            .on_positions_and_pending_orders_tickets(request)
                            .await
                            .map(tonic::Response::into_inner)
                    })
                },
                |message| unwrap_body!(message.body, positions_and_orders_tickets_reply::Body),
            )
            .await
    }

    /// Raw trade-transaction feed (order accept/reject/fill events as the
    /// terminal emits them, before this crate's own reconciliation).
    pub async fn on_trade_transaction(&self, cancel: CancellationToken) -> StreamHandle<TradeTransactionData> {
        self.streams
            .start(
                (),
                cancel,
                |mut transport: Transport, instance_id: Uuid, ()| {
                    terminal_stream(instance_id, move |request| async move {
                        transport.streaming.on_trade_transaction(request).await.map(tonic::Response::into_inner)
                    })
                },
                |message| unwrap_body!(message.body, on_trade_transaction_reply::Body),
            )
            .await
    }

    /// Balance/equity/margin push feed, used by the Sugar facade's
    /// wait-for-price and health-check helpers to avoid polling.
    pub async fn on_account_property(&self, cancel: CancellationToken) -> StreamHandle<AccountPropertyData> {
        self.streams
            .start(
                (),
                cancel,
                |mut transport: Transport, instance_id: Uuid, ()| {
                    terminal_stream(instance_id, move |request| async move {
                        transport.streaming.on_account_property(request).await.map(tonic::Response::into_inner)
                    })
                },
                |message| unwrap_body!(message.body, on_account_property_reply::Body),
            )
            .await
    }

    /// Order-book depth stream for one symbol, served by the gateway's
    /// `Subscription` service - distinct from `Streaming` only at the wire
    /// level.
    pub async fn on_market_depth(&self, symbol: String, cancel: CancellationToken) -> StreamHandle<MarketBookGetData> {
        self.streams
            .start(
                symbol,
                cancel,
                |mut transport: Transport, instance_id: Uuid, symbol: String| {
                    async move {
                        let stream = transport
                            .subscription
                            .on_market_depth(MarketDepthRequest {
                                terminal_instance_guid: instance_id.to_string(),
                                symbol,
                            })
                            .await?
                            .into_inner();
                        Ok(stream)
                    }
                    .boxed()
                },
                |message| unwrap_body!(message.body, market_depth_reply::Body),
            )
            .await
    }
}

/// Shared plumbing for the four zero-argument `Streaming` RPCs: build the
/// `TerminalRequest` and box the call.
fn terminal_stream<Msg, F, Fut>(
    instance_id: Uuid,
    call: F,
) -> futures::future::BoxFuture<'static, Result<tonic::Streaming<Msg>, ClientError>>
where
    F: FnOnce(TerminalRequest) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<tonic::Streaming<Msg>, tonic::Status>> + Send + 'static,
    Msg: Send + 'static,
{
    async move {
        let request = TerminalRequest {
            terminal_instance_guid: instance_id.to_string(),
        };
        call(request).await.map_err(ClientError::from)
    }
    .boxed()
}
