use super::{support::unwrap_body, Account, DEADLINE_HISTORY, DEADLINE_LISTING, DEADLINE_TRADE};
use crate::error::ClientError;
use metarpc_integration::backoff::{Backoff, BackoffPolicy};
use metarpc_proto::{
    history_deals_get_reply, order_calc_margin_reply, order_calc_profit_reply, order_check_reply, orders_get_reply,
    orders_total_reply, positions_get_reply, positions_total_reply, HistoryDealsGetData, HistoryDealsGetRequest,
    OrderCalcMarginRequest, OrderCalcProfitRequest, OrderCheckData, OrderCheckRequest, OrderCloseRequest,
    OrderModifyRequest, OrderSendData, OrderSendRequest, OrdersGetData, OrdersGetRequest, PositionSort,
    PositionsGetData, PositionsGetRequest, TerminalRequest, TradeOperation,
};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

fn require_symbol(symbol: &str) -> Result<(), ClientError> {
    if symbol.trim().is_empty() {
        return Err(ClientError::invalid_argument("symbol must not be empty"));
    }
    Ok(())
}

fn require_positive_volume(volume: f64) -> Result<(), ClientError> {
    if volume <= 0.0 {
        return Err(ClientError::invalid_argument("volume must be positive"));
    }
    Ok(())
}

impl Account {
    pub async fn order_check(
        &self,
        symbol: &str,
        operation: TradeOperation,
        volume: f64,
        price: f64,
        sl: f64,
        tp: f64,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<OrderCheckData, ClientError> {
        require_symbol(symbol)?;
        require_positive_volume(volume)?;
        let deadline = Some(deadline.unwrap_or(DEADLINE_TRADE));
        let symbol = symbol.to_string();
        self.executor
            .execute(cancel, deadline, move |mut transport, instance_id| {
                let symbol = symbol.clone();
                async move {
                    let reply = transport
                        .trade_functions
                        .order_check(OrderCheckRequest {
                            terminal_instance_guid: instance_id.to_string(),
                            symbol,
                            operation: operation as i32,
                            volume,
                            price,
                            sl,
                            tp,
                        })
                        .await?
                        .into_inner();
                    unwrap_body!(reply.body, order_check_reply::Body)
                }
            })
            .await
    }

    pub async fn order_calc_margin(
        &self,
        symbol: &str,
        operation: TradeOperation,
        volume: f64,
        price: f64,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<f64, ClientError> {
        require_symbol(symbol)?;
        require_positive_volume(volume)?;
        let deadline = Some(deadline.unwrap_or(DEADLINE_TRADE));
        let symbol = symbol.to_string();
        self.executor
            .execute(cancel, deadline, move |mut transport, instance_id| {
                let symbol = symbol.clone();
                async move {
                    let reply = transport
                        .trade_functions
                        .order_calc_margin(OrderCalcMarginRequest {
                            terminal_instance_guid: instance_id.to_string(),
                            symbol,
                            operation: operation as i32,
                            volume,
                            price,
                        })
                        .await?
                        .into_inner();
                    unwrap_body!(reply.body, order_calc_margin_reply::Body)
                }
            })
            .await
    }

    pub async fn order_calc_profit(
        &self,
        symbol: &str,
        operation: TradeOperation,
        volume: f64,
        price_open: f64,
        price_close: f64,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<f64, ClientError> {
        require_symbol(symbol)?;
        require_positive_volume(volume)?;
        let deadline = Some(deadline.unwrap_or(DEADLINE_TRADE));
        let symbol = symbol.to_string();
        self.executor
            .execute(cancel, deadline, move |mut transport, instance_id| {
                let symbol = symbol.clone();
                async move {
                    let reply = transport
                        .trade_functions
                        .order_calc_profit(OrderCalcProfitRequest {
                            terminal_instance_guid: instance_id.to_string(),
                            symbol,
                            operation: operation as i32,
                            volume,
                            price_open,
                            price_close,
                        })
                        .await?
                        .into_inner();
                    unwrap_body!(reply.body, order_calc_profit_reply::Body)
                }
            })
            .await
    }

    /// Places an order. Deliberately **not** retried by the reconnect
    /// executor: resending an `OrderSend` after a transport drop risks a
    /// duplicate fill. A transient failure here always surfaces as
    /// [`ClientError::IndeterminateOrder`] so the caller reconciles by
    /// reading positions rather than assuming a retry is safe.
    #[allow(clippy::too_many_arguments)]
    pub async fn order_send(
        &self,
        symbol: &str,
        operation: TradeOperation,
        volume: f64,
        price: f64,
        sl: f64,
        tp: f64,
        deviation: u64,
        comment: &str,
        magic: u64,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<OrderSendData, ClientError> {
        require_symbol(symbol)?;
        require_positive_volume(volume)?;
        let request = OrderSendRequest {
            terminal_instance_guid: String::new(),
            symbol: symbol.to_string(),
            operation: operation as i32,
            volume,
            price,
            sl,
            tp,
            deviation,
            comment: comment.to_string(),
            magic,
        };
        self.mutate_once(cancel, deadline, request, |mut transport, request| async move {
            let reply = transport.trade_functions.order_send(request).await?.into_inner();
            unwrap_body!(reply.body, metarpc_proto::order_send_reply::Body)
        })
        .await
    }

    /// Modifies an open order's price/SL/TP. Same non-retry policy as
    /// [`Account::order_send`].
    pub async fn order_modify(
        &self,
        ticket: u64,
        price: f64,
        sl: f64,
        tp: f64,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<OrderSendData, ClientError> {
        let request = OrderModifyRequest {
            terminal_instance_guid: String::new(),
            ticket,
            price,
            sl,
            tp,
        };
        self.mutate_once(cancel, deadline, request, |mut transport, request| async move {
            let reply = transport.trade_functions.order_modify(request).await?.into_inner();
            unwrap_body!(reply.body, metarpc_proto::order_modify_reply::Body)
        })
        .await
    }

    /// Closes (partially or fully) an open position. Same non-retry policy
    /// as [`Account::order_send`].
    pub async fn order_close(
        &self,
        ticket: u64,
        volume: f64,
        deviation: u64,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<OrderSendData, ClientError> {
        require_positive_volume(volume)?;
        let request = OrderCloseRequest {
            terminal_instance_guid: String::new(),
            ticket,
            volume,
            deviation,
        };
        self.mutate_once(cancel, deadline, request, |mut transport, request| async move {
            let reply = transport.trade_functions.order_close(request).await?.into_inner();
            unwrap_body!(reply.body, metarpc_proto::order_close_reply::Body)
        })
        .await
    }

    pub async fn positions_total(&self, cancel: &CancellationToken, deadline: Option<Duration>) -> Result<i32, ClientError> {
        let deadline = Some(deadline.unwrap_or(DEADLINE_LISTING));
        self.terminal_call(cancel, deadline, |mut transport, request| async move {
            let reply = transport.trade_functions.positions_total(request).await?.into_inner();
            unwrap_body!(reply.body, positions_total_reply::Body)
        })
        .await
    }

    pub async fn positions_get(
        &self,
        sort_mode: PositionSort,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<PositionsGetData, ClientError> {
        let deadline = Some(deadline.unwrap_or(DEADLINE_LISTING));
        self.executor
            .execute(cancel, deadline, move |mut transport, instance_id| async move {
                let reply = transport
                    .trade_functions
                    .positions_get(PositionsGetRequest {
                        terminal_instance_guid: instance_id.to_string(),
                        sort_mode: sort_mode as i32,
                    })
                    .await?
                    .into_inner();
                unwrap_body!(reply.body, positions_get_reply::Body)
            })
            .await
    }

    pub async fn orders_total(&self, cancel: &CancellationToken, deadline: Option<Duration>) -> Result<i32, ClientError> {
        let deadline = Some(deadline.unwrap_or(DEADLINE_LISTING));
        self.terminal_call(cancel, deadline, |mut transport, request| async move {
            let reply = transport.trade_functions.orders_total(request).await?.into_inner();
            unwrap_body!(reply.body, orders_total_reply::Body)
        })
        .await
    }

    pub async fn orders_get(
        &self,
        sort_mode: PositionSort,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<OrdersGetData, ClientError> {
        let deadline = Some(deadline.unwrap_or(DEADLINE_LISTING));
        self.executor
            .execute(cancel, deadline, move |mut transport, instance_id| async move {
                let reply = transport
                    .trade_functions
                    .orders_get(OrdersGetRequest {
                        terminal_instance_guid: instance_id.to_string(),
                        sort_mode: sort_mode as i32,
                    })
                    .await?
                    .into_inner();
                unwrap_body!(reply.body, orders_get_reply::Body)
            })
            .await
    }

    pub async fn history_deals_get(
        &self,
        from_msc: i64,
        to_msc: i64,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<HistoryDealsGetData, ClientError> {
        let deadline = Some(deadline.unwrap_or(DEADLINE_HISTORY));
        self.executor
            .execute(cancel, deadline, move |mut transport, instance_id| async move {
                let reply = transport
                    .trade_functions
                    .history_deals_get(HistoryDealsGetRequest {
                        terminal_instance_guid: instance_id.to_string(),
                        from_msc,
                        to_msc,
                    })
                    .await?
                    .into_inner();
                unwrap_body!(reply.body, history_deals_get_reply::Body)
            })
            .await
    }

    async fn terminal_call<F, Fut, T>(&self, cancel: &CancellationToken, deadline: Option<Duration>, call: F) -> Result<T, ClientError>
    where
        F: Fn(crate::transport::Transport, TerminalRequest) -> Fut,
        Fut: std::future::Future<Output = Result<T, ClientError>>,
    {
        self.executor
            .execute(cancel, deadline, move |transport, instance_id| {
                call(
                    transport,
                    TerminalRequest {
                        terminal_instance_guid: instance_id.to_string(),
                    },
                )
            })
            .await
    }

    /// Runs a trade-mutating call: connects (retrying transient failures,
    /// since nothing has reached the broker yet), then issues the request
    /// exactly once. A transient failure while still connecting is retried
    /// like any other unary call; a transient failure from the send itself
    /// becomes [`ClientError::IndeterminateOrder`] instead of a silent
    /// resend, since by then the broker may already have processed it.
    async fn mutate_once<Req, F, Fut, T>(
        &self,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
        mut request: Req,
        call: F,
    ) -> Result<T, ClientError>
    where
        Req: HasInstanceGuid,
        F: FnOnce(crate::transport::Transport, Req) -> Fut,
        Fut: std::future::Future<Output = Result<T, ClientError>>,
    {
        let deadline = deadline.unwrap_or(DEADLINE_TRADE);
        let start = Instant::now();
        let mut backoff = Backoff::from(BackoffPolicy::default());

        let (transport, instance_id) = loop {
            if cancel.is_cancelled() {
                return Err(ClientError::Cancelled);
            }
            if start.elapsed() >= deadline {
                return Err(ClientError::Timeout {
                    last_cause: "deadline exceeded while connecting for order mutation".to_string(),
                });
            }

            let connected = tokio::select! {
                result = self.executor.session().ensure_connected() => result,
                _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            };

            match connected {
                Ok(pair) => break pair,
                Err(error) if error.is_retriable() => {
                    warn!(?error, "ensure_connected failed transiently before sending order, retrying");
                    if !backoff.sleep(cancel).await {
                        return Err(ClientError::Cancelled);
                    }
                    continue;
                }
                Err(error) => return Err(error),
            }
        };

        request.set_instance_guid(instance_id.to_string());
        let remaining = deadline.saturating_sub(start.elapsed());

        let attempt = async move {
            tokio::select! {
                result = call(transport, request) => result,
                _ = cancel.cancelled() => Err(ClientError::Cancelled),
            }
        };

        let outcome = match tokio::time::timeout(remaining, attempt).await {
            Ok(outcome) => outcome,
            Err(_) => {
                return Err(ClientError::IndeterminateOrder {
                    ticket: None,
                    reason: "deadline exceeded waiting for order mutation acknowledgement".to_string(),
                })
            }
        };

        match outcome {
            Ok(value) => Ok(value),
            Err(ClientError::Cancelled) => Err(ClientError::Cancelled),
            Err(error) if error.is_retriable() => {
                self.executor.session().mark_disconnected().await;
                Err(ClientError::IndeterminateOrder {
                    ticket: None,
                    reason: error.to_string(),
                })
            }
            Err(error) => Err(error),
        }
    }
}

trait HasInstanceGuid {
    fn set_instance_guid(&mut self, guid: String);
}

impl HasInstanceGuid for OrderSendRequest {
    fn set_instance_guid(&mut self, guid: String) {
        self.terminal_instance_guid = guid;
    }
}

impl HasInstanceGuid for OrderModifyRequest {
    fn set_instance_guid(&mut self, guid: String) {
        self.terminal_instance_guid = guid;
    }
}

impl HasInstanceGuid for OrderCloseRequest {
    fn set_instance_guid(&mut self, guid: String) {
        self.terminal_instance_guid = guid;
    }
}
