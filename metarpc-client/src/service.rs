use crate::{
    account::Account,
    domain::{AccountSummary, Deal, OrderReceipt, PendingOrder, Position, Tick},
    error::ClientError,
    retcode,
    symbol::{Direction, SymbolName, SymbolSpec, VolumeEnvelope},
};
use chrono::{DateTime, Utc};
use metarpc_proto::{PositionSort, TradeOperation};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Mid-level facade: native Rust types in and out, per-call
/// deadlines, and the translation from a trade mutation's return code into
/// [`ClientError::BrokerRejected`]. Thin over [`Account`] - no composed
/// multi-call behaviour lives here, that's the Sugar facade's job.
#[derive(Clone)]
pub struct Service {
    pub(crate) account: Account,
}

impl Service {
    pub fn new(account: Account) -> Self {
        Self { account }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub async fn account_summary(&self, cancel: &CancellationToken, deadline: Option<Duration>) -> Result<AccountSummary, ClientError> {
        Ok(self.account.account_summary(cancel, deadline).await?.into())
    }

    pub async fn tick(&self, symbol: &SymbolName, cancel: &CancellationToken, deadline: Option<Duration>) -> Result<Tick, ClientError> {
        Ok(self.account.symbol_info_tick(symbol.as_str(), cancel, deadline).await?.into())
    }

    pub async fn symbol_spec(&self, symbol: &SymbolName, cancel: &CancellationToken, deadline: Option<Duration>) -> Result<SymbolSpec, ClientError> {
        let data = self.account.symbol_params(symbol.as_str(), cancel, deadline).await?;
        Ok(SymbolSpec {
            symbol: SymbolName::new(data.symbol),
            point: data.point,
            digits: data.digits,
            volume: VolumeEnvelope {
                min: data.volume_min,
                max: data.volume_max,
                step: data.volume_step,
            },
            contract_size: data.contract_size,
            stops_level_points: data.stops_level,
            trade_allowed: data.trade_allowed,
        })
    }

    pub async fn positions(&self, cancel: &CancellationToken, deadline: Option<Duration>) -> Result<Vec<Position>, ClientError> {
        let data = self.account.positions_get(PositionSort::ByOpenTime, cancel, deadline).await?;
        Ok(data.positions.into_iter().map(Position::from).collect())
    }

    pub async fn orders(&self, cancel: &CancellationToken, deadline: Option<Duration>) -> Result<Vec<PendingOrder>, ClientError> {
        let data = self.account.orders_get(PositionSort::ByOpenTime, cancel, deadline).await?;
        Ok(data.orders.into_iter().map(PendingOrder::from).collect())
    }

    pub async fn history(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<Vec<Deal>, ClientError> {
        if to < from {
            return Err(ClientError::invalid_argument("history window end precedes start"));
        }
        let data = self
            .account
            .history_deals_get(from.timestamp_millis(), to.timestamp_millis(), cancel, deadline)
            .await?;
        Ok(data.deals.into_iter().map(Deal::from).collect())
    }

    pub async fn order_check(
        &self,
        symbol: &SymbolName,
        direction: Direction,
        volume: f64,
        price: f64,
        sl: f64,
        tp: f64,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<metarpc_proto::OrderCheckData, ClientError> {
        self.account
            .order_check(symbol.as_str(), operation_for(direction), volume, price, sl, tp, cancel, deadline)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn order_send(
        &self,
        symbol: &SymbolName,
        direction: Direction,
        volume: f64,
        price: f64,
        sl: f64,
        tp: f64,
        deviation: u64,
        comment: &str,
        magic: u64,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<OrderReceipt, ClientError> {
        let data = self
            .account
            .order_send(
                symbol.as_str(),
                operation_for(direction),
                volume,
                price,
                sl,
                tp,
                deviation,
                comment,
                magic,
                cancel,
                deadline,
            )
            .await?;
        accept_or_reject(data)
    }

    pub async fn order_modify(
        &self,
        ticket: u64,
        price: f64,
        sl: f64,
        tp: f64,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<OrderReceipt, ClientError> {
        let data = self.account.order_modify(ticket, price, sl, tp, cancel, deadline).await?;
        accept_or_reject(data)
    }

    pub async fn order_close(
        &self,
        ticket: u64,
        volume: f64,
        deviation: u64,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<OrderReceipt, ClientError> {
        let data = self.account.order_close(ticket, volume, deviation, cancel, deadline).await?;
        accept_or_reject(data)
    }
}

fn operation_for(direction: Direction) -> TradeOperation {
    match direction {
        Direction::Buy => TradeOperation::Buy,
        Direction::Sell => TradeOperation::Sell,
    }
}

/// Turns a trade server's return code into either the receipt or a
/// [`ClientError::BrokerRejected`] (a broker decision, never retried).
fn accept_or_reject(data: metarpc_proto::OrderSendData) -> Result<OrderReceipt, ClientError> {
    if retcode::is_success(data.retcode) {
        Ok(OrderReceipt::from(data))
    } else {
        Err(ClientError::BrokerRejected {
            retcode: data.retcode,
            description: retcode::describe(data.retcode).to_string(),
        })
    }
}
