use super::risk::sl_tp_from_pips;
use super::Sugar;
use crate::{domain::OrderReceipt, error::ClientError, symbol::Direction, symbol::SymbolName};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

const DEFAULT_DEVIATION_POINTS: u64 = 10;

impl Sugar {
    /// Opens a market position at the current ask/bid, with SL/TP expressed
    /// in pips rather than absolute prices (`MarketBuy`/`MarketSell`).
    #[allow(clippy::too_many_arguments)]
    pub async fn market_order(
        &self,
        symbol: &SymbolName,
        direction: Direction,
        volume: f64,
        sl_pips: f64,
        tp_pips: f64,
        comment: &str,
        magic: u64,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<OrderReceipt, ClientError> {
        if volume <= 0.0 {
            return Err(ClientError::invalid_argument("volume must be positive"));
        }

        let tick = self.service.tick(symbol, cancel, deadline).await?;
        let spec = self.service.symbol_spec(symbol, cancel, deadline).await?;
        let entry = match direction {
            Direction::Buy => tick.ask,
            Direction::Sell => tick.bid,
        };
        let (sl, tp) = sl_tp_from_pips(direction, entry, sl_pips, tp_pips, spec.point);

        self.service
            .order_send(
                symbol,
                direction,
                volume,
                entry,
                sl,
                tp,
                DEFAULT_DEVIATION_POINTS,
                comment,
                magic,
                cancel,
                deadline,
            )
            .await
            .map_err(|error| error.in_operation(match direction {
                Direction::Buy => "market_buy",
                Direction::Sell => "market_sell",
            }))
    }

    pub async fn market_buy(
        &self,
        symbol: &SymbolName,
        volume: f64,
        sl_pips: f64,
        tp_pips: f64,
        comment: &str,
        magic: u64,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<OrderReceipt, ClientError> {
        self.market_order(symbol, Direction::Buy, volume, sl_pips, tp_pips, comment, magic, cancel, deadline)
            .await
    }

    pub async fn market_sell(
        &self,
        symbol: &SymbolName,
        volume: f64,
        sl_pips: f64,
        tp_pips: f64,
        comment: &str,
        magic: u64,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<OrderReceipt, ClientError> {
        self.market_order(symbol, Direction::Sell, volume, sl_pips, tp_pips, comment, magic, cancel, deadline)
            .await
    }

    /// Closes every open position at market, best-effort: one position
    /// failing to close does not stop the rest from being attempted.
    /// Returns the number actually closed, so calling this twice in a row
    /// is idempotent - the second call sees no open positions and returns 0.
    pub async fn close_all_positions(
        &self,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<usize, ClientError> {
        let positions = self.service.positions(cancel, deadline).await?;
        let mut closed = 0;

        for position in positions {
            match self
                .service
                .order_close(position.ticket, position.volume, DEFAULT_DEVIATION_POINTS, cancel, deadline)
                .await
                .map_err(|error| error.in_operation("close_all_positions"))
            {
                Ok(_) => closed += 1,
                Err(error) => warn!(ticket = position.ticket, %error, "close_all_positions: position failed to close"),
            }
        }

        Ok(closed)
    }
}
