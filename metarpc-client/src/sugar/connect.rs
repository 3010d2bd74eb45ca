use super::Sugar;
use crate::{domain::Tick, error::ClientError, symbol::SymbolName};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

impl Sugar {
    /// Ensures the session is connected, then round-trips a `Ping` so a
    /// caller can distinguish "never connected" from "connected but the
    /// gateway stopped answering" (`HealthCheck`).
    pub async fn health_check(&self, cancel: &CancellationToken, deadline: Option<Duration>) -> Result<bool, ClientError> {
        self.service.account().ensure_connected().await?;
        self.service
            .account()
            .ping(cancel, deadline)
            .await
            .map_err(|error| error.in_operation("health_check"))
    }

    /// Current best bid/ask for `symbol` (price info helper).
    pub async fn price(&self, symbol: &SymbolName, cancel: &CancellationToken, deadline: Option<Duration>) -> Result<Tick, ClientError> {
        self.service.tick(symbol, cancel, deadline).await.map_err(|error| error.in_operation("price"))
    }

    /// Polls `symbol`'s price every `poll_interval` until both sides of the
    /// quote are live (`WaitForPrice`: `bid > 0 && ask > 0`), `deadline`
    /// elapses, or `cancel` fires.
    pub async fn wait_for_price(
        &self,
        symbol: &SymbolName,
        poll_interval: Duration,
        cancel: &CancellationToken,
        deadline: Duration,
    ) -> Result<Tick, ClientError> {
        self.wait_for_price_matching(symbol, |tick| tick.bid > 0.0 && tick.ask > 0.0, poll_interval, cancel, deadline)
            .await
    }

    /// General form of [`Sugar::wait_for_price`] for callers (and tests)
    /// that need a different quote condition than the fixed contract.
    async fn wait_for_price_matching(
        &self,
        symbol: &SymbolName,
        predicate: impl Fn(&Tick) -> bool,
        poll_interval: Duration,
        cancel: &CancellationToken,
        deadline: Duration,
    ) -> Result<Tick, ClientError> {
        let deadline_at = tokio::time::Instant::now() + deadline;

        loop {
            let tick = self.price(symbol, cancel, Some(deadline)).await?;
            if predicate(&tick) {
                return Ok(tick);
            }

            if tokio::time::Instant::now() >= deadline_at {
                return Err(ClientError::Timeout {
                    last_cause: format!("price for {symbol} never satisfied predicate"),
                });
            }

            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {}
                _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            }
        }
    }
}
