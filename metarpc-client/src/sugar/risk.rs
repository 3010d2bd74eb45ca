use super::Sugar;
use crate::{
    error::ClientError,
    symbol::{Direction, SymbolSpec},
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Stop-loss/take-profit prices `pips` away from `entry_price`, on the side
/// dictated by `direction`. A pip here is synonymous with the symbol's raw
/// point size - no 10-point pip convention is applied.
pub fn sl_tp_from_pips(
    direction: Direction,
    entry_price: f64,
    sl_pips: f64,
    tp_pips: f64,
    point: f64,
) -> (f64, f64) {
    let sign = direction.sign();
    let sl = entry_price - sign * sl_pips * point;
    let tp = entry_price + sign * tp_pips * point;
    (sl, tp)
}

/// Lot size that risks at most `risk_amount` (in account currency) if the
/// stop loss is hit, rounded down to the symbol's volume step and clamped
/// into its `[min, max]`. Returns zero if `stop_loss_pips` is non-positive -
/// there is no well-defined size for an unbounded loss.
pub fn position_size_by_risk(spec: &SymbolSpec, risk_amount: f64, stop_loss_pips: f64) -> f64 {
    if stop_loss_pips <= 0.0 || risk_amount <= 0.0 {
        return 0.0;
    }
    let loss_per_lot = stop_loss_pips * spec.point * spec.contract_size;
    if loss_per_lot <= 0.0 {
        return 0.0;
    }
    spec.volume.clamp_round_down(risk_amount / loss_per_lot)
}

/// Whether a position of `volume` lots can plausibly be opened: the symbol
/// allows trading, the volume lies on an allowed step within bounds, and the
/// required margin does not exceed what is free. Pure and synchronous -
/// callers that want the margin requirement computed for them should use
/// [`Sugar::can_open_position`].
pub fn can_open_position(spec: &SymbolSpec, volume: f64, margin_required: f64, margin_free: f64) -> bool {
    spec.trade_allowed && spec.volume.contains(volume) && spec.volume.is_on_step(volume) && margin_required <= margin_free
}

impl Sugar {
    /// Fetches the symbol spec, account free margin, and the broker's own
    /// margin estimate for `volume`, then evaluates [`can_open_position`].
    pub async fn can_open_position(
        &self,
        symbol: &crate::symbol::SymbolName,
        direction: Direction,
        volume: f64,
        price: f64,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<bool, ClientError> {
        let spec = self.service.symbol_spec(symbol, cancel, deadline).await?;
        let summary = self.service.account_summary(cancel, deadline).await?;
        let margin_required = self
            .service
            .account()
            .order_calc_margin(
                symbol.as_str(),
                match direction {
                    Direction::Buy => metarpc_proto::TradeOperation::Buy,
                    Direction::Sell => metarpc_proto::TradeOperation::Sell,
                },
                volume,
                price,
                cancel,
                deadline,
            )
            .await?;

        Ok(can_open_position(
            &spec,
            volume,
            margin_required,
            crate::domain::to_f64(summary.margin_free),
        ))
    }

    /// Lot size that risks `risk_percent` of current equity if `stop_loss_pips`
    /// is hit (`PositionSizeByRisk`).
    pub async fn position_size_by_risk(
        &self,
        symbol: &crate::symbol::SymbolName,
        risk_percent: f64,
        stop_loss_pips: f64,
        cancel: &CancellationToken,
        deadline: Option<Duration>,
    ) -> Result<f64, ClientError> {
        if !(0.0..=100.0).contains(&risk_percent) {
            return Err(ClientError::invalid_argument("risk_percent must be within [0, 100]"));
        }
        let spec = self.service.symbol_spec(symbol, cancel, deadline).await?;
        let summary = self.service.account_summary(cancel, deadline).await?;
        let equity = crate::domain::to_f64(summary.equity);
        let risk_amount = equity * (risk_percent / 100.0);
        Ok(position_size_by_risk(&spec, risk_amount, stop_loss_pips))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::VolumeEnvelope;

    fn spec() -> SymbolSpec {
        SymbolSpec {
            symbol: crate::symbol::SymbolName::new("EURUSD"),
            point: 0.00001,
            digits: 5,
            volume: VolumeEnvelope { min: 0.01, max: 50.0, step: 0.01 },
            contract_size: 100_000.0,
            stops_level_points: 50,
            trade_allowed: true,
        }
    }

    #[test]
    fn sl_tp_from_pips_moves_opposite_directions_for_buy() {
        let (sl, tp) = sl_tp_from_pips(Direction::Buy, 1.1000, 20.0, 40.0, 0.00001);
        assert!(sl < 1.1000);
        assert!(tp > 1.1000);
    }

    #[test]
    fn sl_tp_from_pips_uses_point_size_directly_no_tenfold_convention() {
        let (sl, tp) = sl_tp_from_pips(Direction::Buy, 1.08500, 50.0, 100.0, 0.00001);
        assert!((sl - 1.08450).abs() < 1e-9);
        assert!((tp - 1.09500).abs() < 1e-9);
    }

    #[test]
    fn position_size_by_risk_scales_with_stop_distance() {
        let spec = spec();
        let tight = position_size_by_risk(&spec, 100.0, 10.0);
        let wide = position_size_by_risk(&spec, 100.0, 100.0);
        assert!(tight > wide);
    }

    #[test]
    fn position_size_by_risk_zero_stop_is_zero() {
        assert_eq!(position_size_by_risk(&spec(), 100.0, 0.0), 0.0);
    }

    #[test]
    fn can_open_position_rejects_off_step_volume() {
        let spec = spec();
        assert!(!can_open_position(&spec, 0.015, 10.0, 1000.0));
    }

    #[test]
    fn can_open_position_rejects_insufficient_margin() {
        let spec = spec();
        assert!(!can_open_position(&spec, 1.0, 5000.0, 1000.0));
    }
}
