use derive_more::{Display, From};
use smol_str::SmolStr;

/// A broker symbol name, e.g. `EURUSD`. A thin newtype rather than a bare
/// `String` so argument validation ("symbol non-empty") has one
/// place to live.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display, From)]
pub struct SymbolName(pub SmolStr);

impl SymbolName {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SymbolName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
pub enum TradeMode {
    Demo,
    Contest,
    Real,
}

impl From<metarpc_proto::TradeMode> for TradeMode {
    fn from(value: metarpc_proto::TradeMode) -> Self {
        match value {
            metarpc_proto::TradeMode::Demo => TradeMode::Demo,
            metarpc_proto::TradeMode::Contest => TradeMode::Contest,
            metarpc_proto::TradeMode::Real => TradeMode::Real,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Buy => 1.0,
            Direction::Sell => -1.0,
        }
    }
}

/// Broker-imposed lot-size envelope ("volume step / min / max").
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VolumeEnvelope {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl VolumeEnvelope {
    /// Rounds `volume` down to the nearest multiple of `step` and clamps it
    /// into `[min, max]`. Used by `PositionSizeByRisk` to
    /// guarantee the returned lot never exceeds broker limits.
    pub fn clamp_round_down(&self, volume: f64) -> f64 {
        if self.step <= 0.0 {
            return volume.clamp(self.min, self.max);
        }
        let steps = (volume / self.step).floor();
        let rounded = steps * self.step;
        rounded.clamp(self.min, self.max)
    }

    /// Whether `volume` is an integer multiple of `step`, within half a step
    /// of floating-point tolerance (`CanOpenPosition`).
    pub fn is_on_step(&self, volume: f64) -> bool {
        if self.step <= 0.0 {
            return true;
        }
        let steps = volume / self.step;
        (steps - steps.round()).abs() * self.step < self.step / 2.0
    }

    pub fn contains(&self, volume: f64) -> bool {
        volume >= self.min && volume <= self.max
    }
}

/// Symbol metadata needed by the Sugar facade's pricing and risk helpers.
/// A subset of what `SymbolParams` returns over the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSpec {
    pub symbol: SymbolName,
    pub point: f64,
    pub digits: i32,
    pub volume: VolumeEnvelope,
    pub contract_size: f64,
    pub stops_level_points: i32,
    pub trade_allowed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> VolumeEnvelope {
        VolumeEnvelope {
            min: 0.01,
            max: 100.0,
            step: 0.01,
        }
    }

    #[test]
    fn clamp_round_down_rounds_to_step() {
        let e = envelope();
        assert_eq!(e.clamp_round_down(0.0449), 0.04);
    }

    #[test]
    fn clamp_round_down_respects_bounds() {
        let e = envelope();
        assert_eq!(e.clamp_round_down(0.001), 0.01);
        assert_eq!(e.clamp_round_down(1000.0), 100.0);
    }

    #[test]
    fn is_on_step_detects_fractional_lots() {
        let e = envelope();
        assert!(e.is_on_step(0.05));
        assert!(!e.is_on_step(0.053));
    }
}
