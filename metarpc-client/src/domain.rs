use crate::symbol::{SymbolName, TradeMode};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal};

/// Converts a millisecond Unix timestamp from the wire into a UTC instant.
/// Falls back to the epoch on an out-of-range value rather than panicking -
/// malformed timestamps should surface as wrong-looking data, not a crash.
pub(crate) fn from_millis(msc: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(msc).single().unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap())
}

pub(crate) fn decimal(value: f64) -> Decimal {
    Decimal::from_f64_retain(value).unwrap_or_default()
}

/// Inverse of [`decimal`] - used where a ratio or threshold needs to mix
/// with an `f64`-denominated quantity (pip distances, percentages).
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Native view of `AccountSummaryData` (money fields as [`Decimal`], never `f64`, to avoid surprising equality/rounding bugs in caller code that sums or compares balances).
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSummary {
    pub login: u64,
    pub currency: String,
    pub leverage: i32,
    pub trade_mode: TradeMode,
    pub balance: Decimal,
    pub equity: Decimal,
    pub margin: Decimal,
    pub margin_free: Decimal,
    pub margin_level: Decimal,
    pub name: String,
    pub server: String,
}

impl From<metarpc_proto::AccountSummaryData> for AccountSummary {
    fn from(data: metarpc_proto::AccountSummaryData) -> Self {
        Self {
            login: data.login,
            currency: data.currency,
            leverage: data.leverage,
            trade_mode: metarpc_proto::TradeMode::try_from(data.trade_mode)
                .map(TradeMode::from)
                .unwrap_or(TradeMode::Demo),
            balance: decimal(data.balance),
            equity: decimal(data.equity),
            margin: decimal(data.margin),
            margin_free: decimal(data.margin_free),
            margin_level: decimal(data.margin_level),
            name: data.name,
            server: data.server,
        }
    }
}

/// Native view of a `TickData` message - current best bid/ask for a symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
    pub volume: u64,
    pub time: DateTime<Utc>,
}

impl From<metarpc_proto::TickData> for Tick {
    fn from(data: metarpc_proto::TickData) -> Self {
        Self {
            bid: data.bid,
            ask: data.ask,
            last: data.last,
            volume: data.volume,
            time: from_millis(data.time_msc),
        }
    }
}

impl Tick {
    /// Mid-price, used by the Sugar facade when a quote with no explicit
    /// direction is needed (`PositionSizeByRisk`).
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }
}

/// Native view of `PositionData`.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub ticket: u64,
    pub symbol: SymbolName,
    pub operation: metarpc_proto::TradeOperation,
    pub volume: f64,
    pub price_open: f64,
    pub price_current: f64,
    pub sl: f64,
    pub tp: f64,
    pub profit: Decimal,
    pub opened_at: DateTime<Utc>,
    pub magic: u64,
    pub comment: String,
}

impl From<metarpc_proto::PositionData> for Position {
    fn from(data: metarpc_proto::PositionData) -> Self {
        Self {
            ticket: data.ticket,
            symbol: SymbolName::new(data.symbol),
            operation: metarpc_proto::TradeOperation::try_from(data.r#type).unwrap_or(metarpc_proto::TradeOperation::Buy),
            volume: data.volume,
            price_open: data.price_open,
            price_current: data.price_current,
            sl: data.sl,
            tp: data.tp,
            profit: decimal(data.profit),
            opened_at: from_millis(data.time_msc),
            magic: data.magic,
            comment: data.comment,
        }
    }
}

/// Native view of `PendingOrderData`.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOrder {
    pub ticket: u64,
    pub symbol: SymbolName,
    pub operation: metarpc_proto::TradeOperation,
    pub volume_initial: f64,
    pub volume_current: f64,
    pub price_open: f64,
    pub sl: f64,
    pub tp: f64,
    pub placed_at: DateTime<Utc>,
    pub magic: u64,
    pub comment: String,
}

impl From<metarpc_proto::PendingOrderData> for PendingOrder {
    fn from(data: metarpc_proto::PendingOrderData) -> Self {
        Self {
            ticket: data.ticket,
            symbol: SymbolName::new(data.symbol),
            operation: metarpc_proto::TradeOperation::try_from(data.r#type).unwrap_or(metarpc_proto::TradeOperation::Buy),
            volume_initial: data.volume_initial,
            volume_current: data.volume_current,
            price_open: data.price_open,
            sl: data.sl,
            tp: data.tp,
            placed_at: from_millis(data.time_setup_msc),
            magic: data.magic,
            comment: data.comment,
        }
    }
}

/// Native view of `DealData` - one closed-trade history record.
#[derive(Debug, Clone, PartialEq)]
pub struct Deal {
    pub ticket: u64,
    pub order: u64,
    pub symbol: SymbolName,
    pub operation: metarpc_proto::TradeOperation,
    pub volume: f64,
    pub price: f64,
    pub profit: Decimal,
    pub commission: Decimal,
    pub swap: Decimal,
    pub closed_at: DateTime<Utc>,
    pub position_id: u64,
    pub comment: String,
}

impl From<metarpc_proto::DealData> for Deal {
    fn from(data: metarpc_proto::DealData) -> Self {
        Self {
            ticket: data.ticket,
            order: data.order,
            symbol: SymbolName::new(data.symbol),
            operation: metarpc_proto::TradeOperation::try_from(data.r#type).unwrap_or(metarpc_proto::TradeOperation::Buy),
            volume: data.volume,
            price: data.price,
            profit: decimal(data.profit),
            commission: decimal(data.commission),
            swap: decimal(data.swap),
            closed_at: from_millis(data.time_msc),
            position_id: data.position_id,
            comment: data.comment,
        }
    }
}

/// Outcome of a successful trade mutation (`OrderSend`/`Modify`/`Close`),
/// after the retcode has already been checked for success by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderReceipt {
    pub ticket: u64,
    pub order: u64,
    pub volume: f64,
    pub price: f64,
    pub comment: String,
}

impl From<metarpc_proto::OrderSendData> for OrderReceipt {
    fn from(data: metarpc_proto::OrderSendData) -> Self {
        Self {
            ticket: data.ticket,
            order: data.order,
            volume: data.volume,
            price: data.price,
            comment: data.comment,
        }
    }
}
