//! Human-readable mapping for MT5 trade server return codes.
//! Not exhaustive - the full MT5 `TRADE_RETCODE_*` enum runs into the dozens;
//! these are the codes this crate's own logic needs to recognise (success,
//! and the rejection reasons `CanOpenPosition`/`OrderSend` distinguish).

pub const TRADE_RETCODE_DONE: u32 = 10009;
pub const TRADE_RETCODE_REQUOTE: u32 = 10004;
pub const TRADE_RETCODE_INVALID_VOLUME: u32 = 10014;
pub const TRADE_RETCODE_INVALID_STOPS: u32 = 10016;
pub const TRADE_RETCODE_TRADE_DISABLED: u32 = 10017;
pub const TRADE_RETCODE_MARKET_CLOSED: u32 = 10018;
pub const TRADE_RETCODE_NO_MONEY: u32 = 10019;
pub const TRADE_RETCODE_POSITION_CLOSED: u32 = 10036;

pub fn is_success(retcode: u32) -> bool {
    retcode == TRADE_RETCODE_DONE
}

pub fn describe(retcode: u32) -> &'static str {
    match retcode {
        TRADE_RETCODE_DONE => "Request executed successfully",
        TRADE_RETCODE_REQUOTE => "Requote",
        TRADE_RETCODE_INVALID_VOLUME => "Invalid volume",
        TRADE_RETCODE_INVALID_STOPS => "Invalid stops",
        TRADE_RETCODE_TRADE_DISABLED => "Trade is disabled",
        TRADE_RETCODE_MARKET_CLOSED => "Market is closed",
        TRADE_RETCODE_NO_MONEY => "Not enough money",
        TRADE_RETCODE_POSITION_CLOSED => "Position already closed",
        other => {
            let _ = other;
            "Unrecognised return code"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_have_descriptions() {
        assert_eq!(describe(TRADE_RETCODE_DONE), "Request executed successfully");
        assert_eq!(describe(TRADE_RETCODE_REQUOTE), "Requote");
    }

    #[test]
    fn only_done_is_success() {
        assert!(is_success(TRADE_RETCODE_DONE));
        assert!(!is_success(TRADE_RETCODE_INVALID_STOPS));
    }
}
