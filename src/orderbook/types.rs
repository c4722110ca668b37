//! Order book snapshot types.

use rust_decimal::Decimal;
use serde::Serialize;

/// One token's market state at a point in time.
///
/// Mid-price and spread are present exactly when both best bid and best ask
/// are present. Prices live in [0, 1] probability units upstream, but the
/// type does not enforce the bound; display code clamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderBookSnapshot {
    /// Token ID this snapshot represents.
    pub token_id: String,
    /// Price of the most recent trade, if any.
    pub last_trade_price: Option<Decimal>,
    /// Highest bid-level price.
    pub best_bid: Option<Decimal>,
    /// Lowest ask-level price.
    pub best_ask: Option<Decimal>,
    /// Average of best bid and best ask.
    pub mid_price: Option<Decimal>,
    /// Best ask minus best bid.
    pub spread: Option<Decimal>,
}

impl OrderBookSnapshot {
    /// Build a snapshot from parsed bid/ask level prices.
    pub fn from_levels(
        token_id: impl Into<String>,
        last_trade_price: Option<Decimal>,
        bids: &[Decimal],
        asks: &[Decimal],
    ) -> Self {
        let best_bid = bids.iter().copied().max();
        let best_ask = asks.iter().copied().min();
        let (mid_price, spread) = match (best_bid, best_ask) {
            (Some(bid), Some(ask)) => (Some((bid + ask) / Decimal::TWO), Some(ask - bid)),
            _ => (None, None),
        };
        Self {
            token_id: token_id.into(),
            last_trade_price,
            best_bid,
            best_ask,
            mid_price,
            spread,
        }
    }
}
