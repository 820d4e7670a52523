//! Wire payload shapes for the topics an `ExchangeAgent` sends and receives.
//!
//! `Message::payload` stays `serde_json::Value` end to end; these structs
//! only exist at the construction/pattern-matching boundary here, mirroring
//! how the rest of the pack keeps typed request/response structs next to an
//! untyped wire format.

use orderbook::Side;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize)]
pub struct OrderPayload {
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    pub price: f64,
    pub quantity: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CancelPayload {
    pub order_id: String,
    pub symbol: String,
}

/// Covers every `query_type` variant; fields irrelevant to a given query are
/// simply `None`. Matches the original's single untyped dict more closely
/// than seven separate request structs would.
#[derive(Clone, Debug, Deserialize)]
pub struct MarketDepthQueryPayload {
    pub symbol: String,
    pub query_id: Option<String>,
    pub query_type: String,
    pub side: Option<Side>,
    pub depth: Option<usize>,
    pub quantity: Option<i64>,
    pub min_fill_percent: Option<f64>,
    pub reference_quantity: Option<f64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TradePayload {
    pub trade_id: String,
    pub price: f64,
    pub quantity: i64,
    pub buyer_id: String,
    pub seller_id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct PricePayload {
    pub best_bid: f64,
    pub best_ask: f64,
    pub spread: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct StatsPayload {
    pub volume: i64,
    pub vwap: f64,
    pub best_bid: f64,
    pub best_ask: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct CancelConfirmPayload {
    pub order_id: String,
    pub cancelled: bool,
}
