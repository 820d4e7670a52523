use serde::{Deserialize, Serialize};

pub type OrderId = String;
pub type AgentId = String;
pub type Symbol = String;

/// BUY-side market orders are encoded as this sentinel price; the matcher treats
/// it as "unconditionally crossable", never as a numeric bound.
pub const MARKET_BUY_PRICE: f64 = f64::INFINITY;
/// SELL-side market order sentinel; same treatment, mirrored.
pub const MARKET_SELL_PRICE: f64 = 0.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub agent_id: AgentId,
    pub symbol: Symbol,
    pub side: Side,
    pub price: f64,
    pub quantity: i64,
    pub timestamp: i64,
}

impl Order {
    /// True when `price` is this order's side's market sentinel.
    pub fn is_market(&self) -> bool {
        match self.side {
            Side::Buy => self.price == MARKET_BUY_PRICE,
            Side::Sell => self.price == MARKET_SELL_PRICE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: String,
    pub symbol: Symbol,
    pub price: f64,
    pub quantity: i64,
    pub buyer_id: AgentId,
    pub seller_id: AgentId,
    pub timestamp: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub symbol: Symbol,
    pub timestamp: i64,
    pub best_bid: f64,
    pub best_ask: f64,
    pub rolling_volume: i64,
    pub rolling_vwap: f64,
}

impl MarketData {
    pub fn new(symbol: impl Into<String>) -> Self {
        MarketData {
            symbol: symbol.into(),
            timestamp: 0,
            best_bid: 0.0,
            best_ask: f64::INFINITY,
            rolling_volume: 0,
            rolling_vwap: 0.0,
        }
    }
}

/// One aggregated rung of the book, as returned by depth/snapshot queries.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceLevelView {
    pub price: f64,
    pub quantity: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: Symbol,
    pub bids: Vec<PriceLevelView>,
    pub asks: Vec<PriceLevelView>,
    pub best_bid: f64,
    pub best_ask: f64,
}
