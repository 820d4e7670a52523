//! Price-time-priority limit order book for one trading symbol.
//!
//! Matching, cancellation, and read-only depth/liquidity analytics live here.
//! The book trusts its caller for anything outside its own invariants — see
//! `cancel_order`'s bool return and the analytics' zero-on-empty behavior
//! instead of `Result`-wrapped errors.

pub mod price_levels;
pub mod types;

pub use price_levels::PriceLevels;
pub use types::{
    AgentId, MarketData, Order, OrderBookSnapshot, OrderId, PriceLevelView, Side, Symbol, Trade,
    MARKET_BUY_PRICE, MARKET_SELL_PRICE,
};

use std::collections::HashMap;

/// Central limit order book with separate bid/ask sides for a single symbol.
///
/// Bids and asks are independent `PriceLevels`; an `order_id -> (side, price)`
/// index gives `cancel_order` its price level directly instead of scanning
/// both sides.
pub struct OrderBook {
    pub symbol: Symbol,
    pub bids: PriceLevels,
    pub asks: PriceLevels,
    order_index: HashMap<OrderId, (Side, f64)>,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: PriceLevels::new(Side::Buy),
            asks: PriceLevels::new(Side::Sell),
            order_index: HashMap::new(),
        }
    }

    pub fn best_bid(&self) -> f64 {
        self.bids.best_price().unwrap_or(0.0)
    }

    pub fn best_ask(&self) -> f64 {
        self.asks.best_price().unwrap_or(f64::INFINITY)
    }

    fn own_side(&mut self, side: Side) -> &mut PriceLevels {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Whether `price` unconditionally crosses the opposite side, per the
    /// matching algorithm: BUY at +inf and SELL at 0.0 are sentinels, not
    /// numeric bounds to compare.
    fn crossable(side: Side, price: f64) -> impl Fn(f64) -> bool {
        move |opposite_price: f64| match side {
            Side::Buy => price == MARKET_BUY_PRICE || opposite_price <= price,
            Side::Sell => price == MARKET_SELL_PRICE || opposite_price >= price,
        }
    }

    /// Drains the opposite side against `order`, up to its crossable limit,
    /// emitting one trade per resting order consumed and cleaning up the
    /// order index as resting orders are exhausted.
    fn drain_against_opposite(&mut self, order: &mut Order) -> Vec<Trade> {
        let mut trades = Vec::new();
        let want = order.quantity;
        let side = order.side;
        let crossable = Self::crossable(side, order.price);
        let levels = match side.opposite() {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let index = &mut self.order_index;
        let filled = levels.drain_best(want, crossable, |resting, qty| {
            trades.push(Self::make_trade(order, resting, qty));
            if resting.quantity == 0 {
                index.remove(&resting.order_id);
            }
        });
        order.quantity -= filled;
        trades
    }

    /// `execute_partial_market` pre-phase: drains only the opposite level at
    /// exactly `order.price`, before the generic best-first walk runs.
    fn drain_exact_price(&mut self, order: &mut Order) -> Vec<Trade> {
        let mut trades = Vec::new();
        let side = order.side;
        let price = order.price;
        let want = order.quantity;
        let levels = match side.opposite() {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let index = &mut self.order_index;
        let filled = levels.drain_price(price, want, |resting, qty| {
            trades.push(Self::make_trade(order, resting, qty));
            if resting.quantity == 0 {
                index.remove(&resting.order_id);
            }
        });
        order.quantity -= filled;
        trades
    }

    fn make_trade(aggressor: &Order, resting: &Order, quantity: i64) -> Trade {
        let (buyer_id, seller_id) = match aggressor.side {
            Side::Buy => (aggressor.agent_id.clone(), resting.agent_id.clone()),
            Side::Sell => (resting.agent_id.clone(), aggressor.agent_id.clone()),
        };
        Trade {
            trade_id: format!("TRADE_{}_{}", aggressor.order_id, resting.order_id),
            symbol: aggressor.symbol.clone(),
            price: resting.price,
            quantity,
            buyer_id,
            seller_id,
            timestamp: aggressor.timestamp,
        }
    }

    fn rest(&mut self, order: Order) {
        self.order_index
            .insert(order.order_id.clone(), (order.side, order.price));
        self.own_side(order.side).push(order);
    }

    /// Adds a limit order and returns any trades it produced immediately.
    ///
    /// When `execute_partial_market` is set and the opposite side has
    /// liquidity at exactly `order.price`, that overlap is drained first
    /// (as a market-style fill, regardless of whether better prices exist
    /// elsewhere), then the normal best-first cross runs on what remains,
    /// then any leftover quantity rests.
    pub fn add_limit_order(&mut self, mut order: Order, execute_partial_market: bool) -> Vec<Trade> {
        let mut trades = Vec::new();

        if execute_partial_market && order.quantity > 0 {
            trades.extend(self.drain_exact_price(&mut order));
        }
        if order.quantity > 0 {
            trades.extend(self.drain_against_opposite(&mut order));
        }
        if order.quantity > 0 {
            self.rest(order);
        }

        trades
    }

    /// Adds a market order. Rejects with no mutation if the would-fill
    /// fraction is below `min_fill_percent`; an accepted order that doesn't
    /// fully fill does not rest.
    pub fn add_market_order(
        &mut self,
        mut order: Order,
        min_fill_percent: f64,
    ) -> (bool, Vec<Trade>) {
        let (can_fill, _) = self.can_fill_order(order.side, order.quantity, min_fill_percent);
        if !can_fill {
            return (false, Vec::new());
        }
        let trades = self.drain_against_opposite(&mut order);
        (true, trades)
    }

    /// Removes `order_id` from its level, refreshing best prices implicitly
    /// (the level's own bookkeeping keeps `best_price` correct). Returns
    /// false if the id is unknown.
    pub fn cancel_order(&mut self, order_id: &str) -> bool {
        let Some((side, price)) = self.order_index.remove(order_id) else {
            return false;
        };
        self.own_side(side).cancel(price, &order_id.to_string()).is_some()
    }

    pub fn get_order_book_snapshot(&self, depth: usize) -> OrderBookSnapshot {
        OrderBookSnapshot {
            symbol: self.symbol.clone(),
            bids: self
                .bids
                .depth(Some(depth))
                .into_iter()
                .map(|(price, quantity)| PriceLevelView { price, quantity })
                .collect(),
            asks: self
                .asks
                .depth(Some(depth))
                .into_iter()
                .map(|(price, quantity)| PriceLevelView { price, quantity })
                .collect(),
            best_bid: self.best_bid(),
            best_ask: self.best_ask(),
        }
    }

    /// Opposite-side depth for `side`: BUY sees asks, SELL sees bids.
    pub fn get_market_depth(&self, side: Side, depth: usize) -> Vec<(f64, i64)> {
        match side {
            Side::Buy => self.asks.depth(Some(depth)),
            Side::Sell => self.bids.depth(Some(depth)),
        }
    }

    pub fn get_total_quantity_at_side(&self, side: Side, depth: Option<usize>) -> i64 {
        match side {
            Side::Buy => self.asks.total_quantity(depth),
            Side::Sell => self.bids.total_quantity(depth),
        }
    }

    /// Walks the opposite side best-first, unbounded, accumulating cost until
    /// `qty` is covered or the book is exhausted.
    pub fn get_average_price_for_quantity(&self, side: Side, qty: i64) -> (f64, f64, f64) {
        let levels = match side {
            Side::Buy => self.asks.depth(None),
            Side::Sell => self.bids.depth(None),
        };
        let Some(&(reference_price, _)) = levels.first() else {
            return (0.0, 0.0, 0.0);
        };

        let mut total_cost = 0.0;
        let mut filled = 0i64;
        for (price, available) in levels {
            if filled >= qty {
                break;
            }
            let take = available.min(qty - filled);
            total_cost += price * take as f64;
            filled += take;
        }

        if filled == 0 {
            return (0.0, 0.0, 0.0);
        }

        let average_price = total_cost / filled as f64;
        let fill_fraction = filled as f64 / qty as f64;
        let slippage_bps = match side {
            Side::Buy => (average_price - reference_price) / reference_price * 10_000.0,
            Side::Sell => (reference_price - average_price) / reference_price * 10_000.0,
        };
        (average_price, slippage_bps, fill_fraction)
    }

    pub fn can_fill_order(&self, side: Side, qty: i64, min_fill_percent: f64) -> (bool, f64) {
        let (_, _, fill_fraction) = self.get_average_price_for_quantity(side, qty);
        (fill_fraction >= min_fill_percent, fill_fraction)
    }

    /// Mean of bid-side and ask-side totals, each clamped and normalized by
    /// `reference_qty`.
    ///
    /// Preserves the source's side-swap: `get_total_quantity_at_side(S, ..)`
    /// already returns the side *opposite* S, so passing "SELL" here yields
    /// the bid-side total and "BUY" yields the ask-side total — the naming
    /// below (`bid_quantity`/`ask_quantity`) matches what the source labels
    /// them, not a literal reading of the side argument. See DESIGN.md.
    pub fn get_liquidity_score(&self, reference_quantity: f64) -> f64 {
        let bid_quantity = self.get_total_quantity_at_side(Side::Sell, None) as f64;
        let ask_quantity = self.get_total_quantity_at_side(Side::Buy, None) as f64;
        let bid_score = (bid_quantity / reference_quantity).min(1.0);
        let ask_score = (ask_quantity / reference_quantity).min(1.0);
        (bid_score + ask_score) / 2.0
    }

    pub fn get_spread(&self) -> f64 {
        let (bid, ask) = (self.best_bid(), self.best_ask());
        if ask == f64::INFINITY || bid == 0.0 {
            f64::INFINITY
        } else {
            ask - bid
        }
    }

    /// Same side-swap convention as `get_liquidity_score`.
    pub fn get_imbalance(&self) -> f64 {
        let bid_quantity = self.get_total_quantity_at_side(Side::Sell, None) as f64;
        let ask_quantity = self.get_total_quantity_at_side(Side::Buy, None) as f64;
        if bid_quantity + ask_quantity == 0.0 {
            0.0
        } else {
            (bid_quantity - ask_quantity) / (bid_quantity + ask_quantity)
        }
    }
}
