//! Places a ladder of resting limit orders around a fair value and
//! occasionally crosses the book with a market order, so a freshly
//! initialized symbol has two-sided depth almost immediately.

use orderbook::Side;
use rand::Rng;
use sim_core::{Agent, AgentContext, Message};
use std::collections::HashMap;

pub struct LiquidityProviderAgent {
    agent_id: String,
    symbol: String,
    ctx: Option<AgentContext>,

    fair_value: f64,
    spread: f64,
    limit_order_size: i64,
    market_order_size: i64,
    max_orders_per_side: usize,
    liquidity_provision_interval: i64,
    market_trade_interval: i64,

    active_limit_orders: HashMap<String, Side>,
    last_order_book_state: Option<serde_json::Value>,
    last_liquidity_provision: i64,
    last_market_trade: i64,
}

impl LiquidityProviderAgent {
    pub fn new(agent_id: impl Into<String>, symbol: impl Into<String>) -> Self {
        LiquidityProviderAgent {
            agent_id: agent_id.into(),
            symbol: symbol.into(),
            ctx: None,
            fair_value: 100.0,
            spread: 0.02,
            limit_order_size: 20,
            market_order_size: 10,
            max_orders_per_side: 5,
            liquidity_provision_interval: 1000,
            market_trade_interval: 2000,
            active_limit_orders: HashMap::new(),
            last_order_book_state: None,
            last_liquidity_provision: 0,
            last_market_trade: 0,
        }
    }

    fn ctx(&self) -> &AgentContext {
        self.ctx.as_ref().expect("LiquidityProviderAgent used before being registered with a kernel")
    }

    fn order_book_is_thin(&self) -> bool {
        let Some(state) = &self.last_order_book_state else {
            return true;
        };
        let bids = state.get("bids").and_then(|v| v.as_array()).map(|a| a.len()).unwrap_or(0);
        let asks = state.get("asks").and_then(|v| v.as_array()).map(|a| a.len()).unwrap_or(0);
        bids < 2 && asks < 2
    }

    fn submit_order(&self, order_id: String, side: Side, price: f64, quantity: i64) {
        let payload = serde_json::json!({
            "order_id": order_id,
            "symbol": self.symbol,
            "side": side,
            "price": price,
            "quantity": quantity,
        });
        self.ctx().send_message(format!("{}.ORDER", self.symbol), payload);
    }

    fn cancel_resting_orders(&mut self) {
        for order_id in self.active_limit_orders.keys().cloned().collect::<Vec<_>>() {
            let payload = serde_json::json!({ "order_id": order_id, "symbol": self.symbol });
            self.ctx().send_message(format!("{}.CANCEL", self.symbol), payload);
        }
        self.active_limit_orders.clear();
    }

    fn place_ladder(&mut self, current_time: i64) {
        self.cancel_resting_orders();

        let fair_value = self
            .last_order_book_state
            .as_ref()
            .and_then(|state| {
                let best_bid = state.get("best_bid")?.as_f64()?;
                let best_ask = state.get("best_ask")?.as_f64()?;
                match (best_bid > 0.0, best_ask.is_finite()) {
                    (true, true) => Some((best_bid + best_ask) / 2.0),
                    (true, false) => Some(best_bid),
                    (false, true) => Some(best_ask),
                    (false, false) => None,
                }
            })
            .unwrap_or(self.fair_value);

        for i in 0..self.max_orders_per_side {
            let bid_price = ((fair_value * (1.0 - self.spread / 2.0 - i as f64 * 0.005)) * 100.0).round() / 100.0;
            let bid_id = format!("{}_BID_{}_{}", self.agent_id, i, current_time);
            self.submit_order(bid_id.clone(), Side::Buy, bid_price, self.limit_order_size);
            self.active_limit_orders.insert(bid_id, Side::Buy);

            let ask_price = ((fair_value * (1.0 + self.spread / 2.0 + i as f64 * 0.005)) * 100.0).round() / 100.0;
            let ask_id = format!("{}_ASK_{}_{}", self.agent_id, i, current_time);
            self.submit_order(ask_id.clone(), Side::Sell, ask_price, self.limit_order_size);
            self.active_limit_orders.insert(ask_id, Side::Sell);
        }
    }

    fn cross_randomly(&mut self, current_time: i64) {
        let side = if rand::thread_rng().gen_bool(0.5) { Side::Buy } else { Side::Sell };
        let price = if side == Side::Buy { f64::INFINITY } else { 0.0 };
        let order_id = format!("{}_MARKET_{:?}_{}", self.agent_id, side, current_time);
        self.submit_order(order_id, side, price, self.market_order_size);
    }
}

impl Agent for LiquidityProviderAgent {
    fn agent_id(&self) -> &str {
        &self.agent_id
    }

    fn bind(&mut self, ctx: AgentContext) {
        ctx.subscribe(format!("{}.ORDERBOOK", self.symbol));
        ctx.subscribe(format!("{}.PRICE", self.symbol));
        ctx.schedule_wakeup(500);
        self.ctx = Some(ctx);
    }

    fn receive_message(&mut self, message: &Message) {
        if message.topic == format!("{}.ORDERBOOK", self.symbol) {
            self.last_order_book_state = Some(message.payload.clone());
        }
    }

    fn wakeup(&mut self, current_time: i64) {
        if current_time - self.last_liquidity_provision >= self.liquidity_provision_interval || self.order_book_is_thin() {
            self.place_ladder(current_time);
            self.last_liquidity_provision = current_time;
        }

        if current_time - self.last_market_trade >= self.market_trade_interval {
            self.cross_randomly(current_time);
            self.last_market_trade = current_time;
        }

        let next_wakeup = (self.last_liquidity_provision + self.liquidity_provision_interval)
            .min(self.last_market_trade + self.market_trade_interval)
            .min(current_time + 1000);
        self.ctx().schedule_wakeup(next_wakeup);
    }

    fn is_active(&self) -> bool {
        true
    }
}
