//! Follows short-term price trends: a run of rising mid-prices draws a
//! buy, a run of falling mid-prices draws a sell, both as limit orders
//! priced just inside the touch so they post rather than cross.

use orderbook::Side;
use sim_core::{Agent, AgentContext, Message};
use std::collections::VecDeque;

const HISTORY_LEN: usize = 10;
const SIGNAL_WINDOW: usize = 5;
const SIGNAL_THRESHOLD: f64 = 0.05;

pub struct MomentumTraderAgent {
    agent_id: String,
    symbol: String,
    ctx: Option<AgentContext>,
    price_history: VecDeque<(i64, f64)>,
    position: i64,
    max_position: i64,
    order_size: i64,
}

impl MomentumTraderAgent {
    pub fn new(agent_id: impl Into<String>, symbol: impl Into<String>) -> Self {
        MomentumTraderAgent {
            agent_id: agent_id.into(),
            symbol: symbol.into(),
            ctx: None,
            price_history: VecDeque::with_capacity(HISTORY_LEN),
            position: 0,
            max_position: 100,
            order_size: 10,
        }
    }

    fn ctx(&self) -> &AgentContext {
        self.ctx.as_ref().expect("MomentumTraderAgent used before being registered with a kernel")
    }

    fn process_price_update(&mut self, payload: &serde_json::Value, timestamp: i64) {
        let Some(best_bid) = payload.get("best_bid").and_then(|v| v.as_f64()) else { return };
        let Some(best_ask) = payload.get("best_ask").and_then(|v| v.as_f64()) else { return };
        if !(best_bid > 0.0 && best_ask.is_finite()) {
            return;
        }

        let mid_price = (best_bid + best_ask) / 2.0;
        if self.price_history.len() == HISTORY_LEN {
            self.price_history.pop_front();
        }
        self.price_history.push_back((timestamp, mid_price));

        if self.price_history.len() >= SIGNAL_WINDOW {
            self.check_momentum_signal();
        }
    }

    fn check_momentum_signal(&mut self) {
        let recent: Vec<f64> = self.price_history.iter().rev().take(SIGNAL_WINDOW).map(|&(_, p)| p).collect();
        let price_change = recent[0] - recent[SIGNAL_WINDOW - 1];

        if price_change > SIGNAL_THRESHOLD && self.position < self.max_position {
            self.place_order(Side::Buy);
        } else if price_change < -SIGNAL_THRESHOLD && self.position > -self.max_position {
            self.place_order(Side::Sell);
        }
    }

    fn place_order(&self, side: Side) {
        let Some(&(_, current_price)) = self.price_history.back() else { return };
        let price = if side == Side::Buy { current_price * 0.995 } else { current_price * 1.005 };
        let order_id = format!("{}_{:?}_{}", self.agent_id, side, (current_price * 100.0).round() as i64);
        let payload = serde_json::json!({
            "order_id": order_id,
            "symbol": self.symbol,
            "side": side,
            "price": price,
            "quantity": self.order_size,
        });
        self.ctx().send_message(format!("{}.ORDER", self.symbol), payload);
    }
}

impl Agent for MomentumTraderAgent {
    fn agent_id(&self) -> &str {
        &self.agent_id
    }

    fn bind(&mut self, ctx: AgentContext) {
        ctx.subscribe(format!("{}.PRICE", self.symbol));
        self.ctx = Some(ctx);
    }

    fn receive_message(&mut self, message: &Message) {
        if message.topic == format!("{}.PRICE", self.symbol) {
            self.process_price_update(&message.payload, message.timestamp);
        }
    }

    fn is_active(&self) -> bool {
        true
    }
}
