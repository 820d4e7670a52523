//! The only component that mutates order books.
//!
//! One `ExchangeAgent` owns a book per symbol. A driver typically calls
//! `initialize_symbol` for every traded symbol before the kernel starts
//! running (so the exchange's first periodic wakeup, scheduled at an
//! absolute `market_data_update_interval`, always lands in the future);
//! `process_order` also calls it lazily as a fallback for an order on a
//! symbol nobody set up. Every other agent talks to a book only through
//! `SYMBOL.ORDER`, `SYMBOL.CANCEL`, and `SYMBOL.MARKET_DEPTH`.

pub mod config;
pub mod types;

pub use config::ExchangeAgentConfig;

use orderbook::{MarketData, Order, OrderBook, Symbol, Trade};
use sim_core::{Agent, AgentContext, Message};
use std::collections::BTreeMap;
use types::{
    CancelConfirmPayload, CancelPayload, MarketDepthQueryPayload, OrderPayload, PricePayload,
    StatsPayload, TradePayload,
};

pub struct ExchangeAgent {
    agent_id: String,
    ctx: Option<AgentContext>,
    config: ExchangeAgentConfig,
    books: BTreeMap<Symbol, OrderBook>,
    market_data: BTreeMap<Symbol, MarketData>,
    trade_history: Vec<Trade>,
}

impl ExchangeAgent {
    pub fn new(agent_id: impl Into<String>, config: ExchangeAgentConfig) -> Self {
        ExchangeAgent {
            agent_id: agent_id.into(),
            ctx: None,
            config,
            books: BTreeMap::new(),
            market_data: BTreeMap::new(),
            trade_history: Vec::new(),
        }
    }

    fn ctx(&self) -> &AgentContext {
        self.ctx
            .as_ref()
            .expect("ExchangeAgent used before being registered with a kernel")
    }

    /// Creates the book for `symbol` and subscribes to its three inbound
    /// topics, if it doesn't already exist. Called lazily from the first
    /// `SYMBOL.ORDER` the agent sees for a symbol, matching the original; can
    /// also be called up front by a driver that wants subscriptions live
    /// before the first order arrives.
    pub fn initialize_symbol(&mut self, symbol: &str) {
        if self.books.contains_key(symbol) {
            return;
        }
        tracing::info!(symbol, "initializing symbol");
        self.books.insert(symbol.to_string(), OrderBook::new(symbol));
        self.market_data.insert(symbol.to_string(), MarketData::new(symbol));

        let ctx = self.ctx();
        ctx.subscribe(format!("{symbol}.ORDER"));
        ctx.subscribe(format!("{symbol}.CANCEL"));
        ctx.subscribe(format!("{symbol}.MARKET_DEPTH"));
        // Absolute, not current_time-relative: matches every symbol's first
        // wakeup landing on the same interval grid regardless of when its
        // first order happens to arrive.
        ctx.schedule_wakeup(self.config.market_data_update_interval);
    }

    fn process_order(&mut self, message: &Message) {
        let payload: OrderPayload = match serde_json::from_value(message.payload.clone()) {
            Ok(p) => p,
            Err(error) => {
                tracing::warn!(%error, "malformed ORDER payload, dropping");
                return;
            }
        };

        if !self.books.contains_key(&payload.symbol) {
            self.initialize_symbol(&payload.symbol);
        }

        let order = Order {
            order_id: payload.order_id,
            agent_id: message.source_id.clone(),
            symbol: payload.symbol.clone(),
            side: payload.side,
            price: payload.price,
            quantity: payload.quantity,
            timestamp: message.timestamp,
        };
        let is_market = order.is_market();
        let book = self.books.get_mut(&payload.symbol).expect("just initialized");

        let trades = if is_market {
            let (accepted, trades) = book.add_market_order(order, self.config.default_min_fill_percent);
            if !accepted {
                tracing::info!(symbol = %payload.symbol, "market order rejected: insufficient liquidity");
                return;
            }
            trades
        } else {
            book.add_limit_order(order, false)
        };

        for trade in &trades {
            self.trade_history.push(trade.clone());
            let topic = format!("{}.TRADE", trade.symbol);
            let trade_payload = serde_json::to_value(TradePayload {
                trade_id: trade.trade_id.clone(),
                price: trade.price,
                quantity: trade.quantity,
                buyer_id: trade.buyer_id.clone(),
                seller_id: trade.seller_id.clone(),
            })
            .expect("TradePayload always serializes");
            self.ctx().send_message_at(topic, trade_payload, message.timestamp);
        }

        self.update_market_data(&payload.symbol, message.timestamp);

        let snapshot = self.books[&payload.symbol].get_order_book_snapshot(5);
        let snapshot_payload = serde_json::to_value(&snapshot).expect("snapshot always serializes");
        self.ctx().send_message_at(
            format!("{}.ORDERBOOK", payload.symbol),
            snapshot_payload,
            message.timestamp,
        );
    }

    fn process_cancel(&mut self, message: &Message) {
        let payload: CancelPayload = match serde_json::from_value(message.payload.clone()) {
            Ok(p) => p,
            Err(error) => {
                tracing::warn!(%error, "malformed CANCEL payload, dropping");
                return;
            }
        };
        let Some(book) = self.books.get_mut(&payload.symbol) else {
            tracing::warn!(symbol = %payload.symbol, "cancel for unknown symbol");
            return;
        };
        if !book.cancel_order(&payload.order_id) {
            return;
        }

        let confirm = serde_json::to_value(CancelConfirmPayload {
            order_id: payload.order_id,
            cancelled: true,
        })
        .expect("CancelConfirmPayload always serializes");
        self.ctx().send_message_at(
            format!("{}.CANCEL_CONFIRM", payload.symbol),
            confirm,
            message.timestamp,
        );
        self.update_market_data(&payload.symbol, message.timestamp);
    }

    fn process_market_depth_query(&mut self, message: &Message) {
        let payload: MarketDepthQueryPayload = match serde_json::from_value(message.payload.clone()) {
            Ok(p) => p,
            Err(error) => {
                tracing::warn!(%error, "malformed MARKET_DEPTH payload, dropping");
                return;
            }
        };
        let Some(book) = self.books.get(&payload.symbol) else {
            tracing::warn!(symbol = %payload.symbol, "market depth query for unknown symbol");
            return;
        };

        let mut response = serde_json::Map::new();
        response.insert("query_type".into(), payload.query_type.clone().into());
        if let Some(query_id) = &payload.query_id {
            response.insert("query_id".into(), query_id.clone().into());
        }

        // Matches the original's unconditional final send: an unrecognized
        // query_type, or one missing a field it needs, still gets a reply —
        // just one carrying only `query_type`/`query_id` and whatever this
        // match managed to compute.
        match payload.query_type.as_str() {
            "get_market_depth" => match payload.side {
                Some(side) => {
                    let depth = payload.depth.unwrap_or(5);
                    let levels: Vec<_> = book
                        .get_market_depth(side, depth)
                        .into_iter()
                        .map(|(price, quantity)| serde_json::json!({"price": price, "quantity": quantity}))
                        .collect();
                    response.insert("levels".into(), levels.into());
                }
                None => tracing::warn!("get_market_depth query missing side"),
            },
            "get_total_quantity_at_side" => match payload.side {
                Some(side) => {
                    let quantity = book.get_total_quantity_at_side(side, payload.depth);
                    response.insert("quantity".into(), quantity.into());
                }
                None => tracing::warn!("get_total_quantity_at_side query missing side"),
            },
            "get_average_price_for_quantity" => match (payload.side, payload.quantity) {
                (Some(side), Some(quantity)) => {
                    let (average_price, slippage_bps, fill_percentage) =
                        book.get_average_price_for_quantity(side, quantity);
                    response.insert("average_price".into(), average_price.into());
                    response.insert("slippage_bps".into(), slippage_bps.into());
                    response.insert("fill_percentage".into(), fill_percentage.into());
                }
                _ => tracing::warn!("get_average_price_for_quantity query missing side/quantity"),
            },
            "can_fill_order" => match (payload.side, payload.quantity) {
                (Some(side), Some(quantity)) => {
                    let min_fill_percent = payload.min_fill_percent.unwrap_or(1.0);
                    let (can_fill, actual_fill_percentage) = book.can_fill_order(side, quantity, min_fill_percent);
                    response.insert("can_fill".into(), can_fill.into());
                    response.insert("actual_fill_percentage".into(), actual_fill_percentage.into());
                }
                _ => tracing::warn!("can_fill_order query missing side/quantity"),
            },
            "get_liquidity_score" => {
                let reference_quantity = payload.reference_quantity.unwrap_or(100.0);
                response.insert(
                    "liquidity_score".into(),
                    book.get_liquidity_score(reference_quantity).into(),
                );
            }
            "get_spread" => {
                response.insert("spread".into(), book.get_spread().into());
            }
            "get_imbalance" => {
                response.insert("imbalance".into(), book.get_imbalance().into());
            }
            other => tracing::warn!(query_type = other, "unknown market depth query_type"),
        }

        self.ctx().send_message_at(
            format!("{}.MARKET_DEPTH_RESPONSE", payload.symbol),
            serde_json::Value::Object(response),
            message.timestamp,
        );
    }

    fn update_market_data(&mut self, symbol: &str, timestamp: i64) {
        let (best_bid, best_ask) = {
            let book = self.books.get(symbol).expect("symbol must already be initialized");
            (book.best_bid(), book.best_ask())
        };
        if let Some(market_data) = self.market_data.get_mut(symbol) {
            market_data.timestamp = timestamp;
            market_data.best_bid = best_bid;
            market_data.best_ask = best_ask;
        }

        let spread = if best_ask == f64::INFINITY { 0.0 } else { best_ask - best_bid };
        let payload = serde_json::to_value(PricePayload { best_bid, best_ask, spread })
            .expect("PricePayload always serializes");
        self.ctx().send_message_at(format!("{symbol}.PRICE"), payload, timestamp);
    }

    fn publish_market_statistics(&mut self, timestamp: i64) {
        let interval = self.config.market_data_update_interval;
        let window_start = timestamp - interval;
        let symbols: Vec<Symbol> = self.market_data.keys().cloned().collect();

        for symbol in symbols {
            let mut total_volume = 0i64;
            let mut total_value = 0.0f64;
            for trade in self
                .trade_history
                .iter()
                .filter(|t| t.symbol == symbol && t.timestamp >= window_start)
            {
                total_volume += trade.quantity;
                total_value += trade.price * trade.quantity as f64;
            }
            let vwap = if total_volume > 0 { total_value / total_volume as f64 } else { 0.0 };
            let market_data = &self.market_data[&symbol];

            let payload = serde_json::to_value(StatsPayload {
                volume: total_volume,
                vwap,
                best_bid: market_data.best_bid,
                best_ask: market_data.best_ask,
            })
            .expect("StatsPayload always serializes");
            self.ctx().send_message_at(format!("{symbol}.STATS"), payload, timestamp);
        }
    }
}

impl Agent for ExchangeAgent {
    fn agent_id(&self) -> &str {
        &self.agent_id
    }

    fn bind(&mut self, ctx: AgentContext) {
        self.ctx = Some(ctx);
    }

    fn receive_message(&mut self, message: &Message) {
        if message.topic.ends_with(".ORDER") {
            self.process_order(message);
        } else if message.topic.ends_with(".CANCEL") {
            self.process_cancel(message);
        } else if message.topic.ends_with(".MARKET_DEPTH") {
            self.process_market_depth_query(message);
        }
    }

    fn wakeup(&mut self, current_time: i64) {
        self.publish_market_statistics(current_time);
        self.ctx().schedule_wakeup(current_time + self.config.market_data_update_interval);
    }

    fn is_active(&self) -> bool {
        true
    }
}
