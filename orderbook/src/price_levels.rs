use crate::types::{Order, OrderId, Side};
use ordered_float::OrderedFloat;
use std::collections::{BTreeMap, VecDeque};

/// One price rung: a FIFO queue of live orders plus their aggregate quantity.
/// Invariant: a level with zero aggregate quantity is removed from the map,
/// never left behind empty.
#[derive(Default)]
struct Level {
    orders: VecDeque<Order>,
    quantity: i64,
}

/// One side (bids or asks) of a single symbol's book.
///
/// Keyed by `OrderedFloat<f64>` so real-valued prices get a total order inside
/// a `BTreeMap` without the caller normalizing to integer ticks. Bids and asks
/// differ only in which end of the map is "best"; `best_price`/`pop_best_queue`
/// branch on `side` for that.
///
/// Cancellation is eager: `cancel` removes the order from its level's FIFO
/// immediately and shrinks or drops the level on the spot, rather than
/// marking it dead and skipping it lazily during matching.
pub struct PriceLevels {
    side: Side,
    levels: BTreeMap<OrderedFloat<f64>, Level>,
}

impl PriceLevels {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Adds an order at its price level, creating the level if absent.
    pub fn push(&mut self, order: Order) {
        let key = OrderedFloat(order.price);
        let level = self.levels.entry(key).or_default();
        level.quantity += order.quantity;
        level.orders.push_back(order);
    }

    /// Best price for this side: highest for bids, lowest for asks.
    pub fn best_price(&self) -> Option<f64> {
        match self.side {
            Side::Buy => self.levels.last_key_value().map(|(px, _)| px.0),
            Side::Sell => self.levels.first_key_value().map(|(px, _)| px.0),
        }
    }

    /// Total quantity resting at the best price, 0 if the side is empty.
    pub fn best_level_quantity(&self) -> i64 {
        match self.side {
            Side::Buy => self.levels.last_key_value().map(|(_, l)| l.quantity),
            Side::Sell => self.levels.first_key_value().map(|(_, l)| l.quantity),
        }
        .unwrap_or(0)
    }

    /// Drains up to `max_fill` units from the level at exactly `price`,
    /// front-to-back, calling `on_fill(resting_order, filled_qty)` once per
    /// resting order touched (`resting_order.quantity` already reflects the
    /// fill). Removes exhausted orders and drops the level if it empties.
    /// No-op returning 0 if no level exists at `price`.
    pub fn drain_price(
        &mut self,
        price: f64,
        max_fill: i64,
        mut on_fill: impl FnMut(&Order, i64),
    ) -> i64 {
        let key = OrderedFloat(price);
        let mut total = 0;
        let mut now_empty = false;
        if let Some(level) = self.levels.get_mut(&key) {
            while total < max_fill {
                let Some(front) = level.orders.front_mut() else {
                    break;
                };
                let fill = (max_fill - total).min(front.quantity);
                front.quantity -= fill;
                level.quantity -= fill;
                on_fill(front, fill);
                total += fill;
                if front.quantity == 0 {
                    level.orders.pop_front();
                }
            }
            now_empty = level.orders.is_empty();
        }
        if now_empty {
            self.levels.remove(&key);
        }
        total
    }

    /// Drains the best level(s), best-first, while `crossable(price)` holds
    /// and `max_fill` has not been reached, moving to the next-best level
    /// once the current one empties. Returns total filled.
    pub fn drain_best(
        &mut self,
        max_fill: i64,
        crossable: impl Fn(f64) -> bool,
        mut on_fill: impl FnMut(&Order, i64),
    ) -> i64 {
        let mut total = 0;
        while total < max_fill {
            let Some(price) = self.best_price() else {
                break;
            };
            if !crossable(price) {
                break;
            }
            let filled = self.drain_price(price, max_fill - total, &mut on_fill);
            if filled == 0 {
                break;
            }
            total += filled;
        }
        total
    }

    /// Removes `order_id` from the level at `price`. Returns the removed order
    /// if it was found. Preserves FIFO of the remaining orders at that level
    /// and drops the level entirely if it becomes empty.
    pub fn cancel(&mut self, price: f64, order_id: &OrderId) -> Option<Order> {
        let key = OrderedFloat(price);
        let level = self.levels.get_mut(&key)?;
        let pos = level.orders.iter().position(|o| &o.order_id == order_id)?;
        let removed = level.orders.remove(pos)?;
        level.quantity -= removed.quantity;
        if level.orders.is_empty() {
            self.levels.remove(&key);
        }
        Some(removed)
    }

    /// Levels best-first, as `(price, quantity)`, capped at `depth` when given.
    pub fn depth(&self, depth: Option<usize>) -> Vec<(f64, i64)> {
        let iter: Box<dyn Iterator<Item = (&OrderedFloat<f64>, &Level)>> = match self.side {
            Side::Buy => Box::new(self.levels.iter().rev()),
            Side::Sell => Box::new(self.levels.iter()),
        };
        match depth {
            Some(d) => iter.take(d).map(|(px, l)| (px.0, l.quantity)).collect(),
            None => iter.map(|(px, l)| (px.0, l.quantity)).collect(),
        }
    }

    /// Total quantity across up to `depth` best levels (all levels if `None`).
    pub fn total_quantity(&self, depth: Option<usize>) -> i64 {
        self.depth(depth).iter().map(|(_, q)| *q).sum()
    }
}
