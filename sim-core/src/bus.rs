use crate::agent::Agent;
use crate::message::{AgentId, Message};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};
use std::rc::Rc;

/// Timestamp-ordered publish/subscribe layer shared by the kernel and every
/// registered agent via `Rc<RefCell<_>>`.
///
/// Subscriptions are either exact topics or one of three wildcard shapes:
/// the universal `*`, a prefix pattern `PREFIX.*` (matches `PREFIX` itself
/// and any `PREFIX.suffix`), or a suffix pattern `*.SUFFIX`. Any other use of
/// `*` matches nothing.
pub struct MessageBus {
    subscriptions: HashMap<String, HashSet<AgentId>>,
    wildcard_subscriptions: HashMap<String, HashSet<AgentId>>,
    queue: BinaryHeap<Message>,
    agent_handlers: HashMap<AgentId, Rc<RefCell<dyn Agent>>>,
    next_message_id: u64,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus {
    pub fn new() -> Self {
        MessageBus {
            subscriptions: HashMap::new(),
            wildcard_subscriptions: HashMap::new(),
            queue: BinaryHeap::new(),
            agent_handlers: HashMap::new(),
            next_message_id: 0,
        }
    }

    pub fn subscribe(&mut self, agent_id: AgentId, topic_pattern: impl Into<String>) {
        let pattern = topic_pattern.into();
        if pattern.contains('*') {
            self.wildcard_subscriptions
                .entry(pattern)
                .or_default()
                .insert(agent_id);
        } else {
            self.subscriptions.entry(pattern).or_default().insert(agent_id);
        }
    }

    pub fn unsubscribe(&mut self, agent_id: &str, topic_pattern: &str) {
        if topic_pattern.contains('*') {
            if let Some(agents) = self.wildcard_subscriptions.get_mut(topic_pattern) {
                agents.remove(agent_id);
            }
        } else if let Some(agents) = self.subscriptions.get_mut(topic_pattern) {
            agents.remove(agent_id);
        }
    }

    pub fn register_agent_handler(&mut self, agent_id: AgentId, handler: Rc<RefCell<dyn Agent>>) {
        self.agent_handlers.insert(agent_id, handler);
    }

    /// Enqueues `payload` for delivery at `timestamp`, assigning the next
    /// monotonic `message_id`. Returns the assigned id.
    pub fn publish(
        &mut self,
        timestamp: i64,
        topic: impl Into<String>,
        payload: Value,
        source_id: impl Into<String>,
    ) -> u64 {
        let message_id = self.next_message_id;
        self.next_message_id += 1;
        self.queue.push(Message {
            timestamp,
            topic: topic.into(),
            payload,
            source_id: source_id.into(),
            message_id,
        });
        message_id
    }

    /// Pops every pending message with `timestamp <= at`, in nondecreasing
    /// `(timestamp, message_id)` order.
    fn pop_due(&mut self, at: i64) -> Vec<Message> {
        let mut due = Vec::new();
        while let Some(top) = self.queue.peek() {
            if top.timestamp > at {
                break;
            }
            due.push(self.queue.pop().expect("peeked element must pop"));
        }
        due
    }

    /// Subscribers for `topic`, exact and wildcard, in a deterministic order.
    fn recipients_for(&self, topic: &str) -> Vec<AgentId> {
        let mut recipients: BTreeSet<AgentId> = BTreeSet::new();
        if let Some(agents) = self.subscriptions.get(topic) {
            recipients.extend(agents.iter().cloned());
        }
        for (pattern, agents) in &self.wildcard_subscriptions {
            if matches_pattern(topic, pattern) {
                recipients.extend(agents.iter().cloned());
            }
        }
        recipients.into_iter().collect()
    }

    fn handler_for(&self, agent_id: &str) -> Option<Rc<RefCell<dyn Agent>>> {
        self.agent_handlers.get(agent_id).cloned()
    }
}

fn matches_pattern(topic: &str, pattern: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if !pattern.contains('*') {
        return topic == pattern;
    }
    if let Some(prefix) = pattern.strip_suffix(".*") {
        return topic == prefix || topic.starts_with(&format!("{prefix}."));
    }
    if let Some(suffix) = pattern.strip_prefix("*.") {
        return topic.ends_with(&format!(".{suffix}"));
    }
    false
}

/// Delivers every message due at `at`, one message at a time, in pop order.
///
/// Deliberately a free function over `&Rc<RefCell<MessageBus>>` rather than
/// a `&mut self` method: each step below borrows the bus only long enough to
/// pop messages, read subscriptions, or clone out a handler, then drops that
/// borrow before invoking the handler. A handler that publishes or
/// subscribes during its own `receive_message` call re-borrows the same
/// `RefCell` — holding our borrow across that call would panic at runtime
/// with a double mutable borrow.
pub fn deliver_messages(bus: &Rc<RefCell<MessageBus>>, at: i64) {
    let due = bus.borrow_mut().pop_due(at);
    tracing::debug!(timestamp = at, count = due.len(), "delivering messages");
    for message in due {
        let recipients = bus.borrow().recipients_for(&message.topic);
        for agent_id in recipients {
            match bus.borrow().handler_for(&agent_id) {
                Some(handler) => handler.borrow_mut().receive_message(&message),
                None => tracing::warn!(
                    agent_id = %agent_id,
                    topic = %message.topic,
                    "message dropped: no handler registered for subscribed agent"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentContext;
    use std::cell::Cell;

    struct Recorder {
        id: AgentId,
        received: Vec<Message>,
    }

    impl Agent for Recorder {
        fn agent_id(&self) -> &str {
            &self.id
        }
        fn bind(&mut self, _ctx: AgentContext) {}
        fn receive_message(&mut self, message: &Message) {
            self.received.push(message.clone());
        }
    }

    fn recorder(id: &str) -> Rc<RefCell<Recorder>> {
        Rc::new(RefCell::new(Recorder {
            id: id.to_string(),
            received: Vec::new(),
        }))
    }

    #[test]
    fn exact_subscription_matches_only_its_topic() {
        let bus = Rc::new(RefCell::new(MessageBus::new()));
        let r = recorder("R");
        bus.borrow_mut().register_agent_handler("R".into(), r.clone());
        bus.borrow_mut().subscribe("R".into(), "X.TRADE");

        bus.borrow_mut().publish(100, "X.TRADE", Value::Null, "ex");
        bus.borrow_mut().publish(100, "X.ORDERBOOK", Value::Null, "ex");
        deliver_messages(&bus, 100);

        assert_eq!(r.borrow().received.len(), 1);
        assert_eq!(r.borrow().received[0].topic, "X.TRADE");
    }

    #[test]
    fn prefix_wildcard_matches_literal_and_dotted_suffixes() {
        let bus = Rc::new(RefCell::new(MessageBus::new()));
        let r = recorder("R");
        bus.borrow_mut().register_agent_handler("R".into(), r.clone());
        bus.borrow_mut().subscribe("R".into(), "X.*");

        bus.borrow_mut().publish(100, "X", Value::Null, "ex");
        bus.borrow_mut().publish(100, "X.TRADE", Value::Null, "ex");
        bus.borrow_mut().publish(100, "Y.TRADE", Value::Null, "ex");
        deliver_messages(&bus, 100);

        let topics: Vec<_> = r.borrow().received.iter().map(|m| m.topic.clone()).collect();
        assert_eq!(topics, vec!["X", "X.TRADE"]);
    }

    #[test]
    fn suffix_wildcard_matches_any_prefix() {
        let bus = Rc::new(RefCell::new(MessageBus::new()));
        let r = recorder("R");
        bus.borrow_mut().register_agent_handler("R".into(), r.clone());
        bus.borrow_mut().subscribe("R".into(), "*.ORDERBOOK");

        bus.borrow_mut().publish(100, "X.ORDERBOOK", Value::Null, "ex");
        bus.borrow_mut().publish(100, "Y.ORDERBOOK", Value::Null, "ex");
        bus.borrow_mut().publish(100, "X.TRADE", Value::Null, "ex");
        deliver_messages(&bus, 100);

        assert_eq!(r.borrow().received.len(), 2);
    }

    #[test]
    fn universal_wildcard_matches_everything() {
        let bus = Rc::new(RefCell::new(MessageBus::new()));
        let r = recorder("R");
        bus.borrow_mut().register_agent_handler("R".into(), r.clone());
        bus.borrow_mut().subscribe("R".into(), "*");

        bus.borrow_mut().publish(100, "ANYTHING.AT.ALL", Value::Null, "ex");
        deliver_messages(&bus, 100);

        assert_eq!(r.borrow().received.len(), 1);
    }

    #[test]
    fn equal_timestamp_messages_deliver_in_message_id_order() {
        let bus = Rc::new(RefCell::new(MessageBus::new()));
        let r = recorder("R");
        bus.borrow_mut().register_agent_handler("R".into(), r.clone());
        bus.borrow_mut().subscribe("R".into(), "X.*");

        bus.borrow_mut().publish(100, "X.A", Value::Null, "ex");
        bus.borrow_mut().publish(100, "X.B", Value::Null, "ex");
        bus.borrow_mut().publish(100, "X.C", Value::Null, "ex");
        deliver_messages(&bus, 100);

        let topics: Vec<_> = r.borrow().received.iter().map(|m| m.topic.clone()).collect();
        assert_eq!(topics, vec!["X.A", "X.B", "X.C"]);
    }

    #[test]
    fn message_not_delivered_before_its_timestamp() {
        let bus = Rc::new(RefCell::new(MessageBus::new()));
        let r = recorder("R");
        bus.borrow_mut().register_agent_handler("R".into(), r.clone());
        bus.borrow_mut().subscribe("R".into(), "X.A");

        bus.borrow_mut().publish(150, "X.A", Value::Null, "ex");
        deliver_messages(&bus, 100);
        assert!(r.borrow().received.is_empty());

        deliver_messages(&bus, 150);
        assert_eq!(r.borrow().received.len(), 1);
    }

    #[test]
    fn unknown_recipient_is_silently_dropped() {
        let bus = Rc::new(RefCell::new(MessageBus::new()));
        // Subscribe "GHOST" without ever registering a handler for it.
        bus.borrow_mut().subscribe("GHOST".into(), "X.A");
        bus.borrow_mut().publish(100, "X.A", Value::Null, "ex");
        // Must not panic.
        deliver_messages(&bus, 100);
    }

    #[test]
    fn reentrant_publish_during_handler_does_not_panic() {
        struct Republisher {
            ctx: Option<AgentContext>,
            clock: Rc<Cell<i64>>,
        }
        impl Agent for Republisher {
            fn agent_id(&self) -> &str {
                "REPUB"
            }
            fn bind(&mut self, ctx: AgentContext) {
                self.ctx = Some(ctx);
            }
            fn receive_message(&mut self, _message: &Message) {
                let ctx = self.ctx.as_ref().unwrap();
                ctx.send_message_at("X.ECHO", Value::Null, self.clock.get());
            }
        }

        let clock = Rc::new(Cell::new(100));
        let bus = Rc::new(RefCell::new(MessageBus::new()));
        let scheduler = Rc::new(RefCell::new(crate::kernel::Scheduler::new()));
        let republisher = Rc::new(RefCell::new(Republisher { ctx: None, clock: clock.clone() }));

        let ctx = AgentContext::new("REPUB".into(), bus.clone(), scheduler, clock.clone());
        republisher.borrow_mut().bind(ctx);
        bus.borrow_mut()
            .register_agent_handler("REPUB".into(), republisher.clone());
        bus.borrow_mut().subscribe("REPUB".into(), "X.TRIGGER");

        bus.borrow_mut().publish(100, "X.TRIGGER", Value::Null, "ex");
        deliver_messages(&bus, 100);

        // The echo was published during delivery; it is queued, not yet delivered.
        assert_eq!(bus.borrow().queue.len(), 1);
    }
}
