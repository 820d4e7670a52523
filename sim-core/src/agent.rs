use crate::bus::MessageBus;
use crate::kernel::Scheduler;
use crate::message::{AgentId, Message};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Capability every simulation participant implements.
///
/// The source expresses this as a three-level class hierarchy (`Agent` ->
/// `PassiveAgent`/`ActiveAgent`); per the design notes that hierarchy
/// collapses here into one trait with a default no-op `wakeup` and an
/// `is_active` flag, since Rust has no abstract-class equivalent and a tagged
/// capability is the idiomatic stand-in for the dynamic-dispatch split the
/// kernel needs (`is_active` gates whether `wakeup` is ever called).
pub trait Agent {
    fn agent_id(&self) -> &str;

    /// Called once by `Kernel::register_agent`, handing the agent its
    /// bus/scheduler/clock handle. Implementations store `ctx` for later use
    /// by `subscribe`/`send_message`/`schedule_wakeup`.
    fn bind(&mut self, ctx: AgentContext);

    fn receive_message(&mut self, message: &Message);

    fn wakeup(&mut self, _current_time: i64) {}

    fn is_active(&self) -> bool {
        false
    }
}

/// Non-owning handle to the bus, scheduler, and virtual clock, handed to an
/// agent at registration in place of a back-reference to the kernel itself.
#[derive(Clone)]
pub struct AgentContext {
    agent_id: AgentId,
    bus: Rc<RefCell<MessageBus>>,
    scheduler: Rc<RefCell<Scheduler>>,
    clock: Rc<Cell<i64>>,
}

impl AgentContext {
    pub fn new(
        agent_id: AgentId,
        bus: Rc<RefCell<MessageBus>>,
        scheduler: Rc<RefCell<Scheduler>>,
        clock: Rc<Cell<i64>>,
    ) -> Self {
        AgentContext {
            agent_id,
            bus,
            scheduler,
            clock,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn current_time(&self) -> i64 {
        self.clock.get()
    }

    pub fn subscribe(&self, topic_pattern: impl Into<String>) {
        self.bus.borrow_mut().subscribe(self.agent_id.clone(), topic_pattern);
    }

    pub fn unsubscribe(&self, topic_pattern: &str) {
        self.bus.borrow_mut().unsubscribe(&self.agent_id, topic_pattern);
    }

    /// Publishes at the current virtual time. Returns the assigned
    /// `message_id`.
    pub fn send_message(&self, topic: impl Into<String>, payload: Value) -> u64 {
        self.send_message_at(topic, payload, self.current_time())
    }

    pub fn send_message_at(&self, topic: impl Into<String>, payload: Value, timestamp: i64) -> u64 {
        self.bus
            .borrow_mut()
            .publish(timestamp, topic, payload, self.agent_id.clone())
    }

    /// Requests a wakeup at `timestamp`. Panics if `timestamp` is in the past
    /// relative to the current virtual clock — scheduling into the past is a
    /// programmer error, not a recoverable condition.
    pub fn schedule_wakeup(&self, timestamp: i64) {
        self.scheduler.borrow_mut().schedule_event(
            timestamp,
            self.agent_id.clone(),
            crate::kernel::EventKind::Wakeup,
            self.clock.get(),
        );
    }
}
