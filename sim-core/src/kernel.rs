use crate::agent::{Agent, AgentContext};
use crate::bus::{self, MessageBus};
use crate::message::AgentId;
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    Wakeup,
}

/// A scheduled kernel event: `(timestamp, agent_id, kind)`, the key the
/// event heap orders by.
#[derive(Clone, Debug, Eq, PartialEq)]
struct Event {
    timestamp: i64,
    agent_id: AgentId,
    kind: EventKind,
}

impl Ord for Event {
    /// Reversed, as with `Message`, so `BinaryHeap` behaves as a min-heap.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.timestamp, &other.agent_id, other.kind).cmp(&(self.timestamp, &self.agent_id, self.kind))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Owns the event heap and the per-timestamp wakeup index. Shared between
/// the kernel's run loop and every agent's `AgentContext` via `Rc<RefCell<_>>`
/// so agents can schedule their own future wakeups.
pub struct Scheduler {
    queue: BinaryHeap<Event>,
    wakeups: HashMap<i64, HashSet<AgentId>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            queue: BinaryHeap::new(),
            wakeups: HashMap::new(),
        }
    }

    /// Schedules `kind` for `agent_id` at `timestamp`. Panics if `timestamp`
    /// is before `current_time` — scheduling into the past cannot be made
    /// sense of by a deterministic replay and is treated as a programmer
    /// error, not a recoverable condition.
    pub fn schedule_event(&mut self, timestamp: i64, agent_id: AgentId, kind: EventKind, current_time: i64) {
        assert!(
            timestamp >= current_time,
            "cannot schedule {kind:?} for agent {agent_id} at {timestamp}: current time is {current_time}"
        );
        self.queue.push(Event {
            timestamp,
            agent_id: agent_id.clone(),
            kind,
        });
        if kind == EventKind::Wakeup {
            self.wakeups.entry(timestamp).or_default().insert(agent_id);
        }
    }

    fn peek_next_timestamp(&self) -> Option<i64> {
        self.queue.peek().map(|e| e.timestamp)
    }

    /// Pops every event at exactly `timestamp` off the heap. The popped
    /// events themselves carry no further information the kernel needs —
    /// the wakeup index (populated at schedule time) is what the run loop
    /// actually dispatches from — so this only drains the heap.
    fn drain_events_at(&mut self, timestamp: i64) {
        while matches!(self.queue.peek(), Some(e) if e.timestamp == timestamp) {
            self.queue.pop();
        }
    }

    /// Removes and returns the agents due for a wakeup at `timestamp`, sorted
    /// for a deterministic dispatch order.
    fn take_wakeups(&mut self, timestamp: i64) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self
            .wakeups
            .remove(&timestamp)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

/// Virtual-time event scheduler driving agent wakeups and message delivery
/// in a single logical thread.
///
/// Given identical registration order, identical initial events, and
/// deterministic agent logic, `run` produces a bit-identical sequence of
/// trades and published messages across executions.
pub struct Kernel {
    clock: Rc<Cell<i64>>,
    end_time: i64,
    scheduler: Rc<RefCell<Scheduler>>,
    bus: Rc<RefCell<MessageBus>>,
    agents: HashMap<AgentId, Rc<RefCell<dyn Agent>>>,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel {
    pub fn new() -> Self {
        Kernel {
            clock: Rc::new(Cell::new(0)),
            end_time: 0,
            scheduler: Rc::new(RefCell::new(Scheduler::new())),
            bus: Rc::new(RefCell::new(MessageBus::new())),
            agents: HashMap::new(),
        }
    }

    pub fn current_time(&self) -> i64 {
        self.clock.get()
    }

    /// Registers `agent`, binds it to a fresh `AgentContext`, and wires its
    /// `receive_message` into the bus's handler table.
    pub fn register_agent(&mut self, agent: Rc<RefCell<dyn Agent>>) {
        let agent_id = agent.borrow().agent_id().to_string();
        let ctx = AgentContext::new(
            agent_id.clone(),
            self.bus.clone(),
            self.scheduler.clone(),
            self.clock.clone(),
        );
        agent.borrow_mut().bind(ctx);
        self.bus.borrow_mut().register_agent_handler(agent_id.clone(), agent.clone());
        self.agents.insert(agent_id, agent);
    }

    /// Schedules `agent_id` for a wakeup at `timestamp`. Panics if the agent
    /// was never registered, or if `timestamp` precedes the current time.
    pub fn schedule_agent_wakeup(&mut self, agent_id: &str, timestamp: i64) {
        assert!(
            self.agents.contains_key(agent_id),
            "agent {agent_id} not registered with kernel"
        );
        self.scheduler
            .borrow_mut()
            .schedule_event(timestamp, agent_id.to_string(), EventKind::Wakeup, self.clock.get());
    }

    /// Runs the simulation from time 0 to `end_time`.
    ///
    /// Each iteration advances to the next event's timestamp (clamped to
    /// `end_time`), delivers all messages due at that time, then wakes every
    /// active agent scheduled for it. After the loop exits, one final
    /// delivery pass flushes messages published by the last wakeups — those
    /// publications share the final timestamp, so without this flush they
    /// would never be handed to subscribers.
    pub fn run(&mut self, end_time: i64) {
        tracing::info!(end_time, "starting simulation run");
        self.end_time = end_time;
        self.clock.set(0);

        loop {
            if self.clock.get() >= self.end_time {
                break;
            }
            let Some(mut next) = self.scheduler.borrow().peek_next_timestamp() else {
                self.clock.set(self.end_time);
                break;
            };
            if next > self.end_time {
                next = self.end_time;
            }
            self.clock.set(next);
            tracing::debug!(timestamp = next, "processing events");

            self.scheduler.borrow_mut().drain_events_at(next);
            bus::deliver_messages(&self.bus, next);

            let due = self.scheduler.borrow_mut().take_wakeups(next);
            for agent_id in due {
                if let Some(agent) = self.agents.get(&agent_id) {
                    let mut a = agent.borrow_mut();
                    if a.is_active() {
                        a.wakeup(next);
                    }
                }
            }
        }

        bus::deliver_messages(&self.bus, self.clock.get());
        tracing::info!("simulation run completed");
    }
}
