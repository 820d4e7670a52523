//! Discrete-event simulation core: virtual clock, event scheduling, and a
//! timestamp-ordered publish/subscribe message bus.
//!
//! Strictly single-threaded cooperative — the kernel is the only driver, and
//! handler/wakeup bodies run to completion before time advances. All
//! ordering derives from simulated timestamps and `message_id` tiebreaks;
//! there is no real concurrency, so shared state uses `Rc`/`RefCell` rather
//! than `Arc`/`Mutex`.

pub mod agent;
pub mod bus;
pub mod kernel;
pub mod message;

pub use agent::{Agent, AgentContext};
pub use bus::MessageBus;
pub use kernel::{EventKind, Kernel};
pub use message::{AgentId, Message};
