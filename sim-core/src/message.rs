use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

pub type AgentId = String;

/// One piece of inter-agent traffic: a timestamped, topic-addressed payload.
///
/// `message_id` is the heap tiebreak for same-timestamp messages. The source
/// assigns it from a random UUID at construction time, which makes the
/// relative order of two same-timestamp messages a function of random bytes
/// rather than anything the simulation controls. Here it is allocated by
/// `MessageBus::publish` from a single monotonic counter in call order
/// instead, so identical agent logic reproduces identical delivery order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub timestamp: i64,
    pub topic: String,
    pub payload: Value,
    pub source_id: AgentId,
    pub message_id: u64,
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        (self.timestamp, self.message_id) == (other.timestamp, other.message_id)
    }
}

impl Eq for Message {}

impl PartialOrd for Message {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Message {
    /// Reversed so a `BinaryHeap<Message>` (a max-heap) pops the
    /// smallest `(timestamp, message_id)` first, matching `heapq`'s
    /// min-heap semantics.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.timestamp, other.message_id).cmp(&(self.timestamp, self.message_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    fn msg(timestamp: i64, message_id: u64) -> Message {
        Message {
            timestamp,
            topic: "X.ORDER".into(),
            payload: Value::Null,
            source_id: "A".into(),
            message_id,
        }
    }

    #[test]
    fn heap_pops_lowest_timestamp_first() {
        let mut heap = BinaryHeap::new();
        heap.push(msg(200, 0));
        heap.push(msg(100, 1));
        heap.push(msg(150, 2));

        assert_eq!(heap.pop().unwrap().timestamp, 100);
        assert_eq!(heap.pop().unwrap().timestamp, 150);
        assert_eq!(heap.pop().unwrap().timestamp, 200);
    }

    #[test]
    fn heap_breaks_timestamp_ties_by_message_id() {
        let mut heap = BinaryHeap::new();
        heap.push(msg(100, 5));
        heap.push(msg(100, 1));
        heap.push(msg(100, 3));

        assert_eq!(heap.pop().unwrap().message_id, 1);
        assert_eq!(heap.pop().unwrap().message_id, 3);
        assert_eq!(heap.pop().unwrap().message_id, 5);
    }
}
