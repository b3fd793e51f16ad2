//! Redelivery filter for Slack events.
//!
//! Slack redelivers an event when it thinks the first acknowledgement was
//! lost. Every delivery of one event carries the same `event_id`, so the
//! gateway remembers the most recent ids and drops repeats.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, PoisonError};

/// Bounded set of recently accepted event ids; the oldest id is forgotten first.
pub struct RecentEvents {
    capacity: usize,
    seen: Mutex<Seen>,
}

#[derive(Default)]
struct Seen {
    order: VecDeque<String>,
    ids: HashSet<String>,
}

impl RecentEvents {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            seen: Mutex::new(Seen::default()),
        }
    }

    /// Record `event_id`. Returns `false` if it was already recorded.
    pub fn first_delivery(&self, event_id: &str) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        if seen.ids.contains(event_id) {
            return false;
        }

        if seen.order.len() >= self.capacity {
            if let Some(oldest) = seen.order.pop_front() {
                seen.ids.remove(&oldest);
            }
        }
        seen.order.push_back(event_id.to_string());
        seen.ids.insert(event_id.to_string());
        true
    }
}
