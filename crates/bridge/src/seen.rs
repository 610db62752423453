use std::collections::HashSet;

use stockpile_core::OrderId;

/// Process-local record of order ids already handed to the forwarder.
///
/// Ids are added before (or atomically with) initiating forwarding and are
/// never removed. Mutated only by the watcher loop, so implementations need
/// no internal locking. A future persistent-offset implementation can be
/// swapped in without touching the watcher's control logic.
pub trait SeenSet: Send {
    fn has(&self, order_id: OrderId) -> bool;

    /// Mark an id as seen. Returns `true` when the id was not seen before.
    fn mark_seen(&mut self, order_id: OrderId) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// HashSet-backed seen-set (the default; not durable).
#[derive(Debug, Default)]
pub struct InMemorySeenSet {
    ids: HashSet<OrderId>,
}

impl InMemorySeenSet {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SeenSet for InMemorySeenSet {
    fn has(&self, order_id: OrderId) -> bool {
        self.ids.contains(&order_id)
    }

    fn mark_seen(&mut self, order_id: OrderId) -> bool {
        self.ids.insert(order_id)
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_seen_reports_first_insertion_only() {
        let mut seen = InMemorySeenSet::new();
        let id = OrderId::new();

        assert!(!seen.has(id));
        assert!(seen.mark_seen(id));
        assert!(seen.has(id));
        assert!(!seen.mark_seen(id));
        assert_eq!(seen.len(), 1);
    }
}
