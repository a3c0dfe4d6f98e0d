use crate::state::{StateObserver, StateRecord};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// In-process fan-out of state records to live subscribers.
///
/// Publishing succeeds even when nobody is subscribed (the record is simply
/// dropped). Slow subscribers lag and lose records rather than blocking the
/// poller.
pub struct StateBroadcaster {
    sender: broadcast::Sender<StateRecord>,
}

impl StateBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Send a record to every current subscriber
    pub fn publish(&self, record: StateRecord) {
        trace!(entity_id = %record.entity_id, "Emitting state");
        // No receivers is fine
        let _ = self.sender.send(record);
    }

    /// Receive every record published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<StateRecord> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Observer callback that republishes every written record
    pub fn observer(self: &Arc<Self>) -> StateObserver {
        let broadcaster = Arc::clone(self);
        Arc::new(move |record: &StateRecord| broadcaster.publish(record.clone()))
    }
}

impl Default for StateBroadcaster {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::build_store;

    #[test]
    fn test_publish_without_subscribers() {
        let broadcaster = StateBroadcaster::new(4);
        broadcaster.publish(StateRecord::new("person.alice", "home"));
        assert_eq!(broadcaster.receiver_count(), 0);
    }

    #[test]
    fn test_delivers_to_multiple_subscribers() {
        let broadcaster = StateBroadcaster::new(4);
        let mut rx1 = broadcaster.subscribe();
        let mut rx2 = broadcaster.subscribe();

        broadcaster.publish(StateRecord::new("person.alice", "home"));

        assert_eq!(rx1.try_recv().unwrap().status, "home");
        assert_eq!(rx2.try_recv().unwrap().status, "home");
    }

    #[test]
    fn test_observer_publishes_filtered_records() {
        let broadcaster = Arc::new(StateBroadcaster::new(8));
        let mut rx = broadcaster.subscribe();
        let store = build_store(0, true, broadcaster.observer()).unwrap();

        // No coordinates: dropped by the filter, still broadcast
        store.set(StateRecord::new("person.alice", "home"));

        assert!(store.list().is_empty());
        assert_eq!(rx.try_recv().unwrap().entity_id, "person.alice");
    }
}
