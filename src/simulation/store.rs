use crate::simulation::event::Event;
use crate::time::Time;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct Timeline {
    events: Arc<Vec<Event>>,
    version: u64,
}

/// Append-only, time-ordered event log.
///
/// Writers swap in a new sorted list under the lock; readers clone the
/// current `Arc` and replay it without holding the lock.
#[derive(Debug, Default)]
pub struct TimelineStore {
    inner: RwLock<Timeline>,
}

impl TimelineStore {
    pub fn new() -> TimelineStore {
        TimelineStore::default()
    }

    /// Replaces the whole log.
    pub fn load(&self, mut events: Vec<Event>) -> u64 {
        events.sort_by_key(Event::order_key);
        let mut timeline = self.inner.write();
        timeline.events = Arc::new(events);
        timeline.version += 1;
        debug!(events = timeline.events.len(), version = timeline.version, "timeline loaded");
        timeline.version
    }

    /// Merges `more` into the log and returns the new version.
    pub fn append(&self, more: Vec<Event>) -> u64 {
        let mut timeline = self.inner.write();
        let mut events = Vec::with_capacity(timeline.events.len() + more.len());
        events.extend(timeline.events.iter().cloned());
        events.extend(more);
        // stable: events already in the log stay ahead of new ones with the same key
        events.sort_by_key(Event::order_key);
        timeline.events = Arc::new(events);
        timeline.version += 1;
        debug!(events = timeline.events.len(), version = timeline.version, "timeline appended");
        timeline.version
    }

    pub fn events(&self) -> Arc<Vec<Event>> {
        self.inner.read().events.clone()
    }

    /// Events with `from <= at < to`.
    pub fn events_between(&self, from: Time, to: Time) -> Vec<Event> {
        let events = self.events();
        let first = events.partition_point(|e| e.at < from);
        let last = events.partition_point(|e| e.at < to);
        events[first..last.max(first)].to_vec()
    }

    pub fn version(&self) -> u64 {
        self.inner.read().version
    }

    pub fn len(&self) -> usize {
        self.inner.read().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::event::EventKind;
    use std::thread;

    fn cancellation(at: i64, flight: &str) -> Event {
        Event::cancellation(Time(at), &Arc::from(flight), &Arc::from("SKBO"))
    }

    #[test]
    fn test_append_keeps_order_and_bumps_version() {
        let store = TimelineStore::new();
        assert_eq!(0, store.version());
        assert_eq!(1, store.load(vec![cancellation(50, "B"), cancellation(10, "A")]));
        assert_eq!(2, store.append(vec![cancellation(30, "C"), cancellation(10, "D")]));

        let ids = store
            .events()
            .iter()
            .map(|e| e.flight_id.as_deref().unwrap_or("").to_string())
            .collect::<Vec<_>>();
        assert_eq!(vec!["A", "D", "C", "B"], ids);
        assert!(store.events().iter().all(|e| e.kind == EventKind::Cancellation));
    }

    #[test]
    fn test_events_between_is_half_open() {
        let store = TimelineStore::new();
        store.load((0..10).map(|i| cancellation(i * 10, "X")).collect());
        let window = store.events_between(Time(20), Time(50));
        assert_eq!(vec![20, 30, 40], window.iter().map(|e| e.at.0).collect::<Vec<_>>());
        assert!(store.events_between(Time(50), Time(20)).is_empty());
    }

    #[test]
    fn test_readers_keep_their_copy() {
        let store = Arc::new(TimelineStore::new());
        store.load(vec![cancellation(0, "A")]);
        let before = store.events();

        let writer = {
            let store = store.clone();
            thread::spawn(move || {
                for i in 1..=50 {
                    store.append(vec![cancellation(i, "B")]);
                }
            })
        };
        writer.join().unwrap();

        assert_eq!(1, before.len());
        assert_eq!(51, store.len());
        assert_eq!(51, store.version());
    }
}
