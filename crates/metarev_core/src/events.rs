//! Feed of versioning events.
//!
//! Events are emitted after the change they describe is journaled and
//! applied. Subscribers receive them over a channel; late readers can catch
//! up from a bounded history by sequence cursor.

use crate::entity::EntityId;
use crate::types::RevisionId;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A revision was created.
    RevisionCreated(RevisionId),
    /// Live metadata was restored from a revision.
    Restored(RevisionId),
    /// A draft was saved.
    DraftSaved,
    /// A draft was discarded without promotion.
    DraftDiscarded,
    /// A draft was written to live metadata and frozen as a revision.
    DraftPromoted(RevisionId),
}

/// A single versioning event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersioningEvent {
    /// Position in the feed, starting at 1.
    pub sequence: u64,
    /// Entity the event is about.
    pub entity: EntityId,
    /// What happened.
    pub kind: EventKind,
}

/// Multi-subscriber event feed with bounded history.
pub struct EventFeed {
    subscribers: RwLock<Vec<Sender<VersioningEvent>>>,
    history: RwLock<Vec<VersioningEvent>>,
    max_history: usize,
    next_sequence: AtomicU64,
}

impl EventFeed {
    /// Creates a feed keeping at most `max_history` events.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            history: RwLock::new(Vec::new()),
            max_history,
            next_sequence: AtomicU64::new(1),
        }
    }

    /// Returns a receiver for all future events.
    pub fn subscribe(&self) -> Receiver<VersioningEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Assigns a sequence number and publishes the event.
    ///
    /// The sequence is taken while the history lock is held, so history and
    /// every subscriber observe events in sequence order.
    pub fn emit(&self, entity: EntityId, kind: EventKind) -> VersioningEvent {
        let mut history = self.history.write();
        let event = VersioningEvent {
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
            entity,
            kind,
        };
        history.push(event.clone());
        if history.len() > self.max_history {
            let excess = history.len() - self.max_history;
            history.drain(0..excess);
        }
        self.subscribers
            .write()
            .retain(|tx| tx.send(event.clone()).is_ok());
        event
    }

    /// Returns up to `limit` events with sequence greater than `cursor`.
    pub fn poll(&self, cursor: u64, limit: usize) -> Vec<VersioningEvent> {
        self.history
            .read()
            .iter()
            .filter(|e| e.sequence > cursor)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Sequence of the newest event, or 0.
    pub fn latest_sequence(&self) -> u64 {
        self.history.read().last().map_or(0, |e| e.sequence)
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Number of events held for polling.
    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }
}

impl Default for EventFeed {
    fn default() -> Self {
        Self::with_max_history(1024)
    }
}

impl std::fmt::Debug for EventFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFeed")
            .field("max_history", &self.max_history)
            .field("history", &self.history_len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn emit_and_receive() {
        let feed = EventFeed::default();
        let rx = feed.subscribe();
        let event = feed.emit(EntityId::from_u128(1), EventKind::DraftSaved);
        assert_eq!(event.sequence, 1);
        assert_eq!(rx.recv_timeout(Duration::from_millis(100)).unwrap(), event);
    }

    #[test]
    fn dropped_subscribers_are_removed() {
        let feed = EventFeed::default();
        let rx = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);
        drop(rx);
        feed.emit(EntityId::from_u128(1), EventKind::DraftDiscarded);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn poll_from_cursor_with_limit() {
        let feed = EventFeed::default();
        for n in 1..=5 {
            feed.emit(
                EntityId::from_u128(1),
                EventKind::RevisionCreated(RevisionId::new(n)),
            );
        }
        let events = feed.poll(2, 2);
        let seqs: Vec<_> = events.iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, [3, 4]);
        assert_eq!(feed.latest_sequence(), 5);
    }

    #[test]
    fn history_is_bounded() {
        let feed = EventFeed::with_max_history(3);
        for _ in 0..10 {
            feed.emit(EntityId::from_u128(1), EventKind::DraftSaved);
        }
        assert_eq!(feed.history_len(), 3);
        assert_eq!(feed.poll(0, 10)[0].sequence, 8);
    }

    #[test]
    fn concurrent_emits_stay_in_sequence_order() {
        let feed = EventFeed::default();
        let rx = feed.subscribe();
        std::thread::scope(|s| {
            for n in 0..4u128 {
                let feed = &feed;
                s.spawn(move || {
                    for _ in 0..50 {
                        feed.emit(EntityId::from_u128(n), EventKind::DraftSaved);
                    }
                });
            }
        });
        let received: Vec<u64> = rx.try_iter().map(|e| e.sequence).collect();
        assert_eq!(received, (1..=200).collect::<Vec<u64>>());
        let polled: Vec<u64> = feed.poll(0, 500).iter().map(|e| e.sequence).collect();
        assert_eq!(polled, received);
    }
}
