//! Event bus routing helpers.

use crate::payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};
use chrono::Utc;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::sync::broadcast::Sender;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt};

/// Item yielded to subscribers; `Err` reports envelopes lost to lag.
pub type StreamItem = Result<EventEnvelope, BroadcastStreamRecvError>;

/// Stream handed to subscribers: replayed backlog first, then live events.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamItem> + Send>>;

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    replay: Arc<Mutex<VecDeque<EventEnvelope>>>,
    replay_capacity: usize,
    next_id: Arc<Mutex<EventId>>,
}

impl EventBus {
    /// Construct a bus with a custom replay capacity.
    ///
    /// A zero capacity is raised to one since broadcast channels cannot be empty.
    #[must_use]
    pub fn with_capacity(replay_capacity: usize) -> Self {
        let replay_capacity = replay_capacity.max(1);
        let (sender, _) = broadcast::channel(replay_capacity);
        Self {
            sender,
            replay: Arc::new(Mutex::new(VecDeque::with_capacity(replay_capacity))),
            replay_capacity,
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Construct a bus with the default replay capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Subscribe to the bus, returning a stream of new events.
    ///
    /// Buffered events newer than `last_event_id` are yielded ahead of live
    /// ones. The backlog goes to this subscriber only, and live envelopes
    /// already covered by it are skipped.
    #[must_use]
    pub fn subscribe(&self, last_event_id: Option<EventId>) -> EventStream {
        // Subscribe before snapshotting so nothing published in between is lost.
        let live = BroadcastStream::new(self.sender.subscribe());
        let backlog = last_event_id.map_or_else(Vec::new, |last| self.backlog_since(last));
        let cutoff = backlog
            .last()
            .map_or_else(|| last_event_id.unwrap_or(0), |env| env.id);
        let live = live.filter(move |item| !matches!(item, Ok(env) if env.id <= cutoff));
        Box::pin(tokio_stream::iter(backlog.into_iter().map(Ok)).chain(live))
    }

    /// Publish a new event to all subscribers and return its id.
    #[must_use]
    pub fn publish(&self, event: Event) -> EventId {
        let mut next = self
            .next_id
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let id = *next;
        *next = next.saturating_add(1);
        drop(next);

        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };
        {
            let mut replay = self.lock_replay();
            if replay.len() == self.replay_capacity {
                let _ = replay.pop_front();
            }
            replay.push_back(envelope.clone());
        }
        // No live subscribers is not an error; the replay ring still holds it.
        let _ = self.sender.send(envelope);
        id
    }

    /// Last event id observed in the replay buffer.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.lock_replay().back().map(|env| env.id)
    }

    /// Collect a backlog of events emitted after the specified id.
    #[must_use]
    pub fn backlog_since(&self, id: EventId) -> Vec<EventEnvelope> {
        let replay = self.lock_replay();
        replay.iter().filter(|env| env.id > id).cloned().collect()
    }

    fn lock_replay(&self) -> MutexGuard<'_, VecDeque<EventEnvelope>> {
        self.replay
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payloads::TierStatus;
    use uuid::Uuid;

    fn progress(tier: &str) -> Event {
        Event::TierProgress {
            save_id: Uuid::nil(),
            tier: tier.into(),
            status: TierStatus::Started,
        }
    }

    #[tokio::test]
    async fn publish_and_backlog_from_id() {
        let bus = EventBus::with_capacity(4);
        let first = bus.publish(progress("share_selected"));
        let second = bus.publish(Event::GestureResolved {
            kind: "short".into(),
        });

        assert_eq!(bus.last_event_id(), Some(second));
        let backlog = bus.backlog_since(first);
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0].id, second);
    }

    #[tokio::test]
    async fn replay_ring_drops_oldest_when_full() {
        let bus = EventBus::with_capacity(2);
        for tier in ["a", "b", "c"] {
            let _ = bus.publish(progress(tier));
        }
        let backlog = bus.backlog_since(0);
        let ids: Vec<_> = backlog.iter().map(|env| env.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[tokio::test]
    async fn subscribe_streams_live_events() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe(None);
        let id = bus.publish(Event::SelectionPrepared {
            name: "timestamps.txt".into(),
        });
        let envelope = stream
            .next()
            .await
            .expect("stream item")
            .expect("broadcast ok");
        assert_eq!(envelope.id, id);
        assert!(matches!(envelope.event, Event::SelectionPrepared { .. }));
    }

    #[tokio::test]
    async fn replay_reaches_only_the_new_subscriber() {
        let bus = EventBus::new();
        let mut early = bus.subscribe(None);
        let first = bus.publish(progress("share_selected"));

        let mut late = bus.subscribe(Some(0));
        let second = bus.publish(progress("direct_write"));

        let replayed = late.next().await.expect("backlog item").expect("no lag");
        assert_eq!(replayed.id, first);
        let live = late.next().await.expect("live item").expect("no lag");
        assert_eq!(live.id, second);

        let ids = [
            early.next().await.expect("first").expect("no lag").id,
            early.next().await.expect("second").expect("no lag").id,
        ];
        assert_eq!(ids, [first, second]);
        drop(bus);
        assert!(early.next().await.is_none());
    }

    #[tokio::test]
    async fn subscribe_from_latest_id_yields_only_new_events() {
        let bus = EventBus::new();
        let seen = bus.publish(progress("share_selected"));
        let mut stream = bus.subscribe(bus.last_event_id());
        assert_eq!(bus.last_event_id(), Some(seen));

        let fresh = bus.publish(Event::GestureResolved {
            kind: "long".into(),
        });

        let envelope = stream.next().await.expect("item").expect("no lag");
        assert_eq!(envelope.id, fresh);
    }
}
