//! The listener broadcast hub.
//!
//! One bounded queue per connected listener. Publishing never blocks and
//! never panics: a full queue drops its oldest pending event to make room,
//! and in the pathological case where room still cannot be made the new
//! event is dropped and logged.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::Stream;
use tokio::sync::Notify;

use crate::event::StreamEvent;

/// Outcome of a single enqueue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The event was enqueued with room to spare.
    Delivered,
    /// The oldest pending event was evicted to make room.
    DroppedOldest,
    /// The new event could not be enqueued and was discarded.
    DroppedNew,
}

/// A single listener's bounded FIFO queue.
#[derive(Debug)]
pub struct ListenerQueue {
    inner: Mutex<VecDeque<StreamEvent>>,
    notify: Notify,
    capacity: usize,
}

impl ListenerQueue {
    /// Creates a queue holding at most `capacity` pending events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Enqueues an event without blocking, favoring newest information
    /// over strict delivery completeness.
    pub fn push(&self, event: StreamEvent) -> Delivery {
        let mut queue = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let delivery = if queue.len() < self.capacity {
            queue.push_back(event);
            Delivery::Delivered
        } else if queue.pop_front().is_some() {
            queue.push_back(event);
            Delivery::DroppedOldest
        } else {
            // Zero-capacity queue; nothing to evict.
            Delivery::DroppedNew
        };
        drop(queue);
        self.notify.notify_one();
        delivery
    }

    /// Waits for and removes the next pending event.
    pub async fn recv(&self) -> StreamEvent {
        loop {
            let notified = self.notify.notified();
            if let Some(event) = self
                .inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
            {
                return event;
            }
            notified.await;
        }
    }

    /// Removes the next pending event if one is queued.
    #[must_use]
    pub fn try_recv(&self) -> Option<StreamEvent> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
struct ListenerEntry {
    character_name: String,
    queue: Arc<ListenerQueue>,
}

/// Registry of connected listeners and the fan-out over their queues.
#[derive(Debug)]
pub struct BroadcastHub {
    listeners: Mutex<HashMap<String, ListenerEntry>>,
    queue_capacity: usize,
}

impl BroadcastHub {
    /// Creates a hub whose listener queues hold `queue_capacity` events.
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            queue_capacity,
        }
    }

    /// Registers a listener and broadcasts `player_joined` to everyone,
    /// the new listener included. Returns the listener's queue.
    pub fn register(&self, listener_id: &str, character_name: &str) -> Arc<ListenerQueue> {
        let queue = Arc::new(ListenerQueue::new(self.queue_capacity));
        {
            let mut listeners = self
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            listeners.insert(
                listener_id.to_owned(),
                ListenerEntry {
                    character_name: character_name.to_owned(),
                    queue: Arc::clone(&queue),
                },
            );
        }
        tracing::info!(listener_id, character_name, "listener connected");
        self.publish(&StreamEvent::PlayerJoined {
            name: character_name.to_owned(),
            players: self.connected_names(),
        });
        queue
    }

    /// Removes a listener's queue and broadcasts `player_left` to the
    /// remainder. Unknown IDs are ignored.
    pub fn unregister(&self, listener_id: &str) {
        let removed = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(listener_id);
        if let Some(entry) = removed {
            tracing::info!(listener_id, character_name = %entry.character_name, "listener disconnected");
            self.publish(&StreamEvent::PlayerLeft {
                name: entry.character_name,
                players: self.connected_names(),
            });
        }
    }

    /// Delivers an event to every registered listener.
    pub fn publish(&self, event: &StreamEvent) {
        let queues: Vec<(String, Arc<ListenerQueue>)> = {
            let listeners = self
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            listeners
                .iter()
                .map(|(id, entry)| (id.clone(), Arc::clone(&entry.queue)))
                .collect()
        };
        for (listener_id, queue) in queues {
            match queue.push(event.clone()) {
                Delivery::Delivered => {}
                Delivery::DroppedOldest => {
                    tracing::warn!(listener_id, "listener queue full, dropped oldest event");
                }
                Delivery::DroppedNew => {
                    tracing::warn!(listener_id, ?event, "listener queue stuck, dropped new event");
                }
            }
        }
    }

    /// Delivers an event to one listener only, used to replay the current
    /// lock state to a late joiner.
    pub fn publish_to(&self, listener_id: &str, event: &StreamEvent) {
        let queue = {
            let listeners = self
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            listeners.get(listener_id).map(|e| Arc::clone(&e.queue))
        };
        if let Some(queue) = queue {
            if queue.push(event.clone()) == Delivery::DroppedNew {
                tracing::warn!(listener_id, ?event, "listener queue stuck, dropped new event");
            }
        }
    }

    /// Character names of all connected listeners.
    #[must_use]
    pub fn connected_names(&self) -> Vec<String> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|entry| entry.character_name.clone())
            .collect()
    }

    /// Number of connected listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// One item of a listener's outbound stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    /// A real event.
    Event(StreamEvent),
    /// Emitted after `keepalive_interval` of silence so transports are
    /// not mistaken for dead.
    KeepAlive,
}

/// Wraps a listener queue in an infinite stream that interleaves
/// keep-alive items during idle periods.
pub fn keepalive_stream(
    queue: Arc<ListenerQueue>,
    keepalive_interval: Duration,
) -> impl Stream<Item = StreamItem> {
    futures_util::stream::unfold(queue, move |queue| async move {
        let item = match tokio::time::timeout(keepalive_interval, queue.recv()).await {
            Ok(event) => StreamItem::Event(event),
            Err(_) => StreamItem::KeepAlive,
        };
        Some((item, queue))
    })
}
