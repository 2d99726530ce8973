//! In-process event bus
//!
//! Fan-out of decision records to live subscribers with a short replay ring.
//! `publish` never blocks and never awaits: a subscriber whose bounded queue
//! is full at offer time is dropped rather than backpressuring the publisher.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::models::DecisionRecord;

struct BusInner {
    replay: VecDeque<DecisionRecord>,
    subscribers: HashMap<Uuid, mpsc::Sender<DecisionRecord>>,
}

pub struct EventBus {
    replay_capacity: usize,
    queue_capacity: usize,
    inner: Mutex<BusInner>,
}

/// A live subscription. Holds the replay snapshot taken at subscribe time and
/// the bounded live receiver; dropping it releases the bus registration.
pub struct Subscription {
    pub id: Uuid,
    pub replay: Vec<DecisionRecord>,
    pub receiver: mpsc::Receiver<DecisionRecord>,
    bus: Arc<EventBus>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}

impl EventBus {
    pub fn new(replay_capacity: usize, queue_capacity: usize) -> Self {
        Self {
            replay_capacity,
            queue_capacity,
            inner: Mutex::new(BusInner {
                replay: VecDeque::with_capacity(replay_capacity),
                subscribers: HashMap::new(),
            }),
        }
    }

    /// Append to the replay ring, then offer to every subscriber queue
    /// non-blockingly. Slow (full) and disconnected subscribers are removed.
    pub fn publish(&self, record: DecisionRecord) {
        let mut inner = self.inner.lock();

        if inner.replay.len() >= self.replay_capacity {
            inner.replay.pop_front();
        }
        inner.replay.push_back(record.clone());

        let mut dropped = Vec::new();
        for (id, queue) in inner.subscribers.iter() {
            match queue.try_send(record.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(subscriber = %id, "subscriber queue full, dropping subscriber");
                    dropped.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    dropped.push(*id);
                }
            }
        }
        for id in dropped {
            inner.subscribers.remove(&id);
        }
    }

    /// Register a fresh bounded queue. The replay snapshot and the queue
    /// registration happen under one lock, so a subscriber sees every record
    /// exactly once across the replay/live boundary.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = Uuid::new_v4();

        let replay = {
            let mut inner = self.inner.lock();
            let snapshot: Vec<DecisionRecord> = inner.replay.iter().cloned().collect();
            inner.subscribers.insert(id, tx);
            snapshot
        };

        tracing::debug!(subscriber = %id, replayed = replay.len(), "subscriber attached");
        Subscription {
            id,
            replay,
            receiver: rx,
            bus: Arc::clone(self),
        }
    }

    /// Idempotent; removing an unknown handle is a no-op.
    pub fn unsubscribe(&self, id: Uuid) {
        if self.inner.lock().subscribers.remove(&id).is_some() {
            tracing::debug!(subscriber = %id, "subscriber detached");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}
