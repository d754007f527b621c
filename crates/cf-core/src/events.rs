//! Progress notifications emitted by a session.
//!
//! Subscribers get a live `broadcast` stream. The bus also remembers the last
//! [`HISTORY_LEN`] events so a view that attaches mid-run can catch up.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::ids::SessionId;

pub const HISTORY_LEN: usize = 100;

/// What happened. State names are the `Display` form of the session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    StateChanged { from: String, to: String },
    Selected { commands: Vec<String> },
    Compiled { steps: usize },
    CompileFailed { error: String },
    /// `label` and `color` come from the feature's progress presentation.
    StepStarted {
        index: usize,
        feature: String,
        label: String,
        color: String,
    },
    StepCompleted {
        index: usize,
        feature: String,
        elapsed_ms: u64,
    },
    StepFailed {
        index: usize,
        feature: String,
        error: String,
    },
    Succeeded { steps: usize },
    Reset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Position in the bus's emission order, starting at 0.
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub session: SessionId,
    pub payload: EventPayload,
}

pub struct EventBus {
    tx: broadcast::Sender<Event>,
    next_seq: AtomicU64,
    history: Mutex<VecDeque<Event>>,
}

impl EventBus {
    /// `capacity` bounds how far a slow subscriber may lag before it sees
    /// `RecvError::Lagged`. Zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            next_seq: AtomicU64::new(0),
            history: Mutex::new(VecDeque::with_capacity(HISTORY_LEN)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn broadcast(&self, session: SessionId, payload: EventPayload) {
        let event = Event {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            at: Utc::now(),
            session,
            payload,
        };
        tracing::trace!(seq = event.seq, session = %session.short(), "{:?}", event.payload);

        let mut history = self.history.lock();
        if history.len() == HISTORY_LEN {
            history.pop_front();
        }
        history.push_back(event.clone());
        drop(history);

        // Err only means nobody is listening.
        let _ = self.tx.send(event);
    }

    /// Up to `n` remembered events, newest first.
    pub fn recent_events(&self, n: usize) -> Vec<Event> {
        self.history.lock().iter().rev().take(n).cloned().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("emitted", &self.next_seq.load(Ordering::Relaxed))
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}
