//! Event types and in-process event bus
//!
//! Sync runs publish their lifecycle here; the HTTP layer forwards events to
//! Server-Sent Event clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Sync lifecycle event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncEvent {
    /// A run was accepted and is about to fetch
    RunStarted {
        run_id: Uuid,
        target: String,
        mode: String,
        timestamp: DateTime<Utc>,
    },

    /// A run moved to a new pipeline state
    StateChanged {
        run_id: Uuid,
        target: String,
        old_state: String,
        new_state: String,
        timestamp: DateTime<Utc>,
    },

    /// A run reached `Done`
    RunCompleted {
        run_id: Uuid,
        target: String,
        discovered: usize,
        upserted: usize,
        fallbacks: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A run reached `Failed`
    RunFailed {
        run_id: Uuid,
        target: String,
        failed_in: String,
        error: String,
        committed: usize,
        timestamp: DateTime<Utc>,
    },
}

impl SyncEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            SyncEvent::RunStarted { .. } => "RunStarted",
            SyncEvent::StateChanged { .. } => "StateChanged",
            SyncEvent::RunCompleted { .. } => "RunCompleted",
            SyncEvent::RunFailed { .. } => "RunFailed",
        }
    }

    pub fn run_id(&self) -> Uuid {
        match self {
            SyncEvent::RunStarted { run_id, .. }
            | SyncEvent::StateChanged { run_id, .. }
            | SyncEvent::RunCompleted { run_id, .. }
            | SyncEvent::RunFailed { run_id, .. } => *run_id,
        }
    }
}

/// Broadcast bus for [`SyncEvent`]s
///
/// Cloning is cheap; all clones share one channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    pub fn emit(
        &self,
        event: SyncEvent,
    ) -> Result<usize, broadcast::error::SendError<SyncEvent>> {
        self.tx.send(event)
    }

    /// Emit without caring whether anyone listens
    pub fn emit_lossy(&self, event: SyncEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
