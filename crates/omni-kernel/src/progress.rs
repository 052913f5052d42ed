//! Workflow progress bus.
//!
//! A lightweight publish/subscribe channel built on top of
//! [`tokio::sync::broadcast`].  The workflow engine publishes
//! [`ProgressEvent`]s as waves and steps advance; front ends subscribe to
//! render progress.
//!
//! Each event is published once behind an [`Arc`]; every subscriber gets a
//! handle to the same payload.
//!
//! # Usage
//!
//! ```rust,no_run
//! # use omni_kernel::progress::{ProgressBus, ProgressEvent};
//! # async fn example() {
//! let bus = ProgressBus::new(256);
//! let mut rx = bus.subscribe();
//!
//! bus.publish(ProgressEvent::Message {
//!     kind: "engine".into(),
//!     message: "waiting for a command".into(),
//! });
//!
//! if let Ok(event) = rx.recv().await {
//!     println!("{event:?}");
//! }
//! # }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// An event that flows through the progress bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProgressEvent {
    /// A workflow run began.
    WorkflowStarted {
        workflow_id: Uuid,
        total_steps: usize,
        waves: usize,
        timestamp: DateTime<Utc>,
    },

    /// A wave began executing.
    WaveStarted {
        workflow_id: Uuid,
        /// Zero-based wave number.
        wave: usize,
        /// Actions of the steps in this wave.
        actions: Vec<String>,
    },

    /// A step reached a terminal status.
    StepFinished {
        workflow_id: Uuid,
        /// Index of the step in the original sequence.
        index: usize,
        action: String,
        /// Terminal status as a string (e.g. "completed", "failed").
        status: String,
        retries: u32,
        timestamp: DateTime<Utc>,
    },

    /// A workflow run finished.
    WorkflowFinished {
        workflow_id: Uuid,
        success: bool,
        completed: usize,
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// Free-form notice for anything that does not fit the above.
    Message {
        /// A short, machine-readable kind (e.g. "startup").
        kind: String,
        /// Human-readable description.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Progress bus
// ---------------------------------------------------------------------------

/// Publish/subscribe bus backed by [`tokio::sync::broadcast`].
///
/// The bus is cheaply cloneable (`Arc`-backed) and `Send + Sync`.
#[derive(Clone)]
pub struct ProgressBus {
    inner: Arc<ProgressBusInner>,
}

struct ProgressBusInner {
    sender: broadcast::Sender<Arc<ProgressEvent>>,
}

impl ProgressBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// A subscriber that falls behind by more than `capacity` events receives
    /// [`broadcast::error::RecvError::Lagged`].
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(ProgressBusInner { sender }),
        }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of receivers that will observe this event.  With no
    /// subscribers the event is dropped.
    pub fn publish(&self, event: ProgressEvent) -> usize {
        match self.inner.sender.send(Arc::new(event)) {
            Ok(n) => {
                tracing::trace!(receivers = n, "progress event published");
                n
            }
            Err(_) => 0,
        }
    }

    /// Create a new subscriber that will receive all future events.
    ///
    /// Events published *before* this call are **not** replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ProgressEvent>> {
        self.inner.sender.subscribe()
    }

    /// Return the current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.sender.receiver_count()
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new(256)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
