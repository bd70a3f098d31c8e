//! Process-wide event bus
//!
//! External collaborators (UI pages, notification handlers) observe the
//! session model through this bus. Publishing is fire-and-forget and never
//! blocks the publisher; there is no persistence or replay, so a subscriber
//! registered after an event was published never sees it.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ----------------------------------------------------------------------------
// Bus Events
// ----------------------------------------------------------------------------

/// Events published to external collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusEvent {
    /// Adapter power state changed
    StateChanged { powered: bool },
    /// Adapter visibility changed
    VisibilityChanged { visible: bool },
    /// Adapter name changed
    NameChanged { name: String },
    /// An inbound file transfer completed successfully
    FileReceived { file_name: String },
}

// ----------------------------------------------------------------------------
// Event Bus
// ----------------------------------------------------------------------------

/// Default number of events buffered per subscriber
pub const DEFAULT_BUS_CAPACITY: usize = 64;

/// Broadcast channel all session components publish on
///
/// Cloning the bus yields another handle onto the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BusEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers
    ///
    /// Fire-and-forget: an event published with no subscribers is dropped.
    pub fn publish(&self, event: BusEvent) {
        // send only fails when there are no receivers
        let _ = self.sender.send(event);
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.sender.subscribe()
    }

    /// Number of currently registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
