//! Session configuration

use std::time::Duration;

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for a [`BluetoothSession`](crate::BluetoothSession)
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionConfig {
    /// Maximum lifetime of one transport command; expiry synthesizes an
    /// internal error so the core never hangs on a missing completion
    pub command_timeout: Duration,
    /// How long `terminate` waits for in-flight bonding/transfer operations
    /// before force-aborting the shutdown
    pub shutdown_grace: Duration,
    /// Buffered discovery events per scan stream
    pub scan_channel_capacity: usize,
    /// Buffered progress events per transfer stream
    pub transfer_channel_capacity: usize,
    /// Buffered bus events per subscriber
    pub bus_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(5),
            scan_channel_capacity: 32,
            transfer_channel_capacity: 32,
            bus_capacity: 64,
        }
    }
}

impl SessionConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum transport command lifetime
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the graceful shutdown window
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Set the discovery stream capacity
    pub fn with_scan_channel_capacity(mut self, capacity: usize) -> Self {
        self.scan_channel_capacity = capacity;
        self
    }

    /// Set the transfer stream capacity
    pub fn with_transfer_channel_capacity(mut self, capacity: usize) -> Self {
        self.transfer_channel_capacity = capacity;
        self
    }

    /// Set the event bus capacity
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }
}
