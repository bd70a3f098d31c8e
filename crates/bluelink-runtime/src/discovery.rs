//! Discovery scan lifecycle
//!
//! At most one scan runs per session. `start` claims the scanning slot,
//! asks the driver to scan and returns a typed event stream; a spawned pump
//! merges driver events into the registry before publishing them, so a
//! consumer never observes a device the registry does not yet know.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use bluelink_core::{
    BluetoothError, Device, DeviceAddress, Result, ScanEvent, Transport,
};

use crate::config::SessionConfig;
use crate::registry::DeviceRegistry;

// ----------------------------------------------------------------------------
// Scan State
// ----------------------------------------------------------------------------

/// Lifecycle state of the discovery session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
}

// ----------------------------------------------------------------------------
// Discovery Events
// ----------------------------------------------------------------------------

/// Events delivered to the consumer of one scan
///
/// Exactly one terminal event (`Finished` or `Failed`) closes the stream.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// The driver accepted the scan request
    Started,
    /// A device was observed; the registry already holds this record
    DeviceFound(Device),
    /// A device surfaced by this scan stopped advertising
    DeviceDisappeared(DeviceAddress),
    /// The scan ended normally
    Finished,
    /// The scan aborted
    Failed(BluetoothError),
}

// ----------------------------------------------------------------------------
// Discovery Session
// ----------------------------------------------------------------------------

/// Manages the single scan lifecycle
pub struct DiscoverySession {
    transport: Arc<dyn Transport>,
    registry: Arc<DeviceRegistry>,
    config: SessionConfig,
    state: Arc<Mutex<ScanState>>,
}

impl DiscoverySession {
    /// Create an idle discovery session
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<DeviceRegistry>,
        config: SessionConfig,
    ) -> Self {
        Self {
            transport,
            registry,
            config,
            state: Arc::new(Mutex::new(ScanState::Idle)),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ScanState {
        *self.state.lock().expect("scan state lock poisoned")
    }

    /// Whether a scan is running
    pub fn is_scanning(&self) -> bool {
        self.state() == ScanState::Scanning
    }

    /// Begin a scan and return its event stream
    ///
    /// Fails with [`BluetoothError::AlreadyScanning`] when a scan is
    /// running. The stream starts with `Started` and ends with exactly one
    /// of `Finished`/`Failed`, at which point the session is idle again.
    pub async fn start(&self) -> Result<mpsc::Receiver<DiscoveryEvent>> {
        {
            let mut state = self.state.lock().expect("scan state lock poisoned");
            if *state == ScanState::Scanning {
                return Err(BluetoothError::AlreadyScanning);
            }
            // claim the slot before awaiting the driver
            *state = ScanState::Scanning;
        }

        let scan_rx = match timeout(self.config.command_timeout, self.transport.start_scan()).await
        {
            Ok(Ok(rx)) => rx,
            Ok(Err(fault)) => {
                self.reset_idle();
                return Err(fault.into());
            }
            Err(_) => {
                self.reset_idle();
                return Err(BluetoothError::internal("scan start timed out"));
            }
        };

        let (events, rx) = mpsc::channel(self.config.scan_channel_capacity.max(1));
        // capacity is at least one, the stream always opens with Started
        let _ = events.send(DiscoveryEvent::Started).await;
        info!("discovery started");

        let registry = Arc::clone(&self.registry);
        let state = Arc::clone(&self.state);
        tokio::spawn(pump_scan(scan_rx, events, registry, state));

        Ok(rx)
    }

    /// Ask the driver to end the running scan
    ///
    /// The terminal `Finished` arrives on the scan stream once the driver
    /// confirms. Calling this while idle is a no-op.
    pub async fn stop(&self) -> Result<()> {
        if !self.is_scanning() {
            return Ok(());
        }

        match timeout(self.config.command_timeout, self.transport.stop_scan()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(fault)) => Err(fault.into()),
            Err(_) => Err(BluetoothError::internal("scan stop timed out")),
        }
    }

    fn reset_idle(&self) {
        *self.state.lock().expect("scan state lock poisoned") = ScanState::Idle;
    }
}

// ----------------------------------------------------------------------------
// Scan Pump
// ----------------------------------------------------------------------------

async fn pump_scan(
    mut scan_rx: mpsc::Receiver<ScanEvent>,
    events: mpsc::Sender<DiscoveryEvent>,
    registry: Arc<DeviceRegistry>,
    state: Arc<Mutex<ScanState>>,
) {
    // addresses surfaced by this scan; only these may disappear
    let mut session_found: HashSet<DeviceAddress> = HashSet::new();
    let mut terminal_sent = false;

    while let Some(event) = scan_rx.recv().await {
        match event {
            ScanEvent::Found(device) => {
                let address = device.address;
                // upsert before publishing: the consumer always sees a
                // record the registry already holds
                let stored = registry.upsert(device);
                session_found.insert(address);
                debug!(%address, name = %stored.name, "device found");
                let _ = events.send(DiscoveryEvent::DeviceFound(stored)).await;
            }
            ScanEvent::Lost(address) => {
                if !session_found.contains(&address) {
                    continue;
                }
                let bonded = registry
                    .get(&address)
                    .map(|device| device.is_bonded)
                    .unwrap_or(false);
                if bonded {
                    // bonded devices are never reported disappeared
                    continue;
                }
                registry.remove(&address);
                session_found.remove(&address);
                debug!(%address, "device disappeared");
                let _ = events.send(DiscoveryEvent::DeviceDisappeared(address)).await;
            }
            ScanEvent::Finished => {
                *state.lock().expect("scan state lock poisoned") = ScanState::Idle;
                info!(found = session_found.len(), "discovery finished");
                let _ = events.send(DiscoveryEvent::Finished).await;
                terminal_sent = true;
                break;
            }
            ScanEvent::Failed(fault) => {
                *state.lock().expect("scan state lock poisoned") = ScanState::Idle;
                warn!(%fault, "discovery failed");
                let _ = events.send(DiscoveryEvent::Failed(fault.into())).await;
                terminal_sent = true;
                break;
            }
        }
    }

    if !terminal_sent {
        // driver dropped the stream without a terminal event
        *state.lock().expect("scan state lock poisoned") = ScanState::Idle;
        warn!("scan stream closed by the driver without a terminal event");
        let _ = events
            .send(DiscoveryEvent::Failed(BluetoothError::internal(
                "scan stream closed by the driver",
            )))
            .await;
    }
}
