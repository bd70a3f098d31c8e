//! Outbound file transfer orchestration
//!
//! One transfer at a time. Preconditions are checked before any transport
//! call and each produces a terminal failed record with the matching error
//! kind; once the driver accepts, a pump relays progress with the monotonic
//! and bounded invariants enforced here rather than trusted from the driver.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use bluelink_core::{
    BluetoothError, Device, DeviceAddress, DeviceClass, FileRef, Result, Transport, TransferSignal,
};

use crate::config::SessionConfig;
use crate::registry::DeviceRegistry;

// ----------------------------------------------------------------------------
// Transfer State
// ----------------------------------------------------------------------------

/// Lifecycle of one transfer: `Pending → InProgress → {Succeeded | Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

impl TransferState {
    /// Whether the state is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Succeeded | TransferState::Failed)
    }
}

/// Record of one outbound transfer
#[derive(Debug, Clone)]
pub struct TransferSession {
    pub device: DeviceAddress,
    pub file: FileRef,
    pub sent_bytes: u64,
    pub total_bytes: u64,
    pub state: TransferState,
    pub error: Option<BluetoothError>,
}

/// Events delivered to the consumer of one transfer
///
/// Progress precedes the single terminal event; nothing follows it.
#[derive(Debug, Clone)]
pub enum TransferEvent {
    Progress { sent_bytes: u64, total_bytes: u64 },
    Succeeded,
    Failed(BluetoothError),
}

// ----------------------------------------------------------------------------
// Send Capability
// ----------------------------------------------------------------------------

/// Whether files can be pushed to this device
///
/// Pure predicate on bond state and device class: only classes the object
/// push profile plausibly serves are eligible.
pub fn supports_sending_files(device: &Device) -> bool {
    device.is_bonded
        && matches!(
            device.class_major,
            DeviceClass::Computer
                | DeviceClass::Phone
                | DeviceClass::Imaging
                | DeviceClass::AudioVideo
                | DeviceClass::Wearable
        )
}

// ----------------------------------------------------------------------------
// Transfer Engine
// ----------------------------------------------------------------------------

/// Drives one file send at a time
pub struct TransferEngine {
    transport: Arc<dyn Transport>,
    registry: Arc<DeviceRegistry>,
    config: SessionConfig,
    /// the singleton slot: `Some` while a transfer is pending/in progress
    active: Arc<Mutex<Option<TransferSession>>>,
    /// last terminal record, retained for inspection
    last: Arc<Mutex<Option<TransferSession>>>,
}

impl TransferEngine {
    /// Create an idle engine
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<DeviceRegistry>,
        config: SessionConfig,
    ) -> Self {
        Self {
            transport,
            registry,
            config,
            active: Arc::new(Mutex::new(None)),
            last: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether a transfer is pending or in progress
    pub fn is_busy(&self) -> bool {
        self.active.lock().expect("transfer lock poisoned").is_some()
    }

    /// Snapshot of the transfer currently in flight
    pub fn active_transfer(&self) -> Option<TransferSession> {
        self.active.lock().expect("transfer lock poisoned").clone()
    }

    /// Last terminal transfer record
    pub fn last_transfer(&self) -> Option<TransferSession> {
        self.last.lock().expect("transfer lock poisoned").clone()
    }

    /// Push a file to a bonded device and return the progress stream
    ///
    /// Precondition failures are reported without touching the transport:
    /// a busy engine yields `OperationInProgress`; a non-bonded device or
    /// unsupported class yields `NotSupported`; an unreadable file yields
    /// `FileError`. None of these ever reach `InProgress`.
    pub async fn send_file(
        &self,
        address: DeviceAddress,
        file: FileRef,
    ) -> Result<mpsc::Receiver<TransferEvent>> {
        {
            let mut active = self.active.lock().expect("transfer lock poisoned");
            if active.is_some() {
                return Err(BluetoothError::OperationInProgress);
            }
            *active = Some(TransferSession {
                device: address,
                file: file.clone(),
                sent_bytes: 0,
                total_bytes: 0,
                state: TransferState::Pending,
                error: None,
            });
        }

        let device = match self.registry.get(&address) {
            Some(device) => device,
            None => return Err(self.fail_preflight(BluetoothError::device_not_found(&address))),
        };
        if !supports_sending_files(&device) {
            return Err(self.fail_preflight(BluetoothError::NotSupported));
        }

        let total_bytes = match tokio::fs::metadata(file.path()).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => return Err(self.fail_preflight(BluetoothError::FileError)),
        };

        let signals = match timeout(
            self.config.command_timeout,
            self.transport.send_file(&address, &file),
        )
        .await
        {
            Ok(Ok(signals)) => signals,
            Ok(Err(fault)) => return Err(self.fail_preflight(fault.into())),
            Err(_) => {
                return Err(self.fail_preflight(BluetoothError::internal(
                    "transfer start timed out",
                )))
            }
        };

        {
            let mut active = self.active.lock().expect("transfer lock poisoned");
            if let Some(session) = active.as_mut() {
                session.total_bytes = total_bytes;
                session.state = TransferState::InProgress;
            }
        }
        info!(%address, file = ?file.file_name(), total_bytes, "transfer accepted");

        let (events, rx) = mpsc::channel(self.config.transfer_channel_capacity.max(1));
        tokio::spawn(pump_transfer(
            signals,
            events,
            Arc::clone(&self.active),
            Arc::clone(&self.last),
            total_bytes,
        ));

        Ok(rx)
    }

    /// Retire the reserved slot as a terminal failed record
    fn fail_preflight(&self, error: BluetoothError) -> BluetoothError {
        let mut active = self.active.lock().expect("transfer lock poisoned");
        if let Some(mut session) = active.take() {
            session.state = TransferState::Failed;
            session.error = Some(error.clone());
            *self.last.lock().expect("transfer lock poisoned") = Some(session);
        }
        warn!(%error, "transfer rejected before reaching the transport");
        error
    }
}

// ----------------------------------------------------------------------------
// Transfer Pump
// ----------------------------------------------------------------------------

async fn pump_transfer(
    mut signals: mpsc::Receiver<TransferSignal>,
    events: mpsc::Sender<TransferEvent>,
    active: Arc<Mutex<Option<TransferSession>>>,
    last: Arc<Mutex<Option<TransferSession>>>,
    total_bytes: u64,
) {
    let mut sent = 0u64;
    let mut outcome: Option<TransferEvent> = None;

    while let Some(signal) = signals.recv().await {
        match signal {
            TransferSignal::Progress { sent_bytes } => {
                // monotonic and bounded regardless of what the driver says
                sent = sent_bytes.max(sent).min(total_bytes);
                if let Some(session) = active.lock().expect("transfer lock poisoned").as_mut() {
                    session.sent_bytes = sent;
                }
                debug!(sent, total_bytes, "transfer progress");
                let _ = events
                    .send(TransferEvent::Progress {
                        sent_bytes: sent,
                        total_bytes,
                    })
                    .await;
            }
            TransferSignal::Completed => {
                outcome = Some(TransferEvent::Succeeded);
                break;
            }
            TransferSignal::Failed(fault) => {
                outcome = Some(TransferEvent::Failed(fault.into()));
                break;
            }
        }
    }

    let outcome = outcome.unwrap_or_else(|| {
        // driver dropped the stream without a terminal signal
        TransferEvent::Failed(BluetoothError::internal(
            "transfer stream closed by the driver",
        ))
    });

    // retire the record before notifying the consumer
    {
        let mut active = active.lock().expect("transfer lock poisoned");
        if let Some(mut session) = active.take() {
            match &outcome {
                TransferEvent::Succeeded => {
                    session.sent_bytes = session.total_bytes;
                    session.state = TransferState::Succeeded;
                    info!(%session.device, "transfer succeeded");
                }
                TransferEvent::Failed(error) => {
                    session.state = TransferState::Failed;
                    session.error = Some(error.clone());
                    warn!(%session.device, %error, "transfer failed");
                }
                TransferEvent::Progress { .. } => unreachable!("progress is never terminal"),
            }
            *last.lock().expect("transfer lock poisoned") = Some(session);
        }
    }

    // dropping the sender closes the stream: nothing follows the terminal
    let _ = events.send(outcome).await;
}
