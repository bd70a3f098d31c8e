//! Transport boundary to the platform Bluetooth driver
//!
//! The driver itself (radio firmware, OS Bluetooth stack) is an external
//! dependency. This module defines the asynchronous contract the session
//! model expects from it: scan/pair/transfer primitives with completion
//! reported through results and event streams.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::BluetoothError;
use crate::types::{AdapterInfo, Device, DeviceAddress, FileRef};

// ----------------------------------------------------------------------------
// Transport Faults
// ----------------------------------------------------------------------------

/// Failures reported by the transport driver
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportFault {
    #[error("No Bluetooth adapter available")]
    AdapterUnavailable,

    #[error("Operation not supported by the transport")]
    NotSupported,

    #[error("Connection lost")]
    ConnectionLost,

    #[error("File access failed: {reason}")]
    File { reason: String },

    #[error("Device not known to the transport: {address}")]
    DeviceNotFound { address: String },

    #[error("Driver fault: {reason}")]
    Internal { reason: String },
}

impl From<TransportFault> for BluetoothError {
    fn from(fault: TransportFault) -> Self {
        match fault {
            TransportFault::AdapterUnavailable | TransportFault::NotSupported => {
                BluetoothError::NotSupported
            }
            TransportFault::ConnectionLost => BluetoothError::ConnectionError,
            TransportFault::File { .. } => BluetoothError::FileError,
            TransportFault::DeviceNotFound { address } => {
                BluetoothError::DeviceNotFound { address }
            }
            TransportFault::Internal { reason } => BluetoothError::InternalError { reason },
        }
    }
}

// ----------------------------------------------------------------------------
// Driver Event Streams
// ----------------------------------------------------------------------------

/// Events emitted by the driver while a scan is running
///
/// The driver closes the stream after a terminal `Finished` or `Failed`.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// A nearby device was observed; the record carries the driver's
    /// current view of its bond and connection state
    Found(Device),
    /// A previously observed device stopped advertising
    Lost(DeviceAddress),
    /// The scan ended normally (timeout or explicit stop)
    Finished,
    /// The scan aborted with a driver fault
    Failed(TransportFault),
}

/// Progress signals for one outbound file transfer
#[derive(Debug, Clone)]
pub enum TransferSignal {
    /// Bytes acknowledged by the remote side so far
    Progress { sent_bytes: u64 },
    /// The whole file was delivered
    Completed,
    /// The transfer aborted with a driver fault
    Failed(TransportFault),
}

/// Unsolicited notifications from the driver
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Adapter power state changed
    PoweredChanged(bool),
    /// Adapter visibility changed
    VisibilityChanged(bool),
    /// Adapter name changed
    NameChanged(String),
    /// An inbound file transfer (not initiated by this session) completed
    FileReceived { file_name: String },
}

// ----------------------------------------------------------------------------
// Transport Trait
// ----------------------------------------------------------------------------

/// Asynchronous contract the session model expects from the driver
///
/// All methods are non-blocking; long-running operations report completion
/// through the returned streams. Timeout enforcement is the caller's
/// responsibility (see `SessionConfig::command_timeout` in the runtime).
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Snapshot of the local adapter state
    ///
    /// Fails with [`TransportFault::AdapterUnavailable`] when the platform
    /// has no Bluetooth adapter.
    async fn adapter_info(&self) -> Result<AdapterInfo, TransportFault>;

    /// Stream of unsolicited driver notifications (adapter changes,
    /// inbound file receptions). Consumed by the session's event pump.
    fn transport_events(&self) -> mpsc::UnboundedReceiver<TransportEvent>;

    /// Begin scanning for nearby devices
    ///
    /// Returns the scan event stream. The driver emits exactly one terminal
    /// event (`Finished` or `Failed`) before closing it.
    async fn start_scan(&self) -> Result<mpsc::Receiver<ScanEvent>, TransportFault>;

    /// Ask the driver to end the running scan; confirmation arrives as
    /// `ScanEvent::Finished` on the scan stream
    async fn stop_scan(&self) -> Result<(), TransportFault>;

    /// Fetch fresh detail for a device by address
    async fn fetch_device(&self, address: &DeviceAddress) -> Result<Device, TransportFault>;

    /// Create a bonding with the device; resolves when pairing completes
    async fn pair(&self, address: &DeviceAddress) -> Result<(), TransportFault>;

    /// Destroy the bonding with the device
    async fn unpair(&self, address: &DeviceAddress) -> Result<(), TransportFault>;

    /// Push a file to a bonded device
    ///
    /// Resolving `Ok` means the transfer was accepted; progress and the
    /// terminal outcome arrive on the returned stream.
    async fn send_file(
        &self,
        address: &DeviceAddress,
        file: &FileRef,
    ) -> Result<mpsc::Receiver<TransferSignal>, TransportFault>;
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
