//! Bluelink Core
//!
//! This crate provides the stable API surface for the bluelink Bluetooth
//! session model: device and adapter types, the unified error taxonomy,
//! the process-wide event bus, and the `Transport` trait that abstracts
//! the platform Bluetooth driver.
//!
//! The orchestration layer (registry, discovery, bonding, transfer) lives
//! in `bluelink-runtime`; this crate only defines the vocabulary those
//! components and their consumers share.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod errors;
pub mod events;
pub mod transport;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use errors::{BluetoothError, Result};
pub use events::{BusEvent, EventBus};
pub use transport::{ScanEvent, Transport, TransportEvent, TransportFault, TransferSignal};
pub use types::{AdapterInfo, Device, DeviceAddress, DeviceClass, FileRef};
