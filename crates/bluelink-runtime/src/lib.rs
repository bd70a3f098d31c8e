//! Bluelink Runtime Engine
//!
//! This crate contains the orchestration layer of the bluelink session
//! model, including:
//! - `BluetoothSession`: the façade external collaborators issue commands to
//! - `DeviceRegistry`: canonical store of known/discovered devices
//! - `DiscoverySession`, `BondingController`, `TransferEngine`: the three
//!   stateful components driving the transport
//! - `AdapterState`: local radio power/visibility/name
//!
//! This is the "engine" of bluelink — `bluelink-core` provides the stable
//! API definitions it orchestrates.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod adapter;
pub mod bonding;
pub mod config;
pub mod discovery;
pub mod registry;
pub mod session;
pub mod transfer;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use adapter::AdapterState;
pub use bonding::{BondingController, BondingKind};
pub use config::SessionConfig;
pub use discovery::{DiscoveryEvent, DiscoverySession, ScanState};
pub use registry::DeviceRegistry;
pub use session::BluetoothSession;
pub use transfer::{
    supports_sending_files, TransferEngine, TransferEvent, TransferSession, TransferState,
};

// Re-export core types for convenience
pub use bluelink_core::{
    AdapterInfo, BluetoothError, BusEvent, Device, DeviceAddress, DeviceClass, EventBus, FileRef,
    Result, Transport,
};
