//! Error types for the bluelink session model
//!
//! One taxonomy covers both state-precondition violations (detected without
//! touching the transport) and faults the transport reports after a command
//! was accepted. No error is fatal: every failure path returns the owning
//! component to an idle state so subsequent commands can proceed.

use crate::types::DeviceAddress;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors surfaced by the Bluetooth session model
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BluetoothError {
    /// Capability or precondition violation (absent adapter, unsupported
    /// device class, send to a non-bonded device)
    #[error("Operation not supported")]
    NotSupported,

    /// Local file could not be opened or read
    #[error("File could not be opened or read")]
    FileError,

    /// Transport link was lost mid-operation
    #[error("Connection to the device was lost")]
    ConnectionError,

    /// Unclassified transport or platform fault
    #[error("Internal error: {reason}")]
    InternalError { reason: String },

    /// A discovery scan is already running
    #[error("Discovery is already in progress")]
    AlreadyScanning,

    /// Pair requested for an already bonded device
    #[error("Device is already bonded")]
    AlreadyBonded,

    /// Unpair requested for a device that is not bonded
    #[error("Device is not bonded")]
    NotBonded,

    /// A conflicting operation is already in flight for this resource
    #[error("Another operation is already in progress")]
    OperationInProgress,

    /// The address is unknown to the registry and the transport
    #[error("Device not found: {address}")]
    DeviceNotFound { address: String },

    /// A device address string could not be parsed
    #[error("Invalid device address: {value}")]
    InvalidAddress { value: String },
}

// ----------------------------------------------------------------------------
// Convenience Error Constructors
// ----------------------------------------------------------------------------

impl BluetoothError {
    /// Create an internal error with a reason
    pub fn internal<T: Into<String>>(reason: T) -> Self {
        BluetoothError::InternalError {
            reason: reason.into(),
        }
    }

    /// Create a device-not-found error for an address
    pub fn device_not_found(address: &DeviceAddress) -> Self {
        BluetoothError::DeviceNotFound {
            address: address.to_string(),
        }
    }

    /// Create an invalid-address error
    pub fn invalid_address<T: Into<String>>(value: T) -> Self {
        BluetoothError::InvalidAddress {
            value: value.into(),
        }
    }

    /// Whether this error is a transfer error kind (the terminal error set
    /// a `TransferSession` may carry)
    pub fn is_transfer_kind(&self) -> bool {
        matches!(
            self,
            BluetoothError::NotSupported
                | BluetoothError::FileError
                | BluetoothError::ConnectionError
                | BluetoothError::InternalError { .. }
        )
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, BluetoothError>;

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
