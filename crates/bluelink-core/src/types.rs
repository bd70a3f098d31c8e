//! Core types for the bluelink session model
//!
//! This module defines the fundamental types used throughout the session
//! model, using newtype patterns for semantic validation and type safety.

use core::fmt;
use core::str::FromStr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Device Address
// ----------------------------------------------------------------------------

/// Hardware address of a Bluetooth device (6 bytes, stable identifier)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceAddress([u8; 6]);

impl DeviceAddress {
    /// Create a new address from 6 bytes
    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for DeviceAddress {
    type Err = crate::BluetoothError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.split(':').collect();

        let bytes = hex::decode(&compact)
            .map_err(|_| crate::BluetoothError::invalid_address(s))?;

        if bytes.len() != 6 {
            return Err(crate::BluetoothError::invalid_address(s));
        }

        let mut address = [0u8; 6];
        address.copy_from_slice(&bytes);
        Ok(Self(address))
    }
}

// ----------------------------------------------------------------------------
// Device Class
// ----------------------------------------------------------------------------

/// Major device class reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceClass {
    Misc,
    Computer,
    Phone,
    Network,
    AudioVideo,
    Peripheral,
    Imaging,
    Wearable,
    Toy,
    Health,
    Uncategorized,
    Unknown,
}

impl DeviceClass {
    /// Human-readable label used by device detail views
    pub fn label(&self) -> &'static str {
        match self {
            DeviceClass::Misc => "Miscellaneous",
            DeviceClass::Computer => "Computer",
            DeviceClass::Phone => "Phone",
            DeviceClass::Network => "Network",
            DeviceClass::AudioVideo => "Audio / Video",
            DeviceClass::Peripheral => "Peripheral",
            DeviceClass::Imaging => "Imaging",
            DeviceClass::Wearable => "Wearable",
            DeviceClass::Toy => "Toy",
            DeviceClass::Health => "Health",
            DeviceClass::Uncategorized => "Uncategorized",
            DeviceClass::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ----------------------------------------------------------------------------
// Device
// ----------------------------------------------------------------------------

/// A remote Bluetooth device known to or discovered by the local adapter
///
/// Invariant: `is_connected` implies `is_bonded`. The registry's mutators
/// are the only writers and keep the invariant; records obtained from a
/// transport are normalized on insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Hardware address (unique, stable identifier)
    pub address: DeviceAddress,
    /// Friendly name advertised by the device
    pub name: String,
    /// Major device class
    pub class_major: DeviceClass,
    /// Whether a bonding (pairing) relationship exists
    pub is_bonded: bool,
    /// Whether an active connection exists
    pub is_connected: bool,
}

impl Device {
    /// Create a new device record in the initial (available) state
    pub fn new(address: DeviceAddress, name: impl Into<String>, class_major: DeviceClass) -> Self {
        Self {
            address,
            name: name.into(),
            class_major,
            is_bonded: false,
            is_connected: false,
        }
    }

    /// Presentation rank: connected devices sort above bonded ones,
    /// bonded above merely available ones
    pub fn sort_rank(&self) -> u8 {
        if self.is_connected {
            2
        } else if self.is_bonded {
            1
        } else {
            0
        }
    }

    /// Status label used by device list views
    pub fn status_label(&self) -> &'static str {
        if self.is_connected {
            "Connected"
        } else if self.is_bonded {
            "Paired"
        } else {
            "Available"
        }
    }
}

// ----------------------------------------------------------------------------
// Adapter Info
// ----------------------------------------------------------------------------

/// State of the local Bluetooth adapter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterInfo {
    /// Whether the radio is powered on
    pub powered: bool,
    /// Whether the adapter is discoverable by other devices
    pub visible: bool,
    /// Adapter name presented to other devices
    pub name: String,
}

// ----------------------------------------------------------------------------
// File Reference
// ----------------------------------------------------------------------------

/// Opaque handle to a local file selected for transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef(PathBuf);

impl FileRef {
    /// Create a file reference from a path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Get the underlying path
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// File name component, if the path has one
    pub fn file_name(&self) -> Option<String> {
        self.0
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_roundtrip() {
        let address = DeviceAddress::new([0xAA, 0xBB, 0xCC, 0x01, 0x02, 0x03]);
        assert_eq!(address.to_string(), "AA:BB:CC:01:02:03");

        let parsed: DeviceAddress = "AA:BB:CC:01:02:03".parse().unwrap();
        assert_eq!(parsed, address);

        let lowercase: DeviceAddress = "aa:bb:cc:01:02:03".parse().unwrap();
        assert_eq!(lowercase, address);
    }

    #[test]
    fn test_address_rejects_malformed_input() {
        assert!("AA:BB".parse::<DeviceAddress>().is_err());
        assert!("AA:BB:CC:01:02:03:04".parse::<DeviceAddress>().is_err());
        assert!("ZZ:BB:CC:01:02:03".parse::<DeviceAddress>().is_err());
    }

    #[test]
    fn test_sort_rank_ordering() {
        let address = DeviceAddress::new([0; 6]);
        let mut device = Device::new(address, "Watch", DeviceClass::Wearable);
        assert_eq!(device.sort_rank(), 0);
        assert_eq!(device.status_label(), "Available");

        device.is_bonded = true;
        assert_eq!(device.sort_rank(), 1);
        assert_eq!(device.status_label(), "Paired");

        device.is_connected = true;
        assert_eq!(device.sort_rank(), 2);
        assert_eq!(device.status_label(), "Connected");
    }

    #[test]
    fn test_file_ref_name() {
        let file = FileRef::new("/opt/media/photo.jpg");
        assert_eq!(file.file_name().as_deref(), Some("photo.jpg"));
    }
}
