//! Canonical device store
//!
//! The registry exclusively owns all `Device` records. Discovery and
//! bonding are its only writers; every other component holds addresses and
//! re-queries the registry for current data instead of caching snapshots
//! across async boundaries.

use dashmap::DashMap;

use bluelink_core::{BluetoothError, Device, DeviceAddress, Result};

// ----------------------------------------------------------------------------
// Device Registry
// ----------------------------------------------------------------------------

/// Store of known and discovered devices keyed by hardware address
///
/// Reads return cloned snapshots and never block behind a writer; writes to
/// one entry are serialized by the map's per-entry locking.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: DashMap<DeviceAddress, Device>,
}

impl DeviceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all known devices, sorted for presentation:
    /// connected first, then bonded, then available, each group by name
    pub fn known_devices(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self
            .devices
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        devices.sort_by(|a, b| {
            b.sort_rank()
                .cmp(&a.sort_rank())
                .then_with(|| a.name.cmp(&b.name))
        });
        devices
    }

    /// Current record for an address, if known
    pub fn get(&self, address: &DeviceAddress) -> Option<Device> {
        self.devices.get(address).map(|entry| entry.value().clone())
    }

    /// Whether the address is known
    pub fn contains(&self, address: &DeviceAddress) -> bool {
        self.devices.contains_key(address)
    }

    /// Number of known devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Insert or replace a record, normalizing the connected ⇒ bonded
    /// invariant, and return the stored value
    pub fn upsert(&self, mut device: Device) -> Device {
        if !device.is_bonded {
            device.is_connected = false;
        }
        self.devices.insert(device.address, device.clone());
        device
    }

    /// Flip the bonded flag; unbonding also drops the connected flag
    pub fn set_bonded(&self, address: &DeviceAddress, bonded: bool) -> Result<Device> {
        let mut entry = self
            .devices
            .get_mut(address)
            .ok_or_else(|| BluetoothError::device_not_found(address))?;
        entry.is_bonded = bonded;
        if !bonded {
            entry.is_connected = false;
        }
        Ok(entry.clone())
    }

    /// Flip the connected flag; connecting requires an existing bonding
    pub fn set_connected(&self, address: &DeviceAddress, connected: bool) -> Result<Device> {
        let mut entry = self
            .devices
            .get_mut(address)
            .ok_or_else(|| BluetoothError::device_not_found(address))?;
        if connected && !entry.is_bonded {
            return Err(BluetoothError::NotBonded);
        }
        entry.is_connected = connected;
        Ok(entry.clone())
    }

    /// Remove a record (discovery absence, explicit forget)
    pub fn remove(&self, address: &DeviceAddress) -> Option<Device> {
        self.devices.remove(address).map(|(_, device)| device)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
