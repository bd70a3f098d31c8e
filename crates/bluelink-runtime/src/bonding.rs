//! Pair/unpair orchestration
//!
//! One in-flight operation per device address. A conflicting request is
//! rejected with `OperationInProgress`, never queued, so the driver never
//! sees two bonding commands for the same device at once. Operations on
//! different addresses run concurrently.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::timeout;
use tracing::{info, warn};

use bluelink_core::{BluetoothError, DeviceAddress, Result, Transport};

use crate::config::SessionConfig;
use crate::registry::DeviceRegistry;

// ----------------------------------------------------------------------------
// Bonding Operation Kind
// ----------------------------------------------------------------------------

/// Direction of an in-flight bonding operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondingKind {
    Pairing,
    Unpairing,
}

// ----------------------------------------------------------------------------
// Bonding Controller
// ----------------------------------------------------------------------------

/// Serializes pair/unpair requests per device address
pub struct BondingController {
    transport: Arc<dyn Transport>,
    registry: Arc<DeviceRegistry>,
    config: SessionConfig,
    in_flight: Arc<DashMap<DeviceAddress, BondingKind>>,
}

impl BondingController {
    /// Create a controller with no in-flight operations
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<DeviceRegistry>,
        config: SessionConfig,
    ) -> Self {
        Self {
            transport,
            registry,
            config,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// In-flight operation for an address, if any
    pub fn operation_for(&self, address: &DeviceAddress) -> Option<BondingKind> {
        self.in_flight.get(address).map(|entry| *entry.value())
    }

    /// Whether any bonding operation is in flight
    pub fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Create a bonding with the device
    ///
    /// Atomic: either the operation fully succeeds and the registry's
    /// bonded flag flips, or it fails and nothing changes.
    pub async fn pair(&self, address: DeviceAddress) -> Result<()> {
        let _guard = self.claim(address, BondingKind::Pairing)?;

        let device = self
            .registry
            .get(&address)
            .ok_or_else(|| BluetoothError::device_not_found(&address))?;
        if device.is_bonded {
            return Err(BluetoothError::AlreadyBonded);
        }

        match timeout(self.config.command_timeout, self.transport.pair(&address)).await {
            Ok(Ok(())) => {
                self.registry.set_bonded(&address, true)?;
                info!(%address, "device paired");
                Ok(())
            }
            Ok(Err(fault)) => {
                warn!(%address, %fault, "pairing failed");
                Err(fault.into())
            }
            Err(_) => Err(BluetoothError::internal("pair command timed out")),
        }
    }

    /// Destroy the bonding with the device
    pub async fn unpair(&self, address: DeviceAddress) -> Result<()> {
        let _guard = self.claim(address, BondingKind::Unpairing)?;

        let device = self
            .registry
            .get(&address)
            .ok_or_else(|| BluetoothError::device_not_found(&address))?;
        if !device.is_bonded {
            return Err(BluetoothError::NotBonded);
        }

        match timeout(self.config.command_timeout, self.transport.unpair(&address)).await {
            Ok(Ok(())) => {
                self.registry.set_bonded(&address, false)?;
                info!(%address, "device unpaired");
                Ok(())
            }
            Ok(Err(fault)) => {
                warn!(%address, %fault, "unpairing failed");
                Err(fault.into())
            }
            Err(_) => Err(BluetoothError::internal("unpair command timed out")),
        }
    }

    /// Claim the per-address slot; a held slot rejects the new request
    fn claim(&self, address: DeviceAddress, kind: BondingKind) -> Result<InFlightGuard<'_>> {
        match self.in_flight.entry(address) {
            Entry::Occupied(_) => Err(BluetoothError::OperationInProgress),
            Entry::Vacant(slot) => {
                slot.insert(kind);
                Ok(InFlightGuard {
                    map: &self.in_flight,
                    address,
                })
            }
        }
    }
}

/// Releases the per-address slot on every exit path
struct InFlightGuard<'a> {
    map: &'a DashMap<DeviceAddress, BondingKind>,
    address: DeviceAddress,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.address);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
