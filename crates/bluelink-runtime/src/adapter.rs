//! Local adapter state
//!
//! Pure data plus change detection. The session's event pump feeds driver
//! notifications in through [`AdapterState::apply`] and publishes whatever
//! bus event the change produced; reads are synchronous and never fail.

use std::sync::RwLock;

use tracing::debug;

use bluelink_core::{AdapterInfo, BusEvent, TransportEvent};

// ----------------------------------------------------------------------------
// Adapter State
// ----------------------------------------------------------------------------

/// Power/visibility/name of the local radio
#[derive(Debug)]
pub struct AdapterState {
    info: RwLock<AdapterInfo>,
    supported: bool,
}

impl AdapterState {
    /// Adapter present, seeded with the driver's snapshot
    pub fn new(info: AdapterInfo) -> Self {
        Self {
            info: RwLock::new(info),
            supported: true,
        }
    }

    /// No adapter on this platform: `is_powered` stays false and commands
    /// issued elsewhere fail with `NotSupported`
    pub fn unsupported() -> Self {
        Self {
            info: RwLock::new(AdapterInfo::default()),
            supported: false,
        }
    }

    /// Whether the platform has a Bluetooth adapter at all
    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// Whether the radio is powered on
    pub fn is_powered(&self) -> bool {
        self.info.read().expect("adapter lock poisoned").powered
    }

    /// Whether the adapter is discoverable
    pub fn is_visible(&self) -> bool {
        self.info.read().expect("adapter lock poisoned").visible
    }

    /// Adapter name presented to other devices
    pub fn name(&self) -> String {
        self.info.read().expect("adapter lock poisoned").name.clone()
    }

    /// Full snapshot
    pub fn snapshot(&self) -> AdapterInfo {
        self.info.read().expect("adapter lock poisoned").clone()
    }

    /// Apply a driver notification; returns the bus event to publish when
    /// the notification actually changed something
    pub fn apply(&self, event: &TransportEvent) -> Option<BusEvent> {
        let mut info = self.info.write().expect("adapter lock poisoned");
        match event {
            TransportEvent::PoweredChanged(powered) => {
                if info.powered == *powered {
                    return None;
                }
                info.powered = *powered;
                debug!(powered, "adapter power state changed");
                Some(BusEvent::StateChanged { powered: *powered })
            }
            TransportEvent::VisibilityChanged(visible) => {
                if info.visible == *visible {
                    return None;
                }
                info.visible = *visible;
                debug!(visible, "adapter visibility changed");
                Some(BusEvent::VisibilityChanged { visible: *visible })
            }
            TransportEvent::NameChanged(name) => {
                if info.name == *name {
                    return None;
                }
                info.name = name.clone();
                debug!(name = %name, "adapter name changed");
                Some(BusEvent::NameChanged { name: name.clone() })
            }
            // inbound file receptions are not adapter state
            TransportEvent::FileReceived { .. } => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_adapter_reads_false() {
        let adapter = AdapterState::unsupported();
        assert!(!adapter.is_supported());
        assert!(!adapter.is_powered());
        assert!(!adapter.is_visible());
        assert_eq!(adapter.name(), "");
    }

    #[test]
    fn test_apply_reports_only_actual_changes() {
        let adapter = AdapterState::new(AdapterInfo {
            powered: true,
            visible: false,
            name: "Gear".to_string(),
        });

        // same value: no event
        assert_eq!(adapter.apply(&TransportEvent::PoweredChanged(true)), None);

        assert_eq!(
            adapter.apply(&TransportEvent::VisibilityChanged(true)),
            Some(BusEvent::VisibilityChanged { visible: true })
        );
        assert!(adapter.is_visible());

        assert_eq!(
            adapter.apply(&TransportEvent::NameChanged("Gear S3".to_string())),
            Some(BusEvent::NameChanged {
                name: "Gear S3".to_string()
            })
        );
        assert_eq!(adapter.name(), "Gear S3");
    }
}
