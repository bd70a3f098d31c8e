//! Device fixtures shared by the test suites

use bluelink_core::{Device, DeviceAddress, DeviceClass};

/// Deterministic address ending in the given byte
pub fn test_address(last: u8) -> DeviceAddress {
    DeviceAddress::new([0xAA, 0xBB, 0xCC, 0x00, 0x00, last])
}

/// Device record in the initial (available) state
pub fn test_device(last: u8, name: &str, class_major: DeviceClass) -> Device {
    Device::new(test_address(last), name, class_major)
}
