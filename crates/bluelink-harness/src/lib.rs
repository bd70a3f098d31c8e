//! Bluelink Harness
//!
//! Provides a scriptable [`MockTransport`] and device fixtures that the
//! runtime's unit and integration tests drive instead of a real Bluetooth
//! driver.

pub mod fixtures;
pub mod mock;

pub use fixtures::{test_address, test_device};
pub use mock::{BondingGate, MockTransport};
