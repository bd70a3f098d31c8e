//! Scriptable mock transport
//!
//! Tests inject scan and adapter events, script pair/unpair outcomes and
//! transfer progress tapes, and gate bonding completion to exercise the
//! in-flight guards deterministically.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, Notify};

use bluelink_core::{
    AdapterInfo, Device, DeviceAddress, FileRef, ScanEvent, Transport, TransportEvent,
    TransportFault, TransferSignal,
};

// ----------------------------------------------------------------------------
// Bonding Gate
// ----------------------------------------------------------------------------

/// Handle for holding a pair/unpair call open
///
/// The mock signals `entered` once the driver call is in flight (the
/// controller's guard is held at that point) and blocks until the test
/// calls [`BondingGate::release`].
pub struct BondingGate {
    entered_rx: mpsc::UnboundedReceiver<()>,
    release: Arc<Notify>,
}

impl BondingGate {
    /// Wait until the gated call has reached the driver
    pub async fn entered(&mut self) {
        let _ = self.entered_rx.recv().await;
    }

    /// Let the gated call complete
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[derive(Clone)]
struct GateHandle {
    entered_tx: mpsc::UnboundedSender<()>,
    release: Arc<Notify>,
}

// ----------------------------------------------------------------------------
// Mock Transport
// ----------------------------------------------------------------------------

/// In-memory stand-in for the platform Bluetooth driver
#[derive(Default)]
pub struct MockTransport {
    adapter: Mutex<Option<AdapterInfo>>,
    remote_devices: DashMap<DeviceAddress, Device>,
    events_tx: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
    scan_tx: Mutex<Option<mpsc::Sender<ScanEvent>>>,
    scan_start_fault: Mutex<Option<TransportFault>>,
    pair_outcomes: DashMap<DeviceAddress, Result<(), TransportFault>>,
    unpair_outcomes: DashMap<DeviceAddress, Result<(), TransportFault>>,
    bonding_gates: DashMap<DeviceAddress, GateHandle>,
    transfer_tapes: DashMap<DeviceAddress, Vec<TransferSignal>>,
    transfer_txs: DashMap<DeviceAddress, mpsc::Sender<TransferSignal>>,
    send_faults: DashMap<DeviceAddress, TransportFault>,
    stop_scan_calls: AtomicUsize,
}

impl MockTransport {
    /// Mock with a powered, visible adapter
    pub fn new() -> Self {
        let mock = Self::default();
        mock.set_adapter(AdapterInfo {
            powered: true,
            visible: true,
            name: "Test Adapter".to_string(),
        });
        mock
    }

    /// Mock reporting no adapter at all
    pub fn without_adapter() -> Self {
        Self::default()
    }

    /// Install or replace the adapter snapshot
    pub fn set_adapter(&self, info: AdapterInfo) {
        *self.adapter.lock().unwrap() = Some(info);
    }

    /// Make the device known to the driver (served by `fetch_device`)
    pub fn add_remote(&self, device: Device) {
        self.remote_devices.insert(device.address, device);
    }

    /// Script the outcome of the next `pair` for the address
    pub fn script_pair(&self, address: DeviceAddress, outcome: Result<(), TransportFault>) {
        self.pair_outcomes.insert(address, outcome);
    }

    /// Script the outcome of the next `unpair` for the address
    pub fn script_unpair(&self, address: DeviceAddress, outcome: Result<(), TransportFault>) {
        self.unpair_outcomes.insert(address, outcome);
    }

    /// Hold pair/unpair calls for the address open until released
    pub fn hold_bonding(&self, address: DeviceAddress) -> BondingGate {
        let (entered_tx, entered_rx) = mpsc::unbounded_channel();
        let release = Arc::new(Notify::new());
        self.bonding_gates.insert(
            address,
            GateHandle {
                entered_tx,
                release: Arc::clone(&release),
            },
        );
        BondingGate {
            entered_rx,
            release,
        }
    }

    /// Script the progress tape the next `send_file` to the address plays
    pub fn script_transfer(&self, address: DeviceAddress, tape: Vec<TransferSignal>) {
        self.transfer_tapes.insert(address, tape);
    }

    /// Make the next `send_file` to the address be rejected outright
    pub fn script_send_fault(&self, address: DeviceAddress, fault: TransportFault) {
        self.send_faults.insert(address, fault);
    }

    /// Make the next `start_scan` fail
    pub fn script_scan_start_fault(&self, fault: TransportFault) {
        *self.scan_start_fault.lock().unwrap() = Some(fault);
    }

    /// Inject an unsolicited driver notification
    pub fn emit_transport_event(&self, event: TransportEvent) {
        let sender = self.events_tx.lock().unwrap().clone();
        if let Some(sender) = sender {
            let _ = sender.send(event);
        }
    }

    /// Inject a progress signal into the open transfer stream for the
    /// address (transfers whose scripted tape had no terminal stay open)
    pub async fn emit_transfer_signal(&self, address: DeviceAddress, signal: TransferSignal) {
        let sender = self.transfer_txs.get(&address).map(|tx| tx.clone());
        if let Some(sender) = sender {
            let _ = sender.send(signal).await;
        }
    }

    /// Close the transfer stream for the address without a terminal signal
    pub fn drop_transfer_stream(&self, address: &DeviceAddress) {
        self.transfer_txs.remove(address);
    }

    /// Inject a scan event into the running scan stream
    pub async fn emit_scan_event(&self, event: ScanEvent) {
        let sender = self.scan_tx.lock().unwrap().clone();
        if let Some(sender) = sender {
            let _ = sender.send(event).await;
        }
    }

    /// How many times `stop_scan` was called
    pub fn stop_scan_calls(&self) -> usize {
        self.stop_scan_calls.load(Ordering::SeqCst)
    }

    async fn pass_gate(&self, address: &DeviceAddress) {
        let gate = self.bonding_gates.get(address).map(|g| g.clone());
        if let Some(gate) = gate {
            let _ = gate.entered_tx.send(());
            gate.release.notified().await;
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn adapter_info(&self) -> Result<AdapterInfo, TransportFault> {
        self.adapter
            .lock()
            .unwrap()
            .clone()
            .ok_or(TransportFault::AdapterUnavailable)
    }

    fn transport_events(&self) -> mpsc::UnboundedReceiver<TransportEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.events_tx.lock().unwrap() = Some(tx);
        rx
    }

    async fn start_scan(&self) -> Result<mpsc::Receiver<ScanEvent>, TransportFault> {
        if let Some(fault) = self.scan_start_fault.lock().unwrap().take() {
            return Err(fault);
        }
        let (tx, rx) = mpsc::channel(64);
        *self.scan_tx.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn stop_scan(&self) -> Result<(), TransportFault> {
        self.stop_scan_calls.fetch_add(1, Ordering::SeqCst);
        let sender = self.scan_tx.lock().unwrap().take();
        if let Some(sender) = sender {
            let _ = sender.send(ScanEvent::Finished).await;
        }
        Ok(())
    }

    async fn fetch_device(&self, address: &DeviceAddress) -> Result<Device, TransportFault> {
        self.remote_devices
            .get(address)
            .map(|device| device.clone())
            .ok_or_else(|| TransportFault::DeviceNotFound {
                address: address.to_string(),
            })
    }

    async fn pair(&self, address: &DeviceAddress) -> Result<(), TransportFault> {
        self.pass_gate(address).await;
        self.pair_outcomes
            .remove(address)
            .map(|(_, outcome)| outcome)
            .unwrap_or(Ok(()))
    }

    async fn unpair(&self, address: &DeviceAddress) -> Result<(), TransportFault> {
        self.pass_gate(address).await;
        self.unpair_outcomes
            .remove(address)
            .map(|(_, outcome)| outcome)
            .unwrap_or(Ok(()))
    }

    async fn send_file(
        &self,
        address: &DeviceAddress,
        _file: &FileRef,
    ) -> Result<mpsc::Receiver<TransferSignal>, TransportFault> {
        if let Some((_, fault)) = self.send_faults.remove(address) {
            return Err(fault);
        }

        let tape = self
            .transfer_tapes
            .remove(address)
            .map(|(_, tape)| tape)
            .unwrap_or_else(|| vec![TransferSignal::Completed]);

        let (tx, rx) = mpsc::channel(tape.len().max(1) + 16);
        for signal in tape {
            // capacity covers the whole tape, try_send cannot fail here
            let _ = tx.try_send(signal);
        }
        // keep the stream open so tests can feed more signals later
        self.transfer_txs.insert(*address, tx);
        Ok(rx)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{test_address, test_device};
    use bluelink_core::DeviceClass;

    #[tokio::test]
    async fn test_fetch_device_unknown_address() {
        let mock = MockTransport::new();
        let fault = mock.fetch_device(&test_address(9)).await.unwrap_err();
        assert!(matches!(fault, TransportFault::DeviceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_scan_stream_replays_injected_events() {
        let mock = MockTransport::new();
        let mut scan = mock.start_scan().await.unwrap();

        let device = test_device(1, "Phone1", DeviceClass::Phone);
        mock.emit_scan_event(ScanEvent::Found(device.clone())).await;
        mock.stop_scan().await.unwrap();

        assert!(matches!(scan.recv().await, Some(ScanEvent::Found(found)) if found == device));
        assert!(matches!(scan.recv().await, Some(ScanEvent::Finished)));
        assert_eq!(mock.stop_scan_calls(), 1);
    }

    #[tokio::test]
    async fn test_default_transfer_completes() {
        let mock = MockTransport::new();
        let file = FileRef::new("/tmp/sample.txt");
        let mut signals = mock.send_file(&test_address(1), &file).await.unwrap();
        assert!(matches!(signals.recv().await, Some(TransferSignal::Completed)));

        mock.drop_transfer_stream(&test_address(1));
        assert!(signals.recv().await.is_none());
    }
}
