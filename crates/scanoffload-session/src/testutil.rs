//! Hand-rolled test doubles for the coordinator ports.

use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use scanoffload_core::caps::{DeviceConfig, FirmwareCaps};
use scanoffload_core::error::TransportError;
use scanoffload_core::port::{CommandId, CommandTransport, DeviceState, HostCommand, UpperStack};
use scanoffload_core::types::{
    Band, Channel, IfaceKind, LinkConditions, MacAddr, ScanIes, ScanRequest, Ssid, TrafficLoad,
    Vif,
};
use scanoffload_wire::notif::{CompleteStatus, EbsStatus, LmacScanComplete, UmacScanComplete};

use crate::coordinator::ScanCoordinator;

/// Records every command; can inject one send failure and a fixed abort
/// status.
#[derive(Default)]
pub(crate) struct FakeTransport {
    sent: Mutex<Vec<HostCommand>>,
    fail_next: AtomicBool,
    abort_status: AtomicU32,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self {
            abort_status: AtomicU32::new(1),
            ..Self::default()
        }
    }

    pub(crate) fn sent(&self) -> Vec<HostCommand> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn sent_ids(&self) -> Vec<CommandId> {
        self.sent().iter().map(|cmd| cmd.id).collect()
    }

    pub(crate) fn fail_next_send(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub(crate) fn set_abort_status(&self, status: u32) {
        self.abort_status.store(status, Ordering::SeqCst);
    }
}

#[async_trait]
impl CommandTransport for FakeTransport {
    async fn send(&self, cmd: HostCommand) -> Result<(), TransportError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(TransportError::SendFailed {
                id: cmd.id.opcode(),
                message: "injected failure".into(),
            });
        }
        self.sent.lock().unwrap().push(cmd);
        Ok(())
    }

    async fn send_for_status(&self, cmd: HostCommand) -> Result<u32, TransportError> {
        self.sent.lock().unwrap().push(cmd);
        Ok(self.abort_status.load(Ordering::SeqCst))
    }
}

/// Counts upper-stack callbacks.
#[derive(Default)]
pub(crate) struct FakeStack {
    completions: Mutex<Vec<bool>>,
    sched_stops: AtomicUsize,
    results: AtomicUsize,
}

impl FakeStack {
    pub(crate) fn completions(&self) -> Vec<bool> {
        self.completions.lock().unwrap().clone()
    }

    pub(crate) fn sched_stops(&self) -> usize {
        self.sched_stops.load(Ordering::SeqCst)
    }

    pub(crate) fn results(&self) -> usize {
        self.results.load(Ordering::SeqCst)
    }
}

impl UpperStack for FakeStack {
    fn scan_completed(&self, aborted: bool) {
        self.completions.lock().unwrap().push(aborted);
    }

    fn sched_scan_stopped(&self) {
        self.sched_stops.fetch_add(1, Ordering::SeqCst);
    }

    fn sched_scan_results(&self) {
        self.results.fetch_add(1, Ordering::SeqCst);
    }
}

/// Scriptable device preconditions and link conditions.
pub(crate) struct FakeDevice {
    regulatory: AtomicBool,
    killed: AtomicBool,
    refs: AtomicIsize,
    load: Mutex<TrafficLoad>,
    bound_interfaces: AtomicUsize,
}

impl Default for FakeDevice {
    fn default() -> Self {
        Self {
            regulatory: AtomicBool::new(true),
            killed: AtomicBool::new(false),
            refs: AtomicIsize::new(0),
            load: Mutex::new(TrafficLoad::Low),
            bound_interfaces: AtomicUsize::new(1),
        }
    }
}

impl FakeDevice {
    pub(crate) fn refs(&self) -> isize {
        self.refs.load(Ordering::SeqCst)
    }

    pub(crate) fn set_regulatory_ready(&self, ready: bool) {
        self.regulatory.store(ready, Ordering::SeqCst);
    }

    pub(crate) fn set_radio_killed(&self, killed: bool) {
        self.killed.store(killed, Ordering::SeqCst);
    }

    pub(crate) fn set_load(&self, load: TrafficLoad) {
        *self.load.lock().unwrap() = load;
    }
}

impl DeviceState for FakeDevice {
    fn regulatory_ready(&self) -> bool {
        self.regulatory.load(Ordering::SeqCst)
    }

    fn radio_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    fn link_conditions(&self) -> LinkConditions {
        LinkConditions {
            load: *self.load.lock().unwrap(),
            low_latency: false,
            bound_interfaces: self.bound_interfaces.load(Ordering::SeqCst),
        }
    }

    fn ref_scan(&self) {
        self.refs.fetch_add(1, Ordering::SeqCst);
    }

    fn unref_scan(&self) {
        self.refs.fetch_sub(1, Ordering::SeqCst);
    }
}

pub(crate) struct Harness {
    pub(crate) coordinator: Arc<ScanCoordinator>,
    pub(crate) transport: Arc<FakeTransport>,
    pub(crate) stack: Arc<FakeStack>,
    pub(crate) device: Arc<FakeDevice>,
    pub(crate) ies: ScanIes,
}

pub(crate) fn lmac_caps(max_scans: usize) -> FirmwareCaps {
    FirmwareCaps {
        max_scans,
        max_scan_channels: 40,
        ..FirmwareCaps::default()
    }
}

pub(crate) fn umac_caps(max_scans: usize) -> FirmwareCaps {
    FirmwareCaps {
        umac_scan: true,
        ..lmac_caps(max_scans)
    }
}

pub(crate) fn vif() -> Vif {
    Vif {
        addr: MacAddr([0x02, 0xab, 0xcd, 0x00, 0x00, 0x01]),
        kind: IfaceKind::Station,
    }
}

pub(crate) fn request() -> ScanRequest {
    ScanRequest {
        ssids: vec![Ssid::new(b"alpha".to_vec()).unwrap()],
        channels: vec![
            Channel::new(1, Band::Band2GHz),
            Channel::new(36, Band::Band5GHz),
        ],
        ..ScanRequest::default()
    }
}

pub(crate) fn harness(caps: FirmwareCaps) -> Harness {
    let transport = Arc::new(FakeTransport::new());
    let stack = Arc::new(FakeStack::default());
    let device = Arc::new(FakeDevice::default());
    let config = DeviceConfig {
        valid_tx_ant: 0b11,
        valid_rx_ant: 0b11,
        channels: vec![
            Channel::new(1, Band::Band2GHz),
            Channel::new(6, Band::Band2GHz),
            Channel::new(36, Band::Band5GHz),
        ],
        stop_timeout: Duration::from_millis(50),
        ..DeviceConfig::default()
    };
    let coordinator = Arc::new(ScanCoordinator::new(
        caps,
        config,
        Arc::clone(&transport) as Arc<dyn CommandTransport>,
        Arc::clone(&stack) as Arc<dyn UpperStack>,
        Arc::clone(&device) as Arc<dyn DeviceState>,
    ));
    Harness {
        coordinator,
        transport,
        stack,
        device,
        ies: ScanIes::default(),
    }
}

pub(crate) fn lmac_complete(aborted: bool) -> LmacScanComplete {
    LmacScanComplete {
        last_schedule_line: 0,
        last_iteration: 1,
        status: if aborted {
            CompleteStatus::Aborted
        } else {
            CompleteStatus::Completed
        },
        ebs_status: EbsStatus::Success,
        time_after_last_iter: 0,
    }
}

pub(crate) fn lmac_complete_ebs_failed() -> LmacScanComplete {
    LmacScanComplete {
        ebs_status: EbsStatus::Failed,
        ..lmac_complete(false)
    }
}

pub(crate) fn umac_complete(uid: u32, aborted: bool) -> UmacScanComplete {
    UmacScanComplete {
        uid,
        last_schedule_line: 0,
        last_iteration: 1,
        status: if aborted {
            CompleteStatus::Aborted
        } else {
            CompleteStatus::Completed
        },
        ebs_status: EbsStatus::Success,
    }
}
