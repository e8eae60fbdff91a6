//! The notification reconciler: the asynchronous half of the session state
//! machine.
//!
//! Firmware notifications race against driver-initiated stops. The contract
//! is: a session found in its stop handshake is cleared silently (the stop
//! path already told the upper stack); a session found running was ended by
//! the firmware itself and the upper stack is told here; anything else is a
//! stale event from a firmware/driver desync and is logged and dropped.
//!
//! Every handler resolves pending stop-waiters *before* taking the session
//! lock -- the stopping task holds the lock while it waits.

use scanoffload_core::types::SessionType;
use scanoffload_wire::notif::{
    format_channel_list, LmacScanComplete, ScanIterComplete, UmacScanComplete,
};

use crate::coordinator::ScanCoordinator;
use crate::registry::UidSlot;

impl ScanCoordinator {
    /// Handles the legacy-generation session-complete notification.
    ///
    /// The legacy firmware runs at most one stopping and one running scan,
    /// never two of the same kind, so ownership is recovered from the status
    /// bits alone, checked in stop-handshake-first order.
    pub async fn handle_lmac_scan_complete(&self, notif: &LmacScanComplete) {
        self.waiters.notify_all();

        let mut registry = self.state.lock().await;
        let aborted = notif.aborted();
        let ebs = notif.ebs_status.label();

        if registry.is_stopping(SessionType::Scheduled) {
            if registry.is_stopping(SessionType::Regular) {
                tracing::warn!("regular and scheduled scans stopping simultaneously");
            }
            tracing::debug!(aborted, ebs, "scheduled scan stop acknowledged");
            registry.clear_stopping(SessionType::Scheduled);
        } else if registry.is_stopping(SessionType::Regular) {
            tracing::debug!(aborted, ebs, "regular scan stop acknowledged");
            registry.clear_stopping(SessionType::Regular);
        } else if registry.is_running(SessionType::Scheduled) {
            if registry.is_running(SessionType::Regular) {
                tracing::warn!("regular and scheduled scans running simultaneously");
            }
            tracing::debug!(aborted, ebs, "scheduled scan ended by firmware");
            registry.clear_running(SessionType::Scheduled);
            self.stack.sched_scan_stopped();
        } else if registry.is_running(SessionType::Regular) {
            tracing::debug!(aborted, ebs, "regular scan ended by firmware");
            registry.clear_running(SessionType::Regular);
            self.stack.scan_completed(aborted);
            self.device.unref_scan();
        } else {
            tracing::warn!(aborted, ebs, "scan-complete with no active session; dropping");
        }

        registry.set_last_ebs_usable(notif.ebs_status.is_usable());
    }

    /// Handles the current-generation session-complete notification.
    ///
    /// Ownership is recovered through the UID table. A UID whose slot
    /// disagrees with the status bits is a desync leftover (e.g. a stop that
    /// timed out); the event is dropped after the slot is scrubbed.
    pub async fn handle_umac_scan_complete(&self, notif: &UmacScanComplete) {
        self.waiters.notify_all();

        let mut registry = self.state.lock().await;
        let aborted = notif.aborted();
        let ebs = notif.ebs_status.label();

        let Some(slot) = registry.slot(notif.uid) else {
            tracing::warn!(uid = notif.uid, "scan-complete for UID out of range; dropping");
            return;
        };

        let consistent = match slot {
            UidSlot::Free => false,
            UidSlot::Active(session) => registry.is_running(session),
            UidSlot::Stopping(session) => registry.is_stopping(session),
        };
        if !consistent {
            tracing::warn!(
                uid = notif.uid,
                ?slot,
                "scan-complete does not match recorded status; dropping"
            );
            registry.free_uid(notif.uid);
            return;
        }

        match slot {
            UidSlot::Active(SessionType::Regular) => {
                tracing::debug!(uid = notif.uid, aborted, ebs, "regular scan ended by firmware");
                registry.clear_running(SessionType::Regular);
                self.stack.scan_completed(aborted);
                self.device.unref_scan();
            }
            UidSlot::Active(SessionType::Scheduled) => {
                tracing::debug!(uid = notif.uid, aborted, ebs, "scheduled scan ended by firmware");
                registry.clear_running(SessionType::Scheduled);
                self.stack.sched_scan_stopped();
            }
            UidSlot::Active(SessionType::NetDetect) => {
                // Resolved by the resume path; nothing to tell the stack.
                tracing::debug!(uid = notif.uid, aborted, ebs, "net-detect scan ended");
                registry.clear_running(SessionType::NetDetect);
            }
            UidSlot::Stopping(session) => {
                tracing::debug!(uid = notif.uid, ?session, aborted, ebs, "scan stop acknowledged");
                registry.clear_stopping(session);
            }
            UidSlot::Free => unreachable!("free slots fail the consistency check"),
        }

        registry.free_uid(notif.uid);
        registry.set_last_ebs_usable(notif.ebs_status.is_usable());
    }

    /// Handles an iteration-complete notification. Purely informational;
    /// no session state changes.
    pub fn handle_scan_iteration_complete(&self, notif: &ScanIterComplete) {
        tracing::debug!(
            status = notif.status,
            channels = %format_channel_list(&notif.scanned_channels),
            "scan iteration complete"
        );
    }

    /// Handles a scheduled-scan match notification.
    pub fn handle_match_found(&self) {
        tracing::debug!("scheduled scan results");
        self.stack.sched_scan_results();
    }

    /// Synthesizes completions after a firmware reset. Regular sessions are
    /// reported aborted; scheduled sessions are reported stopped unless the
    /// firmware is about to restart (it restarts them itself). Leftover UID
    /// slots are swept with a warning.
    pub async fn report_scan_aborted(&self, fw_restarting: bool) {
        let mut registry = self.state.lock().await;

        // Only running sessions are reported: a session in its stop
        // handshake already notified the stack and dropped its reference.
        if registry.is_running(SessionType::Regular) {
            self.stack.scan_completed(true);
            self.device.unref_scan();
        }
        if registry.is_running(SessionType::Scheduled) && !fw_restarting {
            self.stack.sched_scan_stopped();
        }

        for (uid, slot) in registry.occupied_uids() {
            tracing::warn!(uid, ?slot, "scan UID status was not cleaned");
        }

        registry.reset();
    }

    /// Clears all scan state on device detach.
    pub async fn detach(&self) {
        let mut registry = self.state.lock().await;
        registry.reset();
    }
}
