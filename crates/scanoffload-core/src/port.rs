//! Port definitions for the scan-offload coordinator.
//!
//! Hexagonal-architecture ports that abstract the three collaborators the
//! session core talks to, enabling real transports and test doubles to be
//! swapped transparently:
//!
//! - [`CommandTransport`] -- the synchronous firmware command channel
//!   (driven side).
//! - [`UpperStack`] -- completion callbacks into the generic 802.11
//!   management layer (driven side).
//! - [`DeviceState`] -- preconditions and link conditions queried before and
//!   during scan transitions (driven side).

use async_trait::async_trait;

use crate::error::TransportError;
use crate::types::LinkConditions;

/// Opcodes of the commands this subsystem sends. The high byte selects the
/// command group (zero for the legacy group).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandId {
    /// Legacy scan request.
    LmacScanRequest,
    /// Legacy scan abort.
    LmacScanAbort,
    /// Scheduled-scan match-profile configuration.
    SchedScanProfiles,
    /// Current-generation attach-time scan configuration.
    UmacScanConfig,
    /// Current-generation scan request.
    UmacScanRequest,
    /// Current-generation scan abort.
    UmacScanAbort,
}

impl CommandId {
    /// The 16-bit wire opcode (group in the high byte).
    #[must_use]
    pub fn opcode(&self) -> u16 {
        match self {
            CommandId::LmacScanRequest => 0x0051,
            CommandId::LmacScanAbort => 0x0052,
            CommandId::SchedScanProfiles => 0x006e,
            CommandId::UmacScanConfig => 0x010c,
            CommandId::UmacScanRequest => 0x010d,
            CommandId::UmacScanAbort => 0x010e,
        }
    }
}

/// One encoded command ready for the transport: opcode plus payload bytes.
/// Consumed by a single send; never retained.
#[derive(Debug, Clone)]
pub struct HostCommand {
    /// Which command this is.
    pub id: CommandId,
    /// Encoded command payload.
    pub payload: Vec<u8>,
}

/// Port that abstracts the firmware command channel.
///
/// Sends are synchronous with respect to the session lock: the calling task
/// holds the lock until the firmware acknowledges the command or the
/// transport reports failure.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Send a command and wait for the firmware acknowledgment.
    async fn send(&self, cmd: HostCommand) -> Result<(), TransportError>;

    /// Send a command and return the status word the firmware answers with.
    /// Used by abort commands, whose status distinguishes "aborting" from
    /// "nothing to abort".
    async fn send_for_status(&self, cmd: HostCommand) -> Result<u32, TransportError>;
}

/// Port for completion callbacks into the 802.11 management layer.
///
/// All callbacks are invoked with the session lock held; implementations must
/// not call back into the coordinator.
pub trait UpperStack: Send + Sync {
    /// A regular scan ended. `aborted` is true when the firmware terminated
    /// it before visiting every channel.
    fn scan_completed(&self, aborted: bool);

    /// A scheduled scan is no longer running.
    fn sched_scan_stopped(&self);

    /// A scheduled-scan iteration matched at least one configured profile.
    fn sched_scan_results(&self);
}

/// Port for device preconditions and link conditions.
pub trait DeviceState: Send + Sync {
    /// Whether the regulatory domain has been established.
    fn regulatory_ready(&self) -> bool;

    /// Whether the radio is administratively disabled. A stop issued while
    /// the radio is killed is treated as already complete.
    fn radio_killed(&self) -> bool;

    /// Snapshot of traffic load, latency mode and bound interfaces for the
    /// dwell policy.
    fn link_conditions(&self) -> LinkConditions;

    /// Take the device-active reference that keeps the device awake for the
    /// duration of a regular scan.
    fn ref_scan(&self);

    /// Release the device-active reference.
    fn unref_scan(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcodes_are_unique() {
        let all = [
            CommandId::LmacScanRequest,
            CommandId::LmacScanAbort,
            CommandId::SchedScanProfiles,
            CommandId::UmacScanConfig,
            CommandId::UmacScanRequest,
            CommandId::UmacScanAbort,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.opcode(), b.opcode(), "{a:?} and {b:?} share an opcode");
            }
        }
    }

    #[test]
    fn umac_opcodes_carry_the_long_group() {
        assert_eq!(CommandId::UmacScanRequest.opcode() >> 8, 0x01);
        assert_eq!(CommandId::LmacScanRequest.opcode() >> 8, 0x00);
    }
}
