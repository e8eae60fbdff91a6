//! Core data types for the scan-offload coordinator.
//!
//! This module defines the data structures shared between the session state
//! machine and the wire encoders:
//!
//! - **Addressing**: [`MacAddr`], [`Ssid`], [`Band`], [`Channel`], [`Vif`]
//! - **Request Types**: [`ScanRequest`], [`MatchSet`], [`ScanIes`],
//!   [`ScanRequestFlags`]
//! - **Plan Types**: [`ScanParams`], [`DwellPlan`], [`ScheduleLine`],
//!   [`ProbeTemplate`], [`LinkConditions`]
//!
//! A [`ScanRequest`] is the immutable user-facing intent. The coordinator
//! derives a [`ScanParams`] from it per start attempt -- dwell plan, schedule
//! lines, pass-all decision, probe-request template -- and hands that to the
//! generation-specific encoder.

use std::fmt;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ScanError, ScanResult};
use crate::MAX_SSID_LEN;

// =============================================================================
// Addressing
// =============================================================================

/// A 48-bit IEEE 802 MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// The broadcast address `ff:ff:ff:ff:ff:ff`.
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

    /// Returns the raw octets.
    #[must_use]
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Whether this is the broadcast address.
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xff; 6]
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

/// An 802.11 SSID: 0 to 32 octets. An empty SSID is the wildcard (hidden)
/// SSID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ssid(Vec<u8>);

impl Ssid {
    /// Creates an SSID, rejecting anything longer than 32 octets.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidRequest`] when the input exceeds
    /// [`MAX_SSID_LEN`].
    pub fn new(bytes: impl Into<Vec<u8>>) -> ScanResult<Self> {
        let bytes = bytes.into();
        if bytes.len() > MAX_SSID_LEN {
            return Err(ScanError::InvalidRequest {
                message: format!("SSID length {} exceeds {MAX_SSID_LEN}", bytes.len()),
            });
        }
        Ok(Self(bytes))
    }

    /// The wildcard (zero-length) SSID.
    #[must_use]
    pub fn wildcard() -> Self {
        Self(Vec::new())
    }

    /// Raw SSID octets.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// SSID length in octets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the wildcard SSID.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The two bands the scan firmware serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Band {
    /// 2.4 GHz ISM band.
    Band2GHz,
    /// 5 GHz UNII bands.
    Band5GHz,
}

/// A scannable channel: the hardware channel number plus its band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Channel {
    /// Hardware channel number (e.g. 1..14 on 2.4 GHz, 36.. on 5 GHz).
    pub number: u16,
    /// The band this channel belongs to.
    pub band: Band,
}

impl Channel {
    /// Convenience constructor.
    #[must_use]
    pub fn new(number: u16, band: Band) -> Self {
        Self { number, band }
    }
}

/// Kind of virtual interface a scan is issued on.
///
/// Peer-discovery interfaces get special dwell treatment: fragmenting their
/// passive dwell would hurt discovery latency, so the timing policy keeps
/// them unfragmented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IfaceKind {
    /// A managed (station) interface.
    Station,
    /// A peer-discovery / device-scan interface.
    PeerDiscovery,
}

/// The virtual interface a scan request is bound to.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vif {
    /// Interface MAC address, used as the probe-request source address when
    /// randomization is off.
    pub addr: MacAddr,
    /// Interface kind.
    pub kind: IfaceKind,
}

// =============================================================================
// Request types
// =============================================================================

bitflags::bitflags! {
    /// Caller-supplied scan behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ScanRequestFlags: u32 {
        /// Deprioritize this scan against traffic; caps time off channel.
        const LOW_PRIORITY = 1 << 0;
        /// Use a randomized source address in probe requests.
        const RANDOM_ADDR = 1 << 1;
    }
}

/// One scheduled-scan match profile: report only networks matching this SSID.
///
/// Cipher and auth criteria are wildcarded in the profile command (the
/// firmware matches any), so the SSID is the only discriminating field
/// carried here.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchSet {
    /// SSID to match. An empty SSID matches any beacon.
    pub ssid: Ssid,
}

/// Extra information elements to append to probe requests, split the way the
/// management layer hands them down.
#[derive(Debug, Clone, Default)]
pub struct ScanIes {
    /// IEs valid only on the 2.4 GHz band.
    pub band_2ghz: Vec<u8>,
    /// IEs valid only on the 5 GHz band.
    pub band_5ghz: Vec<u8>,
    /// IEs common to both bands.
    pub common: Vec<u8>,
}

impl ScanIes {
    /// Total IE payload length across all segments.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.band_2ghz.len() + self.band_5ghz.len() + self.common.len()
    }
}

/// User-facing scan intent. Immutable once submitted; owned exclusively by
/// the session state machine for the duration of the operation.
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    /// SSIDs to probe for, in caller order. Empty means passive-only.
    pub ssids: Vec<Ssid>,
    /// Channels to visit, in caller order. Must not be empty.
    pub channels: Vec<Channel>,
    /// Match profiles (scheduled scans only).
    pub match_sets: Vec<MatchSet>,
    /// Behavior flags.
    pub flags: ScanRequestFlags,
    /// Template address for randomization; bits kept where the mask is set.
    pub mac_addr: Option<MacAddr>,
    /// Randomization mask; `1` bits are taken from `mac_addr`.
    pub mac_addr_mask: Option<MacAddr>,
    /// Suppress CCK rates on 2.4 GHz probe transmission.
    pub no_cck: bool,
    /// Interval between scheduled-scan iterations.
    pub interval: Duration,
    /// Delay before the first scheduled-scan iteration.
    pub delay: Duration,
}

// =============================================================================
// Session and plan types
// =============================================================================

/// The three semantic scan session types multiplexed over one firmware
/// command channel. At most one active instance of each type at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SessionType {
    /// One-shot scan on behalf of the management layer.
    Regular,
    /// Periodic background scan for network matching while not associated.
    Scheduled,
    /// Suspend-time scan used to detect configured networks without a full
    /// driver wake-up.
    NetDetect,
}

/// Traffic-load tier reported by the traffic monitor. `Low` doubles as the
/// unknown tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TrafficLoad {
    /// High traffic; keep time off the operating channel short.
    High,
    /// Medium traffic.
    Medium,
    /// Low or unknown traffic.
    #[default]
    Low,
}

/// Snapshot of link conditions consumed by the dwell/timing policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkConditions {
    /// Current traffic-load tier.
    pub load: TrafficLoad,
    /// Whether any interface runs in low-latency mode.
    pub low_latency: bool,
    /// Number of interfaces currently bound to a channel context. When zero,
    /// the timing policy leaves out-of-channel timing to firmware defaults.
    pub bound_interfaces: usize,
}

/// Derived per-scan timing, computed fresh for every scan start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DwellPlan {
    /// Dwell on an actively probed channel, in ms.
    pub active_dwell: u8,
    /// Dwell on a passively listened channel, in ms.
    pub passive_dwell: u8,
    /// Per-fragment dwell when passive scanning is fragmented, in ms.
    pub fragmented_dwell: u8,
    /// Maximum continuous time away from the operating channel, in ms.
    /// Zero means "firmware default".
    pub max_out_time: u32,
    /// Pause on the operating channel between excursions, in ms.
    /// Zero means "firmware default".
    pub suspend_time: u32,
    /// Whether passive dwell is fragmented.
    pub passive_fragmented: bool,
}

/// One line of the firmware scan schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleLine {
    /// Number of scan iterations this line contributes.
    pub iterations: u8,
    /// Every how many iterations an energy-based iteration is widened into a
    /// full scan. Zero disables the substitution.
    pub full_scan_mul: u8,
}

/// Byte range of one segment inside the probe-request template buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IeSegment {
    /// Offset from the start of the template buffer.
    pub offset: u16,
    /// Length in bytes.
    pub len: u16,
}

/// A fully built probe-request frame template plus the segment table the
/// firmware uses to patch it per channel/band.
#[derive(Debug, Clone, Default)]
pub struct ProbeTemplate {
    /// Raw frame bytes: 802.11 header, wildcard SSID element, then the IE
    /// segments back to back.
    pub buf: Vec<u8>,
    /// The 802.11 header plus wildcard SSID element.
    pub mac_header: IeSegment,
    /// 2.4 GHz band IEs (with the DS Parameter Set placeholder when the
    /// regulatory-measurement condition holds).
    pub band_2ghz: IeSegment,
    /// 5 GHz band IEs.
    pub band_5ghz: IeSegment,
    /// IEs common to both bands.
    pub common: IeSegment,
}

/// Everything the wire encoders need to emit one scan request: the request
/// fields the formats consume, plus every derived decision the coordinator
/// made. Built once per start attempt and dropped afterwards.
#[derive(Debug, Clone)]
pub struct ScanParams {
    /// Which session this plan belongs to.
    pub session: SessionType,
    /// SSIDs to probe for.
    pub ssids: Vec<Ssid>,
    /// Channels to visit.
    pub channels: Vec<Channel>,
    /// Match profiles (scheduled scans).
    pub match_sets: Vec<MatchSet>,
    /// Report every beacon rather than only profile matches.
    pub pass_all: bool,
    /// Suppress CCK rates on 2.4 GHz.
    pub no_cck: bool,
    /// Caller behavior flags.
    pub flags: ScanRequestFlags,
    /// Derived timing.
    pub dwell: DwellPlan,
    /// Two-line schedule plan.
    pub schedule: [ScheduleLine; 2],
    /// Seconds between scheduled iterations (already clamped to 16 bits).
    pub interval_secs: u16,
    /// Seconds before the first iteration (already clamped to 16 bits).
    pub delay_secs: u16,
    /// Whether energy-based scanning is eligible for this scan.
    pub use_ebs: bool,
    /// Ask the firmware for per-iteration completion notifications.
    pub iter_notify: bool,
    /// Antenna indices for the 2.4 GHz and 5 GHz transmit descriptors.
    pub tx_ant: [u8; 2],
    /// Built probe-request template.
    pub probe: ProbeTemplate,
}

impl ScanParams {
    /// Total number of iterations across both schedule lines. A total above
    /// one makes the scan periodic.
    #[must_use]
    pub fn total_iterations(&self) -> u32 {
        u32::from(self.schedule[0].iterations) + u32::from(self.schedule[1].iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssid_rejects_oversize() {
        assert!(Ssid::new(vec![0u8; 33]).is_err());
        assert!(Ssid::new(vec![0u8; 32]).is_ok());
    }

    #[test]
    fn wildcard_ssid_is_empty() {
        let ssid = Ssid::wildcard();
        assert!(ssid.is_empty());
        assert_eq!(ssid.len(), 0);
    }

    #[test]
    fn mac_addr_formats_lowercase_hex() {
        let mac = MacAddr([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);
        assert_eq!(mac.to_string(), "de:ad:be:ef:00:01");
        assert!(MacAddr::BROADCAST.is_broadcast());
        assert!(!mac.is_broadcast());
    }

    #[test]
    fn total_iterations_sums_both_lines() {
        let params = ScanParams {
            session: SessionType::Scheduled,
            ssids: Vec::new(),
            channels: Vec::new(),
            match_sets: Vec::new(),
            pass_all: true,
            no_cck: false,
            flags: ScanRequestFlags::empty(),
            dwell: DwellPlan::default(),
            schedule: [
                ScheduleLine {
                    iterations: 3,
                    full_scan_mul: 1,
                },
                ScheduleLine {
                    iterations: 0xff,
                    full_scan_mul: 3,
                },
            ],
            interval_secs: 10,
            delay_secs: 0,
            use_ebs: false,
            iter_notify: false,
            tx_ant: [0, 0],
            probe: ProbeTemplate::default(),
        };
        assert_eq!(params.total_iterations(), 258);
    }
}
