//! Firmware capability and device configuration model.
//!
//! Both structs are filled in once at device attach, from the firmware TLV
//! capability records and the device NVM respectively, and stay immutable for
//! the lifetime of the attachment. The wire-format generation is derived from
//! [`FirmwareCaps`] exactly once -- the two command formats are mutually
//! exclusive and never re-checked per call.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::{Channel, MacAddr};

/// The two mutually exclusive firmware scan-command generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FwGeneration {
    /// Legacy generation: fixed-size command, session identity carried by
    /// global status bits only.
    Lmac,
    /// Current generation: variable-length command with a trailing tail
    /// section, sessions identified by firmware-assigned UIDs.
    Umac,
}

/// Capability bits and limits reported by the firmware at attach.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FirmwareCaps {
    /// Firmware speaks the current-generation scan command set.
    pub umac_scan: bool,
    /// Passive dwell may be split into fragments.
    pub fragmented_scan: bool,
    /// Energy-based scanning is implemented.
    pub ebs: bool,
    /// EBS may be used even for single-iteration scans.
    pub single_scan_ebs: bool,
    /// The extended 0..7 priority scale is understood; otherwise priorities
    /// collapse to the legacy three-level scale.
    pub ext_scan_priority: bool,
    /// Firmware performs regulatory measurements and therefore requires a DS
    /// Parameter Set placeholder in 2.4 GHz probe requests.
    pub ds_param_set_ie: bool,
    /// The scheduled-scan denylist table is the short variant.
    pub short_denylist: bool,
    /// Location-aware regulatory is handled by firmware; scanning must wait
    /// for the regulatory domain to be established.
    pub lar: bool,
    /// Maximum number of simultaneous scans the firmware can run.
    pub max_scans: usize,
    /// Maximum number of channels one scan command may carry.
    pub max_scan_channels: usize,
}

impl FirmwareCaps {
    /// The command generation this firmware speaks.
    #[must_use]
    pub fn generation(&self) -> FwGeneration {
        if self.umac_scan {
            FwGeneration::Umac
        } else {
            FwGeneration::Lmac
        }
    }
}

impl Default for FirmwareCaps {
    fn default() -> Self {
        Self {
            umac_scan: false,
            fragmented_scan: false,
            ebs: false,
            single_scan_ebs: false,
            ext_scan_priority: false,
            ds_param_set_ie: false,
            short_denylist: false,
            lar: false,
            max_scans: 1,
            max_scan_channels: 40,
        }
    }
}

/// Device-level wiring the encoders need: addresses, antenna masks and the
/// channel inventory used by the attach-time scan configuration command.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Primary device MAC address.
    pub mac_addr: MacAddr,
    /// Bitmask of valid transmit antennas.
    pub valid_tx_ant: u8,
    /// Bitmask of valid receive antennas.
    pub valid_rx_ant: u8,
    /// Receive-antenna override for scanning; zero means "use all valid".
    pub scan_rx_ant: u8,
    /// Legacy-rates word for the scan configuration command, precomputed by
    /// the rate layer.
    pub legacy_rates: u32,
    /// Broadcast station id probe requests are transmitted from.
    pub bcast_sta_id: u8,
    /// Every channel the device supports, for the scan configuration command.
    pub channels: Vec<Channel>,
    /// How long a stop request waits for the firmware scan-complete
    /// notification before forcing cleanup.
    pub stop_timeout: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            mac_addr: MacAddr([0; 6]),
            valid_tx_ant: 0x1,
            valid_rx_ant: 0x1,
            scan_rx_ant: 0,
            legacy_rates: 0,
            bcast_sta_id: 0,
            channels: Vec::new(),
            stop_timeout: Duration::from_secs(1),
        }
    }
}
