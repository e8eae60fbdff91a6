//! The command-format abstraction.
//!
//! The firmware speaks exactly one of two scan command generations, detected
//! via capability bits at attach. [`select_format`] resolves that choice once
//! into a [`ScanCommandFormat`] implementation; nothing downstream re-checks
//! the capability per call.

use scanoffload_core::caps::{DeviceConfig, FirmwareCaps, FwGeneration};
use scanoffload_core::error::ScanResult;
use scanoffload_core::port::HostCommand;
use scanoffload_core::types::ScanParams;

use crate::lmac::LmacFormat;
use crate::umac::UmacFormat;

/// Extended scan priority used for scan requests.
pub const PRIORITY_EXT_6: u32 = 6;
/// Extended priority used for the out-of-channel slot of periodic scans.
pub const PRIORITY_EXT_2: u32 = 2;

const LEGACY_PRIORITY_LOW: u32 = 0;
const LEGACY_PRIORITY_MEDIUM: u32 = 1;
const LEGACY_PRIORITY_HIGH: u32 = 2;

/// Maps an extended (0..7) priority onto whatever scale the firmware
/// understands. Firmware without the extended scale collapses it to the
/// legacy three levels.
#[must_use]
pub(crate) fn scan_priority(caps: &FirmwareCaps, ext: u32) -> u32 {
    if caps.ext_scan_priority {
        return ext;
    }
    if ext <= 2 {
        LEGACY_PRIORITY_LOW
    } else if ext <= 4 {
        LEGACY_PRIORITY_MEDIUM
    } else {
        LEGACY_PRIORITY_HIGH
    }
}

const RX_CHAIN_DRIVER_FORCE_POS: u16 = 0;
const RX_CHAIN_VALID_POS: u16 = 1;
const RX_CHAIN_FORCE_SEL_POS: u16 = 4;
const RX_CHAIN_FORCE_MIMO_SEL_POS: u16 = 7;

/// Builds the receive-chain selection word from the configured antennas. The
/// scan override mask wins over the general valid mask when set.
#[must_use]
pub(crate) fn rx_chain_word(dev: &DeviceConfig) -> u16 {
    let ant = u16::from(if dev.scan_rx_ant != 0 {
        dev.scan_rx_ant
    } else {
        dev.valid_rx_ant
    });
    ant << RX_CHAIN_VALID_POS
        | ant << RX_CHAIN_FORCE_SEL_POS
        | ant << RX_CHAIN_FORCE_MIMO_SEL_POS
        | 1 << RX_CHAIN_DRIVER_FORCE_POS
}

/// One firmware scan-command generation.
///
/// Implementations share the SSID-table and probe-template construction and
/// differ in everything else about the wire layout.
pub trait ScanCommandFormat: Send + Sync {
    /// Which generation this format speaks.
    fn generation(&self) -> FwGeneration;

    /// Upper bound of the encoded scan-request size for this device, used to
    /// size the reusable command buffer.
    fn max_command_len(&self, caps: &FirmwareCaps) -> usize;

    /// Encodes one scan request. `uid` must be `Some` for the current
    /// generation and is ignored by the legacy one.
    fn encode_scan_request(
        &self,
        params: &ScanParams,
        caps: &FirmwareCaps,
        dev: &DeviceConfig,
        uid: Option<u32>,
    ) -> ScanResult<HostCommand>;

    /// Encodes the abort command for a running scan.
    fn encode_abort(&self, uid: Option<u32>) -> ScanResult<HostCommand>;
}

/// Resolves the command format for this firmware. Called once at attach.
#[must_use]
pub fn select_format(caps: &FirmwareCaps) -> Box<dyn ScanCommandFormat> {
    match caps.generation() {
        FwGeneration::Umac => Box::new(UmacFormat),
        FwGeneration::Lmac => Box::new(LmacFormat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_passes_through_on_extended_firmware() {
        let caps = FirmwareCaps {
            ext_scan_priority: true,
            ..FirmwareCaps::default()
        };
        assert_eq!(scan_priority(&caps, PRIORITY_EXT_6), 6);
        assert_eq!(scan_priority(&caps, PRIORITY_EXT_2), 2);
    }

    #[test]
    fn priority_collapses_on_legacy_firmware() {
        let caps = FirmwareCaps::default();
        assert_eq!(scan_priority(&caps, 2), LEGACY_PRIORITY_LOW);
        assert_eq!(scan_priority(&caps, 4), LEGACY_PRIORITY_MEDIUM);
        assert_eq!(scan_priority(&caps, 6), LEGACY_PRIORITY_HIGH);
    }

    #[test]
    fn rx_chain_prefers_scan_override() {
        let dev = DeviceConfig {
            valid_rx_ant: 0x3,
            scan_rx_ant: 0x1,
            ..DeviceConfig::default()
        };
        let word = rx_chain_word(&dev);
        assert_eq!(word & 1, 1, "driver-force bit");
        assert_eq!((word >> RX_CHAIN_VALID_POS) & 0x7, 0x1);
    }

    #[test]
    fn format_selection_follows_generation() {
        let mut caps = FirmwareCaps::default();
        assert_eq!(select_format(&caps).generation(), FwGeneration::Lmac);
        caps.umac_scan = true;
        assert_eq!(select_format(&caps).generation(), FwGeneration::Umac);
    }
}
