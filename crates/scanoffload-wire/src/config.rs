//! Auxiliary scan commands: attach-time scan configuration and
//! scheduled-scan match profiles.
//!
//! The scan configuration command (current generation only) activates
//! offloaded scanning and hands the firmware everything that never changes
//! per scan: chain settings, legacy rates, default dwells and the full
//! supported-channel inventory.
//!
//! The profile command programs the match filters a scheduled scan reports
//! against, plus a zeroed denylist whose size depends on the firmware's
//! denylist capability.

use scanoffload_core::caps::{DeviceConfig, FirmwareCaps};
use scanoffload_core::error::{ScanError, ScanResult};
use scanoffload_core::port::{CommandId, HostCommand};
use scanoffload_core::types::MatchSet;
use scanoffload_core::MAX_MATCH_PROFILES;

use crate::{
    CHANNEL_FLAG_CACHE_ADD, CHANNEL_FLAG_EBS, CHANNEL_FLAG_EBS_ACCURATE,
    CHANNEL_FLAG_PASSIVE2ACTIVE,
};

// scan-config flags
const CONFIG_FLAG_ACTIVATE: u32 = 1 << 0;
const CONFIG_FLAG_ALLOW_EXTERNAL_REQS: u32 = 1 << 1;
const CONFIG_FLAG_SET_TX_CHAINS: u32 = 1 << 8;
const CONFIG_FLAG_SET_RX_CHAINS: u32 = 1 << 9;
const CONFIG_FLAG_SET_ALL_TIMES: u32 = 1 << 10;
const CONFIG_FLAG_SET_LEGACY_RATES: u32 = 1 << 11;
const CONFIG_FLAG_SET_MAC_ADDR: u32 = 1 << 12;
const CONFIG_FLAG_SET_CHANNEL_FLAGS: u32 = 1 << 13;

// default out-of-channel timing handed to the firmware at attach
const CONFIG_OUT_OF_CHANNEL_TIME: u32 = 170;
const CONFIG_SUSPEND_TIME: u32 = 30;
const CONFIG_DWELL_ACTIVE: u8 = 20;
const CONFIG_DWELL_PASSIVE: u8 = 110;
const CONFIG_DWELL_FRAGMENTED: u8 = 20;

/// Scheduled-scan client bit in the profile client bitmaps.
const SCAN_CLIENT_SCHED: u8 = 1 << 0;
/// Profile wildcard: any cipher / any auth algorithm.
const PROFILE_ANY: u8 = 0xff;
const NETWORK_TYPE_ANY: u8 = 3;
const BAND_SELECTION_ANY: u8 = 6;

/// Denylist sizes, selected by the short-denylist capability.
const SHORT_DENYLIST_LEN: usize = 16;
const FULL_DENYLIST_LEN: usize = 64;
/// One denylist entry: MAC address, reported RSSI, client bitmap.
const DENYLIST_ENTRY_LEN: usize = 8;

/// Encodes the attach-time scan configuration command.
///
/// # Errors
///
/// Returns [`ScanError::Size`] when the device channel inventory exceeds
/// what the firmware can hold.
pub fn encode_scan_config(caps: &FirmwareCaps, dev: &DeviceConfig) -> ScanResult<HostCommand> {
    if dev.channels.len() > caps.max_scan_channels {
        return Err(ScanError::Size {
            needed: dev.channels.len(),
            limit: caps.max_scan_channels,
        });
    }

    let flags = CONFIG_FLAG_ACTIVATE
        | CONFIG_FLAG_ALLOW_EXTERNAL_REQS
        | CONFIG_FLAG_SET_TX_CHAINS
        | CONFIG_FLAG_SET_RX_CHAINS
        | CONFIG_FLAG_SET_ALL_TIMES
        | CONFIG_FLAG_SET_LEGACY_RATES
        | CONFIG_FLAG_SET_MAC_ADDR
        | CONFIG_FLAG_SET_CHANNEL_FLAGS;

    let mut buf = Vec::with_capacity(38 + dev.channels.len());
    buf.extend_from_slice(&flags.to_le_bytes());
    buf.extend_from_slice(&u32::from(dev.valid_tx_ant).to_le_bytes());
    buf.extend_from_slice(&u32::from(dev.valid_rx_ant).to_le_bytes());
    buf.extend_from_slice(&dev.legacy_rates.to_le_bytes());
    buf.extend_from_slice(&CONFIG_OUT_OF_CHANNEL_TIME.to_le_bytes());
    buf.extend_from_slice(&CONFIG_SUSPEND_TIME.to_le_bytes());
    buf.push(CONFIG_DWELL_ACTIVE);
    buf.push(CONFIG_DWELL_PASSIVE);
    buf.push(CONFIG_DWELL_FRAGMENTED);
    buf.push(0);
    buf.extend_from_slice(&dev.mac_addr.0);
    buf.push(dev.bcast_sta_id);
    buf.push(
        (CHANNEL_FLAG_EBS
            | CHANNEL_FLAG_EBS_ACCURATE
            | CHANNEL_FLAG_CACHE_ADD
            | CHANNEL_FLAG_PASSIVE2ACTIVE) as u8,
    );
    buf.push(dev.channels.len() as u8);
    buf.push(0);
    for channel in &dev.channels {
        buf.push(channel.number as u8);
    }

    Ok(HostCommand {
        id: CommandId::UmacScanConfig,
        payload: buf,
    })
}

/// Encodes the scheduled-scan profile configuration command.
///
/// Profiles reference the direct-SSID table by placement order, so this
/// command must describe the same match-set list the scan request was built
/// from. Cipher and auth criteria are wildcarded.
///
/// # Errors
///
/// Returns [`ScanError::Size`] when more match sets are supplied than the
/// firmware profile table holds.
pub fn encode_sched_profiles(
    match_sets: &[MatchSet],
    caps: &FirmwareCaps,
) -> ScanResult<HostCommand> {
    if match_sets.len() > MAX_MATCH_PROFILES {
        return Err(ScanError::Size {
            needed: match_sets.len(),
            limit: MAX_MATCH_PROFILES,
        });
    }

    let denylist_len = if caps.short_denylist {
        SHORT_DENYLIST_LEN
    } else {
        FULL_DENYLIST_LEN
    };

    let mut buf = Vec::with_capacity(denylist_len * DENYLIST_ENTRY_LEN + 96);

    // No denylist configuration; the table is present but empty.
    buf.extend(std::iter::repeat(0u8).take(denylist_len * DENYLIST_ENTRY_LEN));

    buf.push(match_sets.len() as u8);
    buf.push(SCAN_CLIENT_SCHED); // active clients
    buf.push(SCAN_CLIENT_SCHED); // pass profile matches
    buf.push(SCAN_CLIENT_SCHED); // notify on match
    let filterless = match_sets.first().map_or(true, |m| m.ssid.is_empty());
    buf.push(if filterless { SCAN_CLIENT_SCHED } else { 0 }); // any-beacon notify
    buf.extend_from_slice(&[0, 0, 0]);

    for index in 0..MAX_MATCH_PROFILES {
        if index < match_sets.len() {
            buf.push(index as u8);
            buf.push(PROFILE_ANY); // unicast cipher
            buf.push(PROFILE_ANY); // auth algorithm
            buf.push(NETWORK_TYPE_ANY);
            buf.push(BAND_SELECTION_ANY);
            buf.push(SCAN_CLIENT_SCHED);
            buf.extend_from_slice(&[0, 0]);
        } else {
            buf.extend_from_slice(&[0u8; 8]);
        }
    }

    Ok(HostCommand {
        id: CommandId::SchedScanProfiles,
        payload: buf,
    })
}
