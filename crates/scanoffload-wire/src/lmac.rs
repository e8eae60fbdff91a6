//! Legacy-generation scan request encoder.
//!
//! The legacy format is one fixed-size command addressed by global session
//! status alone (no scan UIDs). Layout, little-endian throughout:
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       1     active_dwell (ms)
//! 1       1     passive_dwell (ms)
//! 2       1     fragmented_dwell (ms, zero when unfragmented)
//! 3       1     reserved
//! 4       4     max_out_time (ms)
//! 8       4     suspend_time (ms)
//! 12      4     scan_priority
//! 16      4     scan_flags
//! 20      2     rx_chain_select
//! 22      2     reserved
//! 24      4     band flags of the first channel
//! 28      4     filter_flags
//! 32      4     iteration number (always 1)
//! 36      4     delay before the first iteration (s)
//! 40      1     n_channels
//! 41      3     reserved
//! 44      24    tx descriptors: 2.4 GHz then 5 GHz (12 bytes each)
//! 68      680   direct-SSID table (20 slots x 34 bytes)
//! 748     8     schedule lines (2 x: delay u16, iterations u8, full_scan_mul u8)
//! 756     8     EBS channel options (2 x: flags u16, non_ebs_ratio u16)
//! 764     12*n  per-channel config (channel u16, iter_count u16,
//!               iter_interval u32, flags u32)
//! ...     528   probe-request template
//! ```
//!
//! The per-channel flags word carries the direct-SSID bitmap **left-shifted
//! by one bit**: the firmware reserves bit 0 of that field.

use scanoffload_core::caps::{DeviceConfig, FirmwareCaps, FwGeneration};
use scanoffload_core::error::{ScanError, ScanResult};
use scanoffload_core::port::{CommandId, HostCommand};
use scanoffload_core::types::{Band, ScanParams};

use crate::format::{rx_chain_word, scan_priority, ScanCommandFormat, PRIORITY_EXT_6};
use crate::probe::{write_probe, PROBE_REQ_WIRE_LEN};
use crate::ssid::build_direct_ssids;
use crate::{
    CHANNEL_FLAG_CACHE_ADD, CHANNEL_FLAG_EBS, CHANNEL_FLAG_EBS_ACCURATE, DENSE_EBS_SCAN_RATIO,
    SPARSE_EBS_SCAN_RATIO,
};

/// Size of the fixed part of the command, before the channel array.
pub const LMAC_FIXED_LEN: usize = 764;

/// Per-channel config entry size.
pub const LMAC_CHANNEL_CFG_LEN: usize = 12;

// scan_flags bits
const FLAG_PASS_ALL: u32 = 1 << 0;
const FLAG_PASSIVE: u32 = 1 << 1;
const FLAG_PRE_CONNECTION: u32 = 1 << 2;
const FLAG_ITER_COMPLETE: u32 = 1 << 3;
const FLAG_FRAGMENTED: u32 = 1 << 5;
const FLAG_RRM_ENABLED: u32 = 1 << 6;
const FLAG_MATCH: u32 = 1 << 9;

// filter_flags bits
const FILTER_ACCEPT_GRP: u32 = 1 << 2;
const FILTER_IN_BEACON: u32 = 1 << 6;

// tx descriptor bits
const TX_FLAG_SEQ_CTL: u32 = 1 << 13;
const TX_FLAG_BT_DIS: u32 = 1 << 12;
const RATE_1M_PLCP: u32 = 10;
const RATE_6M_PLCP: u32 = 13;
const RATE_CCK_MSK: u32 = 1 << 9;
const RATE_ANT_POS: u32 = 14;

// per-channel config bits
const CHANNEL_CFG_PARTIAL: u32 = 1 << 28;

fn band_word(band: Band) -> u32 {
    match band {
        Band::Band2GHz => 0x1,
        Band::Band5GHz => 0x2,
    }
}

fn rate_word(band: Band, no_cck: bool, ant_idx: u8) -> u32 {
    let ant = (1u32 << ant_idx) << RATE_ANT_POS;
    if band == Band::Band2GHz && !no_cck {
        RATE_1M_PLCP | RATE_CCK_MSK | ant
    } else {
        RATE_6M_PLCP | ant
    }
}

fn scan_flags(params: &ScanParams, caps: &FirmwareCaps) -> u32 {
    let mut flags = 0;

    if params.ssids.is_empty() {
        flags |= FLAG_PASSIVE;
    }
    if params.ssids.len() == 1 && !params.ssids[0].is_empty() {
        flags |= FLAG_PRE_CONNECTION;
    }
    if params.dwell.passive_fragmented {
        flags |= FLAG_FRAGMENTED;
    }
    if caps.ds_param_set_ie {
        flags |= FLAG_RRM_ENABLED;
    }
    if params.pass_all {
        flags |= FLAG_PASS_ALL;
    } else {
        flags |= FLAG_MATCH;
    }
    if params.iter_notify {
        flags |= FLAG_ITER_COMPLETE;
    }

    flags
}

/// The legacy command format.
#[derive(Debug, Clone, Copy, Default)]
pub struct LmacFormat;

impl ScanCommandFormat for LmacFormat {
    fn generation(&self) -> FwGeneration {
        FwGeneration::Lmac
    }

    fn max_command_len(&self, caps: &FirmwareCaps) -> usize {
        LMAC_FIXED_LEN + LMAC_CHANNEL_CFG_LEN * caps.max_scan_channels + PROBE_REQ_WIRE_LEN
    }

    fn encode_scan_request(
        &self,
        params: &ScanParams,
        caps: &FirmwareCaps,
        dev: &DeviceConfig,
        _uid: Option<u32>,
    ) -> ScanResult<HostCommand> {
        let first_channel = params.channels.first().ok_or_else(|| {
            ScanError::InvalidRequest {
                message: "scan request carries no channels".into(),
            }
        })?;
        if params.channels.len() > caps.max_scan_channels {
            return Err(ScanError::Size {
                needed: params.channels.len(),
                limit: caps.max_scan_channels,
            });
        }

        let ssids = build_direct_ssids(&params.match_sets, &params.ssids);
        // This field uses bits 1..20 instead of 0..19.
        let ssid_bitmap = ssids.bitmap << 1;

        let mut buf = Vec::with_capacity(self.max_command_len(caps));

        buf.push(params.dwell.active_dwell);
        buf.push(params.dwell.passive_dwell);
        buf.push(params.dwell.fragmented_dwell);
        buf.push(0);
        buf.extend_from_slice(&params.dwell.max_out_time.to_le_bytes());
        buf.extend_from_slice(&params.dwell.suspend_time.to_le_bytes());
        buf.extend_from_slice(&scan_priority(caps, PRIORITY_EXT_6).to_le_bytes());
        buf.extend_from_slice(&scan_flags(params, caps).to_le_bytes());
        buf.extend_from_slice(&rx_chain_word(dev).to_le_bytes());
        buf.extend_from_slice(&[0, 0]);
        buf.extend_from_slice(&band_word(first_channel.band).to_le_bytes());
        buf.extend_from_slice(&(FILTER_ACCEPT_GRP | FILTER_IN_BEACON).to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&u32::from(params.delay_secs).to_le_bytes());
        buf.push(params.channels.len() as u8);
        buf.extend_from_slice(&[0, 0, 0]);

        for (band, ant) in [
            (Band::Band2GHz, params.tx_ant[0]),
            (Band::Band5GHz, params.tx_ant[1]),
        ] {
            buf.extend_from_slice(&(TX_FLAG_SEQ_CTL | TX_FLAG_BT_DIS).to_le_bytes());
            buf.extend_from_slice(&rate_word(band, params.no_cck, ant).to_le_bytes());
            buf.push(dev.bcast_sta_id);
            buf.extend_from_slice(&[0, 0, 0]);
        }

        ssids.write_table(&mut buf);

        for line in &params.schedule {
            buf.extend_from_slice(&params.interval_secs.to_le_bytes());
            buf.push(line.iterations);
            buf.push(line.full_scan_mul);
        }

        let ebs_flags = CHANNEL_FLAG_EBS | CHANNEL_FLAG_EBS_ACCURATE | CHANNEL_FLAG_CACHE_ADD;
        for ratio in [DENSE_EBS_SCAN_RATIO, SPARSE_EBS_SCAN_RATIO] {
            if params.use_ebs {
                buf.extend_from_slice(&ebs_flags.to_le_bytes());
                buf.extend_from_slice(&ratio.to_le_bytes());
            } else {
                buf.extend_from_slice(&[0u8; 4]);
            }
        }

        debug_assert_eq!(buf.len(), LMAC_FIXED_LEN);

        for channel in &params.channels {
            buf.extend_from_slice(&channel.number.to_le_bytes());
            buf.extend_from_slice(&1u16.to_le_bytes());
            buf.extend_from_slice(&0u32.to_le_bytes());
            buf.extend_from_slice(&(CHANNEL_CFG_PARTIAL | ssid_bitmap).to_le_bytes());
        }

        write_probe(&params.probe, &mut buf);

        Ok(HostCommand {
            id: CommandId::LmacScanRequest,
            payload: buf,
        })
    }

    fn encode_abort(&self, _uid: Option<u32>) -> ScanResult<HostCommand> {
        // The legacy abort addresses "the" running scan; it has no payload.
        Ok(HostCommand {
            id: CommandId::LmacScanAbort,
            payload: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssid::{MAX_DIRECT_SSIDS, SSID_SLOT_LEN};
    use scanoffload_core::types::{
        Channel, DwellPlan, ProbeTemplate, ScanRequestFlags, ScheduleLine, SessionType, Ssid,
    };

    fn params() -> ScanParams {
        ScanParams {
            session: SessionType::Regular,
            ssids: vec![Ssid::new(b"alpha".to_vec()).unwrap()],
            channels: vec![
                Channel::new(1, Band::Band2GHz),
                Channel::new(36, Band::Band5GHz),
            ],
            match_sets: Vec::new(),
            pass_all: true,
            no_cck: false,
            flags: ScanRequestFlags::empty(),
            dwell: DwellPlan {
                active_dwell: 10,
                passive_dwell: 110,
                fragmented_dwell: 0,
                max_out_time: 120,
                suspend_time: 30,
                passive_fragmented: false,
            },
            schedule: [
                ScheduleLine {
                    iterations: 1,
                    full_scan_mul: 0,
                },
                ScheduleLine::default(),
            ],
            interval_secs: 0,
            delay_secs: 0,
            use_ebs: false,
            iter_notify: false,
            tx_ant: [0, 1],
            probe: ProbeTemplate::default(),
        }
    }

    fn caps() -> FirmwareCaps {
        FirmwareCaps {
            max_scan_channels: 40,
            ..FirmwareCaps::default()
        }
    }

    fn encode(params: &ScanParams) -> Vec<u8> {
        LmacFormat
            .encode_scan_request(params, &caps(), &DeviceConfig::default(), None)
            .unwrap()
            .payload
    }

    fn read_u32(buf: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn fixed_header_layout() {
        let buf = encode(&params());
        assert_eq!(buf[0], 10, "active dwell");
        assert_eq!(buf[1], 110, "passive dwell");
        assert_eq!(read_u32(&buf, 4), 120, "max out time");
        assert_eq!(read_u32(&buf, 8), 30, "suspend time");
        assert_eq!(read_u32(&buf, 32), 1, "iteration number");
        assert_eq!(buf[40], 2, "channel count");
        assert_eq!(
            buf.len(),
            LMAC_FIXED_LEN + 2 * LMAC_CHANNEL_CFG_LEN + PROBE_REQ_WIRE_LEN
        );
    }

    #[test]
    fn ssid_bitmap_is_left_shifted_in_channel_flags() {
        let buf = encode(&params());
        // One explicit SSID lands in slot 0: internal bitmap 0b1, wire 0b10.
        let flags = read_u32(&buf, LMAC_FIXED_LEN + 8);
        assert_eq!(flags & 0xff, 0b10);
        assert_ne!(flags & CHANNEL_CFG_PARTIAL, 0);
    }

    #[test]
    fn passive_scan_when_no_ssids() {
        let mut p = params();
        p.ssids.clear();
        let buf = encode(&p);
        let flags = read_u32(&buf, 16);
        assert_ne!(flags & FLAG_PASSIVE, 0);
        assert_eq!(flags & FLAG_PRE_CONNECTION, 0);
    }

    #[test]
    fn single_ssid_sets_pre_connection_hint() {
        let buf = encode(&params());
        let flags = read_u32(&buf, 16);
        assert_ne!(flags & FLAG_PRE_CONNECTION, 0);
        assert_eq!(flags & FLAG_PASSIVE, 0);
    }

    #[test]
    fn match_flag_excludes_pass_all() {
        let mut p = params();
        p.pass_all = false;
        let flags = read_u32(&encode(&p), 16);
        assert_ne!(flags & FLAG_MATCH, 0);
        assert_eq!(flags & FLAG_PASS_ALL, 0);
    }

    #[test]
    fn ebs_channel_options_carry_distinct_ratios() {
        let mut p = params();
        p.use_ebs = true;
        let buf = encode(&p);
        let dense_ratio = u16::from_le_bytes(buf[758..760].try_into().unwrap());
        let sparse_ratio = u16::from_le_bytes(buf[762..764].try_into().unwrap());
        assert_eq!(dense_ratio, DENSE_EBS_SCAN_RATIO);
        assert_eq!(sparse_ratio, SPARSE_EBS_SCAN_RATIO);
        assert!(dense_ratio > sparse_ratio);
    }

    #[test]
    fn no_ebs_options_without_eligibility() {
        let buf = encode(&params());
        assert_eq!(&buf[756..764], &[0u8; 8]);
    }

    #[test]
    fn cck_rate_on_2ghz_unless_suppressed() {
        let buf = encode(&params());
        let rate_2g = read_u32(&buf, 44 + 4);
        assert_ne!(rate_2g & RATE_CCK_MSK, 0);

        let mut p = params();
        p.no_cck = true;
        let buf = encode(&p);
        let rate_2g = read_u32(&buf, 44 + 4);
        assert_eq!(rate_2g & RATE_CCK_MSK, 0);
        assert_eq!(rate_2g & 0xff, RATE_6M_PLCP);
    }

    #[test]
    fn direct_ssid_table_sits_between_tx_and_schedule() {
        let buf = encode(&params());
        assert_eq!(buf[68], 0, "element id of slot 0");
        assert_eq!(buf[69], 5, "length of slot 0");
        assert_eq!(&buf[70..75], b"alpha");
        assert_eq!(68 + MAX_DIRECT_SSIDS * SSID_SLOT_LEN, 748);
    }

    #[test]
    fn too_many_channels_fail_with_size_error() {
        let mut p = params();
        p.channels = (0..50)
            .map(|i| Channel::new(i + 1, Band::Band2GHz))
            .collect();
        let err = LmacFormat
            .encode_scan_request(&p, &caps(), &DeviceConfig::default(), None)
            .unwrap_err();
        assert!(matches!(err, ScanError::Size { needed: 50, limit: 40 }));
    }

    #[test]
    fn empty_channel_list_is_rejected() {
        let mut p = params();
        p.channels.clear();
        let err = LmacFormat
            .encode_scan_request(&p, &caps(), &DeviceConfig::default(), None)
            .unwrap_err();
        assert!(matches!(err, ScanError::InvalidRequest { .. }));
    }
}
