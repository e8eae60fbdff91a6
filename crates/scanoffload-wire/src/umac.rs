//! Current-generation scan request encoder.
//!
//! The current generation addresses every scan by a firmware-assigned UID
//! and moves the per-session payload into a trailing "tail" section so the
//! fixed header stays small. Layout, little-endian:
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     uid
//! 4       4     out-of-channel priority
//! 8       1     active_dwell (ms)
//! 9       1     passive_dwell (ms)
//! 10      1     fragmented_dwell (ms, zero when unfragmented)
//! 11      1     reserved
//! 12      4     max_out_time (ms)
//! 16      4     suspend_time (ms)
//! 20      4     scan_priority
//! 24      4     command flags (bit 0: preemptible by regular scans)
//! 28      4     general_flags
//! 32      1     channel_flags (EBS options)
//! 33      1     n_channels
//! 34      2     reserved
//! 36      8*n   per-channel config (flags u32, channel u8, iter_count u8,
//!               iter_interval u16)
//!
//! tail:
//! +0      8     schedule lines (2 x: interval u16, iter_count u8, reserved)
//! +8      2     delay before the first iteration (s)
//! +10     2     reserved
//! +12     528   probe-request template
//! +540    680   direct-SSID table
//! ```
//!
//! Unlike the legacy format, the per-channel SSID bitmap uses bits 0..19
//! directly, and the schedule collapses into a single line of up to 255
//! iterations.

use scanoffload_core::caps::{DeviceConfig, FirmwareCaps, FwGeneration};
use scanoffload_core::error::{ScanError, ScanResult};
use scanoffload_core::port::{CommandId, HostCommand};
use scanoffload_core::types::{ScanParams, SessionType};

use crate::format::{scan_priority, ScanCommandFormat, PRIORITY_EXT_2, PRIORITY_EXT_6};
use crate::probe::{write_probe, PROBE_REQ_WIRE_LEN};
use crate::ssid::build_direct_ssids;
use crate::{CHANNEL_FLAG_CACHE_ADD, CHANNEL_FLAG_EBS, CHANNEL_FLAG_EBS_ACCURATE};

/// Size of the fixed header, before the channel array.
pub const UMAC_FIXED_LEN: usize = 36;

/// Per-channel config entry size.
pub const UMAC_CHANNEL_CFG_LEN: usize = 8;

/// Size of the trailing tail section.
pub const UMAC_TAIL_LEN: usize = 12 + PROBE_REQ_WIRE_LEN + 680;

// general_flags bits
const GEN_FLAG_PASSIVE: u32 = 1 << 0;
const GEN_FLAG_PRE_CONNECT: u32 = 1 << 1;
const GEN_FLAG_ITER_COMPLETE: u32 = 1 << 2;
const GEN_FLAG_FRAGMENTED: u32 = 1 << 3;
const GEN_FLAG_RRM_ENABLED: u32 = 1 << 4;
const GEN_FLAG_PASS_ALL: u32 = 1 << 5;
const GEN_FLAG_MATCH: u32 = 1 << 6;
const GEN_FLAG_PERIODIC: u32 = 1 << 7;

// command flags
const FLAG_PREEMPTIVE: u32 = 1 << 0;

fn general_flags(params: &ScanParams, caps: &FirmwareCaps) -> u32 {
    let mut flags = 0;

    if params.ssids.is_empty() {
        flags |= GEN_FLAG_PASSIVE;
    }
    if params.ssids.len() == 1 && !params.ssids[0].is_empty() {
        flags |= GEN_FLAG_PRE_CONNECT;
    }
    if params.dwell.passive_fragmented {
        flags |= GEN_FLAG_FRAGMENTED;
    }
    if caps.ds_param_set_ie {
        flags |= GEN_FLAG_RRM_ENABLED;
    }
    if params.pass_all {
        flags |= GEN_FLAG_PASS_ALL;
    } else {
        flags |= GEN_FLAG_MATCH;
    }
    if params.total_iterations() > 1 {
        flags |= GEN_FLAG_PERIODIC;
    }
    if params.iter_notify {
        flags |= GEN_FLAG_ITER_COMPLETE;
    }

    flags
}

/// The current-generation command format.
#[derive(Debug, Clone, Copy, Default)]
pub struct UmacFormat;

impl ScanCommandFormat for UmacFormat {
    fn generation(&self) -> FwGeneration {
        FwGeneration::Umac
    }

    fn max_command_len(&self, caps: &FirmwareCaps) -> usize {
        UMAC_FIXED_LEN + UMAC_CHANNEL_CFG_LEN * caps.max_scan_channels + UMAC_TAIL_LEN
    }

    fn encode_scan_request(
        &self,
        params: &ScanParams,
        caps: &FirmwareCaps,
        _dev: &DeviceConfig,
        uid: Option<u32>,
    ) -> ScanResult<HostCommand> {
        let uid = uid.ok_or_else(|| ScanError::InvariantViolation {
            message: "current-generation scan encoded without a UID".into(),
        })?;
        if params.channels.is_empty() {
            return Err(ScanError::InvalidRequest {
                message: "scan request carries no channels".into(),
            });
        }
        if params.channels.len() > caps.max_scan_channels {
            return Err(ScanError::Size {
                needed: params.channels.len(),
                limit: caps.max_scan_channels,
            });
        }

        let ssids = build_direct_ssids(&params.match_sets, &params.ssids);
        let total_iterations = params.total_iterations();

        let ooc_priority = if total_iterations == 1 {
            PRIORITY_EXT_6
        } else {
            PRIORITY_EXT_2
        };

        let mut buf = Vec::with_capacity(self.max_command_len(caps));

        buf.extend_from_slice(&uid.to_le_bytes());
        buf.extend_from_slice(&scan_priority(caps, ooc_priority).to_le_bytes());
        buf.push(params.dwell.active_dwell);
        buf.push(params.dwell.passive_dwell);
        buf.push(params.dwell.fragmented_dwell);
        buf.push(0);
        buf.extend_from_slice(&params.dwell.max_out_time.to_le_bytes());
        buf.extend_from_slice(&params.dwell.suspend_time.to_le_bytes());
        buf.extend_from_slice(&scan_priority(caps, PRIORITY_EXT_6).to_le_bytes());

        let cmd_flags = if params.session == SessionType::Scheduled {
            FLAG_PREEMPTIVE
        } else {
            0
        };
        buf.extend_from_slice(&cmd_flags.to_le_bytes());
        buf.extend_from_slice(&general_flags(params, caps).to_le_bytes());

        let channel_flags = if params.use_ebs {
            (CHANNEL_FLAG_EBS | CHANNEL_FLAG_EBS_ACCURATE | CHANNEL_FLAG_CACHE_ADD) as u8
        } else {
            0
        };
        buf.push(channel_flags);
        buf.push(params.channels.len() as u8);
        buf.extend_from_slice(&[0, 0]);

        debug_assert_eq!(buf.len(), UMAC_FIXED_LEN);

        for channel in &params.channels {
            buf.extend_from_slice(&ssids.bitmap.to_le_bytes());
            buf.push(channel.number as u8);
            buf.push(1);
            buf.extend_from_slice(&0u16.to_le_bytes());
        }

        // Tail: one collapsed schedule line, capped at 255 iterations.
        let iter_count = total_iterations.min(255) as u8;
        buf.extend_from_slice(&params.interval_secs.to_le_bytes());
        buf.push(iter_count);
        buf.push(0);
        buf.extend_from_slice(&[0u8; 4]);

        buf.extend_from_slice(&params.delay_secs.to_le_bytes());
        buf.extend_from_slice(&[0, 0]);

        write_probe(&params.probe, &mut buf);
        ssids.write_table(&mut buf);

        Ok(HostCommand {
            id: CommandId::UmacScanRequest,
            payload: buf,
        })
    }

    fn encode_abort(&self, uid: Option<u32>) -> ScanResult<HostCommand> {
        let uid = uid.ok_or_else(|| ScanError::InvariantViolation {
            message: "current-generation abort encoded without a UID".into(),
        })?;
        let mut payload = Vec::with_capacity(8);
        payload.extend_from_slice(&uid.to_le_bytes());
        payload.extend_from_slice(&[0u8; 4]);
        Ok(HostCommand {
            id: CommandId::UmacScanAbort,
            payload,
        })
    }
}
