//! Wire codecs for the firmware scan command channel.
//!
//! This crate builds the byte payloads the scan coordinator sends to the
//! radio firmware and parses the notifications it receives back:
//!
//! - **Legacy generation** ([`LmacFormat`]): one fixed-size request struct
//!   with an inline per-channel configuration array and a trailing
//!   probe-request template.
//! - **Current generation** ([`UmacFormat`]): a variable-length request with
//!   a trailing "tail" section carrying the per-session schedule, probe
//!   template and SSID table, addressed by a firmware-assigned scan UID.
//!
//! The two formats are mutually exclusive; [`select_format`] picks one from
//! the firmware capabilities exactly once at device attach. They share only
//! the SSID-table construction ([`ssid`]) and the probe-request template
//! ([`probe`]).
//!
//! # Design Principles
//!
//! 1. **No hidden state**: encoders are pure functions of the scan plan,
//!    capabilities and device wiring
//! 2. **Explicit failure**: anything that does not fit the fixed command
//!    room is a typed error before a single byte reaches the transport
//! 3. **Deterministic**: same plan in, same bytes out

#![forbid(unsafe_code)]

pub mod config;
pub mod format;
pub mod lmac;
pub mod notif;
pub mod probe;
pub mod ssid;
pub mod umac;

pub use format::{select_format, ScanCommandFormat};
pub use lmac::LmacFormat;
pub use notif::{
    CompleteStatus, EbsStatus, LmacScanComplete, NotifError, ScanIterComplete, UmacScanComplete,
};
pub use probe::{build_probe_template, max_ie_room, PROBE_REQ_BUF_LEN};
pub use ssid::{build_direct_ssids, DirectSsids, MAX_DIRECT_SSIDS};
pub use umac::UmacFormat;

/// Per-channel option flag: energy-based scanning enabled.
pub const CHANNEL_FLAG_EBS: u16 = 1 << 0;
/// Per-channel option flag: use the accurate (slower) EBS energy estimate.
pub const CHANNEL_FLAG_EBS_ACCURATE: u16 = 1 << 1;
/// Per-channel option flag: feed results into the firmware channel cache.
pub const CHANNEL_FLAG_CACHE_ADD: u16 = 1 << 2;
/// Per-channel option flag: promote passive channels to active after a
/// beacon is heard (attach-time configuration only).
pub const CHANNEL_FLAG_PASSIVE2ACTIVE: u16 = 1 << 3;

/// Every how many EBS iterations the dense schedule line substitutes a full
/// scan iteration.
pub const DENSE_EBS_SCAN_RATIO: u16 = 5;
/// Full-scan substitution ratio for the sparse (long-interval) line.
pub const SPARSE_EBS_SCAN_RATIO: u16 = 1;
