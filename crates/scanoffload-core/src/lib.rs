//! # scanoffload-core
//!
//! Core types, ports and errors for the scan-offload coordinator: a driver-side
//! subsystem that negotiates passive/active/scheduled channel scanning with
//! dedicated radio firmware and reconciles asynchronous firmware notifications
//! with a generic 802.11 management layer.
//!
//! This crate provides the foundational building blocks used by the rest of
//! the workspace:
//!
//! - **Domain Types**: [`ScanRequest`], [`ScanParams`], [`DwellPlan`],
//!   [`SessionType`], [`Channel`] and friends, for describing scan intent and
//!   the derived per-scan plan handed to the wire encoders.
//!
//! - **Capability Model**: [`FirmwareCaps`] and [`DeviceConfig`], the
//!   attach-time description of what the firmware generation can do and how
//!   the device is wired.
//!
//! - **Error Types**: the [`ScanError`] taxonomy via the [`error`] module.
//!
//! - **Ports**: [`CommandTransport`], [`UpperStack`] and [`DeviceState`] --
//!   hexagonal-architecture traits abstracting the firmware command channel,
//!   the 802.11 management layer above and the device power/regulatory state.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization on the request and
//!   capability types.

#![forbid(unsafe_code)]

pub mod caps;
pub mod error;
pub mod port;
pub mod types;

// Re-export commonly used types at the crate root
pub use caps::{DeviceConfig, FirmwareCaps, FwGeneration};
pub use error::{ScanError, ScanResult, TransportError};
pub use port::{CommandId, CommandTransport, DeviceState, HostCommand, UpperStack};
pub use types::{
    // Addressing
    Band, Channel, IfaceKind, MacAddr, Ssid, Vif,
    // Request types
    MatchSet, ScanIes, ScanRequest, ScanRequestFlags,
    // Plan types
    DwellPlan, IeSegment, LinkConditions, ProbeTemplate, ScanParams, ScheduleLine,
    SessionType, TrafficLoad,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum length in bytes of an 802.11 SSID.
pub const MAX_SSID_LEN: usize = 32;

/// Maximum number of scheduled-scan match profiles the firmware can track.
pub const MAX_MATCH_PROFILES: usize = 11;
