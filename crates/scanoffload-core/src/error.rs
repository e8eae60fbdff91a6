//! Error types for the scan-offload coordinator.
//!
//! This module provides the error taxonomy for the whole workspace using
//! [`thiserror`] for automatic `Display` and `Error` trait implementations.
//!
//! # Error Hierarchy
//!
//! - [`ScanError`]: Top-level error type returned by every coordinator and
//!   encoder operation.
//! - [`TransportError`]: Errors surfaced by the firmware command channel,
//!   wrapped into [`ScanError::Transport`].
//!
//! Admission and precondition failures ([`ScanError::Busy`],
//! [`ScanError::RegulatoryNotReady`]) are returned before any state is
//! mutated. Encoder failures ([`ScanError::Size`], [`ScanError::OutOfSlots`])
//! abort a start sequence before any command reaches the firmware.

use thiserror::Error;

use crate::types::SessionType;

/// A specialized `Result` type for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Top-level error type for the scan-offload coordinator.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ScanError {
    /// A scan was requested before the regulatory domain was established.
    #[error("regulatory domain is not established")]
    RegulatoryNotReady,

    /// A session of the same type is already running (or still stopping).
    #[error("a {0:?} scan is already in progress")]
    Busy(SessionType),

    /// The request does not fit the fixed command buffer or table capacity.
    #[error("scan request exceeds command capacity: need {needed}, limit {limit}")]
    Size {
        /// How much the request asked for (bytes or entries, per context).
        needed: usize,
        /// The capacity the command format provides.
        limit: usize,
    },

    /// No free scan-identifier slot is available.
    #[error("no free scan identifier slot (max {max} simultaneous scans)")]
    OutOfSlots {
        /// The firmware-reported maximum number of simultaneous scans.
        max: usize,
    },

    /// The request violates a structural requirement (e.g. an empty channel
    /// list) and was rejected before any state changed.
    #[error("invalid scan request: {message}")]
    InvalidRequest {
        /// Description of what made the request invalid.
        message: String,
    },

    /// Internal bookkeeping disagreed with itself. Notification-side
    /// violations are logged and dropped rather than surfaced; this variant
    /// only reaches callers from the synchronous start/stop paths.
    #[error("scan state invariant violated: {message}")]
    InvariantViolation {
        /// Description of the violated invariant.
        message: String,
    },

    /// The firmware did not deliver a scan-complete notification within the
    /// stop-wait window. State has already been cleaned up best-effort.
    #[error("timed out waiting for scan-complete notification")]
    StopTimeout,

    /// The firmware command channel failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Errors surfaced by the firmware command channel.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    /// The command was sent but the firmware answered with a failure status.
    #[error("command {id:#06x} rejected by firmware with status {status}")]
    Rejected {
        /// Opcode of the rejected command.
        id: u16,
        /// Status word the firmware returned.
        status: u32,
    },

    /// The command could not be delivered at all.
    #[error("command {id:#06x} failed: {message}")]
    SendFailed {
        /// Opcode of the failed command.
        id: u16,
        /// Transport-specific failure description.
        message: String,
    },

    /// The device is not in an operational state.
    #[error("device is not operational")]
    DeviceNotReady,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_error_names_both_sides() {
        let err = ScanError::Size {
            needed: 600,
            limit: 483,
        };
        let msg = err.to_string();
        assert!(msg.contains("600"), "message should name the need: {msg}");
        assert!(msg.contains("483"), "message should name the limit: {msg}");
    }

    #[test]
    fn transport_error_converts() {
        fn send() -> Result<(), TransportError> {
            Err(TransportError::DeviceNotReady)
        }
        fn start() -> ScanResult<()> {
            send()?;
            Ok(())
        }
        assert!(matches!(
            start(),
            Err(ScanError::Transport(TransportError::DeviceNotReady))
        ));
    }
}
