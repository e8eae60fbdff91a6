//! Firmware scan notification parsers.
//!
//! Three notifications reach the driver asynchronously:
//!
//! - **Session complete** (one layout per generation): a scan ended, either
//!   because it finished or because the firmware aborted it. Carries the
//!   energy-based-scan outcome used to gate future EBS eligibility.
//! - **Iteration complete**: one scheduled-scan iteration finished; purely
//!   informational (scanned channel list).
//!
//! Layouts, little-endian:
//!
//! ```text
//! legacy session complete          current-gen session complete
//! ------  ----  -----              ------  ----  -----
//! 0       1     last schedule line 0       4     uid
//! 1       1     last iteration     4       1     last schedule line
//! 2       1     status             5       1     last iteration
//! 3       1     ebs_status         6       1     status
//! 4       4     time after last    7       1     ebs_status
//!               iteration (ms)
//!
//! iteration complete
//! ------  ----  -----
//! 0       1     status
//! 1       1     number of scanned channels
//! 2       2     reserved
//! 4       2*n   scanned channel numbers
//! ```
//!
//! Parsers either parse real bytes or return a specific [`NotifError`];
//! nothing is guessed. The only lenient field is `ebs_status`, where unknown
//! codes collapse to `Failed` -- the consumer treats anything that is not
//! success/inactive as a reason to disable EBS.

use std::fmt::Write as _;
use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use thiserror::Error;

/// Errors from notification parsing.
#[derive(Debug, Error)]
pub enum NotifError {
    /// The notification payload is shorter than its fixed layout.
    #[error("truncated notification: need {needed} bytes, got {got}")]
    Truncated {
        /// Bytes the layout requires.
        needed: usize,
        /// Bytes actually received.
        got: usize,
    },

    /// The status byte is neither "completed" nor "aborted".
    #[error("unknown scan completion status {value:#04x}")]
    UnknownStatus {
        /// The offending status byte.
        value: u8,
    },
}

/// Terminal status of a scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteStatus {
    /// Every requested channel was visited.
    Completed,
    /// The firmware ended the scan early.
    Aborted,
}

impl CompleteStatus {
    const WIRE_COMPLETED: u8 = 1;
    const WIRE_ABORTED: u8 = 2;

    fn from_raw(value: u8) -> Result<Self, NotifError> {
        match value {
            Self::WIRE_COMPLETED => Ok(CompleteStatus::Completed),
            Self::WIRE_ABORTED => Ok(CompleteStatus::Aborted),
            value => Err(NotifError::UnknownStatus { value }),
        }
    }
}

/// Outcome of energy-based scanning for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EbsStatus {
    /// EBS ran and produced results.
    Success,
    /// EBS ran and failed.
    Failed,
    /// EBS could not locate a requested channel.
    ChanNotFound,
    /// EBS was not active for this scan.
    Inactive,
}

impl EbsStatus {
    fn from_raw(value: u8) -> Self {
        match value {
            0 => EbsStatus::Success,
            2 => EbsStatus::ChanNotFound,
            3 => EbsStatus::Inactive,
            _ => EbsStatus::Failed,
        }
    }

    /// Whether this outcome keeps EBS eligible for the next scan.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        matches!(self, EbsStatus::Success | EbsStatus::Inactive)
    }

    /// Human-readable label for the debug log.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            EbsStatus::Success => "successful",
            EbsStatus::Inactive => "inactive",
            EbsStatus::Failed | EbsStatus::ChanNotFound => "failed",
        }
    }
}

/// Legacy-generation session-complete notification.
#[derive(Debug, Clone, Copy)]
pub struct LmacScanComplete {
    /// Index of the schedule line the scan ended on.
    pub last_schedule_line: u8,
    /// Iteration count within that line.
    pub last_iteration: u8,
    /// Terminal status.
    pub status: CompleteStatus,
    /// Energy-based-scan outcome.
    pub ebs_status: EbsStatus,
    /// Milliseconds since the last iteration finished.
    pub time_after_last_iter: u32,
}

impl LmacScanComplete {
    /// Parses the 8-byte legacy layout.
    ///
    /// # Errors
    ///
    /// [`NotifError::Truncated`] on short input, [`NotifError::UnknownStatus`]
    /// on an unrecognized status byte.
    pub fn parse(data: &[u8]) -> Result<Self, NotifError> {
        if data.len() < 8 {
            return Err(NotifError::Truncated {
                needed: 8,
                got: data.len(),
            });
        }
        Ok(Self {
            last_schedule_line: data[0],
            last_iteration: data[1],
            status: CompleteStatus::from_raw(data[2])?,
            ebs_status: EbsStatus::from_raw(data[3]),
            time_after_last_iter: u32::from_le_bytes(data[4..8].try_into().unwrap()),
        })
    }

    /// Whether the firmware ended the scan early.
    #[must_use]
    pub fn aborted(&self) -> bool {
        self.status == CompleteStatus::Aborted
    }
}

/// Current-generation session-complete notification.
#[derive(Debug, Clone, Copy)]
pub struct UmacScanComplete {
    /// UID of the session that ended.
    pub uid: u32,
    /// Index of the schedule line the scan ended on.
    pub last_schedule_line: u8,
    /// Iteration count within that line.
    pub last_iteration: u8,
    /// Terminal status.
    pub status: CompleteStatus,
    /// Energy-based-scan outcome.
    pub ebs_status: EbsStatus,
}

impl UmacScanComplete {
    /// Parses the 8-byte current-generation layout.
    ///
    /// # Errors
    ///
    /// [`NotifError::Truncated`] on short input, [`NotifError::UnknownStatus`]
    /// on an unrecognized status byte.
    pub fn parse(data: &[u8]) -> Result<Self, NotifError> {
        if data.len() < 8 {
            return Err(NotifError::Truncated {
                needed: 8,
                got: data.len(),
            });
        }
        let mut cursor = Cursor::new(data);
        let uid = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| NotifError::Truncated {
                needed: 4,
                got: data.len(),
            })?;
        Ok(Self {
            uid,
            last_schedule_line: data[4],
            last_iteration: data[5],
            status: CompleteStatus::from_raw(data[6])?,
            ebs_status: EbsStatus::from_raw(data[7]),
        })
    }

    /// Whether the firmware ended the scan early.
    #[must_use]
    pub fn aborted(&self) -> bool {
        self.status == CompleteStatus::Aborted
    }
}

/// Iteration-complete notification (both generations).
#[derive(Debug, Clone)]
pub struct ScanIterComplete {
    /// Raw firmware status word, passed through to the log.
    pub status: u8,
    /// Channels visited during the iteration.
    pub scanned_channels: Vec<u16>,
}

impl ScanIterComplete {
    /// Parses the variable-length iteration layout.
    ///
    /// # Errors
    ///
    /// [`NotifError::Truncated`] when the channel array is shorter than the
    /// declared count.
    pub fn parse(data: &[u8]) -> Result<Self, NotifError> {
        if data.len() < 4 {
            return Err(NotifError::Truncated {
                needed: 4,
                got: data.len(),
            });
        }
        let status = data[0];
        let count = data[1] as usize;
        let needed = 4 + count * 2;
        if data.len() < needed {
            return Err(NotifError::Truncated {
                needed,
                got: data.len(),
            });
        }
        let mut cursor = Cursor::new(&data[4..needed]);
        let mut scanned_channels = Vec::with_capacity(count);
        for _ in 0..count {
            let channel = cursor
                .read_u16::<LittleEndian>()
                .map_err(|_| NotifError::Truncated {
                    needed,
                    got: data.len(),
                })?;
            scanned_channels.push(channel);
        }
        Ok(Self {
            status,
            scanned_channels,
        })
    }
}

/// Renders a scanned-channel list for the debug log.
#[must_use]
pub fn format_channel_list(channels: &[u16]) -> String {
    let mut out = String::new();
    for channel in channels {
        let _ = write!(out, " {channel}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lmac_bytes(status: u8, ebs: u8) -> Vec<u8> {
        let mut buf = vec![0, 2, status, ebs];
        buf.extend_from_slice(&1500u32.to_le_bytes());
        buf
    }

    #[test]
    fn lmac_complete_parses() {
        let notif = LmacScanComplete::parse(&lmac_bytes(1, 0)).unwrap();
        assert!(!notif.aborted());
        assert_eq!(notif.ebs_status, EbsStatus::Success);
        assert_eq!(notif.time_after_last_iter, 1500);
        assert_eq!(notif.last_iteration, 2);
    }

    #[test]
    fn lmac_aborted_status() {
        let notif = LmacScanComplete::parse(&lmac_bytes(2, 3)).unwrap();
        assert!(notif.aborted());
        assert_eq!(notif.ebs_status, EbsStatus::Inactive);
    }

    #[test]
    fn truncated_lmac_complete_is_an_error() {
        assert!(matches!(
            LmacScanComplete::parse(&[0, 0, 1]),
            Err(NotifError::Truncated { needed: 8, got: 3 })
        ));
    }

    #[test]
    fn unknown_status_is_an_error() {
        assert!(matches!(
            LmacScanComplete::parse(&lmac_bytes(9, 0)),
            Err(NotifError::UnknownStatus { value: 9 })
        ));
    }

    #[test]
    fn umac_complete_parses_uid() {
        let mut buf = 5u32.to_le_bytes().to_vec();
        buf.extend_from_slice(&[1, 4, 2, 1]);
        let notif = UmacScanComplete::parse(&buf).unwrap();
        assert_eq!(notif.uid, 5);
        assert!(notif.aborted());
        assert_eq!(notif.ebs_status, EbsStatus::Failed);
    }

    #[test]
    fn unknown_ebs_code_collapses_to_failed() {
        let notif = LmacScanComplete::parse(&lmac_bytes(1, 0x7f)).unwrap();
        assert_eq!(notif.ebs_status, EbsStatus::Failed);
        assert!(!notif.ebs_status.is_usable());
        assert_eq!(notif.ebs_status.label(), "failed");
    }

    #[test]
    fn iteration_complete_parses_channel_list() {
        let mut buf = vec![0, 3, 0, 0];
        for channel in [1u16, 6, 11] {
            buf.extend_from_slice(&channel.to_le_bytes());
        }
        let notif = ScanIterComplete::parse(&buf).unwrap();
        assert_eq!(notif.scanned_channels, vec![1, 6, 11]);
        assert_eq!(format_channel_list(&notif.scanned_channels), " 1 6 11");
    }

    #[test]
    fn iteration_complete_validates_declared_count() {
        let buf = vec![0, 4, 0, 0, 1, 0];
        assert!(matches!(
            ScanIterComplete::parse(&buf),
            Err(NotifError::Truncated { needed: 12, got: 6 })
        ));
    }
}
