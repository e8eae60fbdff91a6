//! Admission control for new scan sessions.
//!
//! When the firmware still has free simultaneous-scan slots, everything is
//! admitted. At capacity the rules exist for backwards compatibility with
//! supplicants that never stop a scheduled scan before requesting a one-shot
//! scan: a same-type request is busy, a cross-type request preempts the
//! other type. Net-detect always admits -- the device is about to suspend
//! and the firmware restarts on resume, so there is nothing worth cleaning
//! up first.

use scanoffload_core::types::SessionType;

use crate::registry::ScanRegistry;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Start immediately.
    Admit,
    /// A session of this type is already active.
    Busy(SessionType),
    /// Stop this other type first, then start. For a regular request the
    /// stop result gates admission; for a scheduled request it is
    /// best-effort and its result is ignored.
    Preempt(SessionType),
}

/// Decides whether a session of `requested` type may start now.
#[must_use]
pub fn admit(registry: &ScanRegistry, max_scans: usize, requested: SessionType) -> Admission {
    if registry.active_sessions() < max_scans {
        return Admission::Admit;
    }

    match requested {
        SessionType::Regular => {
            if registry.is_active(SessionType::Regular) {
                Admission::Busy(SessionType::Regular)
            } else {
                Admission::Preempt(SessionType::Scheduled)
            }
        }
        SessionType::Scheduled => {
            if registry.is_active(SessionType::Scheduled) {
                Admission::Busy(SessionType::Scheduled)
            } else {
                Admission::Preempt(SessionType::Regular)
            }
        }
        // The firmware restarts around a net-detect anyway; any scheduled
        // scans that were running come back on resume.
        SessionType::NetDetect => Admission::Admit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(running: &[SessionType], max: usize) -> ScanRegistry {
        let mut registry = ScanRegistry::new(max);
        for session in running {
            registry.set_running(*session);
        }
        registry
    }

    #[test]
    fn below_capacity_everything_admits() {
        let registry = registry_with(&[SessionType::Regular], 2);
        assert_eq!(
            admit(&registry, 2, SessionType::Scheduled),
            Admission::Admit
        );
    }

    #[test]
    fn same_type_at_capacity_is_busy() {
        let registry = registry_with(&[SessionType::Regular], 1);
        assert_eq!(
            admit(&registry, 1, SessionType::Regular),
            Admission::Busy(SessionType::Regular)
        );

        let registry = registry_with(&[SessionType::Scheduled], 1);
        assert_eq!(
            admit(&registry, 1, SessionType::Scheduled),
            Admission::Busy(SessionType::Scheduled)
        );
    }

    #[test]
    fn stopping_counts_as_active_for_busy() {
        let mut registry = ScanRegistry::new(1);
        registry.set_stopping(SessionType::Regular);
        assert_eq!(
            admit(&registry, 1, SessionType::Regular),
            Admission::Busy(SessionType::Regular)
        );
    }

    #[test]
    fn regular_preempts_scheduled_at_capacity() {
        let registry = registry_with(&[SessionType::Scheduled], 1);
        assert_eq!(
            admit(&registry, 1, SessionType::Regular),
            Admission::Preempt(SessionType::Scheduled)
        );
    }

    #[test]
    fn scheduled_preempts_regular_at_capacity() {
        let registry = registry_with(&[SessionType::Regular], 1);
        assert_eq!(
            admit(&registry, 1, SessionType::Scheduled),
            Admission::Preempt(SessionType::Regular)
        );
    }

    #[test]
    fn net_detect_always_admits() {
        let registry = registry_with(&[SessionType::Regular, SessionType::Scheduled], 2);
        assert_eq!(
            admit(&registry, 2, SessionType::NetDetect),
            Admission::Admit
        );
    }
}
