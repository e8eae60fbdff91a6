//! The slot registry: every piece of process-wide scan state.
//!
//! The registry is the aggregate root of the session core. It owns the
//! per-type status bits, the UID table the current firmware generation
//! addresses sessions by, the global last-EBS-outcome flag and the rotating
//! transmit-antenna index. It is created at device attach, cleared at
//! detach/reset, and only ever touched under the coordinator's lock.

use scanoffload_core::error::{ScanError, ScanResult};
use scanoffload_core::types::SessionType;

bitflags::bitflags! {
    /// Per-type running/stopping bits. A type's stopping bit is only set
    /// while its running bit transitions off during a stop handshake.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SessionStatus: u32 {
        const REGULAR = 1 << 0;
        const SCHED = 1 << 1;
        const NETDETECT = 1 << 2;
        const STOPPING_REGULAR = 1 << 8;
        const STOPPING_SCHED = 1 << 9;
        const STOPPING_NETDETECT = 1 << 10;
    }
}

fn running_bit(session: SessionType) -> SessionStatus {
    match session {
        SessionType::Regular => SessionStatus::REGULAR,
        SessionType::Scheduled => SessionStatus::SCHED,
        SessionType::NetDetect => SessionStatus::NETDETECT,
    }
}

fn stopping_bit(session: SessionType) -> SessionStatus {
    match session {
        SessionType::Regular => SessionStatus::STOPPING_REGULAR,
        SessionType::Scheduled => SessionStatus::STOPPING_SCHED,
        SessionType::NetDetect => SessionStatus::STOPPING_NETDETECT,
    }
}

const ALL_TYPES: [SessionType; 3] = [
    SessionType::Regular,
    SessionType::Scheduled,
    SessionType::NetDetect,
];

/// State of one UID slot in the firmware scan table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UidSlot {
    /// No session owns this UID.
    #[default]
    Free,
    /// A session of this type runs under this UID.
    Active(SessionType),
    /// A stop was acknowledged; the UID is waiting for its final
    /// notification.
    Stopping(SessionType),
}

/// Process-wide scan bookkeeping. One instance per attached device.
#[derive(Debug)]
pub struct ScanRegistry {
    status: SessionStatus,
    uid_slots: Vec<UidSlot>,
    last_ebs_usable: bool,
    last_antenna_idx: u8,
}

impl ScanRegistry {
    /// Creates an empty registry sized for the firmware's simultaneous-scan
    /// limit. EBS starts out usable; the first failed outcome disables it.
    #[must_use]
    pub fn new(max_scans: usize) -> Self {
        Self {
            status: SessionStatus::empty(),
            uid_slots: vec![UidSlot::Free; max_scans],
            last_ebs_usable: true,
            last_antenna_idx: 0,
        }
    }

    /// Whether a session of this type is running.
    #[must_use]
    pub fn is_running(&self, session: SessionType) -> bool {
        self.status.contains(running_bit(session))
    }

    /// Whether a session of this type is in its stop handshake.
    #[must_use]
    pub fn is_stopping(&self, session: SessionType) -> bool {
        self.status.contains(stopping_bit(session))
    }

    /// Whether this type occupies a firmware slot (running or stopping).
    #[must_use]
    pub fn is_active(&self, session: SessionType) -> bool {
        self.is_running(session) || self.is_stopping(session)
    }

    /// Number of types currently occupying a firmware slot.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        ALL_TYPES.iter().filter(|t| self.is_active(**t)).count()
    }

    pub fn set_running(&mut self, session: SessionType) {
        self.status.insert(running_bit(session));
    }

    pub fn clear_running(&mut self, session: SessionType) {
        self.status.remove(running_bit(session));
    }

    pub fn set_stopping(&mut self, session: SessionType) {
        self.status.insert(stopping_bit(session));
    }

    pub fn clear_stopping(&mut self, session: SessionType) {
        self.status.remove(stopping_bit(session));
    }

    /// Claims the first free UID slot for a session.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::OutOfSlots`] when every slot is taken.
    pub fn alloc_uid(&mut self, session: SessionType) -> ScanResult<u32> {
        let slot = self
            .uid_slots
            .iter()
            .position(|slot| *slot == UidSlot::Free)
            .ok_or(ScanError::OutOfSlots {
                max: self.uid_slots.len(),
            })?;
        self.uid_slots[slot] = UidSlot::Active(session);
        Ok(slot as u32)
    }

    /// The UID a running session of this type holds, if any.
    #[must_use]
    pub fn uid_of(&self, session: SessionType) -> Option<u32> {
        self.uid_slots
            .iter()
            .position(|slot| *slot == UidSlot::Active(session))
            .map(|slot| slot as u32)
    }

    /// The recorded state of a UID slot; `None` when the UID is out of range.
    #[must_use]
    pub fn slot(&self, uid: u32) -> Option<UidSlot> {
        self.uid_slots.get(uid as usize).copied()
    }

    /// Marks a UID as waiting for its post-abort notification.
    pub fn mark_uid_stopping(&mut self, uid: u32) {
        if let Some(slot) = self.uid_slots.get_mut(uid as usize) {
            if let UidSlot::Active(session) = *slot {
                *slot = UidSlot::Stopping(session);
            }
        }
    }

    /// Releases a UID slot.
    pub fn free_uid(&mut self, uid: u32) {
        if let Some(slot) = self.uid_slots.get_mut(uid as usize) {
            *slot = UidSlot::Free;
        }
    }

    /// UIDs whose slots are not free, for the reset sweep.
    #[must_use]
    pub fn occupied_uids(&self) -> Vec<(u32, UidSlot)> {
        self.uid_slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| **slot != UidSlot::Free)
            .map(|(uid, slot)| (uid as u32, *slot))
            .collect()
    }

    /// Whether the last energy-based scan outcome allows EBS to be used.
    #[must_use]
    pub fn last_ebs_usable(&self) -> bool {
        self.last_ebs_usable
    }

    /// Records the energy-based outcome of a completed scan.
    pub fn set_last_ebs_usable(&mut self, usable: bool) {
        self.last_ebs_usable = usable;
    }

    /// Rotates to the next valid transmit antenna. Probe transmission cycles
    /// antennas across scans to even out the radio usage.
    pub fn next_scan_antenna(&mut self, valid_mask: u8) -> u8 {
        if valid_mask == 0 {
            return 0;
        }
        let mut idx = self.last_antenna_idx;
        for _ in 0..8 {
            idx = (idx + 1) % 8;
            if valid_mask & (1 << idx) != 0 {
                self.last_antenna_idx = idx;
                return idx;
            }
        }
        self.last_antenna_idx
    }

    /// Returns the registry to its attach-time state. Used on device detach
    /// and firmware reset; a fresh firmware gets a fresh EBS history.
    pub fn reset(&mut self) {
        self.status = SessionStatus::empty();
        for slot in &mut self.uid_slots {
            *slot = UidSlot::Free;
        }
        self.last_ebs_usable = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_and_stopping_bits_are_independent_per_type() {
        let mut registry = ScanRegistry::new(2);
        registry.set_running(SessionType::Regular);
        registry.set_stopping(SessionType::Scheduled);

        assert!(registry.is_running(SessionType::Regular));
        assert!(!registry.is_stopping(SessionType::Regular));
        assert!(registry.is_stopping(SessionType::Scheduled));
        assert!(registry.is_active(SessionType::Scheduled));
        assert!(!registry.is_active(SessionType::NetDetect));
        assert_eq!(registry.active_sessions(), 2);
    }

    #[test]
    fn uid_allocation_is_first_free() {
        let mut registry = ScanRegistry::new(2);
        assert_eq!(registry.alloc_uid(SessionType::Regular).unwrap(), 0);
        assert_eq!(registry.alloc_uid(SessionType::Scheduled).unwrap(), 1);
        assert!(matches!(
            registry.alloc_uid(SessionType::NetDetect),
            Err(ScanError::OutOfSlots { max: 2 })
        ));

        registry.free_uid(0);
        assert_eq!(registry.alloc_uid(SessionType::NetDetect).unwrap(), 0);
    }

    #[test]
    fn uid_lookup_follows_slot_state() {
        let mut registry = ScanRegistry::new(2);
        let uid = registry.alloc_uid(SessionType::Scheduled).unwrap();
        assert_eq!(registry.uid_of(SessionType::Scheduled), Some(uid));

        registry.mark_uid_stopping(uid);
        assert_eq!(registry.uid_of(SessionType::Scheduled), None);
        assert_eq!(
            registry.slot(uid),
            Some(UidSlot::Stopping(SessionType::Scheduled))
        );
        assert_eq!(registry.slot(99), None);
    }

    #[test]
    fn antenna_rotation_cycles_valid_bits() {
        let mut registry = ScanRegistry::new(1);
        // Antennas 0 and 1 valid.
        assert_eq!(registry.next_scan_antenna(0b11), 1);
        assert_eq!(registry.next_scan_antenna(0b11), 0);
        assert_eq!(registry.next_scan_antenna(0b11), 1);
        // Single antenna keeps returning itself.
        assert_eq!(registry.next_scan_antenna(0b100), 2);
        assert_eq!(registry.next_scan_antenna(0b100), 2);
    }

    #[test]
    fn reset_clears_status_and_slots() {
        let mut registry = ScanRegistry::new(2);
        registry.set_running(SessionType::Regular);
        let uid = registry.alloc_uid(SessionType::Regular).unwrap();
        registry.set_last_ebs_usable(false);

        registry.reset();
        assert_eq!(registry.active_sessions(), 0);
        assert_eq!(registry.slot(uid), Some(UidSlot::Free));
        assert!(registry.last_ebs_usable());
    }
}
