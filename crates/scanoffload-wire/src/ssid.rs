//! Direct-SSID table construction, shared by both command generations.
//!
//! The firmware probes for the SSIDs in this table and reports, per channel,
//! which table slots produced a response. Slots are filled in **inverted**
//! order -- match-profile SSIDs from the last profile down, then explicit
//! scan SSIDs from the last down -- because the firmware inverts the table
//! back internally.
//!
//! Explicit scan SSIDs are deduplicated against already-placed entries: an
//! exact length+byte match marks the existing slot in the channel bitmap
//! instead of occupying a new one. Match-profile entries never set bitmap
//! bits themselves; the profile command references them by index.
//!
//! Filling stops silently once the table is full.

use scanoffload_core::types::{MatchSet, Ssid};

/// Number of slots in the firmware direct-SSID table.
pub const MAX_DIRECT_SSIDS: usize = 20;

/// Serialized size of one table slot: element id, length, 32 SSID octets.
pub const SSID_SLOT_LEN: usize = 34;

/// The SSID information element id.
const EID_SSID: u8 = 0;

/// An ordered direct-SSID table plus the bitmap of slots that belong to the
/// explicit scan-SSID list.
#[derive(Debug, Clone, Default)]
pub struct DirectSsids {
    /// Occupied slots, first slot first. Never longer than
    /// [`MAX_DIRECT_SSIDS`].
    pub entries: Vec<Ssid>,
    /// One bit per slot holding an explicit scan SSID. The legacy format
    /// shifts this left by one on the wire (the firmware reserves bit 0).
    pub bitmap: u32,
}

impl DirectSsids {
    /// Serializes the full fixed-size table (empty slots zeroed) into `out`.
    pub fn write_table(&self, out: &mut Vec<u8>) {
        for slot in 0..MAX_DIRECT_SSIDS {
            match self.entries.get(slot) {
                Some(ssid) => {
                    out.push(EID_SSID);
                    out.push(ssid.len() as u8);
                    out.extend_from_slice(ssid.as_bytes());
                    out.extend(std::iter::repeat(0u8).take(32 - ssid.len()));
                }
                None => out.extend_from_slice(&[0u8; SSID_SLOT_LEN]),
            }
        }
    }
}

fn slot_of(entries: &[Ssid], ssid: &Ssid) -> Option<usize> {
    entries.iter().position(|e| {
        e.len() == ssid.len() && e.as_bytes() == ssid.as_bytes()
    })
}

/// Builds the direct-SSID table from the match-profile list and the explicit
/// scan-SSID list, both consumed in reverse order.
#[must_use]
pub fn build_direct_ssids(match_sets: &[MatchSet], ssids: &[Ssid]) -> DirectSsids {
    let mut table = DirectSsids::default();

    // Match-profile SSIDs first; the profile configuration command relies on
    // this placement order. Empty profiles are skipped.
    for set in match_sets.iter().rev() {
        if table.entries.len() == MAX_DIRECT_SSIDS {
            return table;
        }
        if set.ssid.is_empty() {
            continue;
        }
        table.entries.push(set.ssid.clone());
    }

    for ssid in ssids.iter().rev() {
        match slot_of(&table.entries, ssid) {
            Some(slot) => table.bitmap |= 1 << slot,
            None => {
                if table.entries.len() == MAX_DIRECT_SSIDS {
                    return table;
                }
                table.bitmap |= 1 << table.entries.len();
                table.entries.push(ssid.clone());
            }
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ssid(s: &str) -> Ssid {
        Ssid::new(s.as_bytes().to_vec()).unwrap()
    }

    fn matches(names: &[&str]) -> Vec<MatchSet> {
        names.iter().map(|n| MatchSet { ssid: ssid(n) }).collect()
    }

    #[test]
    fn match_sets_fill_in_reverse_without_bitmap_bits() {
        let table = build_direct_ssids(&matches(&["one", "two", "three"]), &[]);
        let names: Vec<&[u8]> = table.entries.iter().map(Ssid::as_bytes).collect();
        assert_eq!(names, vec![b"three".as_ref(), b"two".as_ref(), b"one".as_ref()]);
        assert_eq!(table.bitmap, 0);
    }

    #[test]
    fn empty_match_profiles_are_skipped() {
        let sets = vec![
            MatchSet { ssid: ssid("kept") },
            MatchSet {
                ssid: Ssid::wildcard(),
            },
        ];
        let table = build_direct_ssids(&sets, &[]);
        assert_eq!(table.entries.len(), 1);
        assert_eq!(table.entries[0].as_bytes(), b"kept");
    }

    #[test]
    fn scan_ssids_append_in_reverse_and_mark_bitmap() {
        let table = build_direct_ssids(&[], &[ssid("a"), ssid("b")]);
        let names: Vec<&[u8]> = table.entries.iter().map(Ssid::as_bytes).collect();
        assert_eq!(names, vec![b"b".as_ref(), b"a".as_ref()]);
        assert_eq!(table.bitmap, 0b11);
    }

    #[test]
    fn duplicate_scan_ssid_marks_existing_slot() {
        // "net" arrives both as a match profile and as an explicit SSID: it
        // must occupy exactly one slot, with that slot's bit set.
        let table = build_direct_ssids(&matches(&["net"]), &[ssid("net"), ssid("other")]);
        assert_eq!(table.entries.len(), 2);
        assert_eq!(table.entries[0].as_bytes(), b"net");
        assert_eq!(table.entries[1].as_bytes(), b"other");
        assert_eq!(table.bitmap, 0b11);
    }

    #[test]
    fn table_stops_filling_when_full() {
        let many: Vec<Ssid> = (0..30).map(|i| ssid(&format!("net{i:02}"))).collect();
        let table = build_direct_ssids(&[], &many);
        assert_eq!(table.entries.len(), MAX_DIRECT_SSIDS);
        // The last (reverse order: first submitted) SSIDs were dropped.
        assert_eq!(table.entries[0].as_bytes(), b"net29");
    }

    #[test]
    fn serialized_table_is_fixed_size() {
        let table = build_direct_ssids(&[], &[ssid("x")]);
        let mut out = Vec::new();
        table.write_table(&mut out);
        assert_eq!(out.len(), MAX_DIRECT_SSIDS * SSID_SLOT_LEN);
        assert_eq!(out[0], 0); // element id
        assert_eq!(out[1], 1); // length
        assert_eq!(out[2], b'x');
        // Second slot is empty.
        assert_eq!(out[SSID_SLOT_LEN], 0);
        assert_eq!(out[SSID_SLOT_LEN + 1], 0);
    }
}
