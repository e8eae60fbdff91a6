//! Dwell/timing policy.
//!
//! Computes the per-scan [`DwellPlan`] from the current traffic load, the
//! latency mode, the request flags and the interface kind. Under low latency
//! and high traffic the passive scan is fragmented: dwell on a channel is
//! split into 40 ms fragments with a 105 ms period, and skipping to the next
//! channel is delayed by the same period, so `suspend_time` describes both
//! the fragment and the channel-skip pacing. That keeps the overall passive
//! scan from running too long while active scanning still leaves the
//! operating channel for only one fragment at a time.

use scanoffload_core::caps::FirmwareCaps;
use scanoffload_core::types::{
    DwellPlan, IfaceKind, LinkConditions, ScanRequestFlags, TrafficLoad,
};

/// Per-channel passive dwell, ms. The firmware computes the actual value per
/// band and probe count; this is only the baseline in the command.
const PASSIVE_DWELL: u8 = 110;
/// Per-channel active dwell baseline, ms.
const ACTIVE_DWELL: u8 = 10;
/// Fragment dwell under fragmented passive scanning, ms.
const FRAG_PASSIVE_DWELL: u8 = 40;

/// Ceiling on time off the operating channel for low-priority scans, ms.
const LOW_PRIORITY_MAX_OUT: u32 = 200;

/// Computes the timing plan for one scan start.
///
/// When no interface is bound to a channel context there is nothing to
/// protect: out-of-channel timing stays at zero and the firmware applies its
/// own defaults.
#[must_use]
pub fn compute_dwell(
    conditions: &LinkConditions,
    flags: ScanRequestFlags,
    iface: IfaceKind,
    caps: &FirmwareCaps,
) -> DwellPlan {
    let mut plan = DwellPlan::default();
    let mut frag_dwell = 0u8;

    if conditions.bound_interfaces > 0 {
        match conditions.load {
            TrafficLoad::High => {
                if caps.fragmented_scan {
                    plan.suspend_time = 105;
                    frag_dwell = FRAG_PASSIVE_DWELL;
                    plan.max_out_time = u32::from(frag_dwell);
                } else {
                    plan.suspend_time = 120;
                    plan.max_out_time = 120;
                }
            }
            TrafficLoad::Medium => {
                plan.suspend_time = 120;
                plan.max_out_time = 120;
            }
            TrafficLoad::Low => {
                plan.suspend_time = 30;
                plan.max_out_time = 120;
            }
        }

        if conditions.low_latency {
            if caps.fragmented_scan {
                plan.suspend_time = 105;
                frag_dwell = FRAG_PASSIVE_DWELL;
                plan.max_out_time = u32::from(frag_dwell);
            } else {
                plan.suspend_time = 120;
                plan.max_out_time = 120;
            }
        }

        if frag_dwell > 0 && caps.fragmented_scan {
            // Fragmenting a peer-discovery scan would hurt discovery
            // latency; bound the excursion to the passive dwell instead.
            if iface == IfaceKind::PeerDiscovery {
                plan.max_out_time = 120;
            } else {
                plan.passive_fragmented = true;
            }
        }

        if flags.contains(ScanRequestFlags::LOW_PRIORITY)
            && plan.max_out_time > LOW_PRIORITY_MAX_OUT
        {
            plan.max_out_time = LOW_PRIORITY_MAX_OUT;
        }
    }

    if plan.passive_fragmented {
        plan.fragmented_dwell = frag_dwell;
    }

    plan.passive_dwell = PASSIVE_DWELL;
    plan.active_dwell = ACTIVE_DWELL;

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conditions(load: TrafficLoad, low_latency: bool) -> LinkConditions {
        LinkConditions {
            load,
            low_latency,
            bound_interfaces: 1,
        }
    }

    fn frag_caps() -> FirmwareCaps {
        FirmwareCaps {
            fragmented_scan: true,
            ..FirmwareCaps::default()
        }
    }

    fn compute(
        cond: &LinkConditions,
        iface: IfaceKind,
        caps: &FirmwareCaps,
    ) -> DwellPlan {
        compute_dwell(cond, ScanRequestFlags::empty(), iface, caps)
    }

    #[test]
    fn high_load_with_fragmentation_fragments_passive_dwell() {
        let plan = compute(
            &conditions(TrafficLoad::High, false),
            IfaceKind::Station,
            &frag_caps(),
        );
        assert_eq!(plan.suspend_time, 105);
        assert_eq!(plan.max_out_time, 40);
        assert_eq!(plan.fragmented_dwell, 40);
        assert!(plan.passive_fragmented);
    }

    #[test]
    fn high_load_without_fragmentation_uses_flat_timing() {
        let plan = compute(
            &conditions(TrafficLoad::High, false),
            IfaceKind::Station,
            &FirmwareCaps::default(),
        );
        assert_eq!(plan.suspend_time, 120);
        assert_eq!(plan.max_out_time, 120);
        assert!(!plan.passive_fragmented);
        assert_eq!(plan.fragmented_dwell, 0);
    }

    #[test]
    fn medium_and_low_load_tiers() {
        let medium = compute(
            &conditions(TrafficLoad::Medium, false),
            IfaceKind::Station,
            &frag_caps(),
        );
        assert_eq!((medium.suspend_time, medium.max_out_time), (120, 120));

        let low = compute(
            &conditions(TrafficLoad::Low, false),
            IfaceKind::Station,
            &frag_caps(),
        );
        assert_eq!((low.suspend_time, low.max_out_time), (30, 120));
    }

    #[test]
    fn low_latency_overrides_load_tier() {
        let plan = compute(
            &conditions(TrafficLoad::Low, true),
            IfaceKind::Station,
            &frag_caps(),
        );
        assert_eq!(plan.suspend_time, 105);
        assert_eq!(plan.max_out_time, 40);
        assert!(plan.passive_fragmented);

        let flat = compute(
            &conditions(TrafficLoad::Low, true),
            IfaceKind::Station,
            &FirmwareCaps::default(),
        );
        assert_eq!((flat.suspend_time, flat.max_out_time), (120, 120));
    }

    #[test]
    fn peer_discovery_is_never_fragmented() {
        let plan = compute(
            &conditions(TrafficLoad::High, false),
            IfaceKind::PeerDiscovery,
            &frag_caps(),
        );
        assert!(!plan.passive_fragmented);
        assert_eq!(plan.fragmented_dwell, 0);
        assert_eq!(plan.max_out_time, 120);
        assert_eq!(plan.suspend_time, 105);
    }

    #[test]
    fn low_priority_does_not_raise_below_cap_values() {
        let plan = compute_dwell(
            &conditions(TrafficLoad::Low, false),
            ScanRequestFlags::LOW_PRIORITY,
            IfaceKind::Station,
            &frag_caps(),
        );
        assert_eq!(plan.max_out_time, 120);
    }

    #[test]
    fn zero_bound_interfaces_keep_firmware_defaults() {
        let cond = LinkConditions {
            load: TrafficLoad::High,
            low_latency: true,
            bound_interfaces: 0,
        };
        let plan = compute(&cond, IfaceKind::Station, &frag_caps());
        assert_eq!(plan.suspend_time, 0);
        assert_eq!(plan.max_out_time, 0);
        assert!(!plan.passive_fragmented);
        // The basic dwells are always set; the firmware refines them.
        assert_eq!(plan.passive_dwell, 110);
        assert_eq!(plan.active_dwell, 10);
    }

    #[test]
    fn basic_dwells_are_fixed() {
        let plan = compute(
            &conditions(TrafficLoad::Medium, false),
            IfaceKind::Station,
            &frag_caps(),
        );
        assert_eq!(plan.passive_dwell, 110);
        assert_eq!(plan.active_dwell, 10);
    }
}
