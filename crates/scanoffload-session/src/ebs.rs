//! Energy-based scan eligibility.

use scanoffload_core::caps::FirmwareCaps;
use scanoffload_core::types::IfaceKind;

/// Whether energy-based scanning may be enabled for a scan.
///
/// EBS is used only when:
/// 1. the firmware implements it;
/// 2. the last EBS outcome was usable (success or inactive);
/// 3. the scan is periodic, or single-scan EBS is supported;
/// 4. the scan is not a peer-discovery operation.
#[must_use]
pub fn ebs_eligible(
    caps: &FirmwareCaps,
    last_ebs_usable: bool,
    total_iterations: u32,
    iface: IfaceKind,
) -> bool {
    caps.ebs
        && last_ebs_usable
        && (total_iterations > 1 || caps.single_scan_ebs)
        && iface != IfaceKind::PeerDiscovery
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> FirmwareCaps {
        FirmwareCaps {
            ebs: true,
            single_scan_ebs: true,
            ..FirmwareCaps::default()
        }
    }

    #[test]
    fn eligible_when_all_conditions_hold() {
        assert!(ebs_eligible(&caps(), true, 1, IfaceKind::Station));
    }

    #[test]
    fn each_condition_gates_eligibility() {
        let mut no_ebs = caps();
        no_ebs.ebs = false;
        assert!(!ebs_eligible(&no_ebs, true, 258, IfaceKind::Station));

        assert!(!ebs_eligible(&caps(), false, 258, IfaceKind::Station));

        let mut no_single = caps();
        no_single.single_scan_ebs = false;
        assert!(!ebs_eligible(&no_single, true, 1, IfaceKind::Station));
        assert!(ebs_eligible(&no_single, true, 258, IfaceKind::Station));

        assert!(!ebs_eligible(&caps(), true, 258, IfaceKind::PeerDiscovery));
    }
}
