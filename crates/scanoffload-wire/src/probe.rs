//! Probe-request template construction.
//!
//! Both command generations carry one reusable probe-request frame that the
//! firmware patches per channel. The template is laid out as:
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       24    802.11 management header (probe request, broadcast DA and
//!               BSSID, source = vif address or randomized address)
//! 24      2     Wildcard SSID element (id 0, length 0)
//! 26      m     2.4 GHz band IEs, with a 3-byte DS Parameter Set
//!               placeholder spliced in when the firmware performs
//!               regulatory measurements
//! 26+m    n     5 GHz band IEs
//! 26+m+n  k     Common IEs
//! ```
//!
//! The segment table ([`ProbeTemplate`]) records each range relative to the
//! buffer start. On the wire the template is serialized as the four segment
//! descriptors followed by the buffer padded to [`PROBE_REQ_BUF_LEN`].

use scanoffload_core::error::{ScanError, ScanResult};
use scanoffload_core::types::{
    IeSegment, MacAddr, ProbeTemplate, ScanIes, ScanRequest, ScanRequestFlags, Vif,
};

/// Fixed probe-request template buffer size.
pub const PROBE_REQ_BUF_LEN: usize = 512;

/// 802.11 management header length.
pub const MGMT_HDR_LEN: usize = 24;

/// Serialized template size: four segment descriptors plus the buffer.
pub const PROBE_REQ_WIRE_LEN: usize = 16 + PROBE_REQ_BUF_LEN;

/// Probe-request subtype in the frame-control field.
const FRAME_CTRL_PROBE_REQ: u16 = 0x0040;

const EID_SSID: u8 = 0;
const EID_SUPP_RATES: u8 = 1;
const EID_DS_PARAMS: u8 = 3;
const EID_REQUEST: u8 = 10;
const EID_EXT_SUPP_RATES: u8 = 50;

/// Element ids that must precede the DS Parameter Set element.
const BEFORE_DS_PARAMS: [u8; 4] = [EID_SSID, EID_SUPP_RATES, EID_REQUEST, EID_EXT_SUPP_RATES];

/// Room left for caller IEs after the header, the wildcard SSID element and
/// the optional DS Parameter Set reservation.
#[must_use]
pub fn max_ie_room(ds_reservation: bool) -> usize {
    let mut room = PROBE_REQ_BUF_LEN - (MGMT_HDR_LEN + 2);
    if ds_reservation {
        room -= 3;
    }
    room
}

/// Derives the randomized source address: template bits where the mask is
/// set, fresh random bits elsewhere.
///
/// The firmware cannot re-randomize per iteration, so the address is fixed
/// for the lifetime of one scan and only changes when the scan restarts.
fn randomized_addr(template: MacAddr, mask: MacAddr) -> MacAddr {
    let random: [u8; 6] = rand::random();
    let mut out = [0u8; 6];
    for i in 0..6 {
        out[i] = (template.0[i] & mask.0[i]) | (random[i] & !mask.0[i]);
    }
    MacAddr(out)
}

/// Byte offset at which the DS Parameter Set placeholder is spliced into an
/// IE blob: after the last leading element whose id is in
/// [`BEFORE_DS_PARAMS`].
fn ds_split_offset(ies: &[u8]) -> usize {
    let mut pos = 0;
    while pos + 2 <= ies.len() {
        let eid = ies[pos];
        let len = ies[pos + 1] as usize;
        if !BEFORE_DS_PARAMS.contains(&eid) {
            break;
        }
        if pos + 2 + len > ies.len() {
            break;
        }
        pos += 2 + len;
    }
    pos
}

/// Copies `ies` into `buf`, inserting a zeroed DS Parameter Set placeholder
/// at the split point when requested.
fn copy_with_ds_elem(ies: &[u8], insert_ds: bool, buf: &mut Vec<u8>) {
    if !insert_ds {
        buf.extend_from_slice(ies);
        return;
    }
    let offs = ds_split_offset(ies);
    buf.extend_from_slice(&ies[..offs]);
    // Placeholder; the firmware patches the channel number per channel.
    buf.extend_from_slice(&[EID_DS_PARAMS, 1, 0]);
    buf.extend_from_slice(&ies[offs..]);
}

/// Builds the probe-request template for one scan.
///
/// # Errors
///
/// Returns [`ScanError::Size`] when the header plus all IE segments exceed
/// the fixed template buffer.
pub fn build_probe_template(
    vif: &Vif,
    ies: &ScanIes,
    request: &ScanRequest,
    ds_reservation: bool,
) -> ScanResult<ProbeTemplate> {
    let needed = MGMT_HDR_LEN
        + 2
        + ies.total_len()
        + if ds_reservation { 3 } else { 0 };
    if needed > PROBE_REQ_BUF_LEN {
        return Err(ScanError::Size {
            needed,
            limit: PROBE_REQ_BUF_LEN,
        });
    }

    let source = match (
        request.flags.contains(ScanRequestFlags::RANDOM_ADDR),
        request.mac_addr,
        request.mac_addr_mask,
    ) {
        (true, Some(addr), Some(mask)) => randomized_addr(addr, mask),
        _ => vif.addr,
    };

    let mut buf = Vec::with_capacity(needed);

    // Management header: frame control, duration, DA, SA, BSSID, sequence.
    buf.extend_from_slice(&FRAME_CTRL_PROBE_REQ.to_le_bytes());
    buf.extend_from_slice(&[0, 0]);
    buf.extend_from_slice(&MacAddr::BROADCAST.0);
    buf.extend_from_slice(&source.0);
    buf.extend_from_slice(&MacAddr::BROADCAST.0);
    buf.extend_from_slice(&[0, 0]);

    // Wildcard SSID element; the firmware substitutes direct SSIDs.
    buf.extend_from_slice(&[EID_SSID, 0]);

    let mac_header = IeSegment {
        offset: 0,
        len: (MGMT_HDR_LEN + 2) as u16,
    };

    let start = buf.len();
    copy_with_ds_elem(&ies.band_2ghz, ds_reservation, &mut buf);
    let band_2ghz = IeSegment {
        offset: start as u16,
        len: (buf.len() - start) as u16,
    };

    let start = buf.len();
    buf.extend_from_slice(&ies.band_5ghz);
    let band_5ghz = IeSegment {
        offset: start as u16,
        len: (buf.len() - start) as u16,
    };

    let start = buf.len();
    buf.extend_from_slice(&ies.common);
    let common = IeSegment {
        offset: start as u16,
        len: (buf.len() - start) as u16,
    };

    Ok(ProbeTemplate {
        buf,
        mac_header,
        band_2ghz,
        band_5ghz,
        common,
    })
}

/// Serializes the template as both command formats embed it: segment
/// descriptors, then the buffer padded to the fixed size.
pub fn write_probe(probe: &ProbeTemplate, out: &mut Vec<u8>) {
    for seg in [
        &probe.mac_header,
        &probe.band_2ghz,
        &probe.band_5ghz,
        &probe.common,
    ] {
        out.extend_from_slice(&seg.offset.to_le_bytes());
        out.extend_from_slice(&seg.len.to_le_bytes());
    }
    out.extend_from_slice(&probe.buf);
    out.extend(std::iter::repeat(0u8).take(PROBE_REQ_BUF_LEN - probe.buf.len()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanoffload_core::types::IfaceKind;

    fn vif() -> Vif {
        Vif {
            addr: MacAddr([0x02, 0x11, 0x22, 0x33, 0x44, 0x55]),
            kind: IfaceKind::Station,
        }
    }

    fn ies() -> ScanIes {
        ScanIes {
            // supported rates, then an HT capabilities stub (id 45)
            band_2ghz: vec![EID_SUPP_RATES, 2, 0x82, 0x84, 45, 1, 0xaa],
            band_5ghz: vec![45, 1, 0xbb],
            common: vec![221, 3, 0x00, 0x11, 0x22],
        }
    }

    #[test]
    fn header_uses_vif_address_and_broadcast() {
        let probe = build_probe_template(&vif(), &ies(), &ScanRequest::default(), false).unwrap();
        assert_eq!(&probe.buf[0..2], &FRAME_CTRL_PROBE_REQ.to_le_bytes());
        assert_eq!(&probe.buf[4..10], &[0xff; 6]); // DA
        assert_eq!(&probe.buf[10..16], &vif().addr.0); // SA
        assert_eq!(&probe.buf[16..22], &[0xff; 6]); // BSSID
        assert_eq!(&probe.buf[24..26], &[0, 0]); // wildcard SSID
        assert_eq!(probe.mac_header.len, 26);
    }

    #[test]
    fn ds_placeholder_splices_after_leading_elements() {
        let probe = build_probe_template(&vif(), &ies(), &ScanRequest::default(), true).unwrap();
        let seg = &probe.buf[probe.band_2ghz.offset as usize..][..probe.band_2ghz.len as usize];
        // rates element, then the placeholder, then the HT stub.
        assert_eq!(&seg[0..4], &[EID_SUPP_RATES, 2, 0x82, 0x84]);
        assert_eq!(&seg[4..7], &[EID_DS_PARAMS, 1, 0]);
        assert_eq!(&seg[7..], &[45, 1, 0xaa]);
        assert_eq!(seg.len(), ies().band_2ghz.len() + 3);
    }

    #[test]
    fn no_ds_placeholder_without_reservation() {
        let probe = build_probe_template(&vif(), &ies(), &ScanRequest::default(), false).unwrap();
        assert_eq!(probe.band_2ghz.len as usize, ies().band_2ghz.len());
    }

    #[test]
    fn segments_are_contiguous() {
        let probe = build_probe_template(&vif(), &ies(), &ScanRequest::default(), false).unwrap();
        assert_eq!(
            probe.band_5ghz.offset,
            probe.band_2ghz.offset + probe.band_2ghz.len
        );
        assert_eq!(probe.common.offset, probe.band_5ghz.offset + probe.band_5ghz.len);
        assert_eq!(
            probe.buf.len(),
            (probe.common.offset + probe.common.len) as usize
        );
    }

    #[test]
    fn randomized_address_respects_mask() {
        let mut request = ScanRequest::default();
        request.flags |= ScanRequestFlags::RANDOM_ADDR;
        request.mac_addr = Some(MacAddr([0xda, 0x00, 0x00, 0x00, 0x00, 0x00]));
        request.mac_addr_mask = Some(MacAddr([0xff, 0x00, 0x00, 0x00, 0x00, 0x00]));
        let probe = build_probe_template(&vif(), &ies(), &request, false).unwrap();
        // First octet is fully masked: must equal the template.
        assert_eq!(probe.buf[10], 0xda);
    }

    #[test]
    fn oversized_ies_fail_with_size_error() {
        let huge = ScanIes {
            band_2ghz: vec![0u8; 400],
            band_5ghz: vec![0u8; 200],
            common: Vec::new(),
        };
        let err = build_probe_template(&vif(), &huge, &ScanRequest::default(), false).unwrap_err();
        assert!(matches!(err, ScanError::Size { .. }));
    }

    #[test]
    fn ie_room_accounts_for_ds_reservation() {
        assert_eq!(max_ie_room(false), 512 - 26);
        assert_eq!(max_ie_room(true), 512 - 26 - 3);
    }

    #[test]
    fn wire_serialization_is_fixed_size() {
        let probe = build_probe_template(&vif(), &ies(), &ScanRequest::default(), false).unwrap();
        let mut out = Vec::new();
        write_probe(&probe, &mut out);
        assert_eq!(out.len(), PROBE_REQ_WIRE_LEN);
        // First descriptor is the mac header segment.
        assert_eq!(&out[0..2], &0u16.to_le_bytes());
        assert_eq!(&out[2..4], &26u16.to_le_bytes());
    }
}
