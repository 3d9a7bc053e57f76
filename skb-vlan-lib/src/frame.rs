//! Inline 802.1Q parsing.
//!
//! Not every VLAN tag is hardware-stripped: on transmit paths and on
//! hardware without offload the tag is still inline in the frame, between
//! the Ethernet header and the payload.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                                                               |
//! +                    Destination MAC Address                    +
//! |                                                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                                                               |
//! +                      Source MAC Address                       +
//! |                                                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     TPID (0x8100/0x88a8)      |      TCI (PCP|DEI|VID)        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |           EtherType           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! [`parse_frame`] walks the leading Ethernet header and any stacked tags
//! (802.1ad QinQ allows an outer 0x88a8 tag around an inner 0x8100 one) and
//! yields the same [`VlanTag`] values the offloaded path produces. Unlike
//! the descriptor path, malformed input is expected here and surfaces as
//! [`FrameError`].

use std::fmt;

use thiserror::Error;
use zerocopy::{BigEndian, FromBytes, Immutable, IntoBytes, KnownLayout, Ref, Unaligned, U16};

use crate::vlan::VlanTag;

const ETH_ALEN: usize = 6; // Ethernet address length
/// Ethernet header length, without any VLAN tag.
pub const ETH_HLEN: usize = 14;
/// Length of one inline VLAN tag (TPID + TCI).
pub const VLAN_HLEN: usize = 4;

/// An Ethernet MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct EthAddr([u8; ETH_ALEN]);

impl EthAddr {
    /// The raw address bytes.
    #[inline]
    pub const fn octets(&self) -> [u8; ETH_ALEN] {
        self.0
    }
}

impl fmt::Display for EthAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

/// EtherType number, as carried on the wire (big endian).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct EtherType(pub U16<BigEndian>);

impl EtherType {
    pub const IPV4: EtherType = EtherType(U16::from_bytes([0x08, 0x00]));
    pub const ARP: EtherType = EtherType(U16::from_bytes([0x08, 0x06]));
    pub const VLAN_8021Q: EtherType = EtherType(U16::from_bytes([0x81, 0x00]));
    pub const IPV6: EtherType = EtherType(U16::from_bytes([0x86, 0xdd]));
    pub const VLAN_8021AD: EtherType = EtherType(U16::from_bytes([0x88, 0xa8]));

    /// Whether this EtherType announces an inline VLAN tag.
    #[inline]
    pub fn is_vlan(self) -> bool {
        self == Self::VLAN_8021Q || self == Self::VLAN_8021AD
    }
}

impl From<u16> for EtherType {
    #[inline]
    fn from(v: u16) -> Self {
        EtherType(U16::new(v))
    }
}

impl From<EtherType> for u16 {
    #[inline]
    fn from(v: EtherType) -> Self {
        v.0.get()
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.get() {
            0x0800 => f.write_str("ipv4"),
            0x0806 => f.write_str("arp"),
            0x86dd => f.write_str("ipv6"),
            0x8100 => f.write_str("802.1Q"),
            0x88a8 => f.write_str("802.1ad"),
            other => write!(f, "0x{:04x}", other),
        }
    }
}

/// Errors from inline frame parsing.
#[derive(Debug, Clone, Error)]
pub enum FrameError {
    /// The buffer ended inside the named header.
    #[error("frame too short for {0}")]
    TooShort(&'static str),
    /// More than two stacked VLAN tags.
    #[error("more than two stacked VLAN tags")]
    TagStackTooDeep,
}

#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Debug, Clone, Copy)]
pub struct EtherHeader {
    dest: EthAddr,
    source: EthAddr,
    proto: EtherType,
}

impl EtherHeader {
    #[inline]
    pub fn dest(&self) -> &EthAddr {
        &self.dest
    }

    #[inline]
    pub fn source(&self) -> &EthAddr {
        &self.source
    }

    #[inline]
    pub fn proto(&self) -> EtherType {
        self.proto
    }
}

/// One inline VLAN tag: the TCI plus the EtherType of what follows.
///
/// The TPID that announced the tag belongs to the preceding header; it is
/// consumed by the walk, not stored here.
#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Debug, Clone, Copy)]
pub struct VlanHeader {
    tci: U16<BigEndian>,
    proto: EtherType,
}

impl VlanHeader {
    /// The raw tag control information.
    #[inline]
    pub fn tci(&self) -> u16 {
        self.tci.get()
    }

    /// The decoded tag subfields.
    #[inline]
    pub fn tag(&self) -> VlanTag {
        VlanTag::from_tci(self.tci.get())
    }

    /// EtherType of the encapsulated payload (or of the next tag).
    #[inline]
    pub fn proto(&self) -> EtherType {
        self.proto
    }
}

impl fmt::Display for VlanHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self.tag();
        write!(
            f,
            "802.1Q vid={} pcp={} dei={} proto={}",
            tag.vid, tag.pcp, tag.dei, self.proto
        )
    }
}

/// Leading headers of a frame after walking any inline VLAN tags.
#[derive(Debug, Clone)]
pub enum FrameVlan<'a> {
    Untagged(&'a EtherHeader),
    Tagged(&'a EtherHeader, &'a VlanHeader),
    DoubleTagged(&'a EtherHeader, &'a VlanHeader, &'a VlanHeader),
}

impl<'a> FrameVlan<'a> {
    /// The Ethernet header.
    #[inline]
    pub fn ether(&self) -> &EtherHeader {
        match self {
            FrameVlan::Untagged(eth) => eth,
            FrameVlan::Tagged(eth, _) => eth,
            FrameVlan::DoubleTagged(eth, _, _) => eth,
        }
    }

    /// The outermost tag, if the frame is tagged.
    #[inline]
    pub fn outer_tag(&self) -> Option<&VlanHeader> {
        match self {
            FrameVlan::Untagged(_) => None,
            FrameVlan::Tagged(_, vlan) => Some(vlan),
            FrameVlan::DoubleTagged(_, outer, _) => Some(outer),
        }
    }

    /// The inner tag of a QinQ frame.
    #[inline]
    pub fn inner_tag(&self) -> Option<&VlanHeader> {
        match self {
            FrameVlan::DoubleTagged(_, _, inner) => Some(inner),
            _ => None,
        }
    }

    /// EtherType of the payload past all tags.
    #[inline]
    pub fn inner_type(&self) -> EtherType {
        match self {
            FrameVlan::Untagged(eth) => eth.proto(),
            FrameVlan::Tagged(_, vlan) => vlan.proto(),
            FrameVlan::DoubleTagged(_, _, inner) => inner.proto(),
        }
    }
}

impl fmt::Display for FrameVlan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let eth = self.ether();
        write!(f, "Ethernet {} -> {}", eth.source(), eth.dest())?;
        if let Some(outer) = self.outer_tag() {
            write!(f, " [{}]", outer)?;
        }
        if let Some(inner) = self.inner_tag() {
            write!(f, " [{}]", inner)?;
        }
        write!(f, " proto={}", self.inner_type())
    }
}

/// Parse the Ethernet header and any stacked inline VLAN tags.
///
/// Returns the parsed view and the remaining payload. Frames with more than
/// two stacked tags are rejected rather than silently truncated.
pub fn parse_frame(buf: &[u8]) -> Result<(FrameVlan<'_>, &[u8]), FrameError> {
    let (eth, mut rest) =
        Ref::<_, EtherHeader>::from_prefix(buf).map_err(|_| FrameError::TooShort("ethernet"))?;
    let eth = Ref::into_ref(eth);

    let mut view = FrameVlan::Untagged(eth);

    while view.inner_type().is_vlan() {
        let (vlan, vlan_rest) = Ref::<_, VlanHeader>::from_prefix(rest)
            .map_err(|_| FrameError::TooShort("802.1Q tag"))?;
        rest = vlan_rest;
        let vlan = Ref::into_ref(vlan);

        view = match view {
            FrameVlan::Untagged(eth) => FrameVlan::Tagged(eth, vlan),
            FrameVlan::Tagged(eth, outer) => FrameVlan::DoubleTagged(eth, outer, vlan),
            FrameVlan::DoubleTagged(_, _, _) => return Err(FrameError::TagStackTooDeep),
        };
    }

    Ok((view, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_untagged() {
        let frame: [u8; 14] = [
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, // dest MAC
            0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, // source MAC
            0x08, 0x00, // EtherType: IPv4
        ];

        let (view, rest) = parse_frame(&frame).expect("parse untagged");
        assert!(matches!(view, FrameVlan::Untagged(_)));
        assert_eq!(view.inner_type(), EtherType::IPV4);
        assert_eq!(view.ether().dest().to_string(), "01:02:03:04:05:06");
        assert_eq!(view.ether().source().to_string(), "07:08:09:0a:0b:0c");
        assert!(rest.is_empty());
    }

    #[test]
    fn test_parse_single_tag() {
        let frame: [u8; 18] = [
            0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, // dest MAC
            0x11, 0x22, 0x33, 0x44, 0x55, 0x66, // source MAC
            0x81, 0x00, // TPID: 802.1Q
            0x20, 0x64, // TCI: pcp=1 dei=0 vid=100
            0x08, 0x00, // inner EtherType: IPv4
        ];

        let (view, rest) = parse_frame(&frame).expect("parse tagged");
        let vlan = view.outer_tag().expect("tag present");
        assert_eq!(
            vlan.tag(),
            VlanTag {
                pcp: 1,
                dei: false,
                vid: 100
            }
        );
        assert_eq!(vlan.tci(), 0x2064);
        assert_eq!(view.inner_type(), EtherType::IPV4);
        assert!(view.inner_tag().is_none());
        assert!(rest.is_empty());
    }

    #[test]
    fn test_parse_qinq() {
        let frame: [u8; 22] = [
            0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, // dest MAC
            0x11, 0x22, 0x33, 0x44, 0x55, 0x66, // source MAC
            0x88, 0xa8, // TPID: 802.1ad (service tag)
            0x00, 0x7b, // TCI: vid=123
            0x81, 0x00, // TPID: 802.1Q (customer tag)
            0xe1, 0x23, // TCI: pcp=7 vid=291
            0x86, 0xdd, // inner EtherType: IPv6
        ];

        let (view, _) = parse_frame(&frame).expect("parse QinQ");
        assert!(matches!(view, FrameVlan::DoubleTagged(..)));
        assert_eq!(view.outer_tag().unwrap().tag().vid, 123);
        assert_eq!(view.inner_tag().unwrap().tag().pcp, 7);
        assert_eq!(view.inner_tag().unwrap().tag().vid, 0x123);
        assert_eq!(view.inner_type(), EtherType::IPV6);
    }

    #[test]
    fn test_too_short() {
        let frame = [0u8; 10];
        assert!(matches!(
            parse_frame(&frame),
            Err(FrameError::TooShort("ethernet"))
        ));

        // Ethernet header announcing a tag that is not there.
        let frame: [u8; 15] = [
            0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, //
            0x11, 0x22, 0x33, 0x44, 0x55, 0x66, //
            0x81, 0x00, // TPID with a truncated tag
            0x20,
        ];
        assert!(matches!(
            parse_frame(&frame),
            Err(FrameError::TooShort("802.1Q tag"))
        ));
    }

    #[test]
    fn test_three_tags_rejected() {
        let frame: [u8; 26] = [
            0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, //
            0x11, 0x22, 0x33, 0x44, 0x55, 0x66, //
            0x88, 0xa8, 0x00, 0x01, // tag 1
            0x81, 0x00, 0x00, 0x02, // tag 2
            0x81, 0x00, 0x00, 0x03, // tag 3
            0x08, 0x00,
        ];
        assert!(matches!(
            parse_frame(&frame),
            Err(FrameError::TagStackTooDeep)
        ));
    }

    #[test]
    fn test_display() {
        let frame: [u8; 18] = [
            0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, //
            0x11, 0x22, 0x33, 0x44, 0x55, 0x66, //
            0x81, 0x00, 0x00, 0x2a, // vid=42
            0x08, 0x00,
        ];
        let (view, _) = parse_frame(&frame).expect("parse");
        let rendered = view.to_string();
        assert!(rendered.contains("11:22:33:44:55:66"));
        assert!(rendered.contains("vid=42"));
        assert!(rendered.contains("proto=ipv4"));
    }
}
