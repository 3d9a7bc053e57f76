//! Hardware-offloaded VLAN tag recovery.
//!
//! When a NIC strips the 802.1Q tag on receive, the tag never reaches the
//! packet payload; the kernel keeps it in `sk_buff` metadata instead. This
//! module recovers that metadata and splits the 16-bit tag control
//! information (TCI) into its logical subfields:
//!
//! ```text
//!  15 14 13 12 11 10  9  8  7  6  5  4  3  2  1  0
//! +--------+--+-----------------------------------+
//! |  PCP   |DE|                VID                |
//! +--------+--+-----------------------------------+
//! ```
//!
//! - **PCP** (bits 15..13): Priority Code Point, frame priority class 0-7
//! - **DEI** (bit 12): Drop Eligible Indicator
//! - **VID** (bits 11..0): VLAN Identifier, 0-4095
//!
//! # Layout probing
//!
//! How the kernel flags "a stripped tag is attached" changed in v6.1
//! (commit 354259fa73e2): older kernels carry a single-bit `vlan_present`
//! field, newer ones fold it into the `vlan_all` word. Exactly one of the
//! two exists in any running kernel, and which one is unknowable at build
//! time, so [`PresenceSchema::probe`] checks for `vlan_present` existence
//! and falls back to `vlan_all`. After that single check the decode path is
//! branch-free; the whole operation is a handful of field reads and mask
//! operations, with no allocation, fit for a per-packet hot path.
//!
//! An untagged packet is normal traffic, not a failure: [`extract`] reports
//! it as [`VlanExtraction::Absent`], and the out-parameter variant
//! [`hwaccel_get_tag`] reports it as [`VlanError::NoData`] after zeroing the
//! caller's TCI buffer.
//!
//! The shift/mask constants below are a versioned contract with the kernel's
//! `include/linux/if_vlan.h`; a future change to the bit assignment would be
//! a new schema variant, not an edit to these values.

use thiserror::Error;

use crate::skb::{SkbField, SkbRead};

/// Priority Code Point, bits 15..13 of the TCI.
pub const VLAN_PRIO_MASK: u16 = 0xe000;
/// Shift pairing [`VLAN_PRIO_MASK`].
pub const VLAN_PRIO_SHIFT: u16 = 13;
/// Drop Eligible Indicator, bit 12. Named CFI before 802.1Q-2011.
pub const VLAN_DEI_MASK: u16 = 0x1000;
/// Shift pairing [`VLAN_DEI_MASK`].
pub const VLAN_DEI_SHIFT: u16 = 12;
/// VLAN Identifier, bits 11..0.
pub const VLAN_VID_MASK: u16 = 0x0fff;

/// Decoded tag control information.
///
/// The three fields are views of one 16-bit TCI; they never have independent
/// lifecycles. An all-zero tag is a legitimate tag (priority-tagged frame on
/// VLAN 0), distinct from "no tag".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VlanTag {
    /// Priority Code Point (0-7).
    pub pcp: u8,
    /// Drop Eligible Indicator.
    pub dei: bool,
    /// VLAN Identifier (0-4095).
    pub vid: u16,
}

impl VlanTag {
    /// Split a raw TCI into its subfields.
    #[inline]
    pub const fn from_tci(tci: u16) -> Self {
        VlanTag {
            pcp: ((tci & VLAN_PRIO_MASK) >> VLAN_PRIO_SHIFT) as u8,
            dei: tci & VLAN_DEI_MASK != 0,
            vid: tci & VLAN_VID_MASK,
        }
    }

    /// Reassemble the raw TCI.
    #[inline]
    pub const fn to_tci(self) -> u16 {
        ((self.pcp as u16) << VLAN_PRIO_SHIFT)
            | ((self.dei as u16) << VLAN_DEI_SHIFT)
            | (self.vid & VLAN_VID_MASK)
    }
}

/// Outcome of a tag recovery attempt.
///
/// `Absent` is the common case; most traffic carries no VLAN tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VlanExtraction {
    /// A stripped tag was attached to the descriptor.
    Present(VlanTag),
    /// No tag attached.
    Absent,
}

impl VlanExtraction {
    /// The decoded tag, if one was attached.
    #[inline]
    pub fn tag(self) -> Option<VlanTag> {
        match self {
            VlanExtraction::Present(tag) => Some(tag),
            VlanExtraction::Absent => None,
        }
    }
}

/// Error surface of the out-parameter API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VlanError {
    /// The descriptor carries no VLAN metadata. Expected for most packets;
    /// callers must not escalate this into a pipeline failure.
    #[error("no VLAN data on packet")]
    NoData,
}

/// How the running kernel encodes "a stripped tag is attached".
///
/// Resolved per call by a single field-existence check; the chosen variant
/// then reads exactly one field with no further branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceSchema {
    /// `vlan_present` single-bit field (kernels before v6.1).
    Legacy,
    /// `vlan_all` combined word, non-zero when a tag is attached (v6.1+).
    Combined,
}

impl PresenceSchema {
    /// Resolve the schema of the kernel `skb` came from.
    #[inline]
    pub fn probe(skb: &impl SkbRead) -> Self {
        if skb.field_exists(SkbField::VlanPresent) {
            PresenceSchema::Legacy
        } else {
            PresenceSchema::Combined
        }
    }

    /// Read the presence flag under this schema.
    ///
    /// There is no error path: a field the layout turns out not to carry
    /// reads as "untagged".
    #[inline]
    pub fn tag_present(self, skb: &impl SkbRead) -> bool {
        let field = match self {
            PresenceSchema::Legacy => SkbField::VlanPresent,
            PresenceSchema::Combined => SkbField::VlanAll,
        };
        skb.read(field).unwrap_or(0) != 0
    }
}

/// Whether a hardware-stripped VLAN tag is attached to `skb`.
#[inline]
pub fn vlan_tag_present(skb: &impl SkbRead) -> bool {
    PresenceSchema::probe(skb).tag_present(skb)
}

/// Recover the stripped tag, if any.
///
/// Pure and idempotent: the descriptor is only read, and repeated calls on
/// an unmodified descriptor return the same result.
#[inline]
pub fn extract(skb: &impl SkbRead) -> VlanExtraction {
    if !vlan_tag_present(skb) {
        return VlanExtraction::Absent;
    }
    // Bits above 15 of the stored word are not part of the TCI.
    let tci = skb.read(SkbField::VlanTci).unwrap_or(0) as u16;
    VlanExtraction::Present(VlanTag::from_tci(tci))
}

/// Store the raw TCI of the stripped tag in `tci`.
///
/// Mirrors the kernel's `__vlan_hwaccel_get_tag` contract: on an untagged
/// packet the buffer is zeroed, never left stale, and [`VlanError::NoData`]
/// is returned so callers keeping the kernel's error-style distinction can
/// tell "untagged" from a real read failure layered above.
#[inline]
pub fn hwaccel_get_tag(skb: &impl SkbRead, tci: &mut u16) -> Result<(), VlanError> {
    if vlan_tag_present(skb) {
        *tci = skb.read(SkbField::VlanTci).unwrap_or(0) as u16;
        Ok(())
    } else {
        *tci = 0;
        Err(VlanError::NoData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skb::SkbSnapshot;

    #[test]
    fn test_tci_decode() {
        let tag = VlanTag::from_tci(0x2064);
        assert_eq!(tag.pcp, 1);
        assert!(!tag.dei);
        assert_eq!(tag.vid, 100);

        let tag = VlanTag::from_tci(0xe123);
        assert_eq!(tag.pcp, 7);
        assert!(!tag.dei);
        assert_eq!(tag.vid, 0x123);

        let tag = VlanTag::from_tci(0x1000);
        assert_eq!(tag.pcp, 0);
        assert!(tag.dei);
        assert_eq!(tag.vid, 0);
    }

    #[test]
    fn test_tci_subfields_partition_the_word() {
        // The three masks are disjoint and cover bits 15..0.
        assert_eq!(VLAN_PRIO_MASK & VLAN_DEI_MASK, 0);
        assert_eq!(VLAN_PRIO_MASK & VLAN_VID_MASK, 0);
        assert_eq!(VLAN_DEI_MASK & VLAN_VID_MASK, 0);
        assert_eq!(VLAN_PRIO_MASK | VLAN_DEI_MASK | VLAN_VID_MASK, 0xffff);

        for tci in [0x0000, 0x0001, 0x0fff, 0x1000, 0x2064, 0x7fff, 0xe123, 0xffff] {
            let tag = VlanTag::from_tci(tci);
            assert_eq!(tag.pcp, ((tci >> 13) & 0x7) as u8);
            assert_eq!(u8::from(tag.dei), ((tci >> 12) & 0x1) as u8);
            assert_eq!(tag.vid, tci & 0xfff);
            assert_eq!(tag.to_tci(), tci);
        }
    }

    #[test]
    fn test_probe_picks_schema_by_field_existence() {
        let legacy = SkbSnapshot::legacy(1, 0x2064);
        assert_eq!(PresenceSchema::probe(&legacy), PresenceSchema::Legacy);

        let combined = SkbSnapshot::combined(0x8100_0064, 0x2064);
        assert_eq!(PresenceSchema::probe(&combined), PresenceSchema::Combined);
    }

    #[test]
    fn test_schema_equivalence() {
        // The same logical VLAN state, recorded under either kernel layout,
        // must extract identically.
        for tci in [0x0000u16, 0x2064, 0xe123, 0x1fff] {
            let legacy = SkbSnapshot::legacy(1, tci as u64);
            let combined = SkbSnapshot::combined(1, tci as u64);
            assert_eq!(extract(&legacy), extract(&combined));
            assert_eq!(
                extract(&legacy),
                VlanExtraction::Present(VlanTag::from_tci(tci))
            );
        }

        let legacy = SkbSnapshot::legacy(0, 0);
        let combined = SkbSnapshot::combined(0, 0);
        assert_eq!(extract(&legacy), extract(&combined));
        assert_eq!(extract(&legacy), VlanExtraction::Absent);
    }

    #[test]
    fn test_absent_zeroes_output() {
        let skb = SkbSnapshot::combined(0, 0);
        assert_eq!(extract(&skb), VlanExtraction::Absent);

        // The out buffer must end up zeroed even if the caller left garbage
        // in it.
        let mut tci = 0xdeadu16;
        assert_eq!(hwaccel_get_tag(&skb, &mut tci), Err(VlanError::NoData));
        assert_eq!(tci, 0);
    }

    #[test]
    fn test_zero_tag_is_present_not_absent() {
        // vlan_present set with an all-zero TCI is a legitimate tag
        // (priority-tagged frame on VLAN 0), not "no data".
        let skb = SkbSnapshot::legacy(1, 0x0000);
        assert_eq!(
            extract(&skb),
            VlanExtraction::Present(VlanTag {
                pcp: 0,
                dei: false,
                vid: 0
            })
        );

        let mut tci = 0xffffu16;
        assert_eq!(hwaccel_get_tag(&skb, &mut tci), Ok(()));
        assert_eq!(tci, 0);
    }

    #[test]
    fn test_extract_is_idempotent() {
        let skb = SkbSnapshot::legacy(1, 0xe123);
        let first = extract(&skb);
        let second = extract(&skb);
        assert_eq!(first, second);

        let skb = SkbSnapshot::combined(0, 0);
        assert_eq!(extract(&skb), extract(&skb));
    }

    #[test]
    fn test_bits_above_tci_are_ignored() {
        // The stored word may be wider than the 16-bit TCI.
        let skb = SkbSnapshot::legacy(1, 0xffff_0000_2064);
        assert_eq!(
            extract(&skb).tag(),
            Some(VlanTag {
                pcp: 1,
                dei: false,
                vid: 100
            })
        );
    }

    #[test]
    fn test_presence_reads_value_not_existence() {
        // Legacy layout with the bit cleared: the field exists, the tag
        // does not.
        let skb = SkbSnapshot::legacy(0, 0x2064);
        assert!(!vlan_tag_present(&skb));
        assert_eq!(extract(&skb), VlanExtraction::Absent);

        // Combined layout distinguishes by value the same way.
        let skb = SkbSnapshot::combined(0x8100_0001, 0x2064);
        assert!(vlan_tag_present(&skb));
    }

    #[test]
    fn test_no_data_display() {
        assert_eq!(VlanError::NoData.to_string(), "no VLAN data on packet");
    }
}
