//! Packet descriptor access.
//!
//! The capture side of the pipeline hands this crate an opaque, read-only
//! view of a kernel `struct sk_buff`. The fields this crate needs are not
//! stable across kernel releases: v6.1 (commit 354259fa73e2) removed the
//! `vlan_present` bitfield and folded it into `vlan_all`. A build of this
//! crate must run correctly against kernels on either side of that boundary,
//! so field access goes through [`SkbRead`], which can answer "does this
//! field exist in the running kernel's layout" before a read is attempted.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Named `sk_buff` fields read by this crate.
///
/// The set is closed: a field name outside this enum cannot be expressed, so
/// a read of a structurally impossible field is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkbField {
    /// Single-bit tag-presence flag. Carried by layouts before v6.1 only.
    VlanPresent,
    /// Combined presence/protocol word. Carried by layouts from v6.1 on.
    VlanAll,
    /// Raw 16-bit tag control information, host byte order. Both layouts.
    VlanTci,
}

impl fmt::Display for SkbField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkbField::VlanPresent => "vlan_present",
            SkbField::VlanAll => "vlan_all",
            SkbField::VlanTci => "vlan_tci",
        })
    }
}

/// Read access to a descriptor whose layout is only known at runtime.
///
/// Implementations never fail: existence checks return a definite yes/no,
/// and reading a field the layout does not carry returns `None`. Both
/// operations must be constant-time; they run on the per-packet path.
pub trait SkbRead {
    /// Whether `field` exists in the descriptor layout of the running kernel.
    fn field_exists(&self, field: SkbField) -> bool;

    /// Read `field`, or `None` when the layout does not carry it.
    fn read(&self, field: SkbField) -> Option<u64>;
}

/// A recorded copy of the descriptor fields relevant to VLAN recovery.
///
/// This is what the capture pipeline persists per packet: each field is
/// `Some` exactly when the traced kernel's layout carried it, so a replayed
/// snapshot probes the same way the live descriptor did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkbSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan_present: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan_all: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan_tci: Option<u64>,
}

impl SkbSnapshot {
    /// Snapshot of a pre-6.1 descriptor: `vlan_present` exists.
    pub const fn legacy(vlan_present: u64, vlan_tci: u64) -> Self {
        SkbSnapshot {
            vlan_present: Some(vlan_present),
            vlan_all: None,
            vlan_tci: Some(vlan_tci),
        }
    }

    /// Snapshot of a v6.1+ descriptor: `vlan_present` is gone.
    pub const fn combined(vlan_all: u64, vlan_tci: u64) -> Self {
        SkbSnapshot {
            vlan_present: None,
            vlan_all: Some(vlan_all),
            vlan_tci: Some(vlan_tci),
        }
    }
}

impl SkbRead for SkbSnapshot {
    #[inline]
    fn field_exists(&self, field: SkbField) -> bool {
        self.read(field).is_some()
    }

    #[inline]
    fn read(&self, field: SkbField) -> Option<u64> {
        match field {
            SkbField::VlanPresent => self.vlan_present,
            SkbField::VlanAll => self.vlan_all,
            SkbField::VlanTci => self.vlan_tci,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_existence_tracks_layout() {
        let legacy = SkbSnapshot::legacy(0, 0);
        assert!(legacy.field_exists(SkbField::VlanPresent));
        assert!(!legacy.field_exists(SkbField::VlanAll));
        assert!(legacy.field_exists(SkbField::VlanTci));

        let combined = SkbSnapshot::combined(0, 0);
        assert!(!combined.field_exists(SkbField::VlanPresent));
        assert!(combined.field_exists(SkbField::VlanAll));
    }

    #[test]
    fn test_read_absent_field_is_none_not_zero() {
        // A present field holding zero and an absent field must stay
        // distinguishable; presence probing depends on it.
        let legacy = SkbSnapshot::legacy(0, 0);
        assert_eq!(legacy.read(SkbField::VlanPresent), Some(0));
        assert_eq!(legacy.read(SkbField::VlanAll), None);
    }

    #[test]
    fn test_field_names() {
        assert_eq!(SkbField::VlanPresent.to_string(), "vlan_present");
        assert_eq!(SkbField::VlanAll.to_string(), "vlan_all");
        assert_eq!(SkbField::VlanTci.to_string(), "vlan_tci");
    }
}
