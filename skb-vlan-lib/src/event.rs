//! The VLAN event handed to the tracing pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::vlan::VlanTag;

/// VLAN fields of a traced packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanEvent {
    /// Priority Code Point, also called CoS.
    pub pcp: u8,
    /// Drop eligible indicator.
    pub dei: bool,
    /// VLAN ID.
    pub vid: u16,
    /// The tag was stripped by hardware and recovered from descriptor
    /// metadata rather than read from the payload.
    pub acceleration: bool,
}

impl VlanEvent {
    /// Event for a tag recovered from descriptor metadata.
    #[inline]
    pub fn accelerated(tag: VlanTag) -> Self {
        Self::new(tag, true)
    }

    /// Event for a tag read inline from the frame payload.
    #[inline]
    pub fn inline(tag: VlanTag) -> Self {
        Self::new(tag, false)
    }

    fn new(tag: VlanTag, acceleration: bool) -> Self {
        VlanEvent {
            pcp: tag.pcp,
            dei: tag.dei,
            vid: tag.vid,
            acceleration,
        }
    }
}

impl fmt::Display for VlanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let drop = if self.dei { " drop" } else { "" };
        let accel = if self.acceleration { " accel" } else { "" };
        write!(f, "vlan (id {} prio {}{}{})", self.vid, self.pcp, drop, accel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let tag = VlanTag {
            pcp: 6,
            dei: false,
            vid: 123,
        };
        assert_eq!(
            VlanEvent::accelerated(tag).to_string(),
            "vlan (id 123 prio 6 accel)"
        );
        assert_eq!(VlanEvent::inline(tag).to_string(), "vlan (id 123 prio 6)");

        let tag = VlanTag {
            pcp: 0,
            dei: true,
            vid: 42,
        };
        assert_eq!(
            VlanEvent::inline(tag).to_string(),
            "vlan (id 42 prio 0 drop)"
        );
    }

    #[test]
    fn test_serialize() {
        let event = VlanEvent::accelerated(VlanTag {
            pcp: 1,
            dei: false,
            vid: 100,
        });
        let json = serde_json::to_string(&event).expect("serialize");
        assert_eq!(
            json,
            r#"{"pcp":1,"dei":false,"vid":100,"acceleration":true}"#
        );
    }
}
