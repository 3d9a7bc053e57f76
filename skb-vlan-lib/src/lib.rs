//! Recovery of 802.1Q VLAN metadata from kernel packet descriptors.
//!
//! When network hardware strips a VLAN tag on receive, the tag is cached in
//! `sk_buff` metadata instead of staying inline in the frame. This crate
//! recovers that metadata across kernel versions whose descriptor layouts
//! differ ([`vlan`]), decodes tags still inline in the payload ([`frame`]),
//! and produces the structured event consumed by the tracing pipeline
//! ([`event`]).

pub mod event;
pub mod frame;
pub mod skb;
pub mod timestamp;
pub mod vlan;
