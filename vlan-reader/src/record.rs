use serde::Deserialize;
use skb_vlan::skb::SkbSnapshot;
use skb_vlan::timestamp::Timestamp;

/// One JSON line of a descriptor capture.
///
/// The collection pipeline writes one record per traced packet, holding the
/// snapshot of the descriptor fields as they existed on the traced kernel.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SnapshotRecord {
    /// Capture time, nanoseconds since epoch.
    #[serde(default)]
    pub ts: Timestamp,
    /// Recorded descriptor fields.
    pub skb: SkbSnapshot,
}
