use skb_vlan::event::VlanEvent;
use skb_vlan::frame::{self, FrameError};
use skb_vlan::vlan::{self, VlanExtraction};
use tracing::debug;

use crate::record::SnapshotRecord;
use crate::stats::{LocalStats, Stats, FLUSH_INTERVAL};

/// Decode the hardware-recovered VLAN state of one replayed descriptor.
pub fn process_snapshot(
    count: u64,
    record: &SnapshotRecord,
    local_stats: &mut LocalStats,
    stats: &Stats,
    dump_events: bool,
) {
    local_stats.total_packets += 1;

    match vlan::extract(&record.skb) {
        VlanExtraction::Present(tag) => {
            local_stats.tagged += 1;
            local_stats.accelerated += 1;
            if dump_events {
                println!("{:>5}   {}  {}", count, record.ts, VlanEvent::accelerated(tag));
            }
        }
        VlanExtraction::Absent => {
            local_stats.untagged += 1;
            if dump_events {
                println!("{:>5}   {}  untagged", count, record.ts);
            }
        }
    }

    // Periodic flush to shared stats
    if local_stats.should_flush(FLUSH_INTERVAL) {
        local_stats.flush(stats);
    }
}

/// Decode any inline 802.1Q tags of one captured frame.
pub fn process_frame(
    count: u64,
    data: &[u8],
    local_stats: &mut LocalStats,
    stats: &Stats,
    dump_events: bool,
) {
    local_stats.total_packets += 1;
    local_stats.total_bytes += data.len() as u64;

    match frame::parse_frame(data) {
        Ok((view, _payload)) => match view.outer_tag() {
            Some(outer) => {
                local_stats.tagged += 1;
                local_stats.inline += 1;
                if dump_events {
                    println!("{:>5}   {}", count, VlanEvent::inline(outer.tag()));
                }
                if let Some(inner) = view.inner_tag() {
                    local_stats.double_tagged += 1;
                    if dump_events {
                        println!("{:>5}   {}", count, VlanEvent::inline(inner.tag()));
                    }
                }
            }
            None => {
                local_stats.untagged += 1;
                if dump_events {
                    println!("{:>5}   untagged ({})", count, view.inner_type());
                }
            }
        },
        Err(e) => {
            debug!("Frame {}: {}", count, e);
            match e {
                FrameError::TooShort(_) => local_stats.too_small += 1,
                FrameError::TagStackTooDeep => local_stats.tag_stack_too_deep += 1,
            }
        }
    }

    // Periodic flush to shared stats
    if local_stats.should_flush(FLUSH_INTERVAL) {
        local_stats.flush(stats);
    }
}
