use std::{fmt::Display, sync::atomic::AtomicU64};

/// Thread-local counters for high-throughput counting.
///
/// Counts accumulate locally and are periodically flushed to the shared
/// atomic [`Stats`], avoiding an atomic operation per packet.
#[derive(Default, Debug, Clone)]
pub struct LocalStats {
    // General statistics
    pub total_packets: u64,
    pub total_bytes: u64,

    // Input errors
    pub malformed: u64,
    pub too_small: u64,
    pub tag_stack_too_deep: u64,

    // VLAN outcomes
    pub tagged: u64,
    pub untagged: u64,
    pub accelerated: u64,
    pub inline: u64,
    pub double_tagged: u64,
}

impl LocalStats {
    /// Create a new empty local stats instance
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flush all local counters to the shared atomic stats
    #[inline]
    pub fn flush(&mut self, stats: &Stats) {
        macro_rules! flush_counter {
            ($field:ident) => {
                if self.$field > 0 {
                    stats
                        .$field
                        .fetch_add(self.$field, std::sync::atomic::Ordering::Relaxed);
                    self.$field = 0;
                }
            };
        }

        flush_counter!(total_packets);
        flush_counter!(total_bytes);
        flush_counter!(malformed);
        flush_counter!(too_small);
        flush_counter!(tag_stack_too_deep);
        flush_counter!(tagged);
        flush_counter!(untagged);
        flush_counter!(accelerated);
        flush_counter!(inline);
        flush_counter!(double_tagged);
    }

    /// Check if it's time to flush based on packet count
    ///
    /// Returns true every `interval` packets; `interval` must be a power
    /// of two.
    #[inline]
    pub fn should_flush(&self, interval: u64) -> bool {
        self.total_packets & (interval - 1) == 0
    }
}

/// Flush interval for local stats (must be power of 2)
pub const FLUSH_INTERVAL: u64 = 1024;

#[derive(Default, Debug)]
pub struct Stats {
    // General statistics
    pub total_packets: AtomicU64,
    pub total_bytes: AtomicU64,

    // Input errors
    pub malformed: AtomicU64,
    pub too_small: AtomicU64,
    pub tag_stack_too_deep: AtomicU64,

    // VLAN outcomes
    pub tagged: AtomicU64,
    pub untagged: AtomicU64,
    pub accelerated: AtomicU64,
    pub inline: AtomicU64,
    pub double_tagged: AtomicU64,
}

impl Stats {
    /// Get the value of a counter using relaxed ordering
    #[inline]
    fn get(&self, counter: &AtomicU64) -> u64 {
        counter.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Get total input errors
    pub fn total_errors(&self) -> u64 {
        self.get(&self.malformed) + self.get(&self.too_small) + self.get(&self.tag_stack_too_deep)
    }
}

impl Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== VLAN Statistics ===")?;
        writeln!(f)?;

        writeln!(f, "--- General ---")?;
        writeln!(
            f,
            "Total packets processed: {}",
            self.get(&self.total_packets)
        )?;
        writeln!(f, "Total bytes processed: {}", self.get(&self.total_bytes))?;
        writeln!(f)?;

        let total_errors = self.total_errors();
        if total_errors > 0 {
            writeln!(f, "--- Errors ---")?;
            writeln!(f, "Total errors: {}", total_errors)?;
            if self.get(&self.malformed) > 0 {
                writeln!(f, "  Malformed records: {}", self.get(&self.malformed))?;
            }
            if self.get(&self.too_small) > 0 {
                writeln!(f, "  Too small: {}", self.get(&self.too_small))?;
            }
            if self.get(&self.tag_stack_too_deep) > 0 {
                writeln!(
                    f,
                    "  Tag stack too deep: {}",
                    self.get(&self.tag_stack_too_deep)
                )?;
            }
            writeln!(f)?;
        }

        writeln!(f, "--- VLAN ---")?;
        writeln!(f, "Tagged: {}", self.get(&self.tagged))?;
        if self.get(&self.accelerated) > 0 {
            writeln!(f, "  Accelerated: {}", self.get(&self.accelerated))?;
        }
        if self.get(&self.inline) > 0 {
            writeln!(f, "  Inline: {}", self.get(&self.inline))?;
        }
        if self.get(&self.double_tagged) > 0 {
            writeln!(f, "  Double tagged (QinQ): {}", self.get(&self.double_tagged))?;
        }
        writeln!(f, "Untagged: {}", self.get(&self.untagged))?;

        Ok(())
    }
}
