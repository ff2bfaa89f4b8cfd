//! Per-kind cache counters.

use std::sync::atomic::{AtomicU64, Ordering};

use strata_core::EntityKind;

/// Snapshot of the counters for one kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered by the memory tier.
    pub memory_hits: u64,
    /// Reads answered by the persistent tier after a memory miss.
    pub persistent_hits: u64,
    /// Reads answered by neither tier.
    pub misses: u64,
    /// Admitted writes.
    pub writes: u64,
    /// Writes refused by the admission filter.
    pub rejected: u64,
    /// Writes whose nested placement was skipped.
    pub skipped_placements: u64,
    /// Single-entity deletes and cascade removals.
    pub removals: u64,
}

impl CacheStats {
    /// Hit rate over both tiers (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.memory_hits + self.persistent_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Share of reads answered without touching the persistent tier.
    pub fn memory_hit_rate(&self) -> f64 {
        let total = self.memory_hits + self.persistent_hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.memory_hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Counter {
    MemoryHit,
    PersistentHit,
    Miss,
    Write,
    Rejected,
    SkippedPlacement,
    Removal,
}

#[derive(Debug, Default)]
struct KindCounters {
    memory_hits: AtomicU64,
    persistent_hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    rejected: AtomicU64,
    skipped_placements: AtomicU64,
    removals: AtomicU64,
}

impl KindCounters {
    fn counter(&self, counter: Counter) -> &AtomicU64 {
        match counter {
            Counter::MemoryHit => &self.memory_hits,
            Counter::PersistentHit => &self.persistent_hits,
            Counter::Miss => &self.misses,
            Counter::Write => &self.writes,
            Counter::Rejected => &self.rejected,
            Counter::SkippedPlacement => &self.skipped_placements,
            Counter::Removal => &self.removals,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    kinds: [KindCounters; 6],
}

impl StatsRecorder {
    pub(crate) fn record(&self, kind: EntityKind, counter: Counter) {
        self.add(kind, counter, 1);
    }

    pub(crate) fn add(&self, kind: EntityKind, counter: Counter, n: u64) {
        self.kinds[kind.index()]
            .counter(counter)
            .fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, kind: EntityKind) -> CacheStats {
        let c = &self.kinds[kind.index()];
        CacheStats {
            memory_hits: c.memory_hits.load(Ordering::Relaxed),
            persistent_hits: c.persistent_hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            writes: c.writes.load(Ordering::Relaxed),
            rejected: c.rejected.load(Ordering::Relaxed),
            skipped_placements: c.skipped_placements.load(Ordering::Relaxed),
            removals: c.removals.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            memory_hits: 60,
            persistent_hits: 20,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < f64::EPSILON);
        assert!((stats.memory_hit_rate() - 0.6).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_recorder_is_per_kind() {
        let recorder = StatsRecorder::default();
        recorder.record(EntityKind::User, Counter::Write);
        recorder.add(EntityKind::Message, Counter::Removal, 3);

        assert_eq!(recorder.snapshot(EntityKind::User).writes, 1);
        assert_eq!(recorder.snapshot(EntityKind::Message).removals, 3);
        assert_eq!(recorder.snapshot(EntityKind::Guild), CacheStats::default());
    }
}
