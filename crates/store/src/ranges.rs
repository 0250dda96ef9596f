//! Pending-range bookkeeping: sorted, disjoint, merge-on-insert.
//!
//! Each (asset_id, resolution) key owns one of these lists. Inserting a range
//! that overlaps or abuts existing entries collapses them into their union,
//! which bounds the number of outstanding ranges and prevents duplicate
//! recomputation.

use rollup_core::TimeRange;

/// Merges `incoming` into a sorted, disjoint list of pending ranges.
/// Returns the union range actually stored.
pub fn merge_into(pending: &mut Vec<TimeRange>, incoming: TimeRange) -> TimeRange {
    let mut merged = incoming;

    // Drain every range that overlaps or abuts the incoming one.
    let mut i = 0;
    while i < pending.len() {
        let existing = pending[i];
        if merged.overlaps(&existing) || merged.abuts(&existing) {
            merged = merged.merge(&existing);
            pending.remove(i);
        } else {
            i += 1;
        }
    }

    let pos = pending
        .partition_point(|r| r.start < merged.start);
    pending.insert(pos, merged);
    merged
}

/// Whether any pending range overlaps `range`.
pub fn overlaps_any(pending: &[TimeRange], range: &TimeRange) -> bool {
    pending.iter().any(|r| r.overlaps(range))
}
