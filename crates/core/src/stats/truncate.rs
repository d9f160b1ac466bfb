#![forbid(unsafe_code)]

use super::AggregationGroup;

pub const TOP10_LIMIT: usize = 10;
pub const TOP20_LIMIT: usize = 20;

/// Keeps the leading `max_per_group` reagents of every group. Groups are expected to be
/// sorted already and are never re-sorted or padded.
pub fn truncate_groups(groups: &[AggregationGroup], max_per_group: usize) -> Vec<AggregationGroup> {
    groups
        .iter()
        .map(|group| AggregationGroup {
            agg_fields: group.agg_fields.clone(),
            data: group.data.iter().take(max_per_group).cloned().collect(),
        })
        .collect()
}
