#![forbid(unsafe_code)]

use super::{
    AggValue, AggregationGroup, GroupKey, Snapshot, Source, StatsError, View, Visibility,
    group_by, resolve_views, truncate_groups, views_for, visibility_for,
};
use crate::ids::UserId;
use crate::model::{Caller, Role};
use std::collections::{BTreeMap, HashMap};

/// Named views in key order. Views the caller's role is entitled to are always present
/// (possibly empty); views outside the role are absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatisticsResponse {
    views: Vec<(View, Vec<AggregationGroup>)>,
}

impl StatisticsResponse {
    /// Assembles a response for `role`, keeping only the views the role is entitled to.
    pub fn compose(role: Role, mut groups: BTreeMap<View, Vec<AggregationGroup>>) -> Self {
        let views = views_for(role)
            .iter()
            .map(|view| (*view, groups.remove(view).unwrap_or_default()))
            .collect();
        Self { views }
    }

    pub fn get(&self, view: View) -> Option<&[AggregationGroup]> {
        self.views
            .iter()
            .find(|(candidate, _)| *candidate == view)
            .map(|(_, groups)| groups.as_slice())
    }

    pub fn contains(&self, view: View) -> bool {
        self.get(view).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.views.iter().map(|(view, _)| view.key())
    }

    pub fn iter(&self) -> impl Iterator<Item = (View, &[AggregationGroup])> {
        self.views
            .iter()
            .map(|(view, groups)| (*view, groups.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

/// Computes every view the caller's role is entitled to over one snapshot.
///
/// Views sharing a source, key and disposal filter share one grouping pass, so the
/// top-N views are cut from the same sorted laboratory grouping.
pub fn compute_statistics(
    caller: &Caller,
    snapshot: &Snapshot,
) -> Result<StatisticsResponse, StatsError> {
    snapshot.validate()?;

    let mut bases: HashMap<(Source, GroupKey, bool), Vec<AggregationGroup>> = HashMap::new();
    let mut groups = BTreeMap::new();

    for spec in resolve_views(caller.role) {
        let view_groups = match spec.source {
            Source::EachOwner => per_owner_groups(snapshot, spec.disposed),
            source => {
                let base = bases
                    .entry((source, spec.key, spec.disposed))
                    .or_insert_with(|| {
                        evaluate(
                            snapshot,
                            visibility_for(source, caller),
                            spec.key,
                            spec.disposed,
                        )
                    });
                match spec.top {
                    Some(limit) => truncate_groups(base, limit),
                    None => base.clone(),
                }
            }
        };
        groups.insert(spec.view, view_groups);
    }

    Ok(StatisticsResponse::compose(caller.role, groups))
}

fn evaluate(
    snapshot: &Snapshot,
    visibility: Visibility<'_>,
    key: GroupKey,
    disposed: bool,
) -> Vec<AggregationGroup> {
    group_by(
        snapshot
            .records
            .iter()
            .filter(|record| visibility.admits(record)),
        key,
        disposed,
    )
}

/// One owner-keyed pass over the whole snapshot, then a stable reorder by the owner's role.
/// Equivalent to concatenating each contributing owner's self-scoped grouping.
fn per_owner_groups(snapshot: &Snapshot, disposed: bool) -> Vec<AggregationGroup> {
    let mut groups = group_by(snapshot.records.iter(), GroupKey::Owner, disposed);
    groups.sort_by_key(|group| {
        owner_of(group)
            .map(|owner| snapshot.owner_rank(owner))
            .unwrap_or(u8::MAX)
    });
    groups
}

fn owner_of(group: &AggregationGroup) -> Option<UserId> {
    match group.field("owner_id") {
        Some(AggValue::Int(raw)) => UserId::try_new(*raw).ok(),
        _ => None,
    }
}
