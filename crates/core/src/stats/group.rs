#![forbid(unsafe_code)]

use crate::model::StockRecord;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AggValue {
    Int(i64),
    Text(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AggField {
    pub name: &'static str,
    pub value: AggValue,
}

impl AggField {
    pub fn int(name: &'static str, value: i64) -> Self {
        Self {
            name,
            value: AggValue::Int(value),
        }
    }

    pub fn text(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: AggValue::Text(value.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReagentCount {
    pub reagent: String,
    pub catalog_no: String,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregationGroup {
    pub agg_fields: Vec<AggField>,
    pub data: Vec<ReagentCount>,
}

impl AggregationGroup {
    pub fn field(&self, name: &str) -> Option<&AggValue> {
        self.agg_fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }

    pub fn year(&self) -> Option<i32> {
        match self.field("year") {
            Some(AggValue::Int(year)) => i32::try_from(*year).ok(),
            _ => None,
        }
    }

    pub fn total(&self) -> u64 {
        self.data.iter().map(|entry| entry.count).sum()
    }
}

/// The dimension a grouping collapses records by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Owner,
    Project,
    Laboratory,
}

/// One record's position in a grouping: the outer key fields plus, for disposal
/// groupings, the disposal year.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyValue {
    pub fields: Vec<AggField>,
    pub year: Option<i32>,
}

impl GroupKey {
    /// Extracts this key from a record. `None` excludes the record from the grouping:
    /// records without a project never land in project groups, and undisposed records
    /// never land in year-bucketed groups.
    pub fn extract(self, record: &StockRecord, by_year: bool) -> Option<KeyValue> {
        let year = if by_year {
            Some(record.disposal_year()?)
        } else {
            None
        };
        let fields = match self {
            GroupKey::Owner => vec![
                AggField::int("owner_id", record.owner.id.get()),
                AggField::text("owner", record.owner.name.as_str()),
            ],
            GroupKey::Project => {
                let project = record.project.as_ref()?;
                vec![
                    AggField::int("project_id", project.id.get()),
                    AggField::text("project", project.name.as_str()),
                ]
            }
            GroupKey::Laboratory => vec![
                AggField::int("laboratory_id", record.laboratory.id.get()),
                AggField::text("laboratory", record.laboratory.name.as_str()),
            ],
        };
        Some(KeyValue { fields, year })
    }
}

#[derive(Default)]
struct YearBucket {
    counts: Vec<ReagentCount>,
    index: HashMap<(String, String), usize>,
}

impl YearBucket {
    fn add(&mut self, record: &StockRecord) {
        let key = (record.reagent.name.clone(), record.reagent.catalog_no.clone());
        if let Some(&slot) = self.index.get(&key) {
            self.counts[slot].count += 1;
            return;
        }
        self.index.insert(key, self.counts.len());
        self.counts.push(ReagentCount {
            reagent: record.reagent.name.clone(),
            catalog_no: record.reagent.catalog_no.clone(),
            count: 1,
        });
    }
}

struct OuterBucket {
    fields: Vec<AggField>,
    years: BTreeMap<Reverse<Option<i32>>, YearBucket>,
}

/// Collapses records into reagent counts per key value.
///
/// Output order is deterministic and independent of hashing:
/// - outer keys appear in order of first occurrence;
/// - year buckets under the same outer key are most recent first;
/// - within a group, counts are descending, ties keep first-occurrence order.
pub fn group_records<'a, I, F>(records: I, key_fn: F) -> Vec<AggregationGroup>
where
    I: IntoIterator<Item = &'a StockRecord>,
    F: Fn(&StockRecord) -> Option<KeyValue>,
{
    let mut outers: Vec<OuterBucket> = Vec::new();
    let mut outer_index: HashMap<Vec<AggField>, usize> = HashMap::new();

    for record in records {
        let Some(key) = key_fn(record) else {
            continue;
        };
        let outer_slot = match outer_index.get(&key.fields) {
            Some(&slot) => slot,
            None => {
                outer_index.insert(key.fields.clone(), outers.len());
                outers.push(OuterBucket {
                    fields: key.fields,
                    years: BTreeMap::new(),
                });
                outers.len() - 1
            }
        };
        outers[outer_slot]
            .years
            .entry(Reverse(key.year))
            .or_default()
            .add(record);
    }

    let mut out = Vec::new();
    for outer in outers {
        for (Reverse(year), bucket) in outer.years {
            let mut data = bucket.counts;
            data.sort_by(|a, b| b.count.cmp(&a.count));
            let mut agg_fields = outer.fields.clone();
            if let Some(year) = year {
                agg_fields.push(AggField::int("year", i64::from(year)));
            }
            out.push(AggregationGroup { agg_fields, data });
        }
    }
    out
}

/// Convenience over [`group_records`] for one of the built-in keys.
pub fn group_by<'a, I>(records: I, key: GroupKey, by_year: bool) -> Vec<AggregationGroup>
where
    I: IntoIterator<Item = &'a StockRecord>,
{
    group_records(records, |record| key.extract(record, by_year))
}
