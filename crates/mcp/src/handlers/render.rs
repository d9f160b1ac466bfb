#![forbid(unsafe_code)]

use rl_core::dates::format_date;
use rl_core::model::StockRecord;
use rl_core::stats::{AggValue, AggregationGroup, StatisticsResponse};
use rl_storage::{ReagentRow, UserRow};
use serde_json::{Map, Value, json};

/// View key -> groups, in view order. `agg_fields` keeps field order.
pub(super) fn statistics_json(resp: &StatisticsResponse) -> Value {
    let mut views = Map::new();
    for (view, groups) in resp.iter() {
        views.insert(
            view.key().to_string(),
            Value::Array(groups.iter().map(group_json).collect()),
        );
    }
    Value::Object(views)
}

fn group_json(group: &AggregationGroup) -> Value {
    let mut fields = Map::new();
    for field in &group.agg_fields {
        let value = match &field.value {
            AggValue::Int(v) => json!(v),
            AggValue::Text(v) => json!(v),
        };
        fields.insert(field.name.to_string(), value);
    }
    let data = group
        .data
        .iter()
        .map(|entry| {
            json!({
                "reagent": entry.reagent,
                "catalog_no": entry.catalog_no,
                "count": entry.count,
            })
        })
        .collect::<Vec<_>>();
    json!({ "agg_fields": fields, "data": data })
}

pub(super) fn stock_json(record: &StockRecord) -> Value {
    json!({
        "id": record.id.get(),
        "reagent": { "name": record.reagent.name, "catalog_no": record.reagent.catalog_no },
        "owner": { "id": record.owner.id.get(), "name": record.owner.name },
        "project": record.project.as_ref().map(|p| json!({ "id": p.id.get(), "name": p.name })),
        "laboratory": { "id": record.laboratory.id.get(), "name": record.laboratory.name },
        "disposal_date": record.disposal_date.map(format_date),
    })
}

pub(super) fn user_json(user: &UserRow) -> Value {
    json!({
        "id": user.id.get(),
        "username": user.username,
        "role": user.role.as_str(),
    })
}

pub(super) fn reagent_json(reagent: &ReagentRow) -> Value {
    json!({
        "id": reagent.id.get(),
        "name": reagent.name,
        "catalog_no": reagent.catalog_no,
        "producer": reagent.producer,
        "hazard_codes": reagent.hazard_codes,
    })
}
