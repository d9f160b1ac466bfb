#![forbid(unsafe_code)]

use serde_json::{Value, json};

fn user_id_property() -> Value {
    json!({ "type": "integer", "minimum": 1, "description": "Id of the calling user." })
}

pub(crate) fn tool_definitions() -> Vec<Value> {
    vec![
        json!({
            "name": "statistics",
            "description": "Role-scoped reagent usage and disposal statistics. Returns every view the caller's role is entitled to, keyed by view name.",
            "inputSchema": {
                "type": "object",
                "properties": { "user_id": user_id_property() },
                "required": ["user_id"]
            }
        }),
        json!({
            "name": "inventory",
            "description": "Role-gated catalog and stock operations: user.add, laboratory.add, project.add, producer.add, hazard.add, reagent.add, reagent.list, stock.add, stock.dispose, stock.list.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "user_id": user_id_property(),
                    "op": {
                        "type": "string",
                        "enum": crate::handlers::inventory::OPS
                    },
                    "args": { "type": "object" }
                },
                "required": ["user_id", "op"]
            }
        }),
        json!({
            "name": "bootstrap",
            "description": "Creates the first admin user of an empty store.",
            "inputSchema": {
                "type": "object",
                "properties": { "username": { "type": "string" } },
                "required": ["username"]
            }
        }),
    ]
}
