#![forbid(unsafe_code)]

use crate::McpServer;
use crate::handlers::{bootstrap, inventory, statistics};
use serde_json::Value;

pub(crate) fn dispatch_tool(server: &mut McpServer, name: &str, args: Value) -> Option<Value> {
    let resp = match name {
        "statistics" => statistics::handle(server, args),
        "inventory" => inventory::handle(server, args),
        "bootstrap" => bootstrap::handle(server, args),
        _ => return None,
    };
    Some(resp)
}
