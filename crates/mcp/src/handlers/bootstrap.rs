#![forbid(unsafe_code)]

use super::render::user_json;
use crate::McpServer;
use rl_core::model::Role;
use rl_storage::NewUserRequest;
use serde_json::{Value, json};

/// Creates the first admin. Refused once any user exists.
pub(crate) fn handle(server: &mut McpServer, args: Value) -> Value {
    let args = match crate::args_object(args) {
        Ok(v) => v,
        Err(err) => return err,
    };
    let username = match crate::require_string(&args, "username") {
        Ok(v) => v,
        Err(err) => return err,
    };

    match server.store.user_count() {
        Ok(0) => {}
        Ok(_) => {
            return crate::ai_error_with(
                "FORBIDDEN",
                "Store already has users",
                Some("Ask an admin to add users through inventory user.add."),
                Vec::new(),
            );
        }
        Err(err) => return crate::store_error_response(err),
    }

    match server.store.add_user(NewUserRequest {
        username,
        role: Role::Admin,
    }) {
        Ok(user) => {
            tracing::info!(user = %user.id, "bootstrap admin created");
            crate::ai_ok("bootstrap", json!({ "user": user_json(&user) }))
        }
        Err(err) => crate::store_error_response(err),
    }
}
