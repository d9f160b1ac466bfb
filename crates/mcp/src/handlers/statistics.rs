#![forbid(unsafe_code)]

use super::render::statistics_json;
use crate::McpServer;
use rl_core::ids::UserId;
use rl_core::model::Role;
use rl_core::stats::compute_statistics;
use rl_storage::StoreError;
use serde_json::Value;
use std::time::Instant;

pub(crate) fn handle(server: &mut McpServer, args: Value) -> Value {
    let args = match crate::args_object(args) {
        Ok(v) => v,
        Err(err) => return err,
    };
    let user = match crate::require_id(&args, "user_id", UserId::try_new) {
        Ok(v) => v,
        Err(err) => return err,
    };

    let started = Instant::now();
    let (caller, snapshot) = match server.store.statistics_snapshot_for(user) {
        Ok(loaded) => loaded,
        Err(StoreError::UnknownUser) => return crate::unauthorized(),
        Err(err) => {
            tracing::error!(user = %user, error = %err, "statistics snapshot failed");
            return crate::store_error_response(err);
        }
    };
    let resp = match compute_statistics(&caller, &snapshot) {
        Ok(resp) => resp,
        Err(err) => {
            tracing::error!(user = %user, error = %err, "statistics aborted on integrity violation");
            return crate::stats_error_response(&err);
        }
    };

    tracing::info!(
        user = %user,
        role = caller.role.as_str(),
        records = snapshot.records.len(),
        views = resp.len(),
        groups = resp.iter().map(|(_, groups)| groups.len()).sum::<usize>(),
        elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
        "statistics computed"
    );

    let mut warnings = Vec::new();
    if caller.role == Role::ProjectManager && caller.managed_projects.is_empty() {
        warnings.push(crate::warning(
            "NO_MANAGED_PROJECTS",
            "Caller manages no projects; project views are empty.",
            "Assign the caller as manager of a project to populate project views.",
        ));
    }
    crate::ai_ok_with_warnings("statistics", statistics_json(&resp), warnings, Vec::new())
}
