#![forbid(unsafe_code)]

use super::render::{reagent_json, stock_json, user_json};
use crate::{Args, McpServer};
use rl_core::dates::parse_date;
use rl_core::ids::{LaboratoryId, ProjectId, ReagentId, StockId, UserId};
use rl_core::model::{Caller, Role};
use rl_storage::{
    DisposalFilter, DisposeStockRequest, NewHazardClassRequest, NewProjectRequest,
    NewReagentRequest, NewStockRequest, NewUserRequest, OwnerScope, StockFilter, StoreError,
};
use serde_json::{Value, json};

pub(crate) const OPS: &[&str] = &[
    "user.add",
    "laboratory.add",
    "project.add",
    "producer.add",
    "hazard.add",
    "reagent.add",
    "reagent.list",
    "stock.add",
    "stock.dispose",
    "stock.list",
];

const CATALOG_EDITORS: &[Role] = &[Role::Admin, Role::LabManager];

pub(crate) fn handle(server: &mut McpServer, args: Value) -> Value {
    match run(server, args) {
        Ok(v) | Err(v) => v,
    }
}

fn run(server: &mut McpServer, args: Value) -> Result<Value, Value> {
    let args = crate::args_object(args)?;
    let user = crate::require_id(&args, "user_id", UserId::try_new)?;
    let op = crate::require_string(&args, "op")?;
    let op_args = crate::args_object(args.get("args").cloned().unwrap_or(Value::Null))?;

    let caller = match server.store.resolve_caller(user) {
        Ok(caller) => caller,
        Err(StoreError::UnknownUser) => return Err(crate::unauthorized()),
        Err(err) => return Err(crate::store_error_response(err)),
    };

    let result = match op.as_str() {
        "user.add" => add_user(server, &caller, &op_args)?,
        "laboratory.add" => add_laboratory(server, &caller, &op_args)?,
        "project.add" => add_project(server, &caller, &op_args)?,
        "producer.add" => add_producer(server, &caller, &op_args)?,
        "hazard.add" => add_hazard(server, &caller, &op_args)?,
        "reagent.add" => add_reagent(server, &caller, &op_args)?,
        "reagent.list" => list_reagents(server)?,
        "stock.add" => add_stock(server, &caller, &op_args)?,
        "stock.dispose" => dispose_stock(server, &caller, &op_args)?,
        "stock.list" => list_stock(server, &caller, &op_args)?,
        _ => {
            return Err(crate::ai_error_with(
                "UNKNOWN_OP",
                &format!("Unknown inventory op: {op}"),
                Some(format!("Use one of: {}.", OPS.join(", ")).as_str()),
                Vec::new(),
            ));
        }
    };
    Ok(crate::ai_ok(&format!("inventory.{op}"), result))
}

fn require_role(caller: &Caller, allowed: &[Role], action: &str) -> Result<(), Value> {
    if allowed.contains(&caller.role) {
        return Ok(());
    }
    tracing::debug!(user = %caller.user, role = caller.role.as_str(), action, "inventory op denied");
    Err(crate::forbidden(action))
}

fn add_user(server: &mut McpServer, caller: &Caller, args: &Args) -> Result<Value, Value> {
    require_role(caller, &[Role::Admin], "add users")?;
    let username = crate::require_string(args, "username")?;
    let raw_role = crate::require_string(args, "role")?;
    let Some(role) = Role::parse(&raw_role) else {
        return Err(crate::ai_error(
            "INVALID_INPUT",
            "role must be one of: lab_worker, project_manager, lab_manager, admin",
        ));
    };
    let user = server
        .store
        .add_user(NewUserRequest { username, role })
        .map_err(crate::store_error_response)?;
    Ok(json!({ "user": user_json(&user) }))
}

fn add_laboratory(server: &mut McpServer, caller: &Caller, args: &Args) -> Result<Value, Value> {
    require_role(caller, CATALOG_EDITORS, "add laboratories")?;
    let name = crate::require_string(args, "name")?;
    let id = server
        .store
        .add_laboratory(&name)
        .map_err(crate::store_error_response)?;
    Ok(json!({ "laboratory": { "id": id.get(), "name": name.trim() } }))
}

fn add_project(server: &mut McpServer, caller: &Caller, args: &Args) -> Result<Value, Value> {
    require_role(caller, CATALOG_EDITORS, "add projects")?;
    let name = crate::require_string(args, "name")?;
    let manager = crate::optional_id(args, "manager_id", UserId::try_new)?;
    if let Some(manager) = manager {
        let row = match server.store.get_user(manager) {
            Ok(row) => row,
            Err(StoreError::UnknownUser) => {
                return Err(crate::ai_error(
                    "UNKNOWN_ID",
                    "manager_id does not reference a user",
                ));
            }
            Err(err) => return Err(crate::store_error_response(err)),
        };
        if row.role != Role::ProjectManager {
            return Err(crate::ai_error(
                "INVALID_INPUT",
                "manager_id must reference a project_manager",
            ));
        }
    }
    let id = server
        .store
        .add_project(NewProjectRequest {
            name: name.clone(),
            manager,
        })
        .map_err(crate::store_error_response)?;
    Ok(json!({
        "project": { "id": id.get(), "name": name.trim(), "manager_id": manager.map(UserId::get) }
    }))
}

fn add_producer(server: &mut McpServer, caller: &Caller, args: &Args) -> Result<Value, Value> {
    require_role(caller, CATALOG_EDITORS, "add producers")?;
    let name = crate::require_string(args, "name")?;
    let id = server
        .store
        .add_producer(&name)
        .map_err(crate::store_error_response)?;
    Ok(json!({ "producer": { "id": id, "name": name.trim() } }))
}

fn add_hazard(server: &mut McpServer, caller: &Caller, args: &Args) -> Result<Value, Value> {
    require_role(caller, CATALOG_EDITORS, "add hazard classes")?;
    let code = crate::require_string(args, "code")?;
    let description = crate::optional_string(args, "description")?.unwrap_or_default();
    let id = server
        .store
        .add_hazard_class(NewHazardClassRequest {
            code: code.clone(),
            description,
        })
        .map_err(crate::store_error_response)?;
    Ok(json!({ "hazard": { "id": id, "code": code.trim() } }))
}

fn add_reagent(server: &mut McpServer, caller: &Caller, args: &Args) -> Result<Value, Value> {
    require_role(caller, CATALOG_EDITORS, "add reagents")?;
    let reagent = server
        .store
        .add_reagent(NewReagentRequest {
            name: crate::require_string(args, "name")?,
            catalog_no: crate::require_string(args, "catalog_no")?,
            producer: crate::optional_string(args, "producer")?,
            hazard_codes: crate::optional_string_list(args, "hazard_codes")?,
        })
        .map_err(crate::store_error_response)?;
    Ok(json!({ "reagent": reagent_json(&reagent) }))
}

fn list_reagents(server: &mut McpServer) -> Result<Value, Value> {
    let reagents = server
        .store
        .list_reagents()
        .map_err(crate::store_error_response)?;
    Ok(json!({
        "reagents": reagents.iter().map(reagent_json).collect::<Vec<_>>()
    }))
}

fn add_stock(server: &mut McpServer, caller: &Caller, args: &Args) -> Result<Value, Value> {
    let request = NewStockRequest {
        reagent: crate::require_id(args, "reagent_id", ReagentId::try_new)?,
        owner: caller.user,
        project: crate::optional_id(args, "project_id", ProjectId::try_new)?,
        laboratory: crate::require_id(args, "laboratory_id", LaboratoryId::try_new)?,
        count: crate::optional_usize(args, "count")?.unwrap_or(1),
    };
    let ids = server
        .store
        .add_stock(request)
        .map_err(crate::store_error_response)?;
    Ok(json!({
        "stock_ids": ids.iter().map(|id| id.get()).collect::<Vec<_>>()
    }))
}

fn dispose_stock(server: &mut McpServer, caller: &Caller, args: &Args) -> Result<Value, Value> {
    let stock = crate::require_id(args, "stock_id", StockId::try_new)?;
    let date = match crate::optional_string(args, "date")? {
        Some(raw) => {
            parse_date(&raw).map_err(|err| crate::ai_error("INVALID_INPUT", err.message()))?
        }
        None => crate::today_utc(),
    };

    let record = server
        .store
        .get_stock(stock)
        .map_err(crate::store_error_response)?;
    if record.owner.id != caller.user && caller.role != Role::Admin {
        return Err(crate::forbidden("dispose stock owned by another user"));
    }

    let record = server
        .store
        .dispose_stock(DisposeStockRequest { stock, date })
        .map_err(crate::store_error_response)?;
    Ok(json!({ "stock": stock_json(&record) }))
}

fn list_stock(server: &mut McpServer, caller: &Caller, args: &Args) -> Result<Value, Value> {
    let disposed = match crate::optional_string(args, "disposed")?.as_deref() {
        None | Some("any") => DisposalFilter::Any,
        Some("only") => DisposalFilter::Only,
        Some("never") => DisposalFilter::Never,
        Some(_) => {
            return Err(crate::ai_error(
                "INVALID_INPUT",
                "disposed must be one of: any, only, never",
            ));
        }
    };
    let filter = StockFilter {
        scope: visible_scope(caller),
        laboratories: crate::optional_id_list(args, "laboratory_ids", LaboratoryId::try_new)?,
        disposed,
        limit: crate::optional_usize(args, "limit")?.unwrap_or(0),
        offset: crate::optional_usize(args, "offset")?.unwrap_or(0),
    };
    let records = server
        .store
        .list_stock(&filter)
        .map_err(crate::store_error_response)?;
    Ok(json!({
        "stock": records.iter().map(stock_json).collect::<Vec<_>>()
    }))
}

fn visible_scope(caller: &Caller) -> OwnerScope {
    match caller.role {
        Role::LabWorker => OwnerScope::Owner(caller.user),
        Role::ProjectManager => OwnerScope::OwnerOrProjects(
            caller.user,
            caller.managed_projects.iter().copied().collect(),
        ),
        Role::LabManager | Role::Admin => OwnerScope::Any,
    }
}
