#![forbid(unsafe_code)]

use super::catalog::decode_role;
use super::stock::{STOCK_SELECT, decode_stock_row};
use super::{SqliteStore, StoreError, decode_id};
use rl_core::ids::{ProjectId, UserId};
use rl_core::model::{Caller, Role};
use rl_core::stats::{OwnerInfo, Snapshot};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use std::collections::BTreeMap;

impl SqliteStore {
    /// Reads the owner directory and every stock record inside one read transaction, so a
    /// statistics pass never mixes two states of the store. Records come back in id order.
    pub fn statistics_snapshot(&mut self) -> Result<Snapshot, StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Deferred)?;
        let snapshot = load_snapshot(&tx)?;
        tx.commit()?;
        Ok(snapshot)
    }

    /// The caller and the snapshot they are evaluated against, read in the same
    /// transaction. An unknown user fails before any stock is read.
    pub fn statistics_snapshot_for(
        &mut self,
        user: UserId,
    ) -> Result<(Caller, Snapshot), StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Deferred)?;
        let caller = load_caller(&tx, user)?;
        let snapshot = load_snapshot(&tx)?;
        tx.commit()?;
        Ok((caller, snapshot))
    }

    /// Authorization lookup: role of the user plus, for project managers, the projects they
    /// are the designated manager of.
    pub fn resolve_caller(&self, user: UserId) -> Result<Caller, StoreError> {
        load_caller(&self.conn, user)
    }
}

fn load_snapshot(conn: &Connection) -> Result<Snapshot, StoreError> {
    let mut owners = BTreeMap::new();
    {
        let mut stmt = conn.prepare("SELECT id, username, role FROM users ORDER BY id ASC")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let role: String = row.get(2)?;
            owners.insert(
                decode_id(row.get(0)?, UserId::try_new)?,
                OwnerInfo {
                    username: row.get(1)?,
                    role: decode_role(&role)?,
                },
            );
        }
    }

    let mut records = Vec::new();
    {
        let sql = format!("{STOCK_SELECT} ORDER BY s.id ASC");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            records.push(decode_stock_row(row)?);
        }
    }

    tracing::debug!(
        records = records.len(),
        owners = owners.len(),
        "statistics snapshot loaded"
    );
    Ok(Snapshot::new(records, owners))
}

fn load_caller(conn: &Connection, user: UserId) -> Result<Caller, StoreError> {
    let role = conn
        .query_row(
            "SELECT role FROM users WHERE id=?1",
            params![user.get()],
            |row| row.get::<_, String>(0),
        )
        .optional()?
        .ok_or(StoreError::UnknownUser)?;
    let role = decode_role(&role)?;

    let mut caller = Caller::new(user, role);
    if role == Role::ProjectManager {
        caller = caller.with_managed_projects(load_managed_projects(conn, user)?);
    }
    Ok(caller)
}

fn load_managed_projects(conn: &Connection, manager: UserId) -> Result<Vec<ProjectId>, StoreError> {
    let mut stmt = conn.prepare("SELECT id FROM projects WHERE manager_id=?1 ORDER BY id ASC")?;
    let mut rows = stmt.query(params![manager.get()])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(decode_id(row.get(0)?, ProjectId::try_new)?);
    }
    Ok(out)
}
