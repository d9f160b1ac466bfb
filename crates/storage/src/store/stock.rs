#![forbid(unsafe_code)]

use super::{
    DisposalFilter, DisposeStockRequest, NewStockRequest, OwnerScope, SqliteStore, StockFilter,
    StoreError, decode_date, decode_id, encode_date, list_window, map_write_error, now_ms,
};
use rl_core::ids::{LaboratoryId, ProjectId, StockId, UserId};
use rl_core::model::{NamedRef, ReagentRef, StockRecord};
use rusqlite::types::Value as SqlValue;
use rusqlite::{OptionalExtension, Row, params, params_from_iter};

const MAX_UNITS_PER_ADD: usize = 10_000;

/// Joined projection of a stock row. Catalog joins are LEFT joins so a dangling
/// reference surfaces as an empty label instead of a silently dropped row.
pub(super) const STOCK_SELECT: &str = "SELECT s.id, r.name, r.catalog_no, s.owner_id, u.username, \
     s.project_id, p.name, s.laboratory_id, l.name, s.disposal_date \
     FROM stock s \
     LEFT JOIN reagents r ON r.id = s.reagent_id \
     LEFT JOIN users u ON u.id = s.owner_id \
     LEFT JOIN projects p ON p.id = s.project_id \
     LEFT JOIN laboratories l ON l.id = s.laboratory_id";

pub(super) fn decode_stock_row(row: &Row<'_>) -> Result<StockRecord, StoreError> {
    let project_id: Option<i64> = row.get(5)?;
    let project = match project_id {
        Some(raw) => Some(NamedRef::new(
            decode_id(raw, ProjectId::try_new)?,
            row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        )),
        None => None,
    };
    Ok(StockRecord {
        id: decode_id(row.get(0)?, StockId::try_new)?,
        reagent: ReagentRef {
            name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            catalog_no: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        },
        owner: NamedRef::new(
            decode_id(row.get(3)?, UserId::try_new)?,
            row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        ),
        project,
        laboratory: NamedRef::new(
            decode_id(row.get(7)?, LaboratoryId::try_new)?,
            row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        ),
        disposal_date: decode_date(row.get(9)?)?,
    })
}

impl SqliteStore {
    /// Adds `count` identical units in one transaction and returns their ids in order.
    pub fn add_stock(&mut self, request: NewStockRequest) -> Result<Vec<StockId>, StoreError> {
        if request.count == 0 {
            return Err(StoreError::InvalidInput("count must be at least 1"));
        }
        if request.count > MAX_UNITS_PER_ADD {
            return Err(StoreError::InvalidInput("count is too large"));
        }

        let created_at_ms = now_ms();
        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(request.count);
        for _ in 0..request.count {
            tx.execute(
                "INSERT INTO stock(reagent_id, owner_id, project_id, laboratory_id, disposal_date, created_at_ms) \
                 VALUES (?1, ?2, ?3, ?4, NULL, ?5)",
                params![
                    request.reagent.get(),
                    request.owner.get(),
                    request.project.map(ProjectId::get),
                    request.laboratory.get(),
                    created_at_ms,
                ],
            )
            .map_err(|err| map_write_error(err, "stock record"))?;
            ids.push(decode_id(tx.last_insert_rowid(), StockId::try_new)?);
        }
        tx.commit()?;
        Ok(ids)
    }

    pub fn get_stock(&self, id: StockId) -> Result<StockRecord, StoreError> {
        let sql = format!("{STOCK_SELECT} WHERE s.id=?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![id.get()])?;
        match rows.next()? {
            Some(row) => decode_stock_row(row),
            None => Err(StoreError::UnknownId),
        }
    }

    /// Records the disposal/utilization date of one unit. Re-disposing overwrites the date.
    pub fn dispose_stock(&mut self, request: DisposeStockRequest) -> Result<StockRecord, StoreError> {
        let tx = self.conn.transaction()?;
        let exists = tx
            .query_row(
                "SELECT 1 FROM stock WHERE id=?1",
                params![request.stock.get()],
                |_| Ok(()),
            )
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::UnknownId);
        }
        tx.execute(
            "UPDATE stock SET disposal_date=?2 WHERE id=?1",
            params![request.stock.get(), encode_date(request.date)],
        )?;
        tx.commit()?;
        self.get_stock(request.stock)
    }

    pub fn list_stock(&self, filter: &StockFilter) -> Result<Vec<StockRecord>, StoreError> {
        let (limit, offset) = list_window(filter.limit, filter.offset)?;
        let mut sql = String::from(STOCK_SELECT);
        let mut params: Vec<SqlValue> = Vec::new();
        let mut clauses: Vec<String> = Vec::new();

        match &filter.scope {
            OwnerScope::Any => {}
            OwnerScope::Owner(owner) => {
                clauses.push("s.owner_id = ?".to_string());
                params.push(SqlValue::Integer(owner.get()));
            }
            OwnerScope::Projects(projects) => {
                clauses.push(in_clause("s.project_id", projects.len()));
                params.extend(projects.iter().map(|id| SqlValue::Integer(id.get())));
            }
            OwnerScope::OwnerOrProjects(owner, projects) => {
                clauses.push(format!(
                    "(s.owner_id = ? OR {})",
                    in_clause("s.project_id", projects.len())
                ));
                params.push(SqlValue::Integer(owner.get()));
                params.extend(projects.iter().map(|id| SqlValue::Integer(id.get())));
            }
        }

        if !filter.laboratories.is_empty() {
            clauses.push(in_clause("s.laboratory_id", filter.laboratories.len()));
            params.extend(
                filter
                    .laboratories
                    .iter()
                    .map(|id| SqlValue::Integer(id.get())),
            );
        }

        match filter.disposed {
            DisposalFilter::Any => {}
            DisposalFilter::Only => clauses.push("s.disposal_date IS NOT NULL".to_string()),
            DisposalFilter::Never => clauses.push("s.disposal_date IS NULL".to_string()),
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY s.id ASC LIMIT ? OFFSET ?");
        params.push(SqlValue::Integer(limit));
        params.push(SqlValue::Integer(offset));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(decode_stock_row(row)?);
        }
        Ok(out)
    }
}

/// `column IN (?, ?, ...)`; an empty set matches nothing.
fn in_clause(column: &str, len: usize) -> String {
    if len == 0 {
        return "0".to_string();
    }
    let marks = vec!["?"; len].join(", ");
    format!("{column} IN ({marks})")
}
