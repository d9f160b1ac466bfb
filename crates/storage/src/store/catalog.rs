#![forbid(unsafe_code)]

use super::{
    NewHazardClassRequest, NewProjectRequest, NewReagentRequest, NewUserRequest, SqliteStore,
    StoreError, decode_id, map_write_error, normalize_name, now_ms,
};
use rl_core::ids::{LaboratoryId, ProjectId, ReagentId, UserId};
use rl_core::model::Role;
use rusqlite::{OptionalExtension, Transaction, params};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRow {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReagentRow {
    pub id: ReagentId,
    pub name: String,
    pub catalog_no: String,
    pub producer: Option<String>,
    pub hazard_codes: Vec<String>,
}

impl SqliteStore {
    pub fn add_user(&mut self, request: NewUserRequest) -> Result<UserRow, StoreError> {
        let username = normalize_name(&request.username, "username must be a non-empty name")?;
        self.conn
            .execute(
                "INSERT INTO users(username, role, created_at_ms) VALUES (?1, ?2, ?3)",
                params![username, request.role.as_str(), now_ms()],
            )
            .map_err(|err| map_write_error(err, "user"))?;
        let id = decode_id(self.conn.last_insert_rowid(), UserId::try_new)?;
        Ok(UserRow {
            id,
            username,
            role: request.role,
        })
    }

    pub fn user_count(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(1) FROM users", [], |row| row.get(0))?)
    }

    pub fn get_user(&self, id: UserId) -> Result<UserRow, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT username, role FROM users WHERE id=?1",
                params![id.get()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((username, role)) = row else {
            return Err(StoreError::UnknownUser);
        };
        Ok(UserRow {
            id,
            username,
            role: decode_role(&role)?,
        })
    }

    pub fn add_laboratory(&mut self, name: &str) -> Result<LaboratoryId, StoreError> {
        let name = normalize_name(name, "laboratory name must be a non-empty name")?;
        self.conn
            .execute("INSERT INTO laboratories(name) VALUES (?1)", params![name])
            .map_err(|err| map_write_error(err, "laboratory"))?;
        decode_id(self.conn.last_insert_rowid(), LaboratoryId::try_new)
    }

    pub fn add_project(&mut self, request: NewProjectRequest) -> Result<ProjectId, StoreError> {
        let name = normalize_name(&request.name, "project name must be a non-empty name")?;
        self.conn
            .execute(
                "INSERT INTO projects(name, manager_id) VALUES (?1, ?2)",
                params![name, request.manager.map(UserId::get)],
            )
            .map_err(|err| map_write_error(err, "project"))?;
        decode_id(self.conn.last_insert_rowid(), ProjectId::try_new)
    }

    pub fn add_producer(&mut self, name: &str) -> Result<i64, StoreError> {
        let name = normalize_name(name, "producer name must be a non-empty name")?;
        self.conn
            .execute("INSERT INTO producers(name) VALUES (?1)", params![name])
            .map_err(|err| map_write_error(err, "producer"))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn add_hazard_class(&mut self, request: NewHazardClassRequest) -> Result<i64, StoreError> {
        let code = normalize_name(&request.code, "hazard code must be non-empty")?;
        self.conn
            .execute(
                "INSERT INTO hazard_classes(code, description) VALUES (?1, ?2)",
                params![code, request.description.trim()],
            )
            .map_err(|err| map_write_error(err, "hazard class"))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Adds a reagent to the catalog. The producer is created on first use; hazard codes
    /// must already exist.
    pub fn add_reagent(&mut self, request: NewReagentRequest) -> Result<ReagentRow, StoreError> {
        let name = normalize_name(&request.name, "reagent name must be a non-empty name")?;
        let catalog_no =
            normalize_name(&request.catalog_no, "catalog number must be non-empty")?;
        let producer = request
            .producer
            .as_deref()
            .map(|value| normalize_name(value, "producer name must be a non-empty name"))
            .transpose()?;
        let mut hazard_codes = request
            .hazard_codes
            .iter()
            .map(|code| normalize_name(code, "hazard code must be non-empty"))
            .collect::<Result<Vec<_>, _>>()?;
        hazard_codes.sort();
        hazard_codes.dedup();

        let tx = self.conn.transaction()?;
        let producer_id = match producer.as_deref() {
            Some(producer) => Some(ensure_producer_tx(&tx, producer)?),
            None => None,
        };
        tx.execute(
            "INSERT INTO reagents(name, catalog_no, producer_id) VALUES (?1, ?2, ?3)",
            params![name, catalog_no, producer_id],
        )
        .map_err(|err| map_write_error(err, "reagent"))?;
        let reagent_id = tx.last_insert_rowid();

        for code in &hazard_codes {
            let hazard_id = tx
                .query_row(
                    "SELECT id FROM hazard_classes WHERE code=?1",
                    params![code],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?
                .ok_or(StoreError::InvalidInput("unknown hazard code"))?;
            tx.execute(
                "INSERT INTO reagent_hazards(reagent_id, hazard_id) VALUES (?1, ?2)",
                params![reagent_id, hazard_id],
            )?;
        }
        tx.commit()?;

        Ok(ReagentRow {
            id: decode_id(reagent_id, ReagentId::try_new)?,
            name,
            catalog_no,
            producer,
            hazard_codes,
        })
    }

    pub fn list_reagents(&self) -> Result<Vec<ReagentRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.name, r.catalog_no, p.name, \
               (SELECT group_concat(code, '|') FROM ( \
                  SELECT h.code AS code FROM reagent_hazards rh \
                  JOIN hazard_classes h ON h.id = rh.hazard_id \
                  WHERE rh.reagent_id = r.id ORDER BY h.code)) \
             FROM reagents r LEFT JOIN producers p ON p.id = r.producer_id \
             ORDER BY r.name ASC, r.catalog_no ASC",
        )?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let hazards: Option<String> = row.get(4)?;
            out.push(ReagentRow {
                id: decode_id(row.get(0)?, ReagentId::try_new)?,
                name: row.get(1)?,
                catalog_no: row.get(2)?,
                producer: row.get(3)?,
                hazard_codes: hazards
                    .map(|raw| raw.split('|').map(str::to_string).collect())
                    .unwrap_or_default(),
            });
        }
        Ok(out)
    }
}

fn ensure_producer_tx(tx: &Transaction<'_>, name: &str) -> Result<i64, StoreError> {
    tx.execute(
        "INSERT OR IGNORE INTO producers(name) VALUES (?1)",
        params![name],
    )?;
    Ok(tx.query_row(
        "SELECT id FROM producers WHERE name=?1",
        params![name],
        |row| row.get(0),
    )?)
}

pub(super) fn decode_role(raw: &str) -> Result<Role, StoreError> {
    Role::parse(raw).ok_or_else(|| StoreError::Integrity(format!("unknown role tag: {raw}")))
}
