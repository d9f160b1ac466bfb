#![forbid(unsafe_code)]

use crate::ids::{StockId, UserId};
use crate::model::{Role, StockRecord};
use std::collections::{BTreeMap, HashSet};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnerInfo {
    pub username: String,
    pub role: Role,
}

/// A single consistent read of the record store: every stock record in discovery order
/// plus the directory of users that may own them.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub records: Vec<StockRecord>,
    pub owners: BTreeMap<UserId, OwnerInfo>,
}

impl Snapshot {
    pub fn new(records: Vec<StockRecord>, owners: BTreeMap<UserId, OwnerInfo>) -> Self {
        Self { records, owners }
    }

    /// Every record must reference a known owner and carry a reagent identity.
    pub fn validate(&self) -> Result<(), StatsError> {
        for record in &self.records {
            if record.reagent.name.trim().is_empty() {
                return Err(StatsError::MissingReagent { record: record.id });
            }
            if !self.owners.contains_key(&record.owner.id) {
                return Err(StatsError::OrphanOwner {
                    record: record.id,
                    owner: record.owner.id,
                });
            }
        }
        Ok(())
    }

    /// Owners with at least one record, lab managers first, then project managers, lab
    /// workers, admins. Within a role, order of first appearance in the snapshot.
    pub fn contributing_owners(&self) -> Vec<UserId> {
        let mut seen = HashSet::new();
        let mut owners = Vec::<UserId>::new();
        for record in &self.records {
            if seen.insert(record.owner.id) {
                owners.push(record.owner.id);
            }
        }
        owners.sort_by_key(|owner| self.owner_rank(*owner));
        owners
    }

    /// Position of the owner's role in the global composition; unknown owners sort last.
    pub fn owner_rank(&self, owner: UserId) -> u8 {
        self.owners
            .get(&owner)
            .map(|info| info.role.contribution_rank())
            .unwrap_or(u8::MAX)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatsError {
    MissingReagent { record: StockId },
    OrphanOwner { record: StockId, owner: UserId },
}

impl std::fmt::Display for StatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingReagent { record } => {
                write!(f, "stock record {record} has no reagent reference")
            }
            Self::OrphanOwner { record, owner } => {
                write!(f, "stock record {record} references unknown owner {owner}")
            }
        }
    }
}

impl std::error::Error for StatsError {}
