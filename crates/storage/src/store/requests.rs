#![forbid(unsafe_code)]

use rl_core::ids::{LaboratoryId, ProjectId, ReagentId, StockId, UserId};
use rl_core::model::Role;
use time::Date;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUserRequest {
    pub username: String,
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewProjectRequest {
    pub name: String,
    pub manager: Option<UserId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewHazardClassRequest {
    pub code: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewReagentRequest {
    pub name: String,
    pub catalog_no: String,
    pub producer: Option<String>,
    pub hazard_codes: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewStockRequest {
    pub reagent: ReagentId,
    pub owner: UserId,
    pub project: Option<ProjectId>,
    pub laboratory: LaboratoryId,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisposeStockRequest {
    pub stock: StockId,
    pub date: Date,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisposalFilter {
    #[default]
    Any,
    Only,
    Never,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OwnerScope {
    #[default]
    Any,
    Owner(UserId),
    Projects(Vec<ProjectId>),
    OwnerOrProjects(UserId, Vec<ProjectId>),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StockFilter {
    pub scope: OwnerScope,
    /// Empty means every laboratory.
    pub laboratories: Vec<LaboratoryId>,
    pub disposed: DisposalFilter,
    pub limit: usize,
    pub offset: usize,
}
