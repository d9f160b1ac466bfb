#![forbid(unsafe_code)]

use super::GroupKey;
use crate::ids::{ProjectId, UserId};
use crate::model::{Caller, Role, StockRecord};
use std::collections::BTreeSet;

/// Named views of a statistics response, in response key order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum View {
    WorkerPersonal,
    WorkerDisposed,
    ProjectProcedurePersonal,
    ProjectProcedureDisposed,
    LaboratoryPersonal,
    LaboratoryDisposed,
    Top10Laboratory,
    Top20Laboratory,
    GlobalPersonal,
    GlobalDisposed,
}

impl View {
    pub const ALL: [View; 10] = [
        View::WorkerPersonal,
        View::WorkerDisposed,
        View::ProjectProcedurePersonal,
        View::ProjectProcedureDisposed,
        View::LaboratoryPersonal,
        View::LaboratoryDisposed,
        View::Top10Laboratory,
        View::Top20Laboratory,
        View::GlobalPersonal,
        View::GlobalDisposed,
    ];

    pub fn key(self) -> &'static str {
        match self {
            View::WorkerPersonal => "worker_personal_reagents",
            View::WorkerDisposed => "worker_disposed_utilized_personal_reagents",
            View::ProjectProcedurePersonal => "project_procedure_personal_reagents",
            View::ProjectProcedureDisposed => {
                "project_procedure_disposed_utilized_personal_reagents"
            }
            View::LaboratoryPersonal => "laboratory_personal_reagents",
            View::LaboratoryDisposed => "laboratory_disposed_utilized_personal_reagents",
            View::Top10Laboratory => "top10_laboratory_personal_reagents",
            View::Top20Laboratory => "top20_laboratory_personal_reagents",
            View::GlobalPersonal => "global_personal_reagents",
            View::GlobalDisposed => "global_disposed_utilized_personal_reagents",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|view| view.key() == key)
    }

    pub fn spec(self) -> ViewSpec {
        let (source, key, disposed, top) = match self {
            View::WorkerPersonal => (Source::SelfOwned, GroupKey::Owner, false, None),
            View::WorkerDisposed => (Source::SelfOwned, GroupKey::Owner, true, None),
            View::ProjectProcedurePersonal => {
                (Source::ManagedProjects, GroupKey::Project, false, None)
            }
            View::ProjectProcedureDisposed => {
                (Source::ManagedProjects, GroupKey::Project, true, None)
            }
            View::LaboratoryPersonal => (Source::AllRecords, GroupKey::Laboratory, false, None),
            View::LaboratoryDisposed => (Source::AllRecords, GroupKey::Laboratory, true, None),
            View::Top10Laboratory => (
                Source::AllRecords,
                GroupKey::Laboratory,
                false,
                Some(super::TOP10_LIMIT),
            ),
            View::Top20Laboratory => (
                Source::AllRecords,
                GroupKey::Laboratory,
                false,
                Some(super::TOP20_LIMIT),
            ),
            View::GlobalPersonal => (Source::EachOwner, GroupKey::Owner, false, None),
            View::GlobalDisposed => (Source::EachOwner, GroupKey::Owner, true, None),
        };
        ViewSpec {
            view: self,
            source,
            key,
            disposed,
            top,
        }
    }
}

/// Which record subset a view aggregates over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    /// Records owned by the caller.
    SelfOwned,
    /// Records of every owner inside the projects the caller manages.
    ManagedProjects,
    /// Every record in every laboratory.
    AllRecords,
    /// The caller's self-owned view repeated for every owner with records.
    EachOwner,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewSpec {
    pub view: View,
    pub source: Source,
    pub key: GroupKey,
    /// Only records with a disposal date, bucketed by disposal year.
    pub disposed: bool,
    pub top: Option<usize>,
}

const WORKER_VIEWS: &[View] = &[View::WorkerPersonal, View::WorkerDisposed];

const PROJECT_MANAGER_VIEWS: &[View] = &[
    View::WorkerPersonal,
    View::WorkerDisposed,
    View::ProjectProcedurePersonal,
    View::ProjectProcedureDisposed,
];

const LAB_MANAGER_VIEWS: &[View] = &[
    View::WorkerPersonal,
    View::WorkerDisposed,
    View::LaboratoryPersonal,
    View::LaboratoryDisposed,
    View::Top10Laboratory,
    View::Top20Laboratory,
];

const ADMIN_VIEWS: &[View] = &[
    View::LaboratoryPersonal,
    View::LaboratoryDisposed,
    View::Top10Laboratory,
    View::Top20Laboratory,
    View::GlobalPersonal,
    View::GlobalDisposed,
];

/// The views a role is entitled to, in response key order.
pub fn views_for(role: Role) -> &'static [View] {
    match role {
        Role::LabWorker => WORKER_VIEWS,
        Role::ProjectManager => PROJECT_MANAGER_VIEWS,
        Role::LabManager => LAB_MANAGER_VIEWS,
        Role::Admin => ADMIN_VIEWS,
    }
}

pub fn resolve_views(role: Role) -> Vec<ViewSpec> {
    views_for(role).iter().map(|view| view.spec()).collect()
}

/// Record-level visibility predicate for one view evaluation.
#[derive(Clone, Copy, Debug)]
pub enum Visibility<'a> {
    Owner(UserId),
    Projects(&'a BTreeSet<ProjectId>),
    All,
}

impl Visibility<'_> {
    pub fn admits(&self, record: &StockRecord) -> bool {
        match self {
            Visibility::Owner(owner) => record.owner.id == *owner,
            Visibility::Projects(projects) => record
                .project
                .as_ref()
                .is_some_and(|project| projects.contains(&project.id)),
            Visibility::All => true,
        }
    }
}

/// Visibility of a view's source for the given caller. `EachOwner` views are resolved
/// per contributing owner by the composer and never reach this function with a caller.
pub fn visibility_for(source: Source, caller: &Caller) -> Visibility<'_> {
    match source {
        Source::SelfOwned | Source::EachOwner => Visibility::Owner(caller.user),
        Source::ManagedProjects => Visibility::Projects(&caller.managed_projects),
        Source::AllRecords => Visibility::All,
    }
}
