#![forbid(unsafe_code)]

pub mod stats;

pub mod ids {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum IdError {
        NotPositive,
    }

    impl IdError {
        pub fn message(&self) -> &'static str {
            match self {
                Self::NotPositive => "id must be a positive integer",
            }
        }
    }

    macro_rules! row_id {
        ($name:ident) => {
            #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
            pub struct $name(i64);

            impl $name {
                pub fn get(self) -> i64 {
                    self.0
                }

                pub fn try_new(value: i64) -> Result<Self, IdError> {
                    if value <= 0 {
                        return Err(IdError::NotPositive);
                    }
                    Ok(Self(value))
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        };
    }

    row_id!(UserId);
    row_id!(ProjectId);
    row_id!(LaboratoryId);
    row_id!(ReagentId);
    row_id!(StockId);
}

pub mod model {
    use crate::ids::{LaboratoryId, ProjectId, StockId, UserId};
    use std::collections::BTreeSet;
    use time::Date;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub enum Role {
        LabWorker,
        ProjectManager,
        LabManager,
        Admin,
    }

    impl Role {
        pub const ALL: [Role; 4] = [
            Role::LabWorker,
            Role::ProjectManager,
            Role::LabManager,
            Role::Admin,
        ];

        pub fn as_str(self) -> &'static str {
            match self {
                Role::LabWorker => "lab_worker",
                Role::ProjectManager => "project_manager",
                Role::LabManager => "lab_manager",
                Role::Admin => "admin",
            }
        }

        pub fn parse(value: &str) -> Option<Self> {
            match value.trim().to_ascii_lowercase().as_str() {
                "lab_worker" | "worker" => Some(Role::LabWorker),
                "project_manager" | "project_procedure_manager" => Some(Role::ProjectManager),
                "lab_manager" | "laboratory_manager" => Some(Role::LabManager),
                "admin" => Some(Role::Admin),
                _ => None,
            }
        }

        /// Position of this role's users in the admin-wide composition.
        pub fn contribution_rank(self) -> u8 {
            match self {
                Role::LabManager => 0,
                Role::ProjectManager => 1,
                Role::LabWorker => 2,
                Role::Admin => 3,
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct ReagentRef {
        pub name: String,
        pub catalog_no: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct NamedRef<Id> {
        pub id: Id,
        pub name: String,
    }

    impl<Id> NamedRef<Id> {
        pub fn new(id: Id, name: impl Into<String>) -> Self {
            Self {
                id,
                name: name.into(),
            }
        }
    }

    /// One owned unit of reagent. Read-only to the statistics engine.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct StockRecord {
        pub id: StockId,
        pub reagent: ReagentRef,
        pub owner: NamedRef<UserId>,
        pub project: Option<NamedRef<ProjectId>>,
        pub laboratory: NamedRef<LaboratoryId>,
        pub disposal_date: Option<Date>,
    }

    impl StockRecord {
        pub fn is_disposed(&self) -> bool {
            self.disposal_date.is_some()
        }

        pub fn disposal_year(&self) -> Option<i32> {
            self.disposal_date.map(|date| date.year())
        }
    }

    /// The resolved identity a statistics request runs as.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct Caller {
        pub user: UserId,
        pub role: Role,
        pub managed_projects: BTreeSet<ProjectId>,
    }

    impl Caller {
        pub fn new(user: UserId, role: Role) -> Self {
            Self {
                user,
                role,
                managed_projects: BTreeSet::new(),
            }
        }

        pub fn with_managed_projects(mut self, projects: impl IntoIterator<Item = ProjectId>) -> Self {
            self.managed_projects.extend(projects);
            self
        }
    }
}

pub mod dates {
    use time::Date;
    use time::format_description::BorrowedFormatItem;
    use time::macros::format_description;

    const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum DateError {
        Empty,
        Malformed,
    }

    impl DateError {
        pub fn message(&self) -> &'static str {
            match self {
                Self::Empty => "date must not be empty",
                Self::Malformed => "date must be formatted as YYYY-MM-DD",
            }
        }
    }

    pub fn parse_date(value: &str) -> Result<Date, DateError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(DateError::Empty);
        }
        Date::parse(value, DATE_FORMAT).map_err(|_| DateError::Malformed)
    }

    pub fn format_date(date: Date) -> String {
        date.format(DATE_FORMAT)
            .unwrap_or_else(|_| format!("{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day()))
    }
}
