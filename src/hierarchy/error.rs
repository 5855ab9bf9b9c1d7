use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HierarchyError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Slug '{0}' is already in use")]
    DuplicateSlug(String),

    #[error("Cannot set {parent_id} as parent of {id}: it is the node itself or one of its descendants")]
    Cycle { id: i32, parent_id: i32 },

    #[error("Node {id} has {count} child node(s); reassign or delete them first")]
    HasChildren { id: i32, count: i64 },

    #[error("Database error: {0}")]
    Database(#[from] DieselError),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl HierarchyError {
    /// Stable, machine readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            HierarchyError::Validation(_) => "validation",
            HierarchyError::NotFound(_) => "not_found",
            HierarchyError::DuplicateSlug(_) => "duplicate_slug",
            HierarchyError::Cycle { .. } => "cycle",
            HierarchyError::HasChildren { .. } => "has_children",
            HierarchyError::Database(_) | HierarchyError::Pool(_) | HierarchyError::Task(_) => {
                "internal"
            }
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            HierarchyError::Database(_) | HierarchyError::Pool(_) | HierarchyError::Task(_)
        )
    }

    /// A unique violation that slipped past the slug pre-check (two writers
    /// racing for the same slug) is still a duplicate slug.
    pub(crate) fn from_write(err: DieselError, slug: &str) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                HierarchyError::DuplicateSlug(slug.to_string())
            }
            other => HierarchyError::Database(other),
        }
    }
}
