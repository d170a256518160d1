//! Core trait definitions for the repository pattern
//!
//! This module defines three traits:
//!
//! - [`AtomRepository`]: storage for condition atoms
//! - [`FilterRepository`]: storage for content filters
//! - [`ConsumerLookup`]: external consumers checked before a content filter
//!   is deleted
//!
//! # Examples
//!
//! ```no_run
//! use newsfilter_core::ConditionAtom;
//! use newsfilter_repository::{AtomRepository, MemoryRepository};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let repo = MemoryRepository::new();
//! repo.insert_atom(ConditionAtom::new("sport", "genre", "in", "Sport")).await?;
//!
//! let same_shape = repo.find_atoms("genre", "in").await?;
//! assert_eq!(same_shape.len(), 1);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use newsfilter_core::{ConditionAtom, FilterExpression};

use crate::RepositoryResult;

/// Storage for condition atoms
///
/// # Implementation Notes
///
/// - All operations are async; callers may sit on top of a remote store
/// - `insert_atom` expects the id to be assigned already
/// - `update_atom` and `delete_atom` fail with `NotFound` for unknown ids
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` for use across async tasks.
#[async_trait]
pub trait AtomRepository: Send + Sync {
    /// Get an atom by id
    async fn get_atom(&self, id: &str) -> RepositoryResult<Option<ConditionAtom>>;

    /// All stored atoms
    async fn list_atoms(&self) -> RepositoryResult<Vec<ConditionAtom>>;

    /// Atoms with the given field and operator token
    async fn find_atoms(&self, field: &str, operator: &str) -> RepositoryResult<Vec<ConditionAtom>>;

    async fn insert_atom(&self, atom: ConditionAtom) -> RepositoryResult<()>;

    async fn update_atom(&self, atom: ConditionAtom) -> RepositoryResult<()>;

    async fn delete_atom(&self, id: &str) -> RepositoryResult<()>;
}

/// Storage for content filters
///
/// Same CRUD shape as [`AtomRepository`], plus the reverse lookups used by
/// delete guards.
#[async_trait]
pub trait FilterRepository: Send + Sync {
    /// Get a content filter by id
    async fn get_filter(&self, id: &str) -> RepositoryResult<Option<FilterExpression>>;

    /// All stored content filters
    async fn list_filters(&self) -> RepositoryResult<Vec<FilterExpression>>;

    /// Filters whose groups reference the atom directly
    async fn filters_referencing_atom(&self, atom_id: &str) -> RepositoryResult<Vec<FilterExpression>>;

    /// Filters whose groups reference the filter directly
    async fn filters_referencing_filter(
        &self,
        filter_id: &str,
    ) -> RepositoryResult<Vec<FilterExpression>>;

    async fn insert_filter(&self, filter: FilterExpression) -> RepositoryResult<()>;

    async fn update_filter(&self, filter: FilterExpression) -> RepositoryResult<()>;

    async fn delete_filter(&self, id: &str) -> RepositoryResult<()>;
}

/// Consumers outside the filter graph that reference content filters
#[async_trait]
pub trait ConsumerLookup: Send + Sync {
    /// Names of subscribers delivering through the filter
    async fn subscribers_referencing(&self, filter_id: &str) -> RepositoryResult<Vec<String>>;

    /// Names of routing schemes with a rule using the filter
    async fn routing_schemes_referencing(&self, filter_id: &str) -> RepositoryResult<Vec<String>>;
}
