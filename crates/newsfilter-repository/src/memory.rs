//! In-memory repository
//!
//! Map-backed storage for atoms and content filters, for tests, embedding and
//! development. Data is lost when the process exits.

use crate::error::{RepositoryError, RepositoryResult};
use crate::traits::{AtomRepository, FilterRepository};
use async_trait::async_trait;
use newsfilter_compiler::ReferenceKind;
use newsfilter_core::{ConditionAtom, FilterExpression};
use serde::Deserialize;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Seed document accepted by [`MemoryRepository::from_yaml_str`]
#[derive(Debug, Default, Deserialize)]
struct Seed {
    #[serde(default)]
    filter_conditions: Vec<ConditionAtom>,
    #[serde(default)]
    content_filters: Vec<FilterExpression>,
}

/// In-memory atom and filter storage
pub struct MemoryRepository {
    atoms: RwLock<BTreeMap<String, ConditionAtom>>,
    filters: RwLock<BTreeMap<String, FilterExpression>>,
}

impl MemoryRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self {
            atoms: RwLock::new(BTreeMap::new()),
            filters: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a repository pre-populated with atoms and filters
    pub fn with_data(
        atoms: impl IntoIterator<Item = ConditionAtom>,
        filters: impl IntoIterator<Item = FilterExpression>,
    ) -> Self {
        Self {
            atoms: RwLock::new(atoms.into_iter().map(|a| (a.id.clone(), a)).collect()),
            filters: RwLock::new(filters.into_iter().map(|f| (f.id.clone(), f)).collect()),
        }
    }

    /// Load a YAML seed with `filter_conditions` and `content_filters` lists.
    ///
    /// Stored as given, without validation.
    pub fn from_yaml_str(yaml: &str) -> RepositoryResult<Self> {
        let seed: Seed = serde_yaml::from_str(yaml)?;
        tracing::debug!(
            "Seeding memory repository with {} filter conditions and {} content filters",
            seed.filter_conditions.len(),
            seed.content_filters.len()
        );
        Ok(Self::with_data(seed.filter_conditions, seed.content_filters))
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AtomRepository for MemoryRepository {
    async fn get_atom(&self, id: &str) -> RepositoryResult<Option<ConditionAtom>> {
        Ok(self.atoms.read().await.get(id).cloned())
    }

    async fn list_atoms(&self) -> RepositoryResult<Vec<ConditionAtom>> {
        Ok(self.atoms.read().await.values().cloned().collect())
    }

    async fn find_atoms(&self, field: &str, operator: &str) -> RepositoryResult<Vec<ConditionAtom>> {
        let atoms = self.atoms.read().await;
        Ok(atoms
            .values()
            .filter(|a| a.field == field && a.operator == operator)
            .cloned()
            .collect())
    }

    async fn insert_atom(&self, atom: ConditionAtom) -> RepositoryResult<()> {
        let mut atoms = self.atoms.write().await;
        if atoms.contains_key(&atom.id) {
            return Err(RepositoryError::Storage(format!(
                "filter condition '{}' already stored",
                atom.id
            )));
        }
        atoms.insert(atom.id.clone(), atom);
        Ok(())
    }

    async fn update_atom(&self, atom: ConditionAtom) -> RepositoryResult<()> {
        let mut atoms = self.atoms.write().await;
        match atoms.get_mut(&atom.id) {
            Some(stored) => {
                *stored = atom;
                Ok(())
            }
            None => Err(RepositoryError::NotFound {
                kind: ReferenceKind::Atom,
                id: atom.id,
            }),
        }
    }

    async fn delete_atom(&self, id: &str) -> RepositoryResult<()> {
        let mut atoms = self.atoms.write().await;
        atoms
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound {
                kind: ReferenceKind::Atom,
                id: id.to_string(),
            })
    }
}

#[async_trait]
impl FilterRepository for MemoryRepository {
    async fn get_filter(&self, id: &str) -> RepositoryResult<Option<FilterExpression>> {
        Ok(self.filters.read().await.get(id).cloned())
    }

    async fn list_filters(&self) -> RepositoryResult<Vec<FilterExpression>> {
        Ok(self.filters.read().await.values().cloned().collect())
    }

    async fn filters_referencing_atom(&self, atom_id: &str) -> RepositoryResult<Vec<FilterExpression>> {
        let filters = self.filters.read().await;
        Ok(filters
            .values()
            .filter(|f| f.references_atom(atom_id))
            .cloned()
            .collect())
    }

    async fn filters_referencing_filter(
        &self,
        filter_id: &str,
    ) -> RepositoryResult<Vec<FilterExpression>> {
        let filters = self.filters.read().await;
        Ok(filters
            .values()
            .filter(|f| f.references_filter(filter_id))
            .cloned()
            .collect())
    }

    async fn insert_filter(&self, filter: FilterExpression) -> RepositoryResult<()> {
        let mut filters = self.filters.write().await;
        if filters.contains_key(&filter.id) {
            return Err(RepositoryError::Storage(format!(
                "content filter '{}' already stored",
                filter.id
            )));
        }
        filters.insert(filter.id.clone(), filter);
        Ok(())
    }

    async fn update_filter(&self, filter: FilterExpression) -> RepositoryResult<()> {
        let mut filters = self.filters.write().await;
        match filters.get_mut(&filter.id) {
            Some(stored) => {
                *stored = filter;
                Ok(())
            }
            None => Err(RepositoryError::NotFound {
                kind: ReferenceKind::Filter,
                id: filter.id,
            }),
        }
    }

    async fn delete_filter(&self, id: &str) -> RepositoryResult<()> {
        let mut filters = self.filters.write().await;
        filters
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound {
                kind: ReferenceKind::Filter,
                id: id.to_string(),
            })
    }
}
