//! Content filter service
//!
//! Validated create and update (structure, references, acyclicity), guarded
//! delete, and the traversal helpers used for impact analysis.

use crate::error::{ConsumerKind, Reference, RepositoryError, RepositoryResult};
use crate::loader::GraphLoader;
use crate::traits::{AtomRepository, ConsumerLookup, FilterRepository};
use newsfilter_compiler::{validate_filter, ReferenceKind, DEFAULT_MAX_DEPTH};
use newsfilter_core::FilterExpression;
use std::sync::Arc;

/// Storage-facing service for content filters
pub struct FilterService {
    atoms: Arc<dyn AtomRepository>,
    filters: Arc<dyn FilterRepository>,
    consumers: Arc<dyn ConsumerLookup>,
    max_depth: usize,
}

impl FilterService {
    pub fn new(
        atoms: Arc<dyn AtomRepository>,
        filters: Arc<dyn FilterRepository>,
        consumers: Arc<dyn ConsumerLookup>,
    ) -> Self {
        Self {
            atoms,
            filters,
            consumers,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn loader(&self) -> GraphLoader<'_> {
        GraphLoader::new(self.atoms.as_ref(), self.filters.as_ref(), self.max_depth)
    }

    pub async fn get(&self, id: &str) -> RepositoryResult<FilterExpression> {
        self.filters
            .get_filter(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                kind: ReferenceKind::Filter,
                id: id.to_string(),
            })
    }

    pub async fn list(&self) -> RepositoryResult<Vec<FilterExpression>> {
        self.filters.list_filters().await
    }

    /// Filters applied to every outgoing item
    pub async fn global_filters(&self) -> RepositoryResult<Vec<FilterExpression>> {
        Ok(self
            .filters
            .list_filters()
            .await?
            .into_iter()
            .filter(|f| f.is_global)
            .collect())
    }

    /// Filters blocking items from the content API
    pub async fn api_blocking_filters(&self) -> RepositoryResult<Vec<FilterExpression>> {
        Ok(self
            .filters
            .list_filters()
            .await?
            .into_iter()
            .filter(|f| f.api_block)
            .collect())
    }

    /// Validate and store a new filter, assigning an id when it has none
    pub async fn create(&self, mut filter: FilterExpression) -> RepositoryResult<FilterExpression> {
        if filter.id.is_empty() {
            filter.id = uuid::Uuid::new_v4().to_string();
        }
        if filter.name.is_empty() {
            filter.name = filter.id.clone();
        }

        self.check(&filter).await?;
        self.filters.insert_filter(filter.clone()).await?;
        tracing::info!("Created content filter '{}'", filter.name);
        Ok(filter)
    }

    /// Validate against the stored graph, with `filter` replacing its stored
    /// version, and store
    pub async fn update(&self, filter: FilterExpression) -> RepositoryResult<()> {
        self.get(&filter.id).await?;
        self.check(&filter).await?;
        self.filters.update_filter(filter.clone()).await?;
        tracing::info!("Updated content filter '{}'", filter.name);
        Ok(())
    }

    /// Delete a filter no subscriber, routing scheme or other filter references
    pub async fn delete(&self, id: &str) -> RepositoryResult<()> {
        self.get(id).await?;

        let mut references: Vec<Reference> = Vec::new();
        references.extend(
            self.consumers
                .subscribers_referencing(id)
                .await?
                .into_iter()
                .map(|name| Reference::new(ConsumerKind::Subscriber, name)),
        );
        references.extend(
            self.consumers
                .routing_schemes_referencing(id)
                .await?
                .into_iter()
                .map(|name| Reference::new(ConsumerKind::RoutingScheme, name)),
        );
        references.extend(
            self.filters
                .filters_referencing_filter(id)
                .await?
                .into_iter()
                .filter(|f| f.id != id)
                .map(|f| Reference::new(ConsumerKind::ContentFilter, f.name)),
        );

        if !references.is_empty() {
            tracing::debug!("Refusing to delete content filter '{}': {} references", id, references.len());
            return Err(RepositoryError::InUse {
                kind: ReferenceKind::Filter,
                id: id.to_string(),
                references,
            });
        }

        self.filters.delete_filter(id).await?;
        tracing::info!("Deleted content filter '{}'", id);
        Ok(())
    }

    /// Stored filters `id` reaches through nested references
    pub async fn referenced_filters(&self, id: &str) -> RepositoryResult<Vec<FilterExpression>> {
        let (_, graph) = self.loader().load(id).await?;
        Ok(graph
            .referenced_filters(id)
            .iter()
            .filter_map(|nested| graph.filter(nested).cloned())
            .collect())
    }

    /// Stored filters that reach `id` through nested references
    pub async fn referencing_filters(&self, id: &str) -> RepositoryResult<Vec<FilterExpression>> {
        let graph = self.loader().load_all().await?;
        Ok(graph
            .referencing_filters(id)
            .iter()
            .filter_map(|f| graph.filter(f).cloned())
            .collect())
    }

    /// Every filter that depends on the atom, directly or through nesting
    pub async fn filters_using_atom(&self, atom_id: &str) -> RepositoryResult<Vec<FilterExpression>> {
        let graph = self.loader().load_all().await?;
        Ok(graph
            .filters_using_atom(atom_id)
            .iter()
            .filter_map(|f| graph.filter(f).cloned())
            .collect())
    }

    async fn check(&self, filter: &FilterExpression) -> RepositoryResult<()> {
        let stored = self.filters.list_filters().await?;
        if stored
            .iter()
            .any(|f| f.id != filter.id && f.name == filter.name)
        {
            return Err(RepositoryError::DuplicateName {
                kind: ReferenceKind::Filter,
                name: filter.name.clone(),
            });
        }

        let graph = self.loader().load_for(filter).await?;
        validate_filter(&graph, filter)?;
        Ok(())
    }
}
