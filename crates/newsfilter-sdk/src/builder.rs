//! Builder pattern for FilterEngine

use crate::catalog::CatalogHandle;
use crate::config::EngineConfig;
use crate::engine::FilterEngine;
use crate::error::Result;
use chrono::{DateTime, Utc};
use newsfilter_compiler::CompilerOptions;
use newsfilter_core::{FieldCatalog, Vocabulary};
use newsfilter_repository::{
    AtomRepository, ConditionRegistry, ConsumerLookup, FilterRepository, FilterService,
    MemoryConsumers, MemoryRepository,
};
use std::sync::Arc;

/// Builder for FilterEngine
///
/// # Example
///
/// ```rust,ignore
/// use newsfilter_sdk::{EngineConfig, FilterEngineBuilder};
///
/// // Seeded in-memory storage
/// let engine = FilterEngineBuilder::new()
///     .with_config(EngineConfig::load()?)
///     .with_seed_yaml(seed)
///     .build()?;
///
/// // Existing storage and consumer registry
/// let engine = FilterEngineBuilder::new()
///     .with_repository(store)
///     .with_consumers(consumers)
///     .build()?;
/// ```
pub struct FilterEngineBuilder {
    config: EngineConfig,
    atoms: Option<Arc<dyn AtomRepository>>,
    filters: Option<Arc<dyn FilterRepository>>,
    consumers: Option<Arc<dyn ConsumerLookup>>,
    vocabularies: Vec<Vocabulary>,
    seed_yaml: Option<String>,
    clock: Option<DateTime<Utc>>,
}

impl FilterEngineBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            atoms: None,
            filters: None,
            consumers: None,
            vocabularies: Vec::new(),
            seed_yaml: None,
            clock: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_compiler_options(mut self, options: CompilerOptions) -> Self {
        self.config.compiler = options;
        self
    }

    pub fn strict_operators(mut self, strict: bool) -> Self {
        self.config.compiler.strict_operators = strict;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.config.compiler.max_depth = max_depth;
        self
    }

    /// Storage for both atoms and filters
    pub fn with_repository<R>(mut self, repository: Arc<R>) -> Self
    where
        R: AtomRepository + FilterRepository + 'static,
    {
        let atoms: Arc<dyn AtomRepository> = repository.clone();
        let filters: Arc<dyn FilterRepository> = repository;
        self.atoms = Some(atoms);
        self.filters = Some(filters);
        self
    }

    pub fn with_atom_repository(mut self, atoms: Arc<dyn AtomRepository>) -> Self {
        self.atoms = Some(atoms);
        self
    }

    pub fn with_filter_repository(mut self, filters: Arc<dyn FilterRepository>) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Subscriber and routing scheme lookup used by the delete guards
    pub fn with_consumers(mut self, consumers: Arc<dyn ConsumerLookup>) -> Self {
        self.consumers = Some(consumers);
        self
    }

    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabularies.push(vocabulary);
        self
    }

    pub fn with_vocabularies(mut self, vocabularies: impl IntoIterator<Item = Vocabulary>) -> Self {
        self.vocabularies.extend(vocabularies);
        self
    }

    /// Seed in-memory storage from YAML (`filter_conditions`, `content_filters`).
    ///
    /// Ignored for whichever store was supplied explicitly.
    pub fn with_seed_yaml(mut self, yaml: impl Into<String>) -> Self {
        self.seed_yaml = Some(yaml.into());
        self
    }

    /// Evaluate computed fields against a fixed instant
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(now);
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<FilterEngine> {
        let memory = Arc::new(match &self.seed_yaml {
            Some(yaml) => MemoryRepository::from_yaml_str(yaml)?,
            None => MemoryRepository::new(),
        });
        let atoms: Arc<dyn AtomRepository> = match self.atoms {
            Some(atoms) => atoms,
            None => memory.clone(),
        };
        let filters: Arc<dyn FilterRepository> = match self.filters {
            Some(filters) => filters,
            None => memory,
        };
        let consumers = self
            .consumers
            .unwrap_or_else(|| Arc::new(MemoryConsumers::new()));

        let catalog = FieldCatalog::new(self.config.catalog.excluded_vocabulary_fields.clone())
            .with_vocabularies(self.vocabularies);

        let registry = ConditionRegistry::new(atoms.clone(), filters.clone());
        let filter_service = FilterService::new(atoms, filters, consumers)
            .with_max_depth(self.config.compiler.max_depth);

        tracing::info!(
            "Filter engine ready ({} fields, max depth {})",
            catalog.capabilities().len(),
            self.config.compiler.max_depth
        );

        Ok(FilterEngine {
            config: self.config,
            catalog: CatalogHandle::new(catalog),
            registry,
            filters: filter_service,
            clock: self.clock,
        })
    }
}

impl Default for FilterEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let engine = FilterEngineBuilder::new().build().unwrap();
        assert_eq!(engine.config().compiler.max_depth, 32);
        assert!(!engine.config().compiler.strict_operators);
    }

    #[test]
    fn test_builder_options() {
        let engine = FilterEngineBuilder::new()
            .max_depth(3)
            .strict_operators(true)
            .build()
            .unwrap();
        assert_eq!(engine.config().compiler.max_depth, 3);
        assert!(engine.config().compiler.strict_operators);
    }

    #[test]
    fn test_invalid_seed_fails() {
        let result = FilterEngineBuilder::new()
            .with_seed_yaml("filter_conditions: {broken")
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_supplied_repository_is_used() {
        let repo = Arc::new(MemoryRepository::from_yaml_str(
            "content_filters:\n  - _id: f1\n    name: f1\n    content_filter: []\n",
        )
        .unwrap());
        let engine = FilterEngineBuilder::new()
            .with_repository(repo.clone())
            .build()
            .unwrap();

        assert_eq!(engine.filters().list().await.unwrap().len(), 1);
        assert!(repo.get_filter("f1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_vocabularies_feed_catalog() {
        let engine = FilterEngineBuilder::new()
            .with_vocabulary(Vocabulary::new("regions").manageable())
            .build()
            .unwrap();
        assert!(engine.catalog().snapshot().await.contains("regions"));
    }
}
