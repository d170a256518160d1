//! FilterEngine - the consumer-facing entry point
//!
//! Ties the field catalog, the condition registry and the content filter
//! service together. Every compile or match loads the filter graph fresh from
//! storage, so results always reflect the stored filters.

use crate::catalog::CatalogHandle;
use crate::config::EngineConfig;
use crate::error::{Result, SdkError};
use chrono::{DateTime, Utc};
use newsfilter_compiler::{FilterCompiler, FilterGraph, MatchMode, ReferenceKind};
use newsfilter_core::{ConditionAtom, Document, FieldCatalog, FilterExpression};
use newsfilter_repository::{ConditionRegistry, FilterService, RepositoryError};
use serde_json::Value as Json;

/// Content filter engine
pub struct FilterEngine {
    pub(crate) config: EngineConfig,
    pub(crate) catalog: CatalogHandle,
    pub(crate) registry: ConditionRegistry,
    pub(crate) filters: FilterService,
    /// Fixed evaluation instant, `None` for the wall clock
    pub(crate) clock: Option<DateTime<Utc>>,
}

impl FilterEngine {
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CatalogHandle {
        &self.catalog
    }

    pub fn registry(&self) -> &ConditionRegistry {
        &self.registry
    }

    pub fn filters(&self) -> &FilterService {
        &self.filters
    }

    // ========== Filter conditions ==========

    /// Validate against the current catalog and store a new atom
    pub async fn create_condition(&self, atom: ConditionAtom) -> Result<ConditionAtom> {
        let catalog = self.catalog.snapshot().await;
        Ok(self.registry.create(&catalog, atom).await?)
    }

    pub async fn update_condition(&self, atom: ConditionAtom) -> Result<()> {
        let catalog = self.catalog.snapshot().await;
        Ok(self.registry.update(&catalog, atom).await?)
    }

    pub async fn delete_condition(&self, id: &str) -> Result<()> {
        Ok(self.registry.delete(id).await?)
    }

    /// Stored atoms similar to `candidate`
    pub async fn find_similar_conditions(&self, candidate: &ConditionAtom) -> Result<Vec<ConditionAtom>> {
        let catalog = self.catalog.snapshot().await;
        Ok(self.registry.find_similar(&catalog, candidate).await?)
    }

    // ========== Content filters ==========

    pub async fn create_filter(&self, filter: FilterExpression) -> Result<FilterExpression> {
        Ok(self.filters.create(filter).await?)
    }

    pub async fn update_filter(&self, filter: FilterExpression) -> Result<()> {
        Ok(self.filters.update(filter).await?)
    }

    pub async fn delete_filter(&self, id: &str) -> Result<()> {
        Ok(self.filters.delete(id).await?)
    }

    // ========== Compilation and matching ==========

    /// Document-store query for a stored filter
    pub async fn store_query(&self, filter_id: &str) -> Result<Json> {
        let (filter, graph) = self.load(filter_id).await?;
        let catalog = self.catalog.snapshot().await;
        Ok(self.compiler(&graph, &catalog).to_store_query(&filter)?)
    }

    /// Search-backend query for a stored filter
    pub async fn search_query(&self, filter_id: &str, mode: MatchMode) -> Result<Json> {
        let (filter, graph) = self.load(filter_id).await?;
        let catalog = self.catalog.snapshot().await;
        Ok(self.compiler(&graph, &catalog).to_search_query(&filter, mode)?)
    }

    /// Direct match of one document against a filter, stored or not.
    ///
    /// An absent filter matches every document.
    pub async fn does_match(&self, filter: Option<&FilterExpression>, doc: &Document) -> Result<bool> {
        let Some(filter) = filter else {
            return Ok(true);
        };
        let graph = self.filters.loader().load_for(filter).await?;
        let catalog = self.catalog.snapshot().await;
        Ok(self.compiler(&graph, &catalog).does_match(Some(filter), doc)?)
    }

    /// Direct match of one document against a stored filter
    pub async fn does_filter_id_match(&self, filter_id: &str, doc: &Document) -> Result<bool> {
        let (filter, graph) = self.load(filter_id).await?;
        let catalog = self.catalog.snapshot().await;
        Ok(self.compiler(&graph, &catalog).does_match(Some(&filter), doc)?)
    }

    /// Whether `doc` passes every global filter not listed in `disabled`.
    ///
    /// Global filters block: a document matching any of them fails.
    pub async fn conforms_global_filters(&self, doc: &Document, disabled: &[&str]) -> Result<bool> {
        for filter in self.filters.global_filters().await? {
            if disabled.contains(&filter.id.as_str()) {
                continue;
            }
            if self.does_match(Some(&filter), doc).await? {
                tracing::debug!("Document blocked by global filter '{}'", filter.name);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether any API-blocking filter matches `doc`
    pub async fn is_api_blocked(&self, doc: &Document) -> Result<bool> {
        for filter in self.filters.api_blocking_filters().await? {
            if self.does_match(Some(&filter), doc).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn load(&self, filter_id: &str) -> Result<(FilterExpression, FilterGraph)> {
        match self.filters.loader().load(filter_id).await {
            Err(RepositoryError::NotFound {
                kind: ReferenceKind::Filter,
                ..
            }) => Err(SdkError::FilterNotFound(filter_id.to_string())),
            other => Ok(other?),
        }
    }

    fn compiler<'a>(&self, graph: &'a FilterGraph, catalog: &'a FieldCatalog) -> FilterCompiler<'a> {
        let compiler = FilterCompiler::new(graph, catalog).with_options(self.config.compiler.clone());
        match self.clock {
            Some(now) => compiler.with_clock(now),
            None => compiler,
        }
    }
}
