//! Shared field catalog with vocabulary refresh
//!
//! Readers take an immutable snapshot; vocabulary changes build a new catalog
//! and swap it in, so a compilation in progress keeps the catalog it started
//! with.

use newsfilter_core::{FieldCapability, FieldCatalog, VocabularyEvent};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

/// Cloneable handle to the current field catalog
#[derive(Clone)]
pub struct CatalogHandle {
    current: Arc<RwLock<Arc<FieldCatalog>>>,
}

impl CatalogHandle {
    pub fn new(catalog: FieldCatalog) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(catalog))),
        }
    }

    /// Catalog as of now
    pub async fn snapshot(&self) -> Arc<FieldCatalog> {
        self.current.read().await.clone()
    }

    /// Published capabilities, the listing offered to filter editors
    pub async fn capabilities(&self) -> Vec<FieldCapability> {
        self.snapshot()
            .await
            .capabilities()
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn apply(&self, event: VocabularyEvent) {
        let mut current = self.current.write().await;
        let mut next = FieldCatalog::clone(&current);
        next.apply(event);
        *current = Arc::new(next);
    }

    /// Apply events from `events` until every sender is dropped
    pub fn spawn_listener(&self, mut events: mpsc::Receiver<VocabularyEvent>) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                handle.apply(event).await;
            }
            tracing::debug!("Vocabulary listener stopped");
        })
    }
}

impl Default for CatalogHandle {
    fn default() -> Self {
        Self::new(FieldCatalog::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsfilter_core::Vocabulary;

    fn regions() -> Vocabulary {
        Vocabulary::new("regions")
            .manageable()
            .with_item("nsw", "New South Wales")
    }

    #[tokio::test]
    async fn test_apply_swaps_snapshot() {
        let handle = CatalogHandle::default();
        let before = handle.snapshot().await;
        assert!(!before.contains("regions"));

        handle.apply(VocabularyEvent::Upserted(regions())).await;
        assert!(handle.snapshot().await.contains("regions"));
        // earlier snapshots are unaffected
        assert!(!before.contains("regions"));

        handle
            .apply(VocabularyEvent::Deleted("regions".to_string()))
            .await;
        assert!(!handle.snapshot().await.contains("regions"));
    }

    #[tokio::test]
    async fn test_listener_applies_events() {
        let handle = CatalogHandle::default();
        let (tx, rx) = mpsc::channel(4);
        let listener = handle.spawn_listener(rx);

        tx.send(VocabularyEvent::Upserted(regions())).await.unwrap();
        drop(tx);
        listener.await.unwrap();

        let capabilities = handle.capabilities().await;
        assert!(capabilities.iter().any(|c| c.name == "regions"));
    }
}
