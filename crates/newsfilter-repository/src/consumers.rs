//! Delete-guard consumers
//!
//! Subscribers reach content filters through products: a product carries a
//! `filter_id`, and a subscriber lists products under `products` (push
//! delivery) or `api_products` (content API). Routing schemes reference
//! filters from their rules.

use crate::error::RepositoryResult;
use crate::traits::ConsumerLookup;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Content filter applied to the product
    #[serde(default)]
    pub filter_id: Option<String>,
}

impl Product {
    pub fn new(id: impl Into<String>, filter_id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            filter_id: Some(filter_id.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub name: String,

    #[serde(default)]
    pub products: Vec<String>,

    #[serde(default)]
    pub api_products: Vec<String>,
}

impl Subscriber {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            products: Vec::new(),
            api_products: Vec::new(),
        }
    }

    pub fn with_product(mut self, product_id: impl Into<String>) -> Self {
        self.products.push(product_id.into());
        self
    }

    pub fn with_api_product(mut self, product_id: impl Into<String>) -> Self {
        self.api_products.push(product_id.into());
        self
    }

    fn uses_any(&self, product_ids: &[&str]) -> bool {
        self.products
            .iter()
            .chain(self.api_products.iter())
            .any(|p| product_ids.contains(&p.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingRule {
    pub name: String,

    /// Content filter the rule applies
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingScheme {
    pub name: String,

    #[serde(default)]
    pub rules: Vec<RoutingRule>,
}

impl RoutingScheme {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, name: impl Into<String>, filter_id: impl Into<String>) -> Self {
        self.rules.push(RoutingRule {
            name: name.into(),
            filter: Some(filter_id.into()),
        });
        self
    }
}

/// In-memory consumer registry
#[derive(Default)]
pub struct MemoryConsumers {
    products: RwLock<Vec<Product>>,
    subscribers: RwLock<Vec<Subscriber>>,
    routing_schemes: RwLock<Vec<RoutingScheme>>,
}

impl MemoryConsumers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(mut self, product: Product) -> Self {
        self.products.get_mut().push(product);
        self
    }

    pub fn with_subscriber(mut self, subscriber: Subscriber) -> Self {
        self.subscribers.get_mut().push(subscriber);
        self
    }

    pub fn with_routing_scheme(mut self, scheme: RoutingScheme) -> Self {
        self.routing_schemes.get_mut().push(scheme);
        self
    }

    pub async fn remove_subscriber(&self, name: &str) {
        self.subscribers.write().await.retain(|s| s.name != name);
    }

    pub async fn remove_routing_scheme(&self, name: &str) {
        self.routing_schemes.write().await.retain(|s| s.name != name);
    }
}

#[async_trait]
impl ConsumerLookup for MemoryConsumers {
    async fn subscribers_referencing(&self, filter_id: &str) -> RepositoryResult<Vec<String>> {
        let products = self.products.read().await;
        let product_ids: Vec<&str> = products
            .iter()
            .filter(|p| p.filter_id.as_deref() == Some(filter_id))
            .map(|p| p.id.as_str())
            .collect();
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }

        let subscribers = self.subscribers.read().await;
        Ok(subscribers
            .iter()
            .filter(|s| s.uses_any(&product_ids))
            .map(|s| s.name.clone())
            .collect())
    }

    async fn routing_schemes_referencing(&self, filter_id: &str) -> RepositoryResult<Vec<String>> {
        let schemes = self.routing_schemes.read().await;
        Ok(schemes
            .iter()
            .filter(|s| s.rules.iter().any(|r| r.filter.as_deref() == Some(filter_id)))
            .map(|s| s.name.clone())
            .collect())
    }
}
