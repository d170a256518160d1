//! Newsfilter Repository - storage for filter conditions and content filters
//!
//! - [`AtomRepository`] / [`FilterRepository`]: async storage traits, with an
//!   in-memory implementation in [`MemoryRepository`]
//! - [`ConsumerLookup`]: the delete-guard consumers (subscribers, routing
//!   schemes), with [`MemoryConsumers`] for tests and embedding
//! - [`GraphLoader`]: resolves a filter and everything it reaches into a
//!   [`newsfilter_compiler::FilterGraph`]
//! - [`ConditionRegistry`] and [`FilterService`]: validated create, update and
//!   delete, similarity lookup and impact analysis

pub mod consumers;
pub mod error;
pub mod filters;
pub mod loader;
pub mod memory;
pub mod registry;
pub mod traits;

pub use consumers::{MemoryConsumers, Product, RoutingRule, RoutingScheme, Subscriber};
pub use error::{ConsumerKind, Reference, RepositoryError, RepositoryResult};
pub use filters::FilterService;
pub use loader::GraphLoader;
pub use memory::MemoryRepository;
pub use registry::ConditionRegistry;
pub use traits::{AtomRepository, ConsumerLookup, FilterRepository};
