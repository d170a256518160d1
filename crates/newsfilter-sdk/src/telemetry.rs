//! Tracing initialisation

use crate::error::{Result, SdkError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default directives for the given level, covering every crate of the engine
pub fn default_directives(level: &str) -> String {
    ["newsfilter_sdk", "newsfilter_repository", "newsfilter_compiler", "newsfilter_core"]
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default directives. Fails, without panicking, if
/// a global subscriber is already installed.
pub fn init_tracing(level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directives(level).into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| SdkError::ConfigError(format!("Failed to initialize tracing: {}", e)))
}
