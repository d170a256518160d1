//! Configuration types for FilterEngine

use crate::error::{Result, SdkError};
use newsfilter_compiler::CompilerOptions;
use serde::{Deserialize, Serialize};

/// Base name of the optional config file (`.yaml`, `.toml` or `.json`)
pub const DEFAULT_CONFIG_FILE: &str = "config/newsfilter";

/// Prefix of environment overrides, e.g. `NEWSFILTER__COMPILER__MAX_DEPTH`
pub const ENV_PREFIX: &str = "NEWSFILTER";

/// Main engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Compiler options
    pub compiler: CompilerOptions,

    /// Field catalog settings
    pub catalog: CatalogConfig,

    /// Default level for the crate log targets
    pub log_level: String,
}

/// Field catalog settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Vocabulary ids exposed as fields even when not manageable
    pub excluded_vocabulary_fields: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compiler: CompilerOptions::default(),
            catalog: CatalogConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `.env`, the optional `config/newsfilter` file and
    /// `NEWSFILTER__*` environment variables
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from the config file at `base` (extension optional) layered under
    /// environment overrides. A missing file yields the defaults.
    pub fn load_from(base: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(base).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| SdkError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: EngineConfig = settings
            .try_deserialize()
            .map_err(|e| SdkError::ConfigError(format!("Failed to deserialize config: {}", e)))?;
        config.validate()?;

        tracing::debug!("Loaded engine configuration: {:?}", config);
        Ok(config)
    }

    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: EngineConfig = serde_yaml::from_str(yaml)
            .map_err(|e| SdkError::ConfigError(format!("Failed to parse YAML config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_compiler_options(mut self, options: CompilerOptions) -> Self {
        self.compiler = options;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.compiler.max_depth = max_depth;
        self
    }

    pub fn with_strict_operators(mut self, strict: bool) -> Self {
        self.compiler.strict_operators = strict;
        self
    }

    pub fn with_excluded_vocabulary_field(mut self, id: impl Into<String>) -> Self {
        self.catalog.excluded_vocabulary_fields.push(id.into());
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    fn validate(&self) -> Result<()> {
        if self.compiler.max_depth == 0 {
            return Err(SdkError::ConfigError(
                "compiler.max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
