//! Engine configuration
//!
//! Read from `aql-engine.toml` in a configuration directory. A `.env` file in
//! the same directory is loaded first, then these variables override the file:
//!
//! - `AQL_DIALECT` - SQL dialect (derby, mysql, oracle, postgresql, sqlserver)
//! - `AQL_EAGER_LIMIT` - maximum rows an eager result materializes
//! - `AQL_DRY_RUN_DEFAULT` - dry-run mode for actions that do not set it
//! - `AQL_LOG_FILTER` - tracing filter used by the tooling binary
//! - `AQL_TRASHCAN_ENABLED` - hide trashcan content from queries

use std::path::Path;

use aql_core::{Dialect, TrashcanSettings};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "aql-engine.toml";

pub const ENV_DIALECT: &str = "AQL_DIALECT";
pub const ENV_EAGER_LIMIT: &str = "AQL_EAGER_LIMIT";
pub const ENV_DRY_RUN_DEFAULT: &str = "AQL_DRY_RUN_DEFAULT";
pub const ENV_LOG_FILTER: &str = "AQL_LOG_FILTER";
pub const ENV_TRASHCAN_ENABLED: &str = "AQL_TRASHCAN_ENABLED";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub dialect: Dialect,
    /// Upper bound on rows fetched by an eager query
    #[serde(default = "default_eager_limit")]
    pub eager_limit: i64,
    #[serde(default = "default_dry_run")]
    pub dry_run_default: bool,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub trashcan: TrashcanSettings,
}

fn default_eager_limit() -> i64 {
    10_000
}

fn default_dry_run() -> bool {
    true
}

fn default_log_filter() -> String {
    "artifact_aql=info,aql_core=info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            eager_limit: default_eager_limit(),
            dry_run_default: default_dry_run(),
            log_filter: default_log_filter(),
            trashcan: TrashcanSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a directory.
    ///
    /// A missing config file yields the defaults; environment overrides apply either way.
    pub fn load(dir: &Path) -> EngineResult<Self> {
        let env_path = dir.join(".env");
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
        }

        let config_path = dir.join(CONFIG_FILE_NAME);
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> EngineResult<Self> {
        toml::from_str(content).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Apply overrides from a variable lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> EngineResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(dialect) = var(ENV_DIALECT) {
            self.dialect = dialect
                .parse()
                .map_err(|e: aql_core::AqlError| EngineError::Config(e.to_string()))?;
        }

        if let Some(limit) = var(ENV_EAGER_LIMIT) {
            self.eager_limit = limit
                .trim()
                .parse()
                .map_err(|_| EngineError::Config(format!("{} must be a number: {}", ENV_EAGER_LIMIT, limit)))?;
        }

        if let Some(dry_run) = var(ENV_DRY_RUN_DEFAULT) {
            self.dry_run_default = parse_flag(ENV_DRY_RUN_DEFAULT, &dry_run)?;
        }

        if let Some(filter) = var(ENV_LOG_FILTER) {
            self.log_filter = filter;
        }

        if let Some(enabled) = var(ENV_TRASHCAN_ENABLED) {
            self.trashcan.enabled = parse_flag(ENV_TRASHCAN_ENABLED, &enabled)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.eager_limit <= 0 {
            return Err(EngineError::Config(format!(
                "eager_limit must be positive, got {}",
                self.eager_limit
            )));
        }
        if self.trashcan.enabled && self.trashcan.repo_key.is_empty() {
            return Err(EngineError::Config("trashcan.repo_key must not be empty".to_string()));
        }
        Ok(())
    }

    /// Save configuration to a directory
    pub fn save(&self, dir: &Path) -> EngineResult<()> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }
}

fn parse_flag(name: &str, value: &str) -> EngineResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(EngineError::Config(format!("{} must be true or false: {}", name, other))),
    }
}
