// src/config.rs
// =============================================================================
// Configuration for an audit run.
//
// Settings come from an optional TOML file; command-line flags override the
// file, and every key has a default except the store location. Validation
// runs before any session starts: a session never begins without a usable
// document source.
//
// Example file:
//
//   [store]
//   root = "./data"
//
//   [audit]
//   sample-size = 10
//   concurrency = 1
//
//   [http]
//   timeout-secs = 10
//   max-redirects = 5
//   user-agent = "field-link-audit/0.1"
// =============================================================================

use crate::checker::HttpSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Upper bound on checks in flight at once
pub const MAX_CONCURRENCY: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no store location configured (set [store] root or pass --store)")]
    MissingStore,

    #[error("store location '{0}' is not a directory")]
    StoreNotADirectory(PathBuf),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Complete configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub store: StoreConfig,
    pub audit: AuditConfig,
    pub http: HttpConfig,
}

/// Where documents live
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub root: Option<PathBuf>,
}

/// Audit session behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Documents sampled for field sniffing
    #[serde(rename = "sample-size")]
    pub sample_size: usize,

    /// Checks in flight at once; 1 means strictly sequential
    pub concurrency: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            sample_size: 10,
            concurrency: 1,
        }
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    #[serde(rename = "max-redirects")]
    pub max_redirects: usize,

    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_redirects: 5,
            user_agent: format!("field-link-audit/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    pub fn settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.timeout_secs),
            max_redirects: self.max_redirects,
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub store_root: Option<PathBuf>,
    pub sample_size: Option<usize>,
    pub concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Reads and parses a TOML config file (no validation).
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the file if given, else defaults, then applies overrides and
    /// validates the result.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, overrides: &Overrides) {
        if let Some(root) = &overrides.store_root {
            self.store.root = Some(root.clone());
        }
        if let Some(sample_size) = overrides.sample_size {
            self.audit.sample_size = sample_size;
        }
        if let Some(concurrency) = overrides.concurrency {
            self.audit.concurrency = concurrency;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.http.timeout_secs = timeout_secs;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let root = self.store.root.as_ref().ok_or(ConfigError::MissingStore)?;
        if !root.is_dir() {
            return Err(ConfigError::StoreNotADirectory(root.clone()));
        }

        if self.audit.sample_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "audit.sample-size",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(1..=MAX_CONCURRENCY).contains(&self.audit.concurrency) {
            return Err(ConfigError::InvalidValue {
                field: "audit.concurrency",
                reason: format!("must be between 1 and {}", MAX_CONCURRENCY),
            });
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "http.timeout-secs",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// The validated store root.
    pub fn store_root(&self) -> Result<&Path, ConfigError> {
        self.store
            .root
            .as_deref()
            .ok_or(ConfigError::MissingStore)
    }
}
