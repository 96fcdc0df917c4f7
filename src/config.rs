use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::EndpointCache;
use crate::entity::{KindId, KindRegistry};
use crate::graph::{RelationshipRegistry, DEFAULT_DISTANCE_LIMIT, NAME_MAX_LENGTH};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub relgraph: RelgraphConfig,
    #[serde(default)]
    pub traversal: TraversalConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Entity kinds addressable by `namespace.name`.
    #[serde(default)]
    pub kinds: Vec<KindConfig>,
    /// Relationships defined at startup.
    #[serde(default)]
    pub relationships: Vec<RelationshipConfig>,
}

/// Storage and logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelgraphConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Traversal configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TraversalConfig {
    #[serde(default = "default_distance_limit")]
    pub default_limit: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_distance_limit(),
        }
    }
}

/// Endpoint cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_endpoint_cache_capacity")]
    pub endpoint_cache_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            endpoint_cache_capacity: default_endpoint_cache_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KindConfig {
    pub namespace: String,
    pub name: String,
}

/// `from` and `to` are `namespace.Name` references to configured kinds.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationshipConfig {
    pub name: String,
    pub from: String,
    pub to: String,
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_distance_limit() -> usize {
    DEFAULT_DISTANCE_LIMIT
}

fn default_endpoint_cache_capacity() -> usize {
    256
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in RELGRAPH_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("RELGRAPH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::parse(&config_str)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str)
            .context("Failed to parse config.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.cache.endpoint_cache_capacity == 0 {
            anyhow::bail!("cache.endpoint_cache_capacity must be greater than 0");
        }

        let mut seen_kinds = HashSet::new();
        for kind in &self.kinds {
            if kind.namespace.is_empty() || kind.name.is_empty() {
                anyhow::bail!("kinds entries need both namespace and name");
            }
            let id = KindId::new(kind.namespace.as_str(), &kind.name);
            if !seen_kinds.insert(id.clone()) {
                anyhow::bail!("duplicate kind: {}", id.qualified());
            }
        }

        let mut seen_names = HashSet::new();
        for rel in &self.relationships {
            if rel.name.chars().count() > NAME_MAX_LENGTH {
                anyhow::bail!(
                    "relationship name '{}' exceeds {} characters",
                    rel.name,
                    NAME_MAX_LENGTH
                );
            }
            if !seen_names.insert(rel.name.as_str()) {
                anyhow::bail!("relationship '{}' defined more than once", rel.name);
            }
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.relgraph.db_path
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.relgraph.migrations_dir
    }

    /// Kind registry holding every configured kind
    pub fn kind_registry(&self) -> KindRegistry {
        let mut kinds = KindRegistry::new();
        for kind in &self.kinds {
            kinds.register(KindId::new(kind.namespace.as_str(), &kind.name));
        }
        kinds
    }

    /// Endpoint cache sized by `cache.endpoint_cache_capacity`
    pub fn endpoint_cache<E: Clone>(&self) -> EndpointCache<E> {
        EndpointCache::new(self.cache.endpoint_cache_capacity)
    }

    /// Fresh relationship registry with every configured relationship defined
    pub fn relationship_registry(&self) -> Result<RelationshipRegistry> {
        let registry = RelationshipRegistry::new(Arc::new(self.kind_registry()));
        for rel in &self.relationships {
            registry
                .define(&rel.name, rel.from.as_str(), rel.to.as_str())
                .with_context(|| format!("Failed to define relationship '{}'", rel.name))?;
        }
        Ok(registry)
    }
}
