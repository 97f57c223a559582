// src/config.rs
//! Runtime configuration, read from a TOML file
//!
//! ```toml
//! log_filter = "shelfbase_core=debug"
//! seed = true
//!
//! [storage]
//! backend = "table"
//! data_dir = "data"
//!
//! [books]
//! id_strategy = "uuid"
//!
//! [todos]
//! id_strategy = "sequential"
//! ```
//!
//! Every key is optional. `seed` defaults to true for the memory backend
//! and false for the table backend; an unset `id_strategy` falls back to
//! uuid for books and sequential for todos.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, ShelfError};
use crate::record::IdStrategy;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "SHELFBASE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "shelfbase.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShelfConfig {
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Load the starter catalogue into an empty book collection
    pub seed: Option<bool>,
    pub storage: StorageConfig,
    pub books: CollectionConfig,
    pub todos: CollectionConfig,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        ShelfConfig {
            log_filter: "warn".to_string(),
            seed: None,
            storage: StorageConfig::default(),
            books: CollectionConfig::default(),
            todos: CollectionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Table,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: BackendKind,
    /// Directory holding one table file per record type
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            backend: BackendKind::Memory,
            data_dir: PathBuf::from("shelfbase-data"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectionConfig {
    pub id_strategy: Option<IdStrategy>,
}

impl ShelfConfig {
    pub fn books_identity(&self) -> IdStrategy {
        self.books.id_strategy.unwrap_or(IdStrategy::Uuid)
    }

    pub fn todos_identity(&self) -> IdStrategy {
        self.todos.id_strategy.unwrap_or(IdStrategy::Sequential)
    }

    /// Whether an empty book catalogue gets the starter books
    pub fn should_seed(&self) -> bool {
        self.seed
            .unwrap_or(self.storage.backend == BackendKind::Memory)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ShelfError::Config(format!("failed to parse config: {}", e)))
    }

    /// Read and parse a config file that must exist
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ShelfError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Config path: the explicit one, else `$SHELFBASE_CONFIG`, else
    /// `shelfbase.toml` in the working directory
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(path) => path.to_path_buf(),
            None => std::env::var_os(CONFIG_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ShelfConfig::from_toml_str("").unwrap();
        assert_eq!(config, ShelfConfig::default());
        assert_eq!(config.books_identity(), IdStrategy::Uuid);
        assert_eq!(config.todos_identity(), IdStrategy::Sequential);
        assert_eq!(config.storage.backend, BackendKind::Memory);
        assert!(config.should_seed());
    }

    #[test]
    fn test_full_config() {
        let config = ShelfConfig::from_toml_str(
            r#"
            log_filter = "debug"
            seed = true

            [storage]
            backend = "table"
            data_dir = "/var/lib/shelfbase"

            [books]
            id_strategy = "sequential"
            "#,
        )
        .unwrap();
        assert_eq!(config.log_filter, "debug");
        assert!(config.should_seed());
        assert_eq!(config.storage.backend, BackendKind::Table);
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/shelfbase"));
        assert_eq!(config.books_identity(), IdStrategy::Sequential);
        assert_eq!(config.todos_identity(), IdStrategy::Sequential);
    }

    #[test]
    fn test_empty_collection_table_keeps_its_default() {
        let config = ShelfConfig::from_toml_str("[books]
[todos]
").unwrap();
        assert_eq!(config.books_identity(), IdStrategy::Uuid);
        assert_eq!(config.todos_identity(), IdStrategy::Sequential);
    }

    #[test]
    fn test_seed_default_follows_backend() {
        let table = ShelfConfig::from_toml_str("[storage]
backend = \"table\"").unwrap();
        assert!(!table.should_seed());

        let memory = ShelfConfig::from_toml_str("seed = false").unwrap();
        assert!(!memory.should_seed());

        let forced = ShelfConfig::from_toml_str("seed = true
[storage]
backend = \"table\"").unwrap();
        assert!(forced.should_seed());
    }

    #[test]
    fn test_unknown_backend_is_config_error() {
        let err = ShelfConfig::from_toml_str("[storage]\nbackend = \"postgres\"").unwrap_err();
        assert!(matches!(err, ShelfError::Config(_)));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(ShelfConfig::from_toml_str("cache = true").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ShelfConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ShelfError::Config(_)));
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = ShelfConfig::resolve_path(Some(Path::new("custom.toml")));
        assert_eq!(path, PathBuf::from("custom.toml"));
    }
}
