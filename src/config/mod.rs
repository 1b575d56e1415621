//! Collection configuration: which corpora exist and where their resources
//! live.
//!
//! Configuration is a TOML file naming each collection with its metadata
//! resource path, its ordered embedding chunk paths, and its embedding
//! dimension, all resolved against one base URL. Defaults describe the two
//! shipped collections (quotes, bible).


use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;
use url::Url;

use crate::index::DEFAULT_EMBEDDING_DIM;
use crate::loader::CollectionSource;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Base URL all collection resource paths are resolved against.
    pub base_url: String,
    pub collections: Vec<CollectionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionConfig {
    pub name: String,
    pub metadata_path: String,
    /// Chunk paths in producer split order; the loader concatenates them in
    /// this order.
    pub embedding_paths: Vec<String>,
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
}

fn default_embedding_dim() -> usize {
    DEFAULT_EMBEDDING_DIM
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Collection name cannot be empty")]
    EmptyCollectionName,
    #[error("Duplicate collection name: {0}")]
    DuplicateCollectionName(String),
    #[error("Collection {0} has no embedding sources")]
    NoEmbeddingSources(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(usize),
    #[error("Invalid resource path {path} for collection {collection}: {reason}")]
    InvalidResourcePath {
        collection: String,
        path: String,
        reason: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            collections: vec![
                CollectionConfig {
                    name: "quotes".to_string(),
                    metadata_path: "quotes-cohere.json".to_string(),
                    embedding_paths: vec!["quotes-embeddings-int8.bin".to_string()],
                    embedding_dim: DEFAULT_EMBEDDING_DIM,
                },
                CollectionConfig {
                    name: "bible".to_string(),
                    metadata_path: "bible-cohere.json".to_string(),
                    // Split to stay under the deployment host's per-file
                    // size limit; order matters.
                    embedding_paths: vec![
                        "bible-embeddings-int8-0.bin".to_string(),
                        "bible-embeddings-int8-1.bin".to_string(),
                        "bible-embeddings-int8-2.bin".to_string(),
                    ],
                    embedding_dim: DEFAULT_EMBEDDING_DIM,
                },
            ],
        }
    }
}

impl Config {
    /// Loads `config.toml` from `config_dir`, falling back to defaults when
    /// the file does not exist.
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(config_dir.as_ref()).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.as_ref().display()
            )
        })?;

        let config_path = config_dir.as_ref().join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parse_base_url()?;

        let mut seen = HashSet::new();
        for collection in &self.collections {
            collection.validate()?;
            if !seen.insert(collection.name.as_str()) {
                return Err(ConfigError::DuplicateCollectionName(
                    collection.name.clone(),
                ));
            }
        }
        Ok(())
    }

    /// Looks up a collection by name.
    #[inline]
    #[must_use]
    pub fn collection(&self, name: &str) -> Option<&CollectionConfig> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Resolves a collection into the source the loader consumes.
    #[inline]
    pub fn collection_source(&self, name: &str) -> Result<Option<CollectionSource>, ConfigError> {
        let base = self.parse_base_url()?;
        self.collection(name)
            .map(|collection| collection.source(&base))
            .transpose()
    }

    fn parse_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|_| ConfigError::InvalidBaseUrl(self.base_url.clone()))
    }
}

impl CollectionConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyCollectionName);
        }
        if self.embedding_paths.is_empty() {
            return Err(ConfigError::NoEmbeddingSources(self.name.clone()));
        }
        if !(64..=4096).contains(&self.embedding_dim) {
            return Err(ConfigError::InvalidEmbeddingDimension(self.embedding_dim));
        }
        Ok(())
    }

    /// Resolves this collection's resource paths against `base`.
    #[inline]
    pub fn source(&self, base: &Url) -> Result<CollectionSource, ConfigError> {
        let metadata_url = self.join(base, &self.metadata_path)?;
        let embedding_urls = self
            .embedding_paths
            .iter()
            .map(|path| self.join(base, path))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CollectionSource {
            metadata_url,
            embedding_urls,
            embedding_dim: self.embedding_dim,
        })
    }

    fn join(&self, base: &Url, path: &str) -> Result<Url, ConfigError> {
        base.join(path).map_err(|e| ConfigError::InvalidResourcePath {
            collection: self.name.clone(),
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}
