//! Loading and validating the application's configuration.
//!
//! Settings come from four layers, lowest precedence first:
//!
//! 1. built-in defaults for the optional keys,
//! 2. an optional YAML file (`--config <path>` or `<config_dir>/config.yaml`),
//! 3. a `.env` file in the working directory (loaded into the environment),
//! 4. the process environment.
//!
//! The four required keys (`MONGO_URI`, `DB_NAME`, `COLLECTION_NAME`,
//! `GOOGLE_API_KEY`) must be non-blank after layering, otherwise resolution
//! fails with [`ConfigError::Missing`] and nothing else is started.
//!
//! # Examples
//!
//! Resolving from an explicit key/value source:
//!
//! ```
//! use std::collections::HashMap;
//! use profile_search::config::SearchConfig;
//!
//! let env: HashMap<&str, &str> = [
//!     ("MONGO_URI", "mongodb://localhost:27017"),
//!     ("DB_NAME", "shop"),
//!     ("COLLECTION_NAME", "customers"),
//!     ("GOOGLE_API_KEY", "secret"),
//! ]
//! .into_iter()
//! .collect();
//!
//! let config = SearchConfig::resolve(None, |key| env.get(key).map(|v| v.to_string())).unwrap();
//! assert_eq!(config.embedding_model, "models/text-embedding-004");
//! ```

use std::{fmt, fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

pub const ENV_MONGO_URI: &str = "MONGO_URI";
pub const ENV_DB_NAME: &str = "DB_NAME";
pub const ENV_COLLECTION_NAME: &str = "COLLECTION_NAME";
pub const ENV_GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_EMBEDDING_MODEL: &str = "EMBEDDING_MODEL";
pub const ENV_VECTOR_SEARCH_INDEX: &str = "VECTOR_SEARCH_INDEX";
pub const ENV_GEMINI_API_BASE: &str = "GEMINI_API_BASE";

pub const DEFAULT_EMBEDDING_MODEL: &str = "models/text-embedding-004";
pub const DEFAULT_VECTOR_SEARCH_INDEX: &str = "embedding_vector";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The optional YAML layer. Every key may be omitted.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(default)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mongo_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_search_index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_api_base: Option<String>,
}

impl FileConfig {
    /// The file written by `psearch init`.
    pub fn template() -> Self {
        Self {
            mongo_uri: Some("mongodb+srv://CHANGEME@cluster0.example.mongodb.net".to_string()),
            db_name: Some("CHANGEME".to_string()),
            collection_name: Some("CHANGEME".to_string()),
            google_api_key: Some("CHANGEME".to_string()),
            embedding_model: Some(DEFAULT_EMBEDDING_MODEL.to_string()),
            vector_search_index: Some(DEFAULT_VECTOR_SEARCH_INDEX.to_string()),
            gemini_api_base: None,
        }
    }
}

/// Fully resolved settings shared by every subcommand.
#[derive(Clone, PartialEq)]
pub struct SearchConfig {
    /// MongoDB connection string.
    pub mongo_uri: String,

    /// Database holding the customer collection.
    pub db_name: String,

    /// Collection of customer records.
    pub collection_name: String,

    /// Credential for the Gemini API.
    pub google_api_key: String,

    /// Embedding model identifier, e.g. `models/text-embedding-004`.
    pub embedding_model: String,

    /// Name of the Atlas vector search index.
    pub vector_search_index: String,

    /// Base URL of the Gemini REST API.
    pub gemini_api_base: String,
}

impl SearchConfig {
    /// Resolve settings from an optional file layer and a key lookup.
    ///
    /// `lookup` wins over `file`; both win over the built-in defaults. Blank
    /// values count as missing on every layer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] naming every required key that is
    /// still unset.
    pub fn resolve<F>(file: Option<FileConfig>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = file.unwrap_or_default();
        let pick = |key: &str, from_file: Option<String>| {
            non_blank(lookup(key)).or_else(|| non_blank(from_file))
        };

        let mongo_uri = pick(ENV_MONGO_URI, file.mongo_uri);
        let db_name = pick(ENV_DB_NAME, file.db_name);
        let collection_name = pick(ENV_COLLECTION_NAME, file.collection_name);
        let google_api_key = pick(ENV_GOOGLE_API_KEY, file.google_api_key);

        let mut missing = Vec::new();
        for (key, value) in [
            (ENV_MONGO_URI, &mongo_uri),
            (ENV_DB_NAME, &db_name),
            (ENV_COLLECTION_NAME, &collection_name),
            (ENV_GOOGLE_API_KEY, &google_api_key),
        ] {
            if value.is_none() {
                missing.push(key);
            }
        }

        match (mongo_uri, db_name, collection_name, google_api_key) {
            (Some(mongo_uri), Some(db_name), Some(collection_name), Some(google_api_key)) => {
                Ok(Self {
                    mongo_uri,
                    db_name,
                    collection_name,
                    google_api_key,
                    embedding_model: pick(ENV_EMBEDDING_MODEL, file.embedding_model)
                        .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
                    vector_search_index: pick(ENV_VECTOR_SEARCH_INDEX, file.vector_search_index)
                        .unwrap_or_else(|| DEFAULT_VECTOR_SEARCH_INDEX.to_string()),
                    gemini_api_base: pick(ENV_GEMINI_API_BASE, file.gemini_api_base)
                        .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
                })
            }
            _ => Err(ConfigError::Missing(missing)),
        }
    }

    /// Resolve settings for the running process.
    ///
    /// Loads `.env` (without overriding variables already set), reads the YAML
    /// layer from `explicit` or from `<config_dir>/config.yaml` when present,
    /// then consults the process environment.
    ///
    /// # Errors
    ///
    /// Fails if an explicitly named file cannot be read or parsed, or if a
    /// required key is missing.
    pub fn from_env(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }

        let file = match explicit {
            Some(path) => Some(load_config_file(path)?),
            None => match crate::config_dir() {
                Ok(dir) => {
                    let path = dir.join("config.yaml");
                    if path.is_file() {
                        Some(load_config_file(&path)?)
                    } else {
                        None
                    }
                }
                Err(_) => None,
            },
        };

        let config = Self::resolve(file, |key| std::env::var(key).ok())?;
        debug!("Config loaded: {:?}", config);
        Ok(config)
    }

    /// One-line description with the credential masked.
    pub fn summary(&self) -> String {
        format!(
            "Using DB: {}, Collection: {}, Model: {}, Index: {}, API key: {}",
            self.db_name,
            self.collection_name,
            self.embedding_model,
            self.vector_search_index,
            mask(&self.google_api_key)
        )
    }
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("mongo_uri", &"<redacted>")
            .field("db_name", &self.db_name)
            .field("collection_name", &self.collection_name)
            .field("google_api_key", &mask(&self.google_api_key))
            .field("embedding_model", &self.embedding_model)
            .field("vector_search_index", &self.vector_search_index)
            .field("gemini_api_base", &self.gemini_api_base)
            .finish()
    }
}

/// Loads the YAML config layer from `path`.
///
/// # Errors
///
/// - [`ConfigError::Read`] if the file cannot be read.
/// - [`ConfigError::Parse`] if it is not valid YAML for [`FileConfig`].
pub fn load_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
    debug!("Loading config file: {}", path.display());
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() > 8 {
        format!("{visible}****")
    } else {
        "****".to_string()
    }
}
