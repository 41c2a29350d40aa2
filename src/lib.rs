//! # Profile Search (library root)
//!
//! Semantic search over a MongoDB Atlas collection of customer profiles.
//! Gemini turns text into vectors; Atlas `$vectorSearch` finds the nearest
//! records. This crate is the glue between the two:
//!
//! - Settings from env, `.env` and an optional YAML file (`config`).
//! - The sentence each customer record is embedded as (`customer`).
//! - A Gemini `embedContent` client behind the [`embedding::Embedder`] trait (`embedding`).
//! - The MongoDB side behind the [`store::CustomerStore`] trait (`store`).
//! - The one-shot embedding backfill (`backfill`).
//! - Pipeline construction and the search flow (`search`).
//! - Terminal rendering and the interactive prompt (`ui`).
//! - CLI parsing (`commands`) and error types (`error`).
//!
//! ## Typical flow
//!
//! ```no_run
//! use profile_search::{
//!     config::SearchConfig,
//!     embedding::GeminiEmbedder,
//!     search::{SearchOptions, run_search},
//!     store::MongoStore,
//!     ui::render_view,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SearchConfig::from_env(None)?;
//! let embedder = GeminiEmbedder::from_config(&config);
//! let store = MongoStore::connect(&config).await?;
//!
//! let view = run_search(
//!     "young doctors with high income",
//!     &embedder,
//!     &store,
//!     &config.vector_search_index,
//!     SearchOptions::default(),
//! )
//! .await;
//! render_view(&mut std::io::stdout(), &view)?;
//!
//! store.shutdown().await;
//! # Ok(()) }
//! ```

use directories::ProjectDirs;
use std::path::PathBuf;

use crate::error::ConfigError;

pub mod backfill;
pub mod commands;
pub mod config;
pub mod customer;
pub mod embedding;
pub mod error;
pub mod search;
pub mod store;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

/// Return the per-platform configuration directory.
///
/// This uses [`directories::ProjectDirs`] with the application triple
/// `("com", "profile-search", "psearch")`, e.g. `~/.config/psearch` on Linux.
/// The directory is **not** created by this function.
///
/// # Errors
/// Returns [`ConfigError::NoConfigDir`] if no home directory can be found.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    let proj_dirs = ProjectDirs::from("com", "profile-search", "psearch")
        .ok_or(ConfigError::NoConfigDir)?;
    Ok(proj_dirs.config_dir().to_path_buf())
}
