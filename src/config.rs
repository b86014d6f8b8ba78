use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::gateway::DEFAULT_BASE_URL;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FinderConfig {
    /// Remote recipe source settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Search orchestration settings
    #[serde(default)]
    pub search: SearchConfig,
    /// Favorites persistence settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Configuration for the remote recipe source
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
        }
    }
}

/// Configuration for search behavior
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Quiet period before a typed query is searched, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Maximum number of category members resolved to full recipes
    #[serde(default = "default_listing_limit")]
    pub category_fanout_limit: usize,
    /// Query used for the default listing when no filter is active
    #[serde(default = "default_browse_query")]
    pub browse_query: String,
    /// Maximum number of entries in the default listing
    #[serde(default = "default_listing_limit")]
    pub browse_limit: usize,
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            category_fanout_limit: default_listing_limit(),
            browse_query: default_browse_query(),
            browse_limit: default_listing_limit(),
        }
    }
}

/// Configuration for favorites persistence
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding one file per storage key
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
    /// Key the favorites set is stored under
    #[serde(default = "default_favorites_key")]
    pub favorites_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            favorites_key: default_favorites_key(),
        }
    }
}

// Default value functions
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_listing_limit() -> usize {
    12
}

fn default_browse_query() -> String {
    "a".to_string()
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".recipe-finder")
}

fn default_favorites_key() -> String {
    "recipe-finder-favorites".to_string()
}

impl FinderConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with RECIPE_FINDER__ prefix
    /// 2. config.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: RECIPE_FINDER__SEARCH__DEBOUNCE_MS
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }
}

/// Load configuration from file and environment variables
pub fn load_config() -> Result<FinderConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("config").required(false))
        // Use double underscore for nested: RECIPE_FINDER__API__BASE_URL
        .add_source(
            Environment::with_prefix("RECIPE_FINDER")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}
