//! TOML configuration parsing and validation.
//!
//! ```toml
//! [contact_search]
//! search_index_name = "sitecore_analytics_index"
//! default_page_size = 20
//!
//! [indexes.sitecore_analytics_index]
//! path = "./data/contacts.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```
//!
//! `contact_search.search_index_name` picks which `[indexes.*]` entry
//! searches run against.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub contact_search: ContactSearchConfig,
    #[serde(default)]
    pub indexes: BTreeMap<String, IndexConfig>,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContactSearchConfig {
    pub search_index_name: String,
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
}

fn default_page_size() -> u32 {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// SQLite database file backing the index.
    pub path: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// The index named by `contact_search.search_index_name`.
    pub fn search_index(&self) -> Result<&IndexConfig> {
        let name = &self.contact_search.search_index_name;
        self.indexes.get(name).with_context(|| {
            format!(
                "search index '{}' is not configured; add an [indexes.{}] section",
                name, name
            )
        })
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.contact_search.search_index_name.trim().is_empty() {
        anyhow::bail!("contact_search.search_index_name must not be empty");
    }

    if config.contact_search.default_page_size < 1 {
        anyhow::bail!("contact_search.default_page_size must be >= 1");
    }

    let index = config.search_index()?;
    if index.max_connections < 1 {
        anyhow::bail!(
            "indexes.{}.max_connections must be >= 1",
            config.contact_search.search_index_name
        );
    }

    Ok(())
}
