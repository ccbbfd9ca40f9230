//! Layered configuration: defaults, optional YAML file, environment overrides.
//!
//! File lookup follows the usual chain: an explicit path, then
//! `~/.config/acigate/acigate.yml`, then `./acigate.yml`. Environment
//! variables are applied last so deployments can override any file setting.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GatewayError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub servers: ServersConfig,
    pub auth: AuthConfig,
    /// Apps allowed on the direct-call path. Exact, case-sensitive names.
    pub enabled_apps: Vec<String>,
    pub cache: CacheConfig,
    pub execution: ExecutionConfig,
}

/// Base URLs for the two upstream server kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServersConfig {
    /// Apps server: direct namespaced calls plus the catalog listing.
    pub apps_url: String,
    /// Unified server: intent search and execution meta-functions.
    pub unified_url: String,
}

impl Default for ServersConfig {
    fn default() -> Self {
        Self {
            apps_url: "http://localhost:8100".to_string(),
            unified_url: "http://localhost:8101".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// API key for the `X-API-KEY` header. Absent means degraded mode: calls
    /// proceed unauthenticated and the upstream decides whether to reject.
    pub api_key: Option<String>,
    /// Opaque owner id for `X-Linked-Account-Owner-Id`, always sent.
    pub linked_account_id: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            linked_account_id: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Default timeout for execute/direct-call when the caller gives none.
    pub default_timeout_secs: u64,
    pub search_timeout_secs: u64,
    pub catalog_timeout_secs: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: 60,
            search_timeout_secs: 30,
            catalog_timeout_secs: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            servers: ServersConfig::default(),
            auth: AuthConfig::default(),
            enabled_apps: Vec::new(),
            cache: CacheConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain, then apply env overrides.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file_chain(config_path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_file_chain(config_path: Option<&PathBuf>) -> Result<Self> {
        // An explicit path must load; a missing or broken file is an error.
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        // Primary location: ~/.config/acigate/acigate.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary = config_dir
                .join(project_name)
                .join(format!("{}.yml", project_name));
            if primary.exists() {
                match Self::load_from_file(&primary) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary.display(), e);
                    }
                }
            }
        }

        // Fallback location: ./acigate.yml
        let fallback = PathBuf::from(format!("{}.yml", env!("CARGO_PKG_NAME")));
        if fallback.exists() {
            match Self::load_from_file(&fallback) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            GatewayError::Config(format!(
                "failed to parse {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply environment variable overrides on top of file/default values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("ACI_MCP_APPS_URL") {
            self.servers.apps_url = v;
        }
        if let Ok(v) = std::env::var("ACI_MCP_UNIFIED_URL") {
            self.servers.unified_url = v;
        }
        if let Ok(v) = std::env::var("ACI_API_KEY") {
            if !v.is_empty() {
                self.auth.api_key = Some(v);
            }
        }
        if let Ok(v) = std::env::var("ACI_LINKED_ACCOUNT_ID") {
            self.auth.linked_account_id = v;
        }
        if let Ok(v) = std::env::var("ACI_ENABLED_APPS") {
            self.enabled_apps = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(v) = std::env::var("ENABLE_MCP_CACHING") {
            self.cache.enabled = v.eq_ignore_ascii_case("true");
        }
        if let Ok(v) = std::env::var("MCP_CACHE_TTL") {
            match v.parse::<u64>() {
                Ok(secs) => self.cache.ttl_secs = secs,
                Err(_) => log::warn!("Ignoring unparseable MCP_CACHE_TTL: {}", v),
            }
        }
    }
}
