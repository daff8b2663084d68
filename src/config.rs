//! Configuration for the mooring toolkit.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (MOORING_TOOL_BIN, MOORING_SCHEMA_ROOT, MOORING_SECRETS_URL)
//! 2. Config file (.mooring/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .mooring/config.yaml
//! - Falls back to ~/.mooring/config.yaml

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::sql_tool::{DEFAULT_INVOKE_TIMEOUT, DEFAULT_TOOL_BINARY};
use crate::core::classify::MatchPatterns;

/// Default root of the schema tree, as laid out in the server image
pub const DEFAULT_SCHEMA_ROOT: &str = "/etc/temporal/schema";

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub tool: Option<ToolConfig>,
    #[serde(default)]
    pub schema_root: Option<String>,
    #[serde(default)]
    pub secrets: Option<SecretsConfig>,
    #[serde(default)]
    pub patterns: Option<MatchPatterns>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolConfig {
    /// Path to the schema tool binary
    pub binary: Option<String>,
    /// Per-invocation timeout
    pub invoke_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecretsConfig {
    /// Base URL of the HTTP secret store; env credentials when absent
    pub url: Option<String>,
}

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Schema tool binary path
    pub tool_binary: String,

    /// Per-invocation tool timeout in seconds
    pub invoke_timeout_seconds: u64,

    /// Root of the shipped schema tree
    pub schema_root: PathBuf,

    /// HTTP secret store base URL, if configured
    pub secrets_url: Option<String>,

    /// Output match tables
    pub patterns: MatchPatterns,

    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_secs(self.invoke_timeout_seconds)
    }
}

/// Find config file by searching current directory and parents, then the
/// home directory
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".mooring").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    let home_config = dirs::home_dir()?.join(".mooring").join("config.yaml");
    if home_config.exists() {
        return Some(home_config);
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();
    let file = match &config_file {
        Some(path) => Some(load_config_file(path)?),
        None => None,
    };

    let tool_binary = std::env::var("MOORING_TOOL_BIN")
        .ok()
        .or_else(|| file.as_ref().and_then(|f| f.tool.as_ref()?.binary.clone()))
        .unwrap_or_else(|| DEFAULT_TOOL_BINARY.to_string());

    let invoke_timeout_seconds = file
        .as_ref()
        .and_then(|f| f.tool.as_ref()?.invoke_timeout_seconds)
        .unwrap_or(DEFAULT_INVOKE_TIMEOUT.as_secs());

    let schema_root = std::env::var("MOORING_SCHEMA_ROOT")
        .ok()
        .or_else(|| file.as_ref().and_then(|f| f.schema_root.clone()))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEMA_ROOT));

    let secrets_url = std::env::var("MOORING_SECRETS_URL")
        .ok()
        .or_else(|| file.as_ref().and_then(|f| f.secrets.as_ref()?.url.clone()));

    let patterns = file
        .as_ref()
        .and_then(|f| f.patterns.clone())
        .unwrap_or_default();

    Ok(ResolvedConfig {
        tool_binary,
        invoke_timeout_seconds,
        schema_root,
        secrets_url,
        patterns,
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
