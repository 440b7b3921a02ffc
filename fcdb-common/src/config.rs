//! Configuration loading and root folder resolution
//!
//! Every service reads the same TOML file. Values are resolved with the
//! priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`FCDB_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! This module only parses the file and resolves the shared root folder;
//! each service turns the raw sections into its own typed settings.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Name of the config file looked up in the platform config directory
pub const CONFIG_FILE_NAME: &str = "fcdb.toml";

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "FCDB_CONFIG";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "FCDB_ROOT_FOLDER";

/// Raw TOML configuration shared by all services
///
/// All fields are optional so a partial file (or no file at all) is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Folder holding the database and service state
    pub root_folder: Option<PathBuf>,
    /// HTTP listen port
    pub port: Option<u16>,
    /// Logging section
    pub logging: LoggingConfig,
    /// Upstream data provider section
    pub provider: ProviderConfig,
    /// Pipeline tuning section
    pub sync: SyncConfig,
    /// Per-family overrides keyed by family slug (e.g. `clubs`, `skill-moves`)
    pub families: BTreeMap<String, FamilyConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `fcdb_sync=debug`
    pub level: Option<String>,
}

/// Upstream provider connection settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    /// Document holding every universal family (default `metadata`)
    pub metadata_endpoint: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub sec_ch_ua: Option<String>,
    pub sec_ch_ua_platform: Option<String>,
    pub timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_initial_delay_ms: Option<u64>,
    pub retry_max_delay_ms: Option<u64>,
    /// Fixed delay between pages of a paginated listing
    pub page_delay_ms: Option<u64>,
    pub default_max_pages: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Upper bound for a single dictionary lookup or upsert batch
    pub step_timeout_secs: Option<u64>,
    /// Number of missing localization keys kept in a run report
    pub missing_key_sample: Option<usize>,
}

/// Per-family overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilyConfig {
    /// Provider path, relative to `provider.base_url`
    pub endpoint: Option<String>,
    /// Upsert batch size; `0` means a single unchunked write
    pub batch_size: Option<usize>,
    /// Whether the endpoint is fetched page by page (`?page=N`)
    pub paginated: Option<bool>,
}

/// Load configuration from an explicit path or the platform default location
///
/// An explicit path must exist. When no path is given, `FCDB_CONFIG` is
/// consulted, then the platform config directory; a missing default file
/// yields an empty configuration.
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        return load_toml_config(path);
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return load_toml_config(Path::new(&path));
    }

    match default_config_path() {
        Some(path) if path.exists() => load_toml_config(&path),
        _ => {
            debug!("No config file found, using compiled defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    debug!(path = %path.display(), "Loaded config file");
    Ok(config)
}

/// Write a TOML config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Platform config file location
///
/// Linux: `~/.config/fcdb/fcdb.toml`, falling back to `/etc/fcdb/fcdb.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("fcdb").join(CONFIG_FILE_NAME));

    if cfg!(target_os = "linux") {
        if let Some(path) = &user_config {
            if path.exists() {
                return user_config;
            }
        }
        let system_config = PathBuf::from("/etc/fcdb").join(CONFIG_FILE_NAME);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    user_config
}

/// Resolve the root folder: CLI > ENV > TOML > OS default
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("fcdb"))
        .unwrap_or_else(|| PathBuf::from("./fcdb_data"))
}

/// Read and parse an environment override
///
/// Unparseable values are ignored with a warning so a typo in the
/// environment never takes precedence over a valid TOML value.
pub fn env_override<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}
