//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`SHELFCHECK_ROOT_FOLDER`)
//! 3. TOML config file (`root_folder` key)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable config file is never fatal: a warning is logged
//! and compiled defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const ROOT_FOLDER_ENV: &str = "SHELFCHECK_ROOT_FOLDER";
pub const CONFIG_FILE_ENV: &str = "SHELFCHECK_CONFIG";
pub const CONFIG_FILE_NAME: &str = "shelfcheck.toml";
pub const DATABASE_FILE_NAME: &str = "shelfcheck.db";
pub const LIGHTWEIGHT_FILE_NAME: &str = "session.json";
pub const EXPORT_DIR_NAME: &str = "exports";

/// Start-session endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Origin of the catalogue staff interface, e.g. `https://staff.example.org`
    pub base_url: String,
    /// Plugin class routed by `run.pl`
    pub plugin_class: String,
    pub timeout_secs: u64,
    /// OPAC/staff origin used for catalogue links in exports; `base_url` when unset
    pub catalog_base_url: Option<String>,
}

impl ServerConfig {
    pub fn catalog_base(&self) -> &str {
        self.catalog_base_url.as_deref().unwrap_or(&self.base_url)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            plugin_class: "Koha::Plugin::Com::InteractiveInventory".to_string(),
            timeout_secs: 30,
            catalog_base_url: None,
        }
    }
}

/// Session store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Arrays longer than this are split into chunks of this size
    pub chunk_size: usize,
    /// Use the SQLite engine for large collections (falls back to the JSON file when off)
    pub high_capacity: bool,
    /// Per-entry limit of the lightweight engine, in bytes
    pub lightweight_max_entry_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            high_capacity: true,
            lightweight_max_entry_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Contents of `shelfcheck.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Compiled-in defaults for the current platform
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/shelfcheck
        dirs::data_local_dir()
            .map(|d| d.join("shelfcheck"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/shelfcheck"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/shelfcheck
        dirs::data_dir()
            .map(|d| d.join("shelfcheck"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/shelfcheck"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\shelfcheck
        dirs::data_local_dir()
            .map(|d| d.join("shelfcheck"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\shelfcheck"))
    } else {
        PathBuf::from("./shelfcheck_data")
    }
}

/// Locate the config file: env override, then the user config dir, then /etc on Linux
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        return Some(PathBuf::from(path));
    }

    let user_config = dirs::config_dir().map(|d| d.join("shelfcheck").join(CONFIG_FILE_NAME));
    if let Some(path) = user_config.filter(|p| p.exists()) {
        return Some(path);
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/shelfcheck").join(CONFIG_FILE_NAME);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the config file if there is one; warn and use defaults otherwise
pub fn load_or_default(path: Option<&Path>) -> TomlConfig {
    let path = match path.map(Path::to_path_buf).or_else(config_file_path) {
        Some(path) => path,
        None => {
            debug!("No config file found, using compiled defaults");
            return TomlConfig::default();
        }
    };

    match load_toml_config(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!("{} (using compiled defaults)", e);
            TomlConfig::default()
        }
    }
}

/// Write config atomically (temp file + rename)
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

/// Resolves the root folder holding the session store and exports
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    config: Option<TomlConfig>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            config: None,
        }
    }

    /// Root folder given on the command line
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Use an already-loaded config instead of reading the config file
    pub fn with_config(mut self, config: TomlConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            debug!(module = %self.module_name, "Root folder from command line");
            return path.clone();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.is_empty() {
                debug!(module = %self.module_name, "Root folder from {}", ROOT_FOLDER_ENV);
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        let from_toml = match &self.config {
            Some(config) => config.root_folder.clone(),
            None => config_file_path()
                .and_then(|path| load_toml_config(&path).ok())
                .and_then(|config| config.root_folder),
        };
        if let Some(path) = from_toml {
            debug!(module = %self.module_name, "Root folder from config file");
            return path;
        }

        // Priority 4: OS-dependent compiled default
        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Lays out files under the resolved root folder
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root folder (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE_NAME)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    pub fn lightweight_store_path(&self) -> PathBuf {
        self.root.join(LIGHTWEIGHT_FILE_NAME)
    }

    pub fn export_dir(&self) -> PathBuf {
        self.root.join(EXPORT_DIR_NAME)
    }
}
