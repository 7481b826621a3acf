//! Configuration management for mra-decode.
//!
//! Configuration is loaded from multiple sources in priority order:
//! 1. Environment variables (ARM_SPEC_PATH, etc.)
//! 2. Project-local config file (`./mra-decode.toml`)
//! 3. User config file (`~/.config/mra-decode/config.toml`)
//! 4. Built-in defaults
//!
//! The spec directory is only ever *supplied* from here: the tree
//! builder takes it as an explicit parameter, never reads a global.
//!
//! # Config File Format
//!
//! ```toml
//! # mra-decode.toml
//!
//! # Path to the Arm MRA spec directory (contains encodingindex.xml)
//! arm_spec_path = "/home/user/arm-spec"
//!
//! # Where to keep the built-tree cache (optional)
//! cache_path = "/home/user/.cache/mra-decode/tree.json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Global cached configuration.
static CONFIG: OnceLock<Config> = OnceLock::new();

/// mra-decode configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Path to the Arm MRA spec directory.
    /// Contains `encodingindex.xml` and the instruction-form pages.
    pub arm_spec_path: Option<String>,

    /// Path to the built-tree cache file.
    /// No cache is read or written when unset.
    pub cache_path: Option<String>,
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Project-local `mra-decode.toml`
    /// 3. User config `~/.config/mra-decode/config.toml`
    /// 4. Defaults
    pub fn load() -> Self {
        let mut config = Self::default();

        // Load user config first (lowest priority of file configs)
        if let Some(user_config) = Self::load_user_config() {
            config.merge(user_config);
        }

        // Load project-local config (higher priority)
        if let Some(local_config) = Self::load_local_config() {
            config.merge(local_config);
        }

        // Environment variables override everything
        config.apply_env_overrides();

        config
    }

    /// Get the cached global configuration.
    ///
    /// Loads configuration on first call and caches it.
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(|| {
            let config = Self::load();
            log::debug!("Loaded configuration: {:?}", config);
            config
        })
    }

    /// Get the spec directory, with fallback to default.
    ///
    /// Returns the configured path, or "../arm-spec" as fallback.
    pub fn arm_spec_path(&self) -> String {
        self.arm_spec_path
            .clone()
            .unwrap_or_else(|| "../arm-spec".to_string())
    }

    /// Get the cache file path, if one is configured.
    pub fn cache_path(&self) -> Option<&str> {
        self.cache_path.as_deref()
    }

    /// Load user configuration from ~/.config/mra-decode/config.toml
    fn load_user_config() -> Option<Self> {
        let config_dir = dirs::config_dir()?;
        let config_path = config_dir.join("mra-decode").join("config.toml");
        Self::load_from_file(&config_path)
    }

    /// Load project-local configuration from ./mra-decode.toml
    fn load_local_config() -> Option<Self> {
        // Try current directory
        let local_path = Path::new("mra-decode.toml");
        if let Some(config) = Self::load_from_file(local_path) {
            return Some(config);
        }

        // Try to find project root by looking for Cargo.toml
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let project_path = Path::new(&manifest_dir).join("mra-decode.toml");
            if let Some(config) = Self::load_from_file(&project_path) {
                return Some(config);
            }
        }

        None
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Merge another config into this one.
    /// Only overrides fields that are Some in the other config.
    fn merge(&mut self, other: Self) {
        if other.arm_spec_path.is_some() {
            self.arm_spec_path = other.arm_spec_path;
        }
        if other.cache_path.is_some() {
            self.cache_path = other.cache_path;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("ARM_SPEC_PATH") {
            log::info!("Using ARM_SPEC_PATH from environment: {}", path);
            self.arm_spec_path = Some(path);
        }
        if let Ok(path) = std::env::var("MRA_CACHE_PATH") {
            log::info!("Using MRA_CACHE_PATH from environment: {}", path);
            self.cache_path = Some(path);
        }
    }

    /// Get the path to the user config file (for display/creation).
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("mra-decode").join("config.toml"))
    }

    /// Generate a sample config file content.
    pub fn sample_config() -> String {
        r#"# mra-decode configuration
# Place this file at ~/.config/mra-decode/config.toml or ./mra-decode.toml

# Path to the Arm MRA spec directory (required for decoding)
# This should contain encodingindex.xml and the instruction-form pages
arm_spec_path = "/home/user/arm-spec"

# Path to the built-tree cache (optional)
# cache_path = "/home/user/.cache/mra-decode/tree.json"
"#
        .to_string()
    }
}
