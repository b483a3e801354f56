//! TOML-based configuration for the layout engine.
//!
//! Reads and writes `EngineConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\Rackview\config.toml`
//! - Linux:    `~/.config/rackview/config.toml`
//! - macOS:    `~/Library/Application Support/Rackview/config.toml`
//!
//! or to any file passed with `--config`.
//!
//! ```toml
//! [engine]
//! log_level = "debug"
//! inventory = "fixtures/inventory.toml"
//!
//! [rack]
//! unit_width = 300
//! unit_height = 20
//! unit_spacing = 2
//!
//! [layout]
//! resize_border = 4
//! original_size = false
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]`, so a file that names only
//! the values it changes (or no file at all) still yields a complete config.

use std::path::{Path, PathBuf};

use rackview_core::RackGeometry;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::render_rack::DEVICE_LAYOUT_RESIZE_BORDER_SIZE;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is outside its allowed range.
    #[error("config value {field} = {value} must not be negative")]
    Negative { field: &'static str, value: i32 },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level engine configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub rack: RackConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

/// General engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineSection {
    /// `tracing` log level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Inventory catalog used when `--inventory` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<PathBuf>,
}

/// Pixel geometry of a rack unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RackConfig {
    #[serde(default = "default_unit_width")]
    pub unit_width: i32,
    #[serde(default = "default_unit_height")]
    pub unit_height: i32,
    #[serde(default = "default_unit_spacing")]
    pub unit_spacing: i32,
}

/// How device layouts are drawn inside their rack units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutConfig {
    /// Gap between the rack frame and each equipment layout.
    #[serde(default = "default_resize_border")]
    pub resize_border: i32,
    /// Draw layouts at their declared size instead of fitting them.
    #[serde(default)]
    pub original_size: bool,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_unit_width() -> i32 {
    300
}
fn default_unit_height() -> i32 {
    20
}
fn default_unit_spacing() -> i32 {
    2
}
fn default_resize_border() -> i32 {
    DEVICE_LAYOUT_RESIZE_BORDER_SIZE
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            inventory: None,
        }
    }
}

impl Default for RackConfig {
    fn default() -> Self {
        Self {
            unit_width: default_unit_width(),
            unit_height: default_unit_height(),
            unit_spacing: default_unit_spacing(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            resize_border: default_resize_border(),
            original_size: false,
        }
    }
}

impl EngineConfig {
    /// Checks the values that deserialization alone cannot constrain.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Negative`] for the first negative pixel size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            ("rack.unit_width", self.rack.unit_width),
            ("rack.unit_height", self.rack.unit_height),
            ("rack.unit_spacing", self.rack.unit_spacing),
            ("layout.resize_border", self.layout.resize_border),
        ];
        match values.into_iter().find(|(_, value)| *value < 0) {
            Some((field, value)) => Err(ConfigError::Negative { field, value }),
            None => Ok(()),
        }
    }
}

impl RackConfig {
    pub fn to_geometry(&self) -> RackGeometry {
        RackGeometry {
            unit_width: self.unit_width,
            unit_height: self.unit_height,
            unit_spacing: self.unit_spacing,
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `EngineConfig` from the default location, returning
/// `EngineConfig::default()` if the file does not yet exist.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<EngineConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `EngineConfig` from `path`, returning the defaults if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed and
/// [`ConfigError::Negative`] for a negative pixel size.
pub fn load_config_from(path: &Path) -> Result<EngineConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: EngineConfig = toml::from_str(&content)?;
            cfg.validate()?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(EngineConfig::default())
        }
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to the default location.
///
/// # Errors
///
/// See [`save_config_to`].
pub fn save_config(config: &EngineConfig) -> Result<(), ConfigError> {
    save_config_to(config, &config_file_path()?)
}

/// Persists `config` to `path`, creating its directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &EngineConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config base directory including the `Rackview`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Rackview"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("rackview"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Library").join("Application Support").join("Rackview"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
