//! Allocator configuration
//!
//! Device paths default to the Linux devpts layout. Hosts can override them
//! from a JSON file, the environment, or their own command line; later
//! sources win.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default multiplexer device
pub const DEFAULT_MULTIPLEXER: &str = "/dev/ptmx";

/// Default directory holding slave devices
pub const DEFAULT_SLAVE_ROOT: &str = "/dev/pts";

/// Environment variable overriding the multiplexer path
pub const ENV_MULTIPLEXER: &str = "PTPAIR_MULTIPLEXER";

/// Environment variable overriding the slave root
pub const ENV_SLAVE_ROOT: &str = "PTPAIR_SLAVE_ROOT";

/// Device paths used by the allocator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Device that allocates a fresh pair when opened
    pub multiplexer_path: PathBuf,
    /// Directory containing `<unit>` slave nodes
    pub slave_root: PathBuf,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            multiplexer_path: PathBuf::from(DEFAULT_MULTIPLEXER),
            slave_root: PathBuf::from(DEFAULT_SLAVE_ROOT),
        }
    }
}

impl AllocatorConfig {
    pub fn new(multiplexer_path: impl Into<PathBuf>, slave_root: impl Into<PathBuf>) -> Self {
        Self {
            multiplexer_path: multiplexer_path.into(),
            slave_root: slave_root.into(),
        }
    }

    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AllocatorConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `PTPAIR_MULTIPLEXER` and `PTPAIR_SLAVE_ROOT` if set
    pub fn apply_env_vars(&mut self) {
        self.apply_env_with(|key| std::env::var_os(key));
    }

    fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<std::ffi::OsString>,
    {
        if let Some(path) = lookup(ENV_MULTIPLEXER).filter(|v| !v.is_empty()) {
            tracing::debug!(?path, "multiplexer path from environment");
            self.multiplexer_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_SLAVE_ROOT).filter(|v| !v.is_empty()) {
            tracing::debug!(?path, "slave root from environment");
            self.slave_root = PathBuf::from(path);
        }
    }

    /// Both paths must be absolute
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_absolute("multiplexer_path", &self.multiplexer_path)?;
        check_absolute("slave_root", &self.slave_root)?;
        Ok(())
    }
}

fn check_absolute(field: &'static str, path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid {
            field,
            message: "path is empty".to_string(),
        });
    }
    if !path.is_absolute() {
        return Err(ConfigError::Invalid {
            field,
            message: format!("{} is not an absolute path", path.display()),
        });
    }
    Ok(())
}
