use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::resolver::ServedRoot;

/// Server configuration loaded from an optional TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address to bind to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// CORS settings
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Preflight cache lifetime in seconds
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_max_age_secs() -> u64 {
    24 * 60 * 60 // 24 hours
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_max_age_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors: CorsConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Turn the directory given at startup into an absolute, existing served root.
pub fn resolve_served_root(dir: &Path) -> Result<ServedRoot, ConfigError> {
    let root = dir.canonicalize().map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => ConfigError::MissingDirectory(dir.to_path_buf()),
        _ => ConfigError::Io(err),
    })?;

    if !root.is_dir() {
        return Err(ConfigError::NotADirectory(root));
    }

    ServedRoot::new(root)
}
