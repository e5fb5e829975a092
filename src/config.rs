use crate::error::TetherError;
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_YAML: &str = include_str!("../config/default.yaml");
const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub version: u32,
    pub install: Install,
    pub remote: Remote,
    pub log: Log,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Install {
    pub dir: String,
    pub version_file: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Remote {
    pub repository: String,
    pub version_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Log {
    pub transcript_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            install: Install::default(),
            remote: Remote::default(),
            log: Log::default(),
        }
    }
}

impl Default for Install {
    fn default() -> Self {
        Self {
            dir: "./ouroveon".to_string(),
            version_file: "VERSION".to_string(),
        }
    }
}

impl Default for Remote {
    fn default() -> Self {
        Self {
            repository: "https://github.com/Unbundlesss/OUROVEON-build".to_string(),
            version_url:
                "https://raw.githubusercontent.com/Unbundlesss/OUROVEON-build/main/VERSION"
                    .to_string(),
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Self {
            transcript_file: "install.log.txt".to_string(),
        }
    }
}

impl Config {
    /// Version marker location for an install tree rooted at `tree`.
    pub fn version_file_in(&self, tree: &Path) -> PathBuf {
        tree.join(&self.install.version_file)
    }
}

pub fn resolve_config_path(override_path: Option<&PathBuf>) -> PathBuf {
    if let Some(path) = override_path {
        return path.clone();
    }
    if let Ok(path) = env::var("TETHER_CONFIG") {
        return PathBuf::from(path);
    }
    let mut base = default_config_dir();
    base.push("config.yaml");
    base
}

pub fn default_config_dir() -> PathBuf {
    if let Ok(path) = env::var("TETHER_CONFIG_DIR") {
        return PathBuf::from(path);
    }
    let mut base = home_dir().unwrap_or_else(|| PathBuf::from("."));
    base.push(".config");
    base.push("tether");
    base
}

pub fn ensure_parent(path: &Path) -> Result<(), TetherError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn read_config_from_str(content: &str) -> Result<Config, TetherError> {
    let cfg: Config = serde_yaml::from_str(content)?;
    validate_config(&cfg)?;
    Ok(cfg)
}

pub fn read_config(path: &Path) -> Result<Config, TetherError> {
    let content = fs::read_to_string(path)?;
    read_config_from_str(&content)
}

/// Reads the config at `path`, falling back to the built-in defaults when no
/// file exists there.
pub fn load_config(path: &Path) -> Result<Config, TetherError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file; using defaults");
        return Ok(Config::default());
    }
    read_config(path).map_err(|err| {
        TetherError::Config(format!(
            "config is invalid. Please edit {} and try again. ({})",
            path.display(),
            err
        ))
    })
}

pub fn validate_config(cfg: &Config) -> Result<(), TetherError> {
    if cfg.version != CONFIG_VERSION {
        return Err(TetherError::Config(format!(
            "unsupported config version {}",
            cfg.version
        )));
    }
    if cfg.install.dir.trim().is_empty() {
        return Err(TetherError::Config("install.dir must not be empty".to_string()));
    }
    let version_file = cfg.install.version_file.trim();
    if version_file.is_empty() {
        return Err(TetherError::Config(
            "install.version_file must not be empty".to_string(),
        ));
    }
    if Path::new(version_file).is_absolute() {
        return Err(TetherError::Config(
            "install.version_file must be relative to the install tree".to_string(),
        ));
    }
    if cfg.remote.repository.trim().is_empty() {
        return Err(TetherError::Config(
            "remote.repository must not be empty".to_string(),
        ));
    }
    let version_url = cfg.remote.version_url.trim();
    if version_url.is_empty() {
        return Err(TetherError::Config(
            "remote.version_url must not be empty".to_string(),
        ));
    }
    if !(version_url.starts_with("http://") || version_url.starts_with("https://")) {
        return Err(TetherError::Config(format!(
            "remote.version_url must be an http(s) URL, got {version_url}"
        )));
    }
    if cfg.log.transcript_file.trim().is_empty() {
        return Err(TetherError::Config(
            "log.transcript_file must not be empty".to_string(),
        ));
    }
    Ok(())
}
