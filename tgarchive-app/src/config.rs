//! Archiver config (strict YAML).

use std::path::{Path, PathBuf};
use std::{fmt, fs};

use serde::Deserialize;

/// Used when neither a CLI argument nor `$TG_ARCHIVE_CFG` names a file.
pub const DEFAULT_PATH: &str = "config.yml";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Yaml(serde_yaml::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "read config {} failed: {source}", path.display()),
            Self::Yaml(e) => write!(f, "invalid yaml: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Yaml(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Holds `mtproto.tl` and one `<layer>/api.tl` per supported layer.
    pub layers_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Packets buffered between the reader and the pipeline.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Archive only these chats; empty archives everything.
    #[serde(default)]
    pub filter_chat_ids: Vec<i64>,
}

impl ArchiveConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

        if self.layers_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("layers_dir must not be empty".into()));
        }
        if !LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "log_level must be one of {}",
                LEVELS.join(", ")
            )));
        }
        if !(1..=1_000_000).contains(&self.queue_capacity) {
            return Err(ConfigError::Invalid("queue_capacity must be between 1 and 1000000".into()));
        }
        if !(4..=1024).contains(&self.max_depth) {
            return Err(ConfigError::Invalid("max_depth must be between 4 and 1024".into()));
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".into()
}
fn default_queue_capacity() -> usize {
    1000
}
fn default_max_depth() -> usize {
    64
}

/// First CLI argument, else `$TG_ARCHIVE_CFG`, else [`DEFAULT_PATH`].
pub fn config_path(arg: Option<String>) -> PathBuf {
    arg.or_else(|| std::env::var("TG_ARCHIVE_CFG").ok())
        .unwrap_or_else(|| DEFAULT_PATH.into())
        .into()
}

pub fn load_from_file(path: impl AsRef<Path>) -> Result<ArchiveConfig, ConfigError> {
    let path = path.as_ref();
    let s = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_owned(), source })?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ArchiveConfig, ConfigError> {
    let cfg: ArchiveConfig = serde_yaml::from_str(s).map_err(ConfigError::Yaml)?;
    cfg.validate()?;
    Ok(cfg)
}
