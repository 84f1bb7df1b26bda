//! Runtime configuration for hosts embedding the core.
//!
//! # Responsibility
//! - Load `CoreConfig` from an optional TOML file.
//! - Apply `LABGRAPH_*` environment overrides on top of the file.
//! - Open the configured stores.
//!
//! # Invariants
//! - A missing file yields defaults; a malformed file is an error.
//! - Invalid environment overrides are ignored with a warning.
//! - Paths handed to logging and storage are absolute.

use crate::logging::{default_log_level, normalize_level};
use crate::repo::{StoreResult, Stores};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DATA_DIR: &str = "LABGRAPH_DATA_DIR";
pub const ENV_LOG_LEVEL: &str = "LABGRAPH_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "LABGRAPH_LOG_DIR";

const DOCUMENTS_DB_FILE: &str = "documents.sqlite3";
const GRAPH_DB_FILE: &str = "graph.sqlite3";
const LOG_SUBDIR: &str = "logs";

/// Configuration loading failure.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        message: String,
    },
    /// Relative paths could not be resolved against the working directory.
    CurrentDir(std::io::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "failed to parse config `{}`: {message}", path.display())
            }
            Self::CurrentDir(err) => write!(f, "failed to resolve working directory: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::CurrentDir(err) => Some(err),
            Self::Parse { .. } => None,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// Directory holding `documents.sqlite3` and `graph.sqlite3`.
    pub data_dir: PathBuf,
    /// Keeps both stores in memory and ignores `data_dir` for storage.
    pub in_memory: bool,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// Defaults to `<data_dir>/logs`.
    pub dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: std::env::temp_dir().join("labgraph"),
            in_memory: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

impl CoreConfig {
    /// Loads `path` when given and present, then applies process env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?.unwrap_or_default(),
            None => Self::default(),
        };
        config.apply_env_overrides_with(|key| std::env::var(key).ok());
        config.absolutize()?;
        info!(
            "event=config_load module=config status=ok data_dir={} in_memory={} level={}",
            config.data_dir.display(),
            config.in_memory,
            config.logging.level
        );
        Ok(config)
    }

    /// Parses a TOML file; `Ok(None)` when it does not exist.
    pub fn from_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
            .map(Some)
            .map_err(|message| ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|err| err.to_string())
    }

    /// Applies overrides read through `lookup`; blank values are skipped.
    pub fn apply_env_overrides_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(ENV_DATA_DIR) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                self.data_dir = PathBuf::from(trimmed);
            }
        }

        if let Some(raw) = lookup(ENV_LOG_LEVEL) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                match normalize_level(trimmed) {
                    Ok(level) => self.logging.level = level.to_string(),
                    Err(err) => warn!(
                        "event=config_env module=config status=ignored key={} error={}",
                        ENV_LOG_LEVEL, err
                    ),
                }
            }
        }

        if let Some(raw) = lookup(ENV_LOG_DIR) {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return;
            }
            let dir = PathBuf::from(trimmed);
            if dir.is_absolute() {
                self.logging.dir = Some(dir);
            } else {
                warn!(
                    "event=config_env module=config status=ignored key={} error=relative_path",
                    ENV_LOG_DIR
                );
            }
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.logging
            .dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join(LOG_SUBDIR))
    }

    pub fn documents_path(&self) -> PathBuf {
        self.data_dir.join(DOCUMENTS_DB_FILE)
    }

    pub fn graph_path(&self) -> PathBuf {
        self.data_dir.join(GRAPH_DB_FILE)
    }

    /// Opens the stores this configuration points at.
    pub fn open_stores(&self) -> StoreResult<Stores> {
        if self.in_memory {
            return Stores::open_in_memory();
        }
        Stores::open_sqlite(self.documents_path(), self.graph_path())
    }

    fn absolutize(&mut self) -> Result<(), ConfigError> {
        if self.data_dir.is_absolute()
            && self.logging.dir.as_ref().map_or(true, |dir| dir.is_absolute())
        {
            return Ok(());
        }
        let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
        if !self.data_dir.is_absolute() {
            self.data_dir = cwd.join(&self.data_dir);
        }
        if let Some(dir) = self.logging.dir.as_mut() {
            if !dir.is_absolute() {
                *dir = cwd.join(&*dir);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, ENV_DATA_DIR, ENV_LOG_DIR, ENV_LOG_LEVEL};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn toml_sections_override_defaults() {
        let config = CoreConfig::from_toml_str(
            r#"
            data_dir = "/srv/labgraph"
            [logging]
            level = "warn"
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/labgraph"));
        assert_eq!(config.logging.level, "warn");
        assert!(!config.in_memory);
        assert_eq!(config.log_dir(), PathBuf::from("/srv/labgraph/logs"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let error = CoreConfig::from_toml_str("colour = \"blue\"").unwrap_err();
        assert!(error.contains("colour"));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let vars = env(&[
            (ENV_DATA_DIR, " /var/lib/labgraph "),
            (ENV_LOG_LEVEL, "ERROR"),
            (ENV_LOG_DIR, "/var/log/labgraph"),
        ]);
        let mut config = CoreConfig::default();
        config.apply_env_overrides_with(|key| vars.get(key).cloned());

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/labgraph"));
        assert_eq!(config.logging.level, "error");
        assert_eq!(config.log_dir(), PathBuf::from("/var/log/labgraph"));
    }

    #[test]
    fn invalid_env_overrides_are_ignored() {
        let vars = env(&[(ENV_LOG_LEVEL, "chatty"), (ENV_LOG_DIR, "relative/logs")]);
        let mut config = CoreConfig::default();
        let before = config.clone();
        config.apply_env_overrides_with(|key| vars.get(key).cloned());
        assert_eq!(config, before);
    }

    #[test]
    fn missing_file_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = CoreConfig::from_file(&dir.path().join("labgraph.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labgraph.toml");
        std::fs::write(&path, "data_dir = [").unwrap();
        let error = CoreConfig::from_file(&path).unwrap_err();
        assert!(error.to_string().contains("labgraph.toml"));
    }

    #[test]
    fn in_memory_config_opens_stores_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig {
            data_dir: dir.path().to_path_buf(),
            in_memory: true,
            ..CoreConfig::default()
        };
        config.open_stores().unwrap();
        assert!(!config.documents_path().exists());
    }
}
