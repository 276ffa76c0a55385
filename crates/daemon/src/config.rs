// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TOML configuration, loaded from the path named by `DYNAMO_SERVER_CONFIG`
//! (default `/etc/fodd/daemon.toml`).

use fod_adapters::ClassifierConfig;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

const CONFIG_ENV_VAR: &str = "DYNAMO_SERVER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "/etc/fodd/daemon.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// User to drop privileges to after binding any privileged resources.
    /// A no-op if the daemon isn't running as root.
    pub user: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub file_operations: FileOperationsConfig,
    /// Directory holding the WAL and snapshot standing in for the shared
    /// relational database (see `fod_storage::Store`).
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    /// Overrides for the error classifier's substring rule table.
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("/var/lib/fodd")
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    pub path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            path: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileOperationsConfig {
    pub daemon: DaemonSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonSection {
    #[serde(default = "default_max_parallel_links")]
    pub max_parallel_links: usize,
    #[serde(default)]
    pub transfer_timeout: u64,
    #[serde(default)]
    pub overwrite: bool,
    pub x509_proxy: Option<PathBuf>,
    /// Defaults to `x509_proxy` when unset: staging rarely needs a
    /// different identity, but some sites' tape endpoints require one.
    pub staging_x509_proxy: Option<PathBuf>,
    #[serde(default = "default_gfal2_verbosity")]
    pub gfal2_verbosity: String,
}

impl DaemonSection {
    pub fn effective_staging_proxy(&self) -> Option<PathBuf> {
        self.staging_x509_proxy.clone().or_else(|| self.x509_proxy.clone())
    }
}

fn default_max_parallel_links() -> usize {
    10
}

fn default_gfal2_verbosity() -> String {
    "normal".to_string()
}

impl Config {
    /// Load from the path named by `DYNAMO_SERVER_CONFIG`, or
    /// [`DEFAULT_CONFIG_PATH`] if unset.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV_VAR).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let toml = r#"
            user = "fts3"

            [file_operations.daemon]
            max_parallel_links = 20
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.file_operations.daemon.max_parallel_links, 20);
        assert!(!config.file_operations.daemon.overwrite);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn staging_proxy_falls_back_to_primary_proxy() {
        let section = DaemonSection {
            max_parallel_links: 10,
            transfer_timeout: 0,
            overwrite: false,
            x509_proxy: Some(PathBuf::from("/tmp/proxy")),
            staging_x509_proxy: None,
            gfal2_verbosity: "normal".to_string(),
        };
        assert_eq!(section.effective_staging_proxy(), Some(PathBuf::from("/tmp/proxy")));
    }
}
