//! Configuration types shared by the broker and connector binaries.
//!
//! Grounded on `sa_domain::config`: plain `serde`-deserializable structs
//! with a `Default` impl and a `validate()` that returns severity-tagged
//! issues rather than failing eagerly. Parsing from disk (TOML) and CLI
//! overrides happen in the binary crates, not here.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level configuration, optionally loaded from a TOML file and then
/// overridden by CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The service name this broker instance guards; also the database
    /// file stem under the XDG data directory.
    pub for_service: String,
    /// Worker threads backing the tokio runtime (default 2).
    pub worker_threads: usize,
    /// Filesystem path of the local listener socket. Empty means derive
    /// one from `for_service` under the runtime directory.
    pub socket_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            for_service: String::new(),
            worker_threads: 2,
            socket_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Overrides XDG state dir resolution; mainly used by tests.
    pub path_override: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path_override: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Config {
    /// Validate cross-field invariants that `serde` alone can't express.
    /// An empty `for_service` is a hard configuration error.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.server.for_service.trim().is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: "server.for_service must not be empty".to_owned(),
            });
        }

        if self.server.worker_threads == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "server.worker_threads is 0, defaulting to 1 at runtime".to_owned(),
            });
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_rejects_empty_service_name() {
        let config = Config::default();
        let issues = config.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Error));
    }

    #[test]
    fn parses_from_toml() {
        let toml_str = r#"
            [server]
            for_service = "com.example.camera"
            worker_threads = 4
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.for_service, "com.example.camera");
        assert_eq!(config.server.worker_threads, 4);
        assert!(config.validate().is_empty());
    }
}
