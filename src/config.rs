//! Client configuration.
//!
//! Settings come from an optional TOML file and `DQMWATCH_*` environment
//! variables, in that order of precedence (environment wins). Command-line
//! flags are applied on top by the binary.
//!
//! ```toml
//! host = "dqm-server.local"
//! port = 9090
//! packages = ["CDC", "ECL"]
//! channel_capacity = 32
//! log_filter = "dqmwatch=debug"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::session::{PackageSelection, DEFAULT_CHANNEL_CAPACITY};

/// Port the reference monitoring server listens on.
pub const DEFAULT_PORT: u16 = 9090;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Packages to monitor. Empty selects everything the server offers.
    pub packages: Vec<String>,
    pub channel_capacity: usize,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            packages: Vec::new(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            log_filter: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load from `path` (if any) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(
                Environment::with_prefix("DQMWATCH")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("packages"),
            )
            .build()
            .context("Failed to load configuration")?;

        let client: ClientConfig = config
            .try_deserialize()
            .context("Invalid client configuration")?;
        if client.channel_capacity == 0 {
            anyhow::bail!("channel_capacity must be at least 1");
        }
        Ok(client)
    }

    /// `host:port` to connect to.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn selection(&self) -> PackageSelection {
        PackageSelection::from_names(self.packages.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.address(), "localhost:9090");
        assert_eq!(config.selection(), PackageSelection::All);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_load_from_file() {
        let file = config_file(
            r#"
host = "dqm-server.local"
port = 9191
packages = ["CDC", "ECL"]
"#,
        );

        let config = ClientConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.address(), "dqm-server.local:9191");
        assert_eq!(
            config.selection(),
            PackageSelection::Only(vec!["CDC".to_string(), "ECL".to_string()])
        );
        // Unset keys keep their defaults
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let file = config_file("channel_capacity = 0\n");
        let err = ClientConfig::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("channel_capacity"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(ClientConfig::load(Some(&path)).is_err());
    }
}
