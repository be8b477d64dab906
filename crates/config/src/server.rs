//! Server-side configuration loaded from `promptgate.toml`.

use promptgate_core::error::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Long-lived server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on any single upstream HTTP call, in seconds
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8787
}
fn default_upstream_timeout_secs() -> u64 {
    120
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file, falling back to defaults when the file is
    /// absent. `PROMPTGATE_HOST` / `PROMPTGATE_PORT` override the file.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p).map_err(|e| {
                    Error::Config(ConfigError::InvalidHeader(format!(
                        "cannot read {}: {e}",
                        p.display()
                    )))
                })?;
                toml::from_str(&raw).map_err(|e| {
                    Error::Config(ConfigError::InvalidHeader(format!(
                        "invalid config file {}: {e}",
                        p.display()
                    )))
                })?
            }
            None => {
                let default_path = Path::new("promptgate.toml");
                if default_path.exists() {
                    return Self::load(Some(default_path));
                }
                Self::default()
            }
        };

        if let Ok(host) = std::env::var("PROMPTGATE_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("PROMPTGATE_PORT") {
            config.port = port.parse().map_err(|_| {
                Error::Config(ConfigError::InvalidHeader(format!(
                    "PROMPTGATE_PORT is not a port number: {port}"
                )))
            })?;
        }

        debug!(host = %config.host, port = config.port, "Server config loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_no_file() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8787);
        assert_eq!(config.upstream_timeout_secs, 120);
    }

    #[test]
    fn loads_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host = \"0.0.0.0\"\nport = 9000").unwrap();

        let config = ServerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        // Unspecified fields keep their defaults
        assert_eq!(config.upstream_timeout_secs, 120);
    }

    #[test]
    fn rejects_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not-a-number\"").unwrap();
        assert!(ServerConfig::load(Some(file.path())).is_err());
    }
}
