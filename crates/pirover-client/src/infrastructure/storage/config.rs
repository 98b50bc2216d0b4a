//! TOML-based configuration for the client binary.
//!
//! The file is looked up in this order:
//! 1. the first command-line argument,
//! 2. the `PIROVER_CONFIG` environment variable,
//! 3. `pirover.toml` in the working directory.
//!
//! A missing file is not an error; every field has a default.
//!
//! ```toml
//! [connection]
//! host = "pirover.local"
//! port = 1987
//! password = "uMieY6ophu[a"
//! record_video = false
//!
//! [client]
//! log_level = "info"
//! ```
//!
//! # Serde default values (for beginners)
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the TOML file, so a file that
//! only sets `host` is still complete.

use std::path::{Path, PathBuf};

use pirover_core::{protocol::messages::DEFAULT_PORT, ConnectionParameters};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Environment variable that points at the config file.
pub const CONFIG_ENV_VAR: &str = "PIROVER_CONFIG";

/// File name used when neither the command line nor the environment names one.
pub const DEFAULT_CONFIG_FILE: &str = "pirover.toml";

/// Longest accepted host name, in characters.
const MAX_HOST_LEN: usize = 255;

/// Longest accepted label between two dots.
const MAX_LABEL_LEN: usize = 63;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
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

    /// The host is not a valid host name or IP address.
    #[error("invalid host name or IP address: {0:?}")]
    InvalidHost(String),

    /// The port is outside 1–65535.
    #[error("invalid port number: {0}")]
    InvalidPort(i64),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub client: ClientSection,
}

/// Where and how to connect.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ConnectionConfig {
    /// Host name or IP address of the rover.  Empty until configured.
    #[serde(default)]
    pub host: String,
    /// TCP port.  Kept wide so out-of-range values can be reported as such.
    #[serde(default = "default_port")]
    pub port: i64,
    /// Shared secret for the handshake.
    #[serde(default = "default_password")]
    pub password: String,
    /// Whether the operator asked for video recording.
    #[serde(default)]
    pub record_video: bool,
}

/// Process-level settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ClientSection {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    /// `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_port() -> i64 {
    i64::from(DEFAULT_PORT)
}
fn default_password() -> String {
    "uMieY6ophu[a".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            password: default_password(),
            record_video: false,
        }
    }
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ConnectionConfig {
    /// Validates host and port and builds the parameters for a session.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHost`] or [`ConfigError::InvalidPort`].
    pub fn to_parameters(&self) -> Result<ConnectionParameters, ConfigError> {
        if !is_valid_hostname(&self.host) {
            return Err(ConfigError::InvalidHost(self.host.clone()));
        }
        let port = u16::try_from(self.port)
            .ok()
            .filter(|port| *port != 0)
            .ok_or(ConfigError::InvalidPort(self.port))?;
        Ok(ConnectionParameters::new(
            self.host.as_str(),
            port,
            self.password.as_str(),
            self.record_video,
        ))
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

/// Checks that `host` looks like a host name or dotted IPv4 address.
///
/// One trailing dot is allowed.  Every label must be 1–63 characters of
/// ASCII letters, digits and `-`, and must not start or end with `-`.
pub fn is_valid_hostname(host: &str) -> bool {
    let len = host.chars().count();
    if len == 0 || len > MAX_HOST_LEN {
        return false;
    }
    let host = host.strip_suffix('.').unwrap_or(host);
    host.split('.').all(is_valid_label)
}

fn is_valid_label(label: &str) -> bool {
    (1..=MAX_LABEL_LEN).contains(&label.len())
        && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        && !label.starts_with('-')
        && !label.ends_with('-')
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Picks the config file path from `cli_arg`, then `PIROVER_CONFIG`, then
/// the default file name.
pub fn resolve_config_path(cli_arg: Option<String>) -> PathBuf {
    cli_arg
        .or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Parses configuration text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is malformed.
pub fn parse_config(content: &str) -> Result<ClientConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Loads `ClientConfig` from `path`, returning `ClientConfig::default()` if
/// the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!(path = %path.display(), "loading config");
            parse_config(&content)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(ClientConfig::default())
        }
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_client_config_default_values() {
        // Arrange / Act
        let cfg = ClientConfig::default();

        // Assert
        assert_eq!(cfg.connection.host, "");
        assert_eq!(cfg.connection.port, 1987);
        assert_eq!(cfg.connection.password, "uMieY6ophu[a");
        assert!(!cfg.connection.record_video);
        assert_eq!(cfg.client.log_level, "info");
    }

    #[test]
    fn test_parse_empty_file_gives_defaults() {
        assert_eq!(parse_config("").unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_parse_partial_file_fills_missing_fields() {
        // Arrange
        let text = "[connection]\nhost = \"rover.lan\"\n";

        // Act
        let cfg = parse_config(text).unwrap();

        // Assert
        assert_eq!(cfg.connection.host, "rover.lan");
        assert_eq!(cfg.connection.port, 1987);
        assert_eq!(cfg.client.log_level, "info");
    }

    #[test]
    fn test_parse_full_file() {
        let text = r#"
            [connection]
            host = "192.168.1.50"
            port = 2000
            password = "secret"
            record_video = true

            [client]
            log_level = "debug"
        "#;

        let cfg = parse_config(text).unwrap();

        assert_eq!(cfg.connection.host, "192.168.1.50");
        assert_eq!(cfg.connection.port, 2000);
        assert_eq!(cfg.connection.password, "secret");
        assert!(cfg.connection.record_video);
        assert_eq!(cfg.client.log_level, "debug");
    }

    #[test]
    fn test_parse_malformed_toml_is_an_error() {
        let result = parse_config("[connection\nhost = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    // ── Loading ───────────────────────────────────────────────────────────────

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("pirover-client-test-does-not-exist.toml");
        assert_eq!(load_config(&path).unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_load_reads_file_from_disk() {
        // Arrange
        let path = std::env::temp_dir().join(format!(
            "pirover-client-test-{}-load.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[connection]\nhost = \"rover\"\nport = 4242\n").unwrap();

        // Act
        let cfg = load_config(&path);
        std::fs::remove_file(&path).unwrap();

        // Assert
        let cfg = cfg.unwrap();
        assert_eq!(cfg.connection.host, "rover");
        assert_eq!(cfg.connection.port, 4242);
    }

    #[test]
    fn test_resolve_config_path_prefers_cli_argument() {
        let path = resolve_config_path(Some("/etc/rover.toml".to_string()));
        assert_eq!(path, PathBuf::from("/etc/rover.toml"));
    }

    // ── Host validation ───────────────────────────────────────────────────────

    #[test]
    fn test_valid_hostnames() {
        for host in [
            "pirover",
            "pirover.local",
            "PiRover.Local.",
            "192.168.1.50",
            "my-rover-01.example.com",
            &"a".repeat(63),
        ] {
            assert!(is_valid_hostname(host), "{host:?} should be valid");
        }
    }

    #[test]
    fn test_invalid_hostnames() {
        for host in [
            "",
            ".",
            "rover..local",
            "-rover",
            "rover-",
            "rover.local..",
            "under_score",
            "space here",
            "rövér",
            &"a".repeat(64),
        ] {
            assert!(!is_valid_hostname(host), "{host:?} should be invalid");
        }
    }

    #[test]
    fn test_hostname_longer_than_255_is_invalid() {
        let host = vec!["abc"; 65].join(".");
        assert!(host.len() > 255);
        assert!(!is_valid_hostname(&host));
    }

    // ── Parameters ────────────────────────────────────────────────────────────

    #[test]
    fn test_to_parameters_builds_connection_parameters() {
        // Arrange
        let cfg = ConnectionConfig {
            host: "rover.lan".to_string(),
            port: 1987,
            password: "secret".to_string(),
            record_video: true,
        };

        // Act
        let params = cfg.to_parameters().unwrap();

        // Assert
        assert_eq!(params.address(), "rover.lan:1987");
        assert_eq!(params.password, "secret");
        assert!(params.record_video);
    }

    #[test]
    fn test_to_parameters_rejects_empty_host() {
        let cfg = ConnectionConfig::default();
        assert!(matches!(cfg.to_parameters(), Err(ConfigError::InvalidHost(_))));
    }

    #[test]
    fn test_to_parameters_rejects_out_of_range_ports() {
        for port in [0, -1, 65_536, 100_000] {
            let cfg = ConnectionConfig {
                host: "rover".to_string(),
                port,
                ..ConnectionConfig::default()
            };
            match cfg.to_parameters() {
                Err(ConfigError::InvalidPort(p)) => assert_eq!(p, port),
                other => panic!("port {port} accepted: {other:?}"),
            }
        }
    }

    #[test]
    fn test_to_parameters_accepts_port_bounds() {
        for port in [1, 65_535] {
            let cfg = ConnectionConfig {
                host: "rover".to_string(),
                port,
                ..ConnectionConfig::default()
            };
            assert_eq!(i64::from(cfg.to_parameters().unwrap().port), port);
        }
    }
}
