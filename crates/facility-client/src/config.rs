//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/facility-booking/config.toml` by default. A missing file means
//! defaults everywhere.
//!
//! ```toml
//! debug = false
//! log_format = "compact"   # compact, pretty or json
//!
//! [server]
//! host = "127.0.0.1"
//! port = 6789
//!
//! [rpc]
//! timeout_secs = 5
//! max_retries = 5
//! buffer_size = 1024
//!
//! [client]
//! bind_port = 0
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use facility_protocol::DEFAULT_SERVER_PORT;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};
use crate::tracing::LogFormat;

/// Per-attempt receive timeout in seconds.
pub const TIMEOUT_SEC: u64 = 5;
/// Attempts per call before giving up.
pub const MAX_RETRIES: u32 = 5;
/// Receive buffer size in bytes.
pub const BUFFER_SIZE: usize = 1024;

const MIN_BUFFER_SIZE: usize = 16;

/// Configuration for the facility client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Log line format on stderr.
    pub log_format: LogFormat,

    /// Facility server address.
    pub server: ServerSettings,

    /// Retry and buffer tuning.
    pub rpc: RpcConfig,

    /// Local socket settings.
    pub client: LocalSettings,
}

/// Facility server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host name or IP address.
    pub host: String,

    /// UDP port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_SERVER_PORT,
        }
    }
}

/// RPC settings as written in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Seconds to wait for a reply on each attempt.
    pub timeout_secs: u64,

    /// Attempts per call, the first send included.
    pub max_retries: u32,

    /// Largest datagram accepted, in bytes.
    pub buffer_size: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout_secs: TIMEOUT_SEC,
            max_retries: MAX_RETRIES,
            buffer_size: BUFFER_SIZE,
        }
    }
}

/// Local socket settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSettings {
    /// Local UDP port; 0 lets the system choose.
    pub bind_port: u16,
}

/// Validated RPC settings, fixed for the lifetime of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpcSettings {
    pub timeout: Duration,
    pub max_retries: u32,
    pub buffer_size: usize,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(TIMEOUT_SEC),
            max_retries: MAX_RETRIES,
            buffer_size: BUFFER_SIZE,
        }
    }
}

impl RpcSettings {
    pub fn validate(&self) -> ClientResult<()> {
        if self.timeout.is_zero() {
            return Err(ClientError::Config("rpc timeout must be positive".into()));
        }
        if self.max_retries == 0 {
            return Err(ClientError::Config(
                "rpc max_retries must be at least 1".into(),
            ));
        }
        if self.buffer_size < MIN_BUFFER_SIZE {
            return Err(ClientError::Config(format!(
                "rpc buffer_size must be at least {MIN_BUFFER_SIZE} bytes"
            )));
        }
        Ok(())
    }
}

impl TryFrom<&RpcConfig> for RpcSettings {
    type Error = ClientError;

    fn try_from(config: &RpcConfig) -> ClientResult<Self> {
        let settings = Self {
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            buffer_size: config.buffer_size,
        };
        settings.validate()?;
        Ok(settings)
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Validated RPC settings.
    pub fn rpc_settings(&self) -> ClientResult<RpcSettings> {
        RpcSettings::try_from(&self.rpc)
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("facility-booking")
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let config = ClientConfig::default();
        assert_eq!(config.server.port, 6789);
        assert_eq!(config.client.bind_port, 0);

        let settings = config.rpc_settings().unwrap();
        assert_eq!(settings, RpcSettings::default());
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.buffer_size, 1024);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
debug = true
log_format = "pretty"

[server]
host = "facility.example.org"

[rpc]
max_retries = 3
"#
        )
        .unwrap();

        let config = ClientConfig::load_from(file.path()).unwrap();
        assert!(config.debug);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.server.host, "facility.example.org");
        assert_eq!(config.server.port, 6789);
        assert_eq!(config.rpc.max_retries, 3);
        assert_eq!(config.rpc.timeout_secs, 5);
    }

    #[test]
    fn unreadable_or_invalid_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(
            ClientConfig::load_from(&missing)
                .unwrap_err()
                .contains("failed to read")
        );

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[rpc]\nmax_retries = \"many\"\n").unwrap();
        assert!(
            ClientConfig::load_from(&bad)
                .unwrap_err()
                .contains("failed to parse")
        );
    }

    #[test]
    fn settings_are_validated() {
        let mut rpc = RpcConfig::default();
        rpc.max_retries = 0;
        assert!(RpcSettings::try_from(&rpc).is_err());

        let mut rpc = RpcConfig::default();
        rpc.timeout_secs = 0;
        assert!(RpcSettings::try_from(&rpc).is_err());

        let mut rpc = RpcConfig::default();
        rpc.buffer_size = 8;
        assert!(matches!(
            RpcSettings::try_from(&rpc),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn serialized_config_parses_back() {
        let config = ClientConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("[server]"));
        assert_eq!(toml::from_str::<ClientConfig>(&text).unwrap(), config);
    }

    #[test]
    fn default_path_is_under_facility_booking() {
        let path = ClientConfig::default_path();
        assert!(path.ends_with("facility-booking/config.toml"));
    }
}
