//! # Server Configuration
//!
//! Read once at startup from a TOML file (`RANN_CONFIG`, default
//! `rann.toml`). Every section and key is optional.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:3001"
//!
//! [arena]
//! pre_battle_countdown_secs = 70
//! round_countdown_secs = 40
//!
//! [chain]
//! rpc_url = "https://testnet.evm.nodes.onflow.org"
//! chain_id = 545
//!
//! [advisory]
//! endpoint = "http://localhost:8000/moves"
//! ```
//!
//! The signing key is never read from the file, only from
//! `ARENA_AUTOMATION_PRIVATE_KEY`.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rann_arena::{AdvisoryConfig, ArenaConfig};
use rann_blockchain::ChainConfig;
use rann_shared::constants::{FLOW_TESTNET_CHAIN_ID, FLOW_TESTNET_RPC_URL, SERVER_BIND};
use rann_shared::{CONFIRMATION_TIMEOUT_SECS, RPC_REQUEST_TIMEOUT_SECS};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "RANN_CONFIG";
/// Config file used when `RANN_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "rann.toml";
/// Operator signing key.
pub const PRIVATE_KEY_ENV: &str = "ARENA_AUTOMATION_PRIVATE_KEY";
/// RPC endpoint override.
pub const RPC_URL_ENV: &str = "FLOW_TESTNET_RPC";

/// Errors loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// `[server]` section.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SERVER_BIND.to_string(),
        }
    }
}

/// `[chain]` section.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChainSettings {
    /// RPC endpoint. Empty disables the live ledger.
    pub rpc_url: Option<String>,
    /// Expected chain id.
    pub chain_id: u64,
    /// Receipt wait bound.
    pub confirmation_timeout_secs: u64,
    /// Bound on every other node request.
    pub request_timeout_secs: u64,
    /// Probe for contract code before each write.
    pub verify_liveness: bool,
    /// Operator key. Environment only.
    #[serde(skip)]
    pub private_key: Option<String>,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            rpc_url: Some(FLOW_TESTNET_RPC_URL.to_string()),
            chain_id: FLOW_TESTNET_CHAIN_ID,
            confirmation_timeout_secs: CONFIRMATION_TIMEOUT_SECS,
            request_timeout_secs: RPC_REQUEST_TIMEOUT_SECS,
            verify_liveness: true,
            private_key: None,
        }
    }
}

impl fmt::Debug for ChainSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainSettings")
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field("confirmation_timeout_secs", &self.confirmation_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("verify_liveness", &self.verify_liveness)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Complete server configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RannConfig {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Battle timing.
    pub arena: ArenaConfig,
    /// Ledger connection.
    pub chain: ChainSettings,
    /// Move advisory.
    pub advisory: AdvisoryConfig,
}

impl RannConfig {
    /// Loads from `RANN_CONFIG` (or `rann.toml`) and the environment.
    ///
    /// A missing default file is not an error; a missing file named by
    /// `RANN_CONFIG` is.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed, or a
    /// value is invalid.
    pub fn load() -> ConfigResult<Self> {
        let explicit = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let mut config = match &explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Reads one TOML file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(RPC_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.chain.rpc_url = Some(url);
        }
        self.chain.private_key = lookup(PRIVATE_KEY_ENV).filter(|v| !v.trim().is_empty());
        if self.chain.rpc_url.as_deref().is_some_and(|url| url.trim().is_empty()) {
            self.chain.rpc_url = None;
        }
    }

    /// Checks values the server cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the problem.
    pub fn validate(&self) -> ConfigResult<()> {
        self.bind_addr()?;
        self.arena
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        if self.chain.confirmation_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "confirmation_timeout_secs must be positive".into(),
            ));
        }
        if self.chain.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `server.bind` is not an address.
    pub fn bind_addr(&self) -> ConfigResult<SocketAddr> {
        self.server
            .bind
            .parse()
            .map_err(|err| ConfigError::Invalid(format!("server.bind {:?}: {err}", self.server.bind)))
    }

    /// Ledger connection settings.
    #[must_use]
    pub fn chain_config(&self) -> ChainConfig {
        ChainConfig {
            rpc_url: self.chain.rpc_url.clone(),
            chain_id: self.chain.chain_id,
            private_key: self.chain.private_key.clone(),
            confirmation_timeout: Duration::from_secs(self.chain.confirmation_timeout_secs),
            request_timeout: Duration::from_secs(self.chain.request_timeout_secs),
            verify_liveness: self.chain.verify_liveness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RannConfig::default();
        assert_eq!(config.server.bind, "0.0.0.0:3001");
        assert_eq!(config.arena.pre_battle_countdown_secs, 70);
        assert_eq!(config.chain.chain_id, 545);
        assert_eq!(config.chain.confirmation_timeout_secs, 60);
        assert!(config.advisory.endpoint.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file() {
        let config: RannConfig = toml::from_str(
            r#"
            [server]
            bind = "127.0.0.1:8080"

            [arena]
            round_countdown_secs = 20

            [advisory]
            endpoint = "http://localhost:9000/moves"
            budget_ms = 1500
            "#,
        )
        .unwrap();

        assert_eq!(config.bind_addr().unwrap().port(), 8080);
        assert_eq!(config.arena.round_countdown_secs, 20);
        assert_eq!(config.arena.pre_battle_countdown_secs, 70);
        assert_eq!(config.advisory.budget_ms, 1500);
        assert_eq!(config.chain.chain_id, 545);
    }

    #[test]
    fn test_private_key_is_never_read_from_file() {
        let config: RannConfig = toml::from_str(
            r#"
            [chain]
            private_key = "0xdeadbeef"
            "#,
        )
        .unwrap();
        assert!(config.chain.private_key.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RannConfig::default();
        config.apply_env(|key| match key {
            RPC_URL_ENV => Some("http://localhost:8545".into()),
            PRIVATE_KEY_ENV => Some("0xabc".into()),
            _ => None,
        });
        assert_eq!(config.chain.rpc_url.as_deref(), Some("http://localhost:8545"));

        let chain = config.chain_config();
        assert_eq!(chain.private_key.as_deref(), Some("0xabc"));
        assert_eq!(chain.confirmation_timeout, Duration::from_secs(60));
        assert_eq!(chain.request_timeout, Duration::from_secs(15));
        assert!(!format!("{:?}", config.chain).contains("0xabc"));
    }

    #[test]
    fn test_blank_rpc_url_disables_ledger() {
        let mut config: RannConfig = toml::from_str("[chain]\nrpc_url = \"\"").unwrap();
        config.apply_env(|_| None);
        assert!(config.chain_config().rpc_url.is_none());
    }

    #[test]
    fn test_invalid_bind() {
        let mut config = RannConfig::default();
        config.server.bind = "not an address".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = RannConfig::from_file(Path::new("/nonexistent/rann.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
