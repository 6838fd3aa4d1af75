//! Process configuration from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `REDEEMER_LISTEN_ADDR` | `127.0.0.1:3000` |
//! | `REDEEMER_STATE_FILE` | `redeemer-state.json` |
//! | `REDEEMER_MASTER_SERVER` | `https://master.idlechampions.com/~idledragons/` |
//! | `REDEEMER_REQUEST_TIMEOUT_SECS` | `30` |
//!
//! Unset variables take their default. Set but unparseable values are errors.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::api::DEFAULT_MASTER_SERVER;

const ENV_LISTEN_ADDR: &str = "REDEEMER_LISTEN_ADDR";
const ENV_STATE_FILE: &str = "REDEEMER_STATE_FILE";
const ENV_MASTER_SERVER: &str = "REDEEMER_MASTER_SERVER";
const ENV_REQUEST_TIMEOUT: &str = "REDEEMER_REQUEST_TIMEOUT_SECS";

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_STATE_FILE: &str = "redeemer-state.json";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: invalid socket address {value:?}")]
    InvalidListenAddr {
        var: &'static str,
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("{var}: invalid URL {value:?}")]
    InvalidUrl {
        var: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{var}: expected a positive number of seconds, got {value:?}")]
    InvalidTimeout { var: &'static str, value: String },

    #[error("{var}: must not be empty")]
    Empty { var: &'static str },
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address the HTTP server binds.
    pub listen_addr: SocketAddr,

    /// Path of the persisted settings document.
    pub state_file: PathBuf,

    /// Base URL of the master server used to resolve the play server.
    pub master_server: String,

    /// Per-request timeout for the redemption API.
    pub request_timeout: Duration,
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads configuration through `lookup`, which returns a variable's value
    /// if it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let listen_raw = lookup(ENV_LISTEN_ADDR).unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|source| ConfigError::InvalidListenAddr {
                var: ENV_LISTEN_ADDR,
                value: listen_raw.clone(),
                source,
            })?;

        let state_file = match lookup(ENV_STATE_FILE) {
            Some(v) if v.trim().is_empty() => {
                return Err(ConfigError::Empty {
                    var: ENV_STATE_FILE,
                });
            }
            Some(v) => PathBuf::from(v),
            None => PathBuf::from(DEFAULT_STATE_FILE),
        };

        let master_server =
            lookup(ENV_MASTER_SERVER).unwrap_or_else(|| DEFAULT_MASTER_SERVER.to_string());
        Url::parse(master_server.trim()).map_err(|source| ConfigError::InvalidUrl {
            var: ENV_MASTER_SERVER,
            value: master_server.clone(),
            source,
        })?;

        let request_timeout = match lookup(ENV_REQUEST_TIMEOUT) {
            Some(v) => match v.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidTimeout {
                        var: ENV_REQUEST_TIMEOUT,
                        value: v,
                    });
                }
            },
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(Config {
            listen_addr,
            state_file,
            master_server: master_server.trim().to_string(),
            request_timeout,
        })
    }
}
