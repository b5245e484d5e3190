//! Server configuration, populated from environment variables.

use std::net::SocketAddr;

use thiserror::Error;

/// Runtime configuration for the HTTP host.
///
/// Every field has a default, so the demo server starts with zero
/// configuration.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `APIMOUNT_BIND` | `0.0.0.0:3000` | TCP socket address to listen on |
/// | `APIMOUNT_REQUIRE_AUTH` | `false` | Require authorization on every API endpoint |
/// | `APIMOUNT_TOKENS` | (empty) | Comma-separated bearer tokens accepted by protected endpoints |
/// | `APIMOUNT_ROUTE_TABLE` | `true` | Serve the route table at `GET /_routes` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Socket address the server binds to.
    pub bind_addr: SocketAddr,

    /// Passed to the API module as its require-authorization flag.
    pub require_auth: bool,

    /// Bearer tokens accepted on endpoints that require authorization.
    /// With no tokens configured, protected endpoints reject every request.
    pub tokens: Vec<String>,

    /// Whether `GET /_routes` is mounted.
    pub route_table: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            require_auth: false,
            tokens: Vec::new(),
            route_table: true,
        }
    }
}

/// An environment variable held a value that cannot be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a valid socket address (e.g. 0.0.0.0:3000), got {value:?}")]
    InvalidAddress { var: &'static str, value: String },

    #[error("{var} must be a boolean (true/false, 1/0, yes/no, on/off), got {value:?}")]
    InvalidFlag { var: &'static str, value: String },
}

impl ServerConfig {
    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Populate config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind_addr = match lookup("APIMOUNT_BIND") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidAddress {
                    var: "APIMOUNT_BIND",
                    value,
                })?,
            None => defaults.bind_addr,
        };

        let require_auth = match lookup("APIMOUNT_REQUIRE_AUTH") {
            Some(value) => parse_flag("APIMOUNT_REQUIRE_AUTH", value)?,
            None => defaults.require_auth,
        };

        let route_table = match lookup("APIMOUNT_ROUTE_TABLE") {
            Some(value) => parse_flag("APIMOUNT_ROUTE_TABLE", value)?,
            None => defaults.route_table,
        };

        let tokens = lookup("APIMOUNT_TOKENS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_addr,
            require_auth,
            tokens,
            route_table,
        })
    }
}

fn parse_flag(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { var, value }),
    }
}
