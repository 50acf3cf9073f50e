//! Configuration loaded from environment variables
//!
//! The functional surface is deliberately tiny: beyond address and log
//! settings, the only knob is which header carries the session id.
//!
//! | Variable               | Default          |
//! |------------------------|------------------|
//! | `JALKI_HTTP_ADDR`      | `0.0.0.0:8080`   |
//! | `JALKI_LOG_LEVEL`      | `info`           |
//! | `JALKI_LOG_FORMAT`     | `json`           |
//! | `JALKI_SESSION_HEADER` | `x-session-id`   |

use axum::http::HeaderName;
use jalki_core::keys;
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;

/// Configuration error
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An environment variable held a value that does not parse
    #[error("invalid {key}: {message}")]
    Invalid {
        /// The offending variable name
        key: &'static str,
        /// What was wrong with it
        message: String,
    },
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON record per line, diagnostic fields included
    Json,
    /// Human-readable output for development
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen address
    pub http_addr: SocketAddr,
    /// Default tracing filter (overridden by `RUST_LOG`)
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Header carrying the inbound session id
    pub session_header: HeaderName,
}

impl Config {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let http_addr = match var("JALKI_HTTP_ADDR") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                key: "JALKI_HTTP_ADDR",
                message: format!("{e}"),
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let log_level = var("JALKI_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let log_format = match var("JALKI_LOG_FORMAT") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::Invalid {
                key: "JALKI_LOG_FORMAT",
                message,
            })?,
            None => LogFormat::Json,
        };

        let session_header = match var("JALKI_SESSION_HEADER") {
            Some(raw) => {
                HeaderName::from_bytes(raw.as_bytes()).map_err(|e| ConfigError::Invalid {
                    key: "JALKI_SESSION_HEADER",
                    message: format!("{e}"),
                })?
            }
            None => HeaderName::from_static(keys::SESSION_ID),
        };

        Ok(Self {
            http_addr,
            log_level,
            log_format,
            session_header,
        })
    }
}
