//! Shared configuration for the PIME bridge daemon.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! TOML file (`--config-path` or `PIME_CONFIG_PATH`), then `PIME_*`
//! environment variables, and finally command-line flags.

mod defaults;
mod logging;
mod socket;

use serde::{Deserialize, Serialize};

use ortho_config::{OrthoConfig, OrthoError};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_MAX_MESSAGE_BYTES, DEFAULT_TCP_PORT, default_log_filter,
    default_log_filter_string, default_log_format, default_max_message_bytes,
    default_socket_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "PIME")]
pub struct Config {
    /// Endpoint the daemon listens on for host connections.
    #[ortho_config(default = default_socket_endpoint())]
    pub daemon_socket: SocketEndpoint,
    /// `tracing` filter expression applied to daemon logs.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for daemon logs.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Upper bound on the size of one reassembled request.
    #[ortho_config(default = default_max_message_bytes())]
    pub max_message_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_socket: default_socket_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

impl Config {
    /// Socket endpoint the daemon binds.
    #[must_use]
    pub fn daemon_socket(&self) -> &SocketEndpoint {
        &self.daemon_socket
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Maximum request size in bytes.
    #[must_use]
    pub fn max_message_bytes(&self) -> usize {
        self.max_message_bytes
    }
}

/// Result alias for configuration loading.
pub type ConfigResult = Result<Config, std::sync::Arc<OrthoError>>;
