//! Shared configuration for the Chime event daemon.
//!
//! Values are layered by `ortho_config`: built-in defaults, then a
//! `chime.toml` file (located with `--config-path` or `CHIME_CONFIG_PATH`),
//! then `CHIME_*` environment variables, and finally command-line flags. Every
//! field except the application token carries a built-in default, so a bare
//! invocation with no file, environment, or flags still resolves.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub mod defaults;
mod logging;
mod socket;

pub use defaults::{
    DEFAULT_EVENT_SOURCE, DEFAULT_LOG_FILTER, DEFAULT_WORKERS, default_event_source,
    default_log_filter, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError};

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(prefix = "CHIME")]
pub struct Config {
    /// Number of worker threads requested for the consumer pool.
    ///
    /// Values below one are accepted here and replaced by the default when the
    /// pool is built.
    #[ortho_config(default = i64::from(DEFAULT_WORKERS))]
    pub workers: i64,
    /// Remote endpoint delivering socket events.
    #[ortho_config(default = default_event_source())]
    pub event_source: SocketEndpoint,
    /// Application token presented when the transport connects.
    pub app_token: Option<String>,
    /// `tracing` filter directive, for example `info` or `chimed=debug`.
    #[ortho_config(default = default_log_filter().to_owned())]
    pub log_filter: String,
    /// Output format for structured logs.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: i64::from(DEFAULT_WORKERS),
            event_source: default_event_source(),
            app_token: None,
            log_filter: default_log_filter().to_owned(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads the configuration from the process arguments, the environment,
    /// and any configuration file.
    ///
    /// # Errors
    ///
    /// Returns the aggregated loader error when any layer is invalid.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load()
    }

    /// Loads the configuration using `args` in place of the process arguments.
    ///
    /// The first item is the program name, as with `std::env::args_os`.
    ///
    /// # Errors
    ///
    /// Returns the aggregated loader error when any layer is invalid.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Worker count as requested by the merged configuration sources.
    #[must_use]
    pub const fn requested_workers(&self) -> i64 {
        self.workers
    }

    /// Endpoint the transport connects to.
    #[must_use]
    pub fn event_source(&self) -> SocketEndpoint {
        self.event_source.clone()
    }

    /// Application token, when one was supplied.
    #[must_use]
    pub fn app_token(&self) -> Option<&str> {
        self.app_token.as_deref()
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
