//! Environment variable names read by
//! [`LoggerConfig::from_env`](crate::config::LoggerConfig::from_env).
//!
//! These are purely helpers; the pipeline itself never reads the
//! environment.

/// Minimum level: `debug`, `info`, `warn` or `error`.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Output mode: `text`, `json`, `color` or `color-json`.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Destination: `stdout`, `file:<path>` or `tee:<path>` (console and file).
pub const LOG_OUTPUT_ENV: &str = "LOG_OUTPUT";

/// Whether to append the source location, e.g. `true` or `0`.
pub const LOG_ADD_SOURCE_ENV: &str = "LOG_ADD_SOURCE";

/// Queue capacity of the async buffer; unset writes synchronously.
pub const LOG_ASYNC_BUFFER_ENV: &str = "LOG_ASYNC_BUFFER";

/// `strftime` format for the record timestamp.
pub const LOG_TIME_FORMAT_ENV: &str = "LOG_TIME_FORMAT";

/// Deployment environment tag added to every record as `env`.
pub const LOG_ENV_ENV: &str = "LOG_ENV";

/// Read a non-empty environment variable.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
