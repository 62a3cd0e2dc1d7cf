use crate::async_sink::buffered;
use crate::env::{
    env_opt, LOG_ADD_SOURCE_ENV, LOG_ASYNC_BUFFER_ENV, LOG_ENV_ENV, LOG_FORMAT_ENV,
    LOG_LEVEL_ENV, LOG_OUTPUT_ENV, LOG_TIME_FORMAT_ENV,
};
use crate::error::{ConfigError, Error};
use crate::file::file;
use crate::format::{self, Formatter, HandlerOptions, ReplaceAttr};
use crate::interceptor::{self, Interceptor};
use crate::level::Level;
use crate::pipeline::Pipeline;
use crate::rotation::RotationConfig;
use crate::sink::{multi, stdout, Sink};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// How records are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    #[default]
    Text,
    Json,
    #[serde(alias = "color-text")]
    Color,
    ColorJson,
}

impl OutputMode {
    /// Shared formatter instance for this mode.
    pub fn formatter(self) -> &'static dyn Formatter {
        match self {
            OutputMode::Text => format::text(),
            OutputMode::Json => format::json(),
            OutputMode::Color => format::color_text(),
            OutputMode::ColorJson => format::color_json(),
        }
    }
}

impl FromStr for OutputMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutputMode::Text),
            "json" => Ok(OutputMode::Json),
            "color" | "color-text" | "color_text" => Ok(OutputMode::Color),
            "color-json" | "color_json" | "colorjson" => Ok(OutputMode::ColorJson),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

/// Where formatted records go.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Destination {
    #[default]
    Console,
    File {
        path: PathBuf,
        #[serde(default)]
        rotation: RotationConfig,
    },
    /// Console and a rotating file at once.
    ConsoleAndFile {
        path: PathBuf,
        #[serde(default)]
        rotation: RotationConfig,
    },
    /// A sink built by the caller.
    #[serde(skip)]
    Sink(Arc<dyn Sink>),
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Console => f.write_str("Console"),
            Destination::File { path, rotation } => f
                .debug_struct("File")
                .field("path", path)
                .field("rotation", rotation)
                .finish(),
            Destination::ConsoleAndFile { path, rotation } => f
                .debug_struct("ConsoleAndFile")
                .field("path", path)
                .field("rotation", rotation)
                .finish(),
            Destination::Sink(_) => f.write_str("Sink(..)"),
        }
    }
}

impl FromStr for Destination {
    type Err = ConfigError;

    /// Parse `stdout`/`console`, `file:<path>` or `tee:<path>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let lower = s.to_ascii_lowercase();
        if lower.is_empty() || lower == "stdout" || lower == "console" {
            return Ok(Destination::Console);
        }
        let file_path = |rest: &str| {
            if rest.is_empty() {
                Err(ConfigError::InvalidDestination(s.to_string()))
            } else {
                Ok(PathBuf::from(rest))
            }
        };
        if lower.starts_with("file:") {
            let path = file_path(&s["file:".len()..])?;
            Ok(Destination::File { path, rotation: RotationConfig::default() })
        } else if lower.starts_with("tee:") {
            let path = file_path(&s["tee:".len()..])?;
            Ok(Destination::ConsoleAndFile { path, rotation: RotationConfig::default() })
        } else {
            Err(ConfigError::InvalidDestination(s.to_string()))
        }
    }
}

/// Everything needed to build a [`Pipeline`] and its level gate.
///
/// **Fields**
/// - `level`: records below this level are discarded before formatting.
/// - `mode`: output format.
/// - `destination`: sink the formatted bytes go to.
/// - `add_source`: append `source="file:line"` when known.
/// - `time_format`: custom `strftime` format for the timestamp.
/// - `async_buffer`: when set, wrap the sink in an async buffer of this
///   capacity. Records are dropped, not blocked on, when it is full.
/// - `env`: deployment tag added to every record, together with the
///   trace id of the call context.
/// - `interceptor`: hook that can rewrite or drop records.
/// - `replace_attr`: per-attribute rewrite applied while encoding.
#[derive(Clone, Default)]
pub struct LoggerConfig {
    pub level: Level,
    pub mode: OutputMode,
    pub destination: Destination,
    pub add_source: bool,
    pub time_format: Option<String>,
    pub async_buffer: Option<usize>,
    pub env: Option<String>,
    pub interceptor: Option<Interceptor>,
    pub replace_attr: Option<ReplaceAttr>,
}

impl fmt::Debug for LoggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerConfig")
            .field("level", &self.level)
            .field("mode", &self.mode)
            .field("destination", &self.destination)
            .field("add_source", &self.add_source)
            .field("time_format", &self.time_format)
            .field("async_buffer", &self.async_buffer)
            .field("env", &self.env)
            .field("interceptor", &self.interceptor.is_some())
            .field("replace_attr", &self.replace_attr.is_some())
            .finish()
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum level by name; unknown names mean `info`.
    pub fn with_level(mut self, level: &str) -> Self {
        self.level = Level::parse(level);
        self
    }

    pub fn with_min_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_console(self) -> Self {
        self.with_destination(Destination::Console)
    }

    pub fn with_file(self, path: impl Into<PathBuf>, rotation: RotationConfig) -> Self {
        self.with_destination(Destination::File { path: path.into(), rotation })
    }

    pub fn with_sink(self, sink: Arc<dyn Sink>) -> Self {
        self.with_destination(Destination::Sink(sink))
    }

    pub fn with_source(mut self, on: bool) -> Self {
        self.add_source = on;
        self
    }

    pub fn with_time_format(mut self, format: impl Into<String>) -> Self {
        self.time_format = Some(format.into());
        self
    }

    pub fn with_async(mut self, capacity: usize) -> Self {
        self.async_buffer = Some(capacity);
        self
    }

    pub fn with_env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    pub fn with_interceptor(mut self, interceptor: Interceptor) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    pub fn with_replace_attr(mut self, replace: ReplaceAttr) -> Self {
        self.replace_attr = Some(replace);
        self
    }

    /// Development preset: debug level, colored text on the console,
    /// source locations on.
    pub fn dev() -> Self {
        LoggerConfig::new()
            .with_min_level(Level::DEBUG)
            .with_mode(OutputMode::Color)
            .with_console()
            .with_source(true)
    }

    /// Production preset: info level, JSON into a rotating file
    /// (100 MB, 7 backups).
    pub fn prod(path: impl Into<PathBuf>) -> Self {
        LoggerConfig::new()
            .with_min_level(Level::INFO)
            .with_mode(OutputMode::Json)
            .with_file(path, RotationConfig::default().rotation(100, 7))
            .with_source(false)
    }

    /// Preset from plain strings, e.g. command-line flags.
    ///
    /// An empty level means `info`; an empty or unknown format means
    /// JSON; an empty file means console output.
    pub fn preset(level: &str, format: &str, file: &str) -> Self {
        let mode = match format.trim().to_ascii_lowercase().as_str() {
            "text" => OutputMode::Text,
            "color" => OutputMode::Color,
            _ => OutputMode::Json,
        };
        let config = LoggerConfig::new().with_level(level).with_mode(mode);
        if file.is_empty() {
            config.with_console()
        } else {
            config.with_file(file, RotationConfig::default().rotation(100, 7))
        }
    }

    /// Build a configuration from the `LOG_*` environment variables.
    ///
    /// Unset variables keep their defaults. An unknown level falls back to
    /// `info`; malformed values for the other variables are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = LoggerConfig::new();
        if let Some(level) = env_opt(LOG_LEVEL_ENV) {
            config.level = Level::parse(&level);
        }
        if let Some(mode) = env_opt(LOG_FORMAT_ENV) {
            config.mode = mode.parse()?;
        }
        if let Some(output) = env_opt(LOG_OUTPUT_ENV) {
            config.destination = output.parse()?;
        }
        if let Some(flag) = env_opt(LOG_ADD_SOURCE_ENV) {
            config.add_source = parse_bool(LOG_ADD_SOURCE_ENV, &flag)?;
        }
        if let Some(capacity) = env_opt(LOG_ASYNC_BUFFER_ENV) {
            let capacity = capacity.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: LOG_ASYNC_BUFFER_ENV.to_string(),
                value: capacity.clone(),
            })?;
            config.async_buffer = Some(capacity);
        }
        if let Some(format) = env_opt(LOG_TIME_FORMAT_ENV) {
            check_time_format(LOG_TIME_FORMAT_ENV, &format)?;
            config.time_format = Some(format);
        }
        config.env = env_opt(LOG_ENV_ENV);
        Ok(config)
    }

    /// Create the sink described by `destination`, wrapped in an async
    /// buffer when `async_buffer` is set.
    pub fn make_sink(&self) -> Result<Arc<dyn Sink>, Error> {
        let sink = match &self.destination {
            Destination::Console => stdout(),
            Destination::File { path, rotation } => file(path.clone(), rotation.clone()),
            Destination::ConsoleAndFile { path, rotation } => {
                multi(vec![stdout(), file(path.clone(), rotation.clone())])
            }
            Destination::Sink(sink) => Arc::clone(sink),
        };
        match self.async_buffer {
            Some(capacity) => Ok(buffered(sink, capacity)?),
            None => Ok(sink),
        }
    }

    pub fn handler_options(&self) -> HandlerOptions {
        HandlerOptions {
            add_source: self.add_source,
            time_format: self.time_format.clone(),
            replace_attr: self.replace_attr.clone(),
        }
    }

    /// The interceptor to install: builtin enrichment first when `env` is
    /// set, then the user interceptor.
    pub fn interceptor_chain(&self) -> Option<Interceptor> {
        let enrich = self.env.as_ref().map(|env| interceptor::enrich(Some(env.clone())));
        match (enrich, self.interceptor.clone()) {
            (Some(enrich), Some(user)) => Some(interceptor::from_fn(move |ctx, record| {
                enrich(ctx, record).and_then(|record| user(ctx, record))
            })),
            (enrich, user) => user.or(enrich),
        }
    }

    /// Build a fresh pipeline from this configuration.
    ///
    /// Fails with [`ConfigError::InvalidValue`] when `time_format` is not
    /// a format chrono can render.
    pub fn build(&self) -> Result<Pipeline, Error> {
        if let Some(format) = &self.time_format {
            check_time_format("time_format", format)?;
        }
        Ok(Pipeline::new(
            self.mode.formatter(),
            self.make_sink()?,
            self.handler_options(),
            self.interceptor_chain(),
        ))
    }
}

fn check_time_format(key: &str, format: &str) -> Result<(), ConfigError> {
    if format::is_valid_time_format(format) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { key: key.to_string(), value: format.to_string() })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key: key.to_string(), value: value.to_string() }),
    }
}
