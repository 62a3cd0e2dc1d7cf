use crate::config::LoggerConfig;
use crate::context::Context;
use crate::error::Error;
use crate::layer::PipelineLayer;
use crate::level::Level;
use crate::logger::Logger;
use crate::value::Attr;
use std::sync::{Mutex, OnceLock, PoisonError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

static GLOBAL: OnceLock<Logger> = OnceLock::new();
static INIT: Mutex<()> = Mutex::new(());

/// Initialize the process-wide logger, or reconfigure it if it already
/// exists.
///
/// **Parameters**
/// - `config`: [`LoggerConfig`] describing level, format and destination.
///
/// **Effects**
///
/// The first call builds the logger. Later calls build a new pipeline,
/// swap it in atomically and close the previous sink, so buffered
/// records written before the swap are not lost.
pub fn init(config: &LoggerConfig) -> Result<&'static Logger, Error> {
    let _guard = INIT.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(logger) = GLOBAL.get() {
        logger.reconfigure(config)?;
        return Ok(logger);
    }
    let logger = Logger::new(config)?;
    Ok(GLOBAL.get_or_init(|| logger))
}

/// Initialize the process-wide logger and install it as the global
/// `tracing` subscriber.
///
/// **Behavior**
///
/// All `tracing` events at or above the configured level are routed
/// through the pipeline. Fails if a global subscriber is already set.
pub fn init_tracing(config: &LoggerConfig) -> Result<&'static Logger, Error> {
    let logger = init(config)?;
    let subscriber = Registry::default().with(PipelineLayer::new(logger.clone()));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(logger)
}

/// Initialize from the `LOG_*` environment variables with sensible
/// defaults for anything unset.
pub fn init_from_env() -> Result<&'static Logger, Error> {
    init(&LoggerConfig::from_env()?)
}

/// The process-wide logger, if [`init`] has run.
pub fn global() -> Option<&'static Logger> {
    GLOBAL.get()
}

/// Close the process-wide sink, draining buffered records.
pub fn close() -> Result<(), Error> {
    match GLOBAL.get() {
        Some(logger) => logger.close(),
        None => Ok(()),
    }
}

/// Change the process-wide level by name; unknown names mean `info`.
pub fn set_level(level: &str) {
    if let Some(logger) = GLOBAL.get() {
        logger.set_level(level);
    }
}

/// Process-wide logger for `ctx`, carrying its request id.
pub fn from_context(ctx: &Context) -> Result<Logger, Error> {
    global().map(|logger| logger.from_context(ctx)).ok_or(Error::NotInitialized)
}

#[track_caller]
pub fn log(level: Level, msg: &str, attrs: &[Attr]) {
    if let Some(logger) = GLOBAL.get() {
        logger.log(level, msg, attrs);
    }
}

#[track_caller]
pub fn log_ctx(ctx: &Context, level: Level, msg: &str, attrs: &[Attr]) {
    if let Some(logger) = GLOBAL.get() {
        logger.log_ctx(ctx, level, msg, attrs);
    }
}

#[track_caller]
pub fn debug(msg: &str, attrs: &[Attr]) {
    log(Level::DEBUG, msg, attrs);
}

#[track_caller]
pub fn info(msg: &str, attrs: &[Attr]) {
    log(Level::INFO, msg, attrs);
}

#[track_caller]
pub fn warn(msg: &str, attrs: &[Attr]) {
    log(Level::WARN, msg, attrs);
}

#[track_caller]
pub fn error(msg: &str, attrs: &[Attr]) {
    log(Level::ERROR, msg, attrs);
}
