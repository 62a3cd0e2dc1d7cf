//! Structured leveled logging pipeline.
//!
//! A [`Record`] flows through an optional [`Interceptor`], is encoded by a
//! [`Formatter`] (text, JSON, or their ANSI-colored variants) and written
//! to a [`Sink`]: the console, a rotating file, a fan-out of several
//! sinks, or an [`AsyncSink`] that moves I/O onto a background worker.

pub mod level;
pub mod value;
pub mod record;
pub mod context;
pub mod error;

pub mod sink;
pub mod file;
pub mod rotation;
pub mod async_sink;
pub mod memory;

pub mod color;
pub mod format;
mod text;
mod json;

pub mod interceptor;
pub mod pipeline;
pub mod logger;
pub mod config;
pub mod env;
pub mod init;
pub mod layer;

pub use async_sink::AsyncSink;
pub use config::{Destination, LoggerConfig, OutputMode};
pub use context::Context;
pub use error::{ConfigError, Error};
pub use file::FileSink;
pub use format::{Formatter, Handler, HandlerOptions, ReplaceAttr};
pub use interceptor::Interceptor;
pub use level::Level;
pub use logger::Logger;
pub use memory::MemorySink;
pub use pipeline::Pipeline;
pub use record::{Record, Source};
pub use rotation::RotationConfig;
pub use sink::{Console, Multi, Sink};
pub use value::{Attr, LogValue, Value};
