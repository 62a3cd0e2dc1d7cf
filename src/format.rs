use crate::error::Error;
use crate::json::JsonHandler;
use crate::record::{Record, Source};
use crate::sink::Sink;
use crate::text::TextHandler;
use crate::value::{Attr, Value};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const TIME_KEY: &str = "time";
pub const LEVEL_KEY: &str = "level";
pub const MESSAGE_KEY: &str = "msg";
pub const SOURCE_KEY: &str = "source";

/// Whether chrono can render `format` as a `strftime` string.
pub fn is_valid_time_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Keys rendered at fixed positions and therefore never emitted by the
/// attribute loop.
pub fn is_builtin(key: &str) -> bool {
    matches!(key, TIME_KEY | LEVEL_KEY | MESSAGE_KEY | SOURCE_KEY)
}

/// Rewrites an attribute before it is encoded.
///
/// Receives the group path of the attribute (empty for top-level and
/// builtin attributes). Returning an attribute with an empty key drops it.
pub type ReplaceAttr = Arc<dyn Fn(&[String], Attr) -> Attr + Send + Sync>;

/// Rendering options passed to a [`Formatter`].
#[derive(Clone, Default)]
pub struct HandlerOptions {
    /// Append the `source` location when the record carries one.
    pub add_source: bool,
    /// `strftime`-style format for the record timestamp. Defaults to
    /// RFC 3339 with millisecond precision.
    pub time_format: Option<String>,
    pub replace_attr: Option<ReplaceAttr>,
}

impl fmt::Debug for HandlerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerOptions")
            .field("add_source", &self.add_source)
            .field("time_format", &self.time_format)
            .field("replace_attr", &self.replace_attr.is_some())
            .finish()
    }
}

/// Turns records into bytes and hands them to a sink.
pub trait Handler: Send + Sync {
    /// Encode `record` and write it to the sink with a single `write`.
    fn handle(&self, record: &Record) -> Result<(), Error>;
}

/// Factory for [`Handler`]s. Formatters hold no per-record state, so one
/// shared instance per mode is enough.
pub trait Formatter: Send + Sync + fmt::Debug {
    fn format(&self, sink: Arc<dyn Sink>, opts: HandlerOptions) -> Box<dyn Handler>;
}

/// Plain `key=value` lines.
#[derive(Debug)]
pub struct TextFormatter;

/// One JSON object per line.
#[derive(Debug)]
pub struct JsonFormatter;

/// `key=value` lines with ANSI colors.
#[derive(Debug)]
pub struct ColorTextFormatter;

/// JSON lines whose `level` and `msg` values carry ANSI colors.
#[derive(Debug)]
pub struct ColorJsonFormatter;

impl Formatter for TextFormatter {
    fn format(&self, sink: Arc<dyn Sink>, opts: HandlerOptions) -> Box<dyn Handler> {
        Box::new(TextHandler::new(sink, Encoder::new(opts), false))
    }
}

impl Formatter for ColorTextFormatter {
    fn format(&self, sink: Arc<dyn Sink>, opts: HandlerOptions) -> Box<dyn Handler> {
        Box::new(TextHandler::new(sink, Encoder::new(opts), true))
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, sink: Arc<dyn Sink>, opts: HandlerOptions) -> Box<dyn Handler> {
        Box::new(JsonHandler::new(sink, Encoder::new(opts), false))
    }
}

impl Formatter for ColorJsonFormatter {
    fn format(&self, sink: Arc<dyn Sink>, opts: HandlerOptions) -> Box<dyn Handler> {
        Box::new(JsonHandler::new(sink, Encoder::new(opts), true))
    }
}

static TEXT: TextFormatter = TextFormatter;
static JSON: JsonFormatter = JsonFormatter;
static COLOR_TEXT: ColorTextFormatter = ColorTextFormatter;
static COLOR_JSON: ColorJsonFormatter = ColorJsonFormatter;

pub fn text() -> &'static dyn Formatter {
    &TEXT
}

pub fn json() -> &'static dyn Formatter {
    &JSON
}

pub fn color_text() -> &'static dyn Formatter {
    &COLOR_TEXT
}

pub fn color_json() -> &'static dyn Formatter {
    &COLOR_JSON
}

/// Record preparation shared by the text and JSON handlers: builtin
/// attributes, `replace_attr`, lazy resolution and group normalization.
pub(crate) struct Encoder {
    opts: HandlerOptions,
    cwd: Option<PathBuf>,
}

impl Encoder {
    pub(crate) fn new(opts: HandlerOptions) -> Self {
        Encoder { opts, cwd: std::env::current_dir().ok() }
    }

    fn rewrite(&self, groups: &[String], attr: Attr) -> Option<Attr> {
        let attr = match &self.opts.replace_attr {
            Some(replace) => replace(groups, attr),
            None => attr,
        };
        (!attr.key.is_empty()).then_some(attr)
    }

    /// Timestamp in the configured format. A format chrono cannot render
    /// falls back to the default instead of failing the record.
    pub(crate) fn format_time(&self, time: &DateTime<Utc>) -> String {
        if let Some(format) = &self.opts.time_format {
            let mut out = String::new();
            if write!(out, "{}", time.format(format)).is_ok() {
                return out;
            }
        }
        time.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub(crate) fn time_attr(&self, record: &Record) -> Option<Attr> {
        self.rewrite(&[], Attr::time(TIME_KEY, record.time))
    }

    pub(crate) fn level_attr(&self, record: &Record) -> Option<Attr> {
        self.rewrite(&[], Attr::string(LEVEL_KEY, record.level.to_string()))
    }

    pub(crate) fn message_attr(&self, record: &Record) -> Option<Attr> {
        self.rewrite(&[], Attr::string(MESSAGE_KEY, record.message.clone()))
    }

    pub(crate) fn source_attr(&self, record: &Record) -> Option<Attr> {
        if !self.opts.add_source {
            return None;
        }
        let source = record.source.as_ref()?;
        self.rewrite(&[], Attr::string(SOURCE_KEY, self.source_path(source)))
    }

    /// `path:line`, with the path made relative to the working directory
    /// when that is shorter.
    fn source_path(&self, source: &Source) -> String {
        if let Some(cwd) = &self.cwd {
            if let Ok(rel) = Path::new(&source.file).strip_prefix(cwd) {
                let rel = rel.to_string_lossy();
                if rel.len() < source.file.len() {
                    return format!("{}:{}", rel, source.line);
                }
            }
        }
        source.to_string()
    }

    /// Resolve and rewrite the free-form attributes of a record.
    ///
    /// Top-level builtin keys are removed, lazy values are resolved,
    /// groups with an empty key are inlined and empty groups are dropped.
    pub(crate) fn attrs(&self, attrs: &[Attr]) -> Vec<Attr> {
        let mut out = Vec::with_capacity(attrs.len());
        self.collect(&mut Vec::new(), attrs, &mut out);
        out
    }

    fn collect(&self, groups: &mut Vec<String>, attrs: &[Attr], out: &mut Vec<Attr>) {
        for attr in attrs {
            if groups.is_empty() && is_builtin(&attr.key) {
                continue;
            }
            match attr.value.resolve() {
                Value::Group(children) if attr.key.is_empty() => {
                    self.collect(groups, &children, out);
                }
                Value::Group(children) => {
                    groups.push(attr.key.clone());
                    let mut nested = Vec::with_capacity(children.len());
                    self.collect(groups, &children, &mut nested);
                    groups.pop();
                    if !nested.is_empty() {
                        out.push(Attr::group(attr.key.clone(), nested));
                    }
                }
                value => {
                    let attr = Attr { key: attr.key.clone(), value };
                    if let Some(attr) = self.rewrite(groups, attr) {
                        out.push(attr);
                    }
                }
            }
        }
    }
}
