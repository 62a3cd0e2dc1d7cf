use crate::color::{level_style, paint, KEY, MESSAGE, MUTED, VALUE};
use crate::error::Error;
use crate::format::{Encoder, Handler};
use crate::record::Record;
use crate::sink::Sink;
use crate::value::{Attr, Value};
use std::borrow::Cow;
use std::sync::Arc;
use yansi::Style;

/// Writes records as a single `key=value` line:
///
/// ```text
/// time=<ts> level=<LEVEL> <message> key=value group.key=value source="file.rs:12"
/// ```
///
/// Keys and values that are empty or contain spaces, `=`, quotes or
/// control characters are written as quoted, escaped strings. The message
/// is never quoted but has its control characters escaped. With `color`
/// set the same bytes are interleaved with ANSI escapes, so stripping
/// them yields exactly the uncolored line.
pub(crate) struct TextHandler {
    sink: Arc<dyn Sink>,
    enc: Encoder,
    color: bool,
}

impl TextHandler {
    pub(crate) fn new(sink: Arc<dyn Sink>, enc: Encoder, color: bool) -> Self {
        TextHandler { sink, enc, color }
    }

    fn append_attrs(&self, line: &mut Line, prefix: &str, attrs: &[Attr]) {
        for attr in attrs {
            let key = if prefix.is_empty() {
                attr.key.clone()
            } else {
                format!("{}.{}", prefix, attr.key)
            };
            match &attr.value {
                Value::Group(children) => self.append_attrs(line, &key, children),
                value => {
                    let rendered = self.render(value);
                    // structured data stands out in a muted color
                    let style = if rendered.starts_with('{') || rendered.starts_with('[') {
                        MUTED
                    } else {
                        VALUE
                    };
                    line.sep();
                    line.paint(KEY, &quote(&key));
                    line.push("=");
                    line.paint(style, &quote(&rendered));
                }
            }
        }
    }

    fn render(&self, value: &Value) -> String {
        match value {
            Value::Time(t) => self.enc.format_time(t),
            other => other.to_string(),
        }
    }
}

impl Handler for TextHandler {
    fn handle(&self, record: &Record) -> Result<(), Error> {
        let mut line = Line::new(self.color);

        if let Some(attr) = self.enc.time_attr(record) {
            line.sep();
            line.push(&quote(&attr.key));
            line.push("=");
            line.push(&quote(&self.render(&attr.value)));
        }
        if let Some(attr) = self.enc.level_attr(record) {
            line.sep();
            line.push(&quote(&attr.key));
            line.push("=");
            line.paint(level_style(record.level), &quote(&self.render(&attr.value)));
        }
        if let Some(attr) = self.enc.message_attr(record) {
            line.sep();
            line.paint(MESSAGE, &escape_control(&self.render(&attr.value)));
        }

        self.append_attrs(&mut line, "", &self.enc.attrs(&record.attrs));

        if let Some(attr) = self.enc.source_attr(record) {
            line.sep();
            line.paint(MUTED, &format!("{}=", quote(&attr.key)));
            line.paint(MUTED, &format!("{:?}", self.render(&attr.value)));
        }

        line.push("\n");
        self.sink.write(line.as_bytes())?;
        Ok(())
    }
}

/// Output buffer that only emits escape codes when coloring is enabled.
struct Line {
    buf: String,
    color: bool,
}

impl Line {
    fn new(color: bool) -> Self {
        Line { buf: String::with_capacity(256), color }
    }

    fn sep(&mut self) {
        if !self.buf.is_empty() {
            self.buf.push(' ');
        }
    }

    fn push(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    fn paint(&mut self, style: Style, text: &str) {
        if self.color {
            self.buf.push_str(&paint(style, text));
        } else {
            self.buf.push_str(text);
        }
    }

    fn as_bytes(&self) -> &[u8] {
        self.buf.as_bytes()
    }
}

fn needs_quoting(s: &str) -> bool {
    s.is_empty() || s.chars().any(|c| c == ' ' || c == '=' || c == '"' || c.is_control())
}

/// Quote and escape `s` when it would be ambiguous bare.
fn quote(s: &str) -> Cow<'_, str> {
    if needs_quoting(s) {
        Cow::Owned(format!("{:?}", s))
    } else {
        Cow::Borrowed(s)
    }
}

/// Escape control characters so the message stays on one line and cannot
/// carry raw escape sequences.
fn escape_control(s: &str) -> Cow<'_, str> {
    if s.chars().any(char::is_control) {
        let mut out = String::with_capacity(s.len() + 8);
        for c in s.chars() {
            if c.is_control() {
                out.extend(c.escape_default());
            } else {
                out.push(c);
            }
        }
        Cow::Owned(out)
    } else {
        Cow::Borrowed(s)
    }
}
