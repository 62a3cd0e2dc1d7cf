use crate::color::{level_style, paint, MESSAGE};
use crate::error::Error;
use crate::format::{Encoder, Handler, LEVEL_KEY, MESSAGE_KEY};
use crate::record::Record;
use crate::sink::Sink;
use crate::value::{Attr, AttrsMap, Value};
use std::sync::Arc;

/// Writes each record as one JSON object followed by a newline.
///
/// Fields keep record order: `time`, `level`, `msg`, the attributes, then
/// `source`. With `color` set, only the `level` and `msg` string values
/// are wrapped in escape codes; the object structure is untouched.
pub(crate) struct JsonHandler {
    sink: Arc<dyn Sink>,
    enc: Encoder,
    color: bool,
}

impl JsonHandler {
    pub(crate) fn new(sink: Arc<dyn Sink>, enc: Encoder, color: bool) -> Self {
        JsonHandler { sink, enc, color }
    }

    fn colorize(&self, mut attr: Attr, record: &Record) -> Attr {
        if !self.color {
            return attr;
        }
        if let Value::String(s) = &attr.value {
            match attr.key.as_str() {
                LEVEL_KEY => attr.value = Value::String(paint(level_style(record.level), s)),
                MESSAGE_KEY => attr.value = Value::String(paint(MESSAGE, s)),
                _ => {}
            }
        }
        attr
    }
}

impl Handler for JsonHandler {
    fn handle(&self, record: &Record) -> Result<(), Error> {
        let mut fields = Vec::with_capacity(record.attrs.len() + 4);

        if let Some(mut attr) = self.enc.time_attr(record) {
            if let Value::Time(t) = &attr.value {
                attr.value = Value::String(self.enc.format_time(t));
            }
            fields.push(attr);
        }
        if let Some(attr) = self.enc.level_attr(record) {
            fields.push(self.colorize(attr, record));
        }
        if let Some(attr) = self.enc.message_attr(record) {
            fields.push(self.colorize(attr, record));
        }
        fields.extend(self.enc.attrs(&record.attrs));
        if let Some(attr) = self.enc.source_attr(record) {
            fields.push(attr);
        }

        let mut buf = serde_json::to_vec(&AttrsMap(&fields))?;
        buf.push(b'\n');
        self.sink.write(&buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::color::{level_style, paint, MESSAGE};
    use crate::format::{color_json, json, HandlerOptions, ReplaceAttr};
    use crate::level::Level;
    use crate::memory::MemorySink;
    use crate::record::{Record, Source};
    use crate::value::{Attr, Value};
    use serde_json::Value as Json;
    use std::sync::Arc;
    use std::time::Duration;

    fn render(color: bool, record: &Record, opts: HandlerOptions) -> String {
        let sink = Arc::new(MemorySink::new());
        let formatter = if color { color_json() } else { json() };
        formatter.format(sink.clone(), opts).handle(record).unwrap();
        sink.text()
    }

    fn sample() -> Record {
        Record::new(Level::INFO, "boot").with_attrs([
            Attr::int("port", 8080),
            Attr::duration("elapsed", Duration::from_millis(2)),
            Attr::group("db", vec![Attr::string("host", "localhost"), Attr::bool("tls", false)]),
        ])
    }

    #[test]
    fn json_keeps_record_order() {
        let out = render(false, &sample(), HandlerOptions::default());
        assert!(out.ends_with("}\n"));
        let tail = out.split_once(r#""level":"INFO","msg":"boot","#).unwrap().1;
        assert_eq!(
            tail,
            "\"port\":8080,\"elapsed\":2000000,\"db\":{\"host\":\"localhost\",\"tls\":false}}\n"
        );
        assert!(out.starts_with(r#"{"time":""#));
    }

    #[test]
    fn color_json_only_touches_level_and_message() {
        let out = render(true, &sample(), HandlerOptions::default());
        let parsed: Json = serde_json::from_str(&out).unwrap();

        assert_eq!(parsed["msg"], paint(MESSAGE, "boot"));
        assert_eq!(parsed["level"], paint(level_style(Level::INFO), "INFO"));
        assert!(parsed["msg"].as_str().unwrap().starts_with("\x1b["));
        assert_eq!(parsed["port"], 8080);
        assert_eq!(parsed["db"]["host"], "localhost");
    }

    #[test]
    fn color_json_strips_to_plain_json() {
        let record = sample().with_source(Source::new("src/lib.rs", 3));
        let opts = HandlerOptions { add_source: true, ..Default::default() };
        let colored: Json = serde_json::from_str(&render(true, &record, opts.clone())).unwrap();
        let plain: Json = serde_json::from_str(&render(false, &record, opts)).unwrap();

        let mut stripped = colored.clone();
        for key in ["level", "msg"] {
            let raw = colored[key].as_str().unwrap();
            let clean = strip_ansi_escapes::strip(raw.as_bytes());
            stripped[key] = Json::String(String::from_utf8(clean).unwrap());
        }
        assert_eq!(stripped, plain);
        assert_eq!(plain["source"], "src/lib.rs:3");
    }

    #[test]
    fn replace_attr_runs_before_coloring() {
        let replace: ReplaceAttr = Arc::new(|_: &[String], attr: Attr| match attr.key.as_str() {
            "msg" => Attr::string("message", "renamed"),
            "time" => Attr::new("", Value::Bool(false)),
            _ => attr,
        });
        let opts = HandlerOptions { replace_attr: Some(replace), ..Default::default() };
        let parsed: Json = serde_json::from_str(&render(true, &sample(), opts)).unwrap();

        assert!(parsed.get("time").is_none());
        assert!(parsed.get("msg").is_none());
        assert_eq!(parsed["message"], "renamed");
    }

    #[test]
    fn structured_values_stay_structured() {
        let record = Record::new(Level::WARN, "x")
            .with_attrs([Attr::any("payload", serde_json::json!({"a": [1, 2]}))]);
        let parsed: Json = serde_json::from_str(&render(false, &record, HandlerOptions::default())).unwrap();
        assert_eq!(parsed["payload"]["a"][1], 2);
    }
}
