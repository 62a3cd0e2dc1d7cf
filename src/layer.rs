use crate::context::Context;
use crate::level::Level;
use crate::logger::Logger;
use crate::record::{Record, Source};
use crate::value::{Attr, Value};
use chrono::Utc;
use tracing::field::{Field, Visit};
use tracing::subscriber::Interest;
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::layer::{Context as LayerContext, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns `tracing` events into records and
/// routes them through a [`Logger`].
///
/// Events below the logger's current level are rejected in `enabled`, so
/// their fields are never even visited. `TRACE` maps to `DEBUG-4`.
pub struct PipelineLayer {
    logger: Logger,
}

impl PipelineLayer {
    pub fn new(logger: Logger) -> Self {
        PipelineLayer { logger }
    }
}

impl<S> Layer<S> for PipelineLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    // the level can change at runtime, so callsite interest is never cached
    fn register_callsite(&self, _metadata: &'static Metadata<'static>) -> Interest {
        Interest::sometimes()
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: LayerContext<'_, S>) -> bool {
        self.logger.enabled(Level::from(metadata.level()))
    }

    fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
        let meta = event.metadata();
        let level = Level::from(meta.level());
        if !self.logger.enabled(level) {
            return;
        }

        let mut attrs = Vec::new();
        let mut message = None;
        event.record(&mut FieldVisitor { attrs: &mut attrs, message: &mut message });

        let record = Record {
            time: Utc::now(),
            level,
            message: message.unwrap_or_default(),
            attrs,
            source: meta.file().zip(meta.line()).map(|(file, line)| Source::new(file, line)),
        };
        let _ = self.logger.log_record(&Context::default(), record);
    }
}

/// Collects event fields as typed attributes; the `message` field becomes
/// the record message.
pub struct FieldVisitor<'a> {
    pub attrs: &'a mut Vec<Attr>,
    pub message: &'a mut Option<String>,
}

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.attrs.push(Attr::string(field.name(), value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.attrs.push(Attr::int(field.name(), value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.attrs.push(Attr::uint(field.name(), value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.attrs.push(Attr::float(field.name(), value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.attrs.push(Attr::bool(field.name(), value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.attrs.push(Attr::string(field.name(), value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{:?}", value);
        if field.name() == "message" {
            *self.message = Some(rendered);
        } else {
            self.attrs.push(Attr::new(field.name(), Value::String(rendered)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoggerConfig, OutputMode};
    use crate::memory::MemorySink;
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    #[test]
    fn events_become_records() {
        let sink = Arc::new(MemorySink::new());
        let config = LoggerConfig::new()
            .with_level("info")
            .with_mode(OutputMode::Json)
            .with_sink(sink.clone())
            .with_source(true);
        let logger = Logger::new(&config).unwrap();
        let subscriber = Registry::default().with(PipelineLayer::new(logger));

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("filtered out");
            tracing::error!(user_id = 42, ok = false, reason = "invalid password", "authentication failed");
        });

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(parsed["level"], "ERROR");
        assert_eq!(parsed["msg"], "authentication failed");
        assert_eq!(parsed["user_id"], 42);
        assert_eq!(parsed["ok"], false);
        assert_eq!(parsed["reason"], "invalid password");
        assert!(parsed["source"].as_str().unwrap().contains("layer.rs:"));
    }

    #[test]
    fn trace_maps_below_debug() {
        assert_eq!(Level::from(&tracing::Level::TRACE).to_string(), "DEBUG-4");
    }
}
