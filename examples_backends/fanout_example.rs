use std::sync::Arc;

use slog_pipeline::config::Destination;
use slog_pipeline::sink::{multi, stdout};
use slog_pipeline::{
    interceptor, Attr, Context, Logger, LoggerConfig, MemorySink, OutputMode, Record, Sink, Value,
};

/// Whether `attrs`, or the `http` group among them, carries `path=/healthz`.
fn is_health_check(attrs: &[Attr]) -> bool {
    attrs.iter().any(|a| match &a.value {
        Value::Group(children) if a.key == "http" => is_health_check(children),
        value => a.key == "path" && value.to_string() == "/healthz",
    })
}

/// Drops health-check noise and tags everything else.
fn filter(ctx: &Context, mut record: Record) -> Option<Record> {
    if is_health_check(&record.attrs) {
        return None;
    }
    if let Some(trace_id) = ctx.trace_id() {
        record.add(Attr::string("trace_id", trace_id));
    }
    Some(record)
}

fn main() {
    let audit = Arc::new(MemorySink::new());
    let sink: Arc<dyn Sink> = multi(vec![stdout(), audit.clone() as Arc<dyn Sink>]);

    let config = LoggerConfig::new()
        .with_mode(OutputMode::Color)
        .with_destination(Destination::Sink(sink))
        .with_source(true)
        .with_interceptor(interceptor::from_fn(filter));
    let logger = Logger::new(&config).expect("build logger");

    let ctx = Context::new().with_trace_id("4bf92f3577b34da6");
    let http = logger.with_group("http");
    http.info_ctx(&ctx, "request", &[Attr::string("path", "/healthz")]);
    http.info_ctx(&ctx, "request", &[Attr::string("path", "/orders"), Attr::uint("status", 201)]);
    logger.warn("slow upstream", &[Attr::duration("elapsed", std::time::Duration::from_millis(850))]);

    logger.close().expect("close logger");
    println!("audit copy holds {} records", audit.lines().len());
}
