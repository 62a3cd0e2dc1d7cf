use crate::context::Context;
use crate::record::Record;
use crate::value::Attr;
use std::sync::Arc;

/// Hook invoked once per record, before formatting.
///
/// Returning `Some` replaces the record that gets formatted; returning
/// `None` drops it silently. Interceptors may run concurrently on many
/// threads and must not keep the record past their own return.
///
/// Only one interceptor is installed per pipeline; compose several by
/// calling one from another. An interceptor must not log through the
/// logger that runs it, since that would block a concurrent reconfigure.
pub type Interceptor = Arc<dyn Fn(&Context, Record) -> Option<Record> + Send + Sync>;

/// Wrap a closure as an [`Interceptor`].
pub fn from_fn<F>(f: F) -> Interceptor
where
    F: Fn(&Context, Record) -> Option<Record> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Adds `trace_id` from the call context and, when `env` is set, a fixed
/// `env` attribute to every record.
pub fn enrich(env: Option<String>) -> Interceptor {
    Arc::new(move |ctx: &Context, mut record: Record| {
        if let Some(trace_id) = ctx.trace_id() {
            record.add(Attr::string("trace_id", trace_id));
        }
        if let Some(env) = env.as_deref().filter(|e| !e.is_empty()) {
            record.add(Attr::string("env", env));
        }
        Some(record)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    #[test]
    fn enrich_appends_trace_and_env() {
        let hook = enrich(Some("prod".to_string()));
        let ctx = Context::new().with_trace_id("abc123");
        let record = hook(&ctx, Record::new(Level::INFO, "x")).unwrap();

        let keys: Vec<_> = record.attrs.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, ["trace_id", "env"]);
    }

    #[test]
    fn enrich_without_context_is_passthrough() {
        let hook = enrich(None);
        let record = hook(&Context::new(), Record::new(Level::INFO, "x")).unwrap();
        assert!(record.attrs.is_empty());
    }
}
