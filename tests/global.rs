use std::sync::Arc;

use slog_pipeline::{init, Attr, LoggerConfig, MemorySink, OutputMode};

// Global state is per process, so everything lives in one test.
#[test]
fn global_logger_lifecycle() {
    assert!(init::global().is_none());
    assert!(init::from_context(&Default::default()).is_err());
    init::info("before init", &[]);

    let first = Arc::new(MemorySink::new());
    let config = LoggerConfig::new().with_mode(OutputMode::Text).with_sink(first.clone());
    init::init(&config).unwrap();

    init::debug("hidden", &[]);
    init::info("visible", &[Attr::string("k", "v")]);
    init::set_level("debug");
    init::debug("now shown", &[]);
    assert_eq!(first.lines().len(), 2);
    assert!(first.lines()[0].ends_with("visible k=v"));

    let second = Arc::new(MemorySink::new());
    let config = LoggerConfig::new()
        .with_mode(OutputMode::Json)
        .with_sink(second.clone())
        .with_async(16);
    init::init(&config).unwrap();
    assert_eq!(first.close_count(), 1);

    init::warn("after swap", &[]);
    init::close().unwrap();
    assert!(second.text().contains("\"msg\":\"after swap\""));
    assert_eq!(second.close_count(), 1);
}
