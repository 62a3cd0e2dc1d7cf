use std::sync::Arc;
use std::time::Instant;

use slog_pipeline::{Attr, Logger, LoggerConfig, MemorySink, OutputMode};

fn main() {
    let sink = Arc::new(MemorySink::new());

    let config = LoggerConfig::new()
        .with_level("info")
        .with_mode(OutputMode::Json)
        .with_sink(sink.clone())
        .with_async(50_000);
    let logger = Logger::new(&config).expect("build logger");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        logger.error("async load test error", &[Attr::uint("iteration", i)]);
    }

    let elapsed = start.elapsed();
    println!(
        "async: sent {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // Close drains whatever is still queued.
    logger.close().expect("close logger");
    println!("delivered {} of {} records", sink.lines().len(), n);
}
