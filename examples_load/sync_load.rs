use std::sync::Arc;
use std::time::Instant;

use slog_pipeline::{Attr, Logger, LoggerConfig, MemorySink, OutputMode};

fn main() {
    let sink = Arc::new(MemorySink::new());
    let config = LoggerConfig::new().with_mode(OutputMode::Text).with_sink(sink.clone());
    let logger = Logger::new(&config).expect("build logger");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        logger.error("sync load test error", &[Attr::uint("iteration", i)]);
    }

    let elapsed = start.elapsed();
    println!(
        "sync: sent {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // Records below the level never reach the formatter.
    let start = Instant::now();
    for i in 0..n {
        logger.debug("filtered", &[Attr::uint("iteration", i)]);
    }
    println!("filtered {} debug events in {:?}", n, start.elapsed());
}
