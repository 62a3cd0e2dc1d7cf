use slog_pipeline::{Attr, Logger, LoggerConfig, OutputMode, RotationConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = std::env::temp_dir().join("slog-pipeline-demo");
    let path = dir.join("app.log");

    // Tiny limit so a few hundred records produce several backups.
    let rotation = RotationConfig::default()
        .max_size_bytes(4 * 1024)
        .max_age(7)
        .compress(true);

    let config = LoggerConfig::new()
        .with_mode(OutputMode::Json)
        .with_file(&path, rotation)
        .with_async(1024);
    let logger = Logger::new(&config)?;

    for i in 0..500u64 {
        logger.info("order processed", &[Attr::uint("order_id", i), Attr::string("status", "ok")]);
    }
    logger.close()?;

    println!("logs written to {}", dir.display());
    for entry in std::fs::read_dir(&dir)? {
        println!("  {}", entry?.file_name().to_string_lossy());
    }
    Ok(())
}
