use slog_pipeline::init::{close, init_tracing};
use slog_pipeline::{LoggerConfig, OutputMode};
use tracing::{debug, error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = LoggerConfig::new()
        .with_level("info")
        .with_mode(OutputMode::ColorJson)
        .with_env("dev")
        .with_async(1024);
    init_tracing(&config)?;

    debug!("not shown at info level");
    info!("starting service");
    error!(user_id = 42, reason = "invalid password", "authentication failed");

    close()?;
    Ok(())
}
