use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes the logging system with both console and file output.
pub fn init_logging() {
    // Ensure logs directory exists
    let _ = fs::create_dir_all("logs");

    // Daily-rotated JSON file log
    let file_appender = tracing_appender::rolling::daily("logs", "lead_relay.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stdout);

    // Respect RUST_LOG if set; otherwise verbose for our crate
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lead_relay=debug,info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    // Keep the worker alive for the life of the process so logs are flushed
    std::mem::forget(guard);
}
