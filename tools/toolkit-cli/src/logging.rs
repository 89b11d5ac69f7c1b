//! Logging setup driven by the environment.
//!
//! - `LOG_LEVEL`: "trace", "debug", "info" (default), "warn", "error" or "off"
//!
//! Log lines go to stderr so command output on stdout stays scriptable.

use std::env;

use log::{debug, LevelFilter};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

fn level_from_env() -> LevelFilter {
    let level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

pub fn setup_logging() -> eyre::Result<()> {
    let level = level_from_env();
    let config = ConfigBuilder::new()
        .add_filter_allow_str("toolkit_core")
        .add_filter_allow_str("devnet_toolkit")
        .build();

    TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto)?;
    debug!("Logging configured at {level}");
    Ok(())
}
