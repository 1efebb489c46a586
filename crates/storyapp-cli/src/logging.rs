//! File logging, enabled by STORYAPP_LOG

use std::fs::File;

use storyapp_core::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Log to a file when STORYAPP_LOG names a level
///
/// Output goes to `log_file` from the config, or `debug.log` in the data
/// directory. Nothing is written to the terminal.
pub fn init(config: &Config) {
    let Ok(log_level) = std::env::var("STORYAPP_LOG") else {
        return;
    };

    let log_path = config
        .log_file
        .clone()
        .unwrap_or_else(|| config.data_dir.join("debug.log"));

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!(
        "storyapp_core={},storyapp={}",
        log_level, log_level
    ));

    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("Logging initialized to {:?}", log_path);
}
