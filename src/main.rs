//! Auto Game Screenshot
//!
//! A Windows system tray application that watches the foreground window and,
//! while it looks like a game, saves a screenshot of it at a fixed interval.

// Hide console window on Windows in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
#![cfg_attr(not(windows), allow(dead_code, unused_imports))]

mod capture;
mod config;
mod detection;
mod logging;
mod paths;
mod platform;
mod scanner;
#[cfg(windows)]
mod tray;

use anyhow::{Context, Result};
use log::{error, info, LevelFilter};

use crate::config::Config;
use crate::scanner::ScannerRuntime;

fn main() -> Result<()> {
    logging::install_panic_hook();

    // Ensure output directories exist
    paths::ensure_directories()?;
    logging::init(LevelFilter::Info)?;

    let config = match load_startup_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return Err(e);
        }
    };

    info!(
        "Loaded config: idle poll {}s, capture every {}s, quality {}, output {}",
        config.poll_interval_idle_secs,
        config.capture_interval_secs,
        config.image_quality,
        config.output_root.display()
    );

    let runtime = ScannerRuntime::new(config);
    match run(runtime) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            Err(e)
        }
    }
}

/// Loads config.json, applies the log level and prepares the output root.
fn load_startup_config() -> Result<Config> {
    let config_path = paths::get_config_path();
    info!("Looking for config at: {}", config_path.display());

    let config = config::load_config(&config_path)?.resolved(paths::get_exe_dir());
    logging::set_level(config.log_level_filter()?);

    std::fs::create_dir_all(&config.output_root).with_context(|| {
        format!(
            "Output root {} cannot be created",
            config.output_root.display()
        )
    })?;
    Ok(config)
}

#[cfg(windows)]
fn run(runtime: ScannerRuntime) -> Result<()> {
    tray::run_tray_app(runtime)
}

#[cfg(not(windows))]
fn run(_runtime: ScannerRuntime) -> Result<()> {
    Err(anyhow::anyhow!(
        "Foreground window scanning is only supported on Windows"
    ))
}
