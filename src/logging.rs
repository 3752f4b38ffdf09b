//! Logger backend for the `log` facade.
//!
//! Every record goes to stdout and is appended to
//! `<exe_dir>/logs/auto_game_screenshot.log` as `[HH:MM:SS.mmm] LEVEL message`.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::paths;

const LOG_FILE_NAME: &str = "auto_game_screenshot.log";

struct FileLogger {
    file: Mutex<Option<File>>,
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format_line(Local::now(), record.level(), &record.args().to_string());
        let _ = std::io::stdout().write_all(line.as_bytes());
        if let Ok(mut file) = self.file.lock() {
            if let Some(file) = file.as_mut() {
                let _ = file.write_all(line.as_bytes());
            }
        }
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
        if let Ok(mut file) = self.file.lock() {
            if let Some(file) = file.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

fn format_line(at: DateTime<Local>, level: Level, msg: &str) -> String {
    format!("[{}] {:<5} {}\n", at.format("%H:%M:%S%.3f"), level, msg)
}

/// Returns the path of the application log file.
pub fn log_file_path() -> PathBuf {
    paths::get_logs_dir().join(LOG_FILE_NAME)
}

fn open_log_file(path: &Path) -> Option<File> {
    OpenOptions::new().create(true).append(true).open(path).ok()
}

/// Installs the global logger. Must be called once, before any other module logs.
///
/// If the log file cannot be opened, logging continues on stdout only.
pub fn init(level: LevelFilter) -> Result<()> {
    let logger = FileLogger {
        file: Mutex::new(open_log_file(&log_file_path())),
    };
    log::set_boxed_logger(Box::new(logger))
        .map_err(|e| anyhow!("Failed to install logger: {}", e))?;
    log::set_max_level(level);
    Ok(())
}

/// Changes the level after startup, once the configured level is known.
pub fn set_level(level: LevelFilter) {
    log::set_max_level(level);
}

/// Routes panics into the log file, including panics on the scanner thread.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        let thread = std::thread::current()
            .name()
            .unwrap_or("<unnamed>")
            .to_string();

        let line = format_line(
            Local::now(),
            Level::Error,
            &format!("[PANIC] thread '{}'{}: {}", thread, location, msg),
        );
        eprint!("{}", line);
        if let Some(mut file) = open_log_file(&log_file_path()) {
            let _ = file.write_all(line.as_bytes());
        }
    }));
}
