//! Scanner thread lifecycle.
//!
//! The tray shell builds one `ScannerRuntime` at startup, starts the scanner
//! on its own thread, and stops it through the handle on exit.

use anyhow::{Context, Result};
use log::{error, info};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::cancel::CancelToken;
use super::scheduler::Scanner;
use crate::capture::CaptureSink;
use crate::config::Config;
use crate::platform::WindowSystem;

/// Everything the scanner needs for one run: the validated config snapshot
/// and the stop signal shared with the tray shell.
#[derive(Clone, Debug)]
pub struct ScannerRuntime {
    pub config: Arc<Config>,
    pub cancel: CancelToken,
}

impl ScannerRuntime {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            cancel: CancelToken::new(),
        }
    }
}

/// Handle to the running scanner thread.
pub struct ScannerHandle {
    cancel: CancelToken,
    thread: Option<JoinHandle<()>>,
}

impl ScannerHandle {
    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Requests cancellation and waits for the scanner thread to exit.
    ///
    /// Returns after at most one sleep interval plus the tick in progress.
    pub fn stop(mut self) {
        self.cancel.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Scanner thread panicked");
            }
        }
    }
}

/// Spawns the scanner on a dedicated thread.
pub fn start_scanner<W, S>(runtime: &ScannerRuntime, windows: W, sink: S) -> Result<ScannerHandle>
where
    W: WindowSystem + Send + 'static,
    S: CaptureSink + Send + 'static,
{
    let mut scanner = Scanner::new(runtime, windows, sink)?;
    let thread = thread::Builder::new()
        .name("scanner".to_string())
        .spawn(move || scanner.run())
        .context("Failed to spawn scanner thread")?;

    info!(
        "Scanner thread started, screenshots go to {}",
        runtime.config.output_root.display()
    );
    Ok(ScannerHandle {
        cancel: runtime.cancel.clone(),
        thread: Some(thread),
    })
}
