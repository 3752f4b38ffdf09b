//! Polling loop that starts and stops capture sessions.
//!
//! Each tick polls the foreground window, classifies it and captures it when
//! it looks like a game. Ticks never overlap and a failing tick only costs
//! that tick: it is logged and scheduled as if nothing was detected.

use anyhow::Result;
use chrono::Local;
use log::{debug, error, info, warn};
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use super::cancel::CancelToken;
use super::runtime::ScannerRuntime;
use super::state::{CaptureSession, ScannerState, TickOutcome};
use crate::capture::CaptureSink;
use crate::detection::{inspect, Classifier};
use crate::platform::WindowSystem;

pub struct Scanner<W, S> {
    windows: W,
    sink: S,
    classifier: Classifier,
    poll_interval_idle: Duration,
    capture_interval: Duration,
    cancel: CancelToken,
    state: ScannerState,
}

impl<W: WindowSystem, S: CaptureSink> Scanner<W, S> {
    pub fn new(runtime: &ScannerRuntime, windows: W, sink: S) -> Result<Self> {
        let config = &runtime.config;
        Ok(Self {
            windows,
            sink,
            classifier: config.rules.compile()?,
            poll_interval_idle: config.poll_interval_idle(),
            capture_interval: config.capture_interval(),
            cancel: runtime.cancel.clone(),
            state: ScannerState::Idle,
        })
    }

    #[cfg(test)]
    pub fn state(&self) -> &ScannerState {
        &self.state
    }

    /// Polls the current foreground window and captures it if it is a game.
    pub fn evaluate(&mut self) -> Result<TickOutcome> {
        let Some(window) = self.windows.foreground_window() else {
            debug!("No foreground window");
            return Ok(TickOutcome::NotClassified);
        };

        let inspection = inspect(&self.windows, window);
        let decision = self
            .classifier
            .decide(&inspection.process_names, &inspection.module_names);
        debug!(
            "Foreground {:?} processes={:?}: {}",
            window, inspection.process_names, decision
        );
        if !decision.is_game() {
            return Ok(TickOutcome::NotClassified);
        }

        let path = self.sink.capture(window)?;
        Ok(TickOutcome::Classified {
            window,
            decision,
            path,
        })
    }

    /// Runs one tick and returns how long to sleep before the next one.
    pub fn tick(&mut self) -> Duration {
        let outcome = self.evaluate().unwrap_or_else(|e| {
            warn!("Scan failed: {:#}", e);
            TickOutcome::NotClassified
        });

        match outcome {
            TickOutcome::Classified {
                window,
                decision,
                path,
            } => {
                let now = Local::now();
                info!("Screenshot saved: {}", path.display());
                if let ScannerState::Capturing(session) = &mut self.state {
                    if session.active_window == window {
                        debug!(
                            "Capture {} of {:?}, {}s after the previous one",
                            session.captures + 1,
                            window,
                            (now - session.last_capture_at).num_seconds()
                        );
                        session.record_capture(now);
                        return self.capture_interval;
                    }
                }
                // Coming from Idle, or focus moved to another game window
                self.end_session();
                info!("Game detected ({}), capturing {:?}", decision, window);
                self.state = ScannerState::Capturing(CaptureSession::new(window, now));
                self.capture_interval
            }
            TickOutcome::NotClassified => {
                self.end_session();
                self.poll_interval_idle
            }
        }
    }

    /// Runs one tick, treating a panic inside it like a failed scan.
    ///
    /// The panic hook has already logged the payload by the time this returns.
    pub fn tick_guarded(&mut self) -> Duration {
        match panic::catch_unwind(AssertUnwindSafe(|| self.tick())) {
            Ok(delay) => delay,
            Err(_) => {
                error!("Scan panicked, waiting for the next poll");
                self.end_session();
                self.poll_interval_idle
            }
        }
    }

    fn end_session(&mut self) {
        let previous = mem::replace(&mut self.state, ScannerState::Idle);
        if let ScannerState::Capturing(session) = previous {
            let elapsed = Local::now() - session.started_at;
            info!(
                "Capture session for {:?} ended: {} screenshots over {}s",
                session.active_window,
                session.captures,
                elapsed.num_seconds()
            );
        }
    }

    /// Ticks until cancelled. Cancellation is checked before every poll and
    /// interrupts the sleep between ticks.
    pub fn run(&mut self) {
        info!(
            "Scanner started (idle poll {}s, capture every {}s)",
            self.poll_interval_idle.as_secs(),
            self.capture_interval.as_secs()
        );
        while !self.cancel.is_cancelled() {
            let delay = self.tick_guarded();
            if self.cancel.sleep(delay) {
                break;
            }
        }
        self.end_session();
        info!("Scanner stopped");
    }
}
