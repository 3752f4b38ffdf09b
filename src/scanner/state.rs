//! Scanner state machine states.

use chrono::{DateTime, Local};
use std::fmt;
use std::path::PathBuf;

use crate::detection::Decision;
use crate::platform::WindowHandle;

/// A run of consecutive ticks capturing one classified window.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureSession {
    pub active_window: WindowHandle,
    pub started_at: DateTime<Local>,
    pub last_capture_at: DateTime<Local>,
    /// Screenshots written during this session
    pub captures: u32,
}

impl CaptureSession {
    /// Starts a session whose first capture happened at `at`.
    pub fn new(active_window: WindowHandle, at: DateTime<Local>) -> Self {
        Self {
            active_window,
            started_at: at,
            last_capture_at: at,
            captures: 1,
        }
    }

    pub fn record_capture(&mut self, at: DateTime<Local>) {
        self.last_capture_at = at;
        self.captures += 1;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScannerState {
    /// No game focused; polling at the idle interval
    Idle,
    /// A game is focused; capturing at the capture interval
    Capturing(CaptureSession),
}

impl ScannerState {
    #[cfg(test)]
    pub fn is_capturing(&self) -> bool {
        matches!(self, ScannerState::Capturing(_))
    }
}

impl fmt::Display for ScannerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScannerState::Idle => write!(f, "Idle"),
            ScannerState::Capturing(session) => write!(
                f,
                "Capturing {:?} ({} screenshots)",
                session.active_window, session.captures
            ),
        }
    }
}

/// Result of one poll of the foreground window.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// The foreground window is a game and was captured to `path`
    Classified {
        window: WindowHandle,
        decision: Decision,
        path: PathBuf,
    },
    NotClassified,
}
