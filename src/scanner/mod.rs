//! Foreground game scanner.
//!
//! This module provides:
//! - The polling state machine (`Scanner`)
//! - Cooperative cancellation (`CancelToken`)
//! - Thread lifecycle for the tray shell (`start_scanner`, `ScannerHandle`)

pub mod cancel;
pub mod runtime;
pub mod scheduler;
pub mod state;

pub use runtime::{start_scanner, ScannerRuntime};
