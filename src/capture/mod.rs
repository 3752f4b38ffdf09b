//! Screenshot capture of the classified game window.
//!
//! This module provides:
//! - Output path layout and title sanitization (`naming`)
//! - The capture contract used by the scanner (`CaptureSink`)
//! - GDI screen-region grabbing on Windows (`GdiScreenGrabber`)

#[cfg(windows)]
pub mod gdi;
pub mod naming;
pub mod pixels;
pub mod sink;

#[cfg(windows)]
pub use gdi::GdiScreenGrabber;
pub use sink::{CaptureSink, ScreenshotSink};
