//! Writes screenshots of a window to the date-partitioned output tree.

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};

use super::naming::screenshot_path;
use crate::platform::{WindowHandle, WindowRect, WindowSystem};

/// Takes one screenshot of a window per call.
pub trait CaptureSink {
    /// Captures `hwnd` and returns the path of the written file.
    fn capture(&mut self, hwnd: WindowHandle) -> Result<PathBuf>;
}

/// Reads the pixels currently shown inside a screen rectangle.
pub trait ScreenGrabber {
    fn grab(&self, rect: WindowRect) -> Result<RgbaImage>;
}

/// JPEG screenshots under `<output_root>/<date>/<time>-<title>.jpg`.
pub struct ScreenshotSink<W, G> {
    windows: W,
    grabber: G,
    output_root: PathBuf,
    quality: u8,
}

impl<W: WindowSystem, G: ScreenGrabber> ScreenshotSink<W, G> {
    pub fn new(windows: W, grabber: G, output_root: PathBuf, quality: u8) -> Self {
        Self {
            windows,
            grabber,
            output_root,
            quality,
        }
    }
}

impl<W: WindowSystem, G: ScreenGrabber> CaptureSink for ScreenshotSink<W, G> {
    fn capture(&mut self, hwnd: WindowHandle) -> Result<PathBuf> {
        // Read fresh every time; the window may have moved since the last tick
        let rect = self.windows.window_rect(hwnd)?;
        if rect.is_empty() {
            return Err(anyhow!(
                "Window {:?} has no visible area ({}x{})",
                hwnd,
                rect.width(),
                rect.height()
            ));
        }
        let title = self.windows.window_title(hwnd).unwrap_or_default();

        let img = self.grabber.grab(rect)?;

        let path = screenshot_path(&self.output_root, &Local::now(), &title);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        save_jpeg(img, &path, self.quality)?;
        Ok(path)
    }
}

/// Encodes `img` as JPEG at `quality` (1-100), dropping the alpha channel.
///
/// Nothing is written to `path` unless encoding succeeds.
pub fn save_jpeg(img: RgbaImage, path: &Path, quality: u8) -> Result<()> {
    let rgb = DynamicImage::ImageRgba8(img).to_rgb8();

    let mut encoded = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut encoded, quality))
        .with_context(|| format!("Failed to encode {}", path.display()))?;
    fs::write(path, &encoded).with_context(|| format!("Failed to write {}", path.display()))
}
