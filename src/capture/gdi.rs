//! Screen-region capture through GDI.
//!
//! Copies straight from the desktop DC, so the result is exactly what is
//! visible inside the rectangle, spanning monitors if the window does.

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use std::mem;

use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC, GetDIBits,
    ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, CAPTUREBLT, DIB_RGB_COLORS, HBITMAP,
    HDC, ROP_CODE, SRCCOPY,
};

use super::pixels::bgra_to_rgba_image;
use super::sink::ScreenGrabber;
use crate::platform::WindowRect;

struct ScreenDc(HDC);

impl Drop for ScreenDc {
    fn drop(&mut self) {
        unsafe {
            ReleaseDC(HWND::default(), self.0);
        }
    }
}

struct MemoryDc(HDC);

impl Drop for MemoryDc {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteDC(self.0);
        }
    }
}

struct Bitmap(HBITMAP);

impl Drop for Bitmap {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteObject(self.0);
        }
    }
}

/// Grabs screen pixels with BitBlt from the desktop device context.
#[derive(Clone, Copy, Debug, Default)]
pub struct GdiScreenGrabber;

impl ScreenGrabber for GdiScreenGrabber {
    fn grab(&self, rect: WindowRect) -> Result<RgbaImage> {
        let width = rect.width();
        let height = rect.height();
        if width <= 0 || height <= 0 {
            return Err(anyhow!("Cannot capture empty region {}x{}", width, height));
        }

        unsafe {
            let screen = ScreenDc(GetDC(HWND::default()));
            if screen.0.is_invalid() {
                return Err(anyhow!("GetDC failed for the screen"));
            }

            let memory = MemoryDc(CreateCompatibleDC(screen.0));
            if memory.0.is_invalid() {
                return Err(anyhow!("CreateCompatibleDC failed"));
            }

            let bitmap = Bitmap(CreateCompatibleBitmap(screen.0, width, height));
            if bitmap.0.is_invalid() {
                return Err(anyhow!("CreateCompatibleBitmap failed for {}x{}", width, height));
            }

            let previous = SelectObject(memory.0, bitmap.0);
            // CAPTUREBLT includes layered windows (overlays) in the copy
            let blit = BitBlt(
                memory.0,
                0,
                0,
                width,
                height,
                screen.0,
                rect.left,
                rect.top,
                ROP_CODE(SRCCOPY.0 | CAPTUREBLT.0),
            );
            SelectObject(memory.0, previous);
            blit.context("BitBlt from screen failed")?;

            let buffer_size = (width * height * 4) as usize;
            let mut bitmap_info = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: width,
                    // Negative height requests top-down rows
                    biHeight: -height,
                    biPlanes: 1,
                    biBitCount: 32,
                    biSizeImage: buffer_size as u32,
                    biCompression: 0,
                    ..Default::default()
                },
                ..Default::default()
            };

            let mut buffer = vec![0u8; buffer_size];
            let lines = GetDIBits(
                memory.0,
                bitmap.0,
                0,
                height as u32,
                Some(buffer.as_mut_ptr().cast()),
                &mut bitmap_info,
                DIB_RGB_COLORS,
            );
            if lines == 0 {
                return Err(anyhow!("GetDIBits returned no scan lines"));
            }

            bgra_to_rgba_image(width as u32, height as u32, buffer)
        }
    }
}
