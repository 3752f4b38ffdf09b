use anyhow::{anyhow, Result};
use image::RgbaImage;

/// Converts a top-down BGRA buffer (as returned by GetDIBits) into an RGBA image.
///
/// GDI leaves the alpha byte undefined for screen copies, so it is forced opaque.
pub fn bgra_to_rgba_image(width: u32, height: u32, mut buffer: Vec<u8>) -> Result<RgbaImage> {
    for px in buffer.chunks_exact_mut(4) {
        px.swap(0, 2);
        px[3] = 255;
    }
    RgbaImage::from_raw(width, height, buffer)
        .ok_or_else(|| anyhow!("Pixel buffer does not match {}x{}", width, height))
}
