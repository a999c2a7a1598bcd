//! Loading images from disk and building the screen-resolution base bitmap.
//!
//! Animated GIFs are shown as their first frame.

use std::io::Cursor;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::codecs::gif::GifDecoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, GenericImageView, ImageFormat, ImageReader, RgbaImage};
use tracing::debug;

fn first_gif_frame(bytes: Vec<u8>, path: &Path) -> Result<RgbaImage> {
    let decoder = GifDecoder::new(Cursor::new(bytes))
        .with_context(|| format!("Failed to decode GIF: {:?}", path))?;
    let frame = decoder
        .into_frames()
        .next()
        .ok_or_else(|| anyhow!("GIF has no frames: {:?}", path))?
        .context("Failed to decode GIF frame")?;
    Ok(frame.into_buffer())
}

fn read_bytes(path: &Path) -> Result<(Vec<u8>, Option<ImageFormat>)> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read image: {:?}", path))?;
    let format = image::guess_format(&bytes).ok();
    Ok((bytes, format))
}

/// Decodes the full-resolution image at `path`.
pub fn open_image(path: &Path) -> Result<DynamicImage> {
    let (bytes, format) = read_bytes(path)?;
    match format {
        Some(ImageFormat::Gif) => Ok(DynamicImage::ImageRgba8(first_gif_frame(bytes, path)?)),
        Some(fmt) => image::load_from_memory_with_format(&bytes, fmt)
            .with_context(|| format!("Failed to decode image: {:?}", path)),
        None => image::load_from_memory(&bytes)
            .with_context(|| format!("Failed to decode image: {:?}", path)),
    }
}

/// Reads the pixel size without decoding the whole image where the format
/// allows it.
pub fn read_dimensions(path: &Path) -> Result<(u32, u32)> {
    let (bytes, format) = read_bytes(path)?;
    if format == Some(ImageFormat::Gif) {
        return Ok(first_gif_frame(bytes, path)?.dimensions());
    }

    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("Failed to guess image format")?
        .into_dimensions()
        .with_context(|| format!("Failed to read dimensions: {:?}", path))
}

/// Largest size with the source aspect ratio that fits in `max_width x max_height`.
/// Never upscales.
pub fn fit_dimensions(
    src_width: u32,
    src_height: u32,
    max_width: u32,
    max_height: u32,
) -> (u32, u32) {
    if src_width == 0 || src_height == 0 || max_width == 0 || max_height == 0 {
        return (src_width.max(1), src_height.max(1));
    }
    let scale = (max_width as f64 / src_width as f64)
        .min(max_height as f64 / src_height as f64)
        .min(1.0);
    let width = (src_width as f64 * scale).round() as u32;
    let height = (src_height as f64 * scale).round() as u32;
    (width.clamp(1, max_width), height.clamp(1, max_height))
}

/// Screen-resolution copy of `img` that fits in `max_width x max_height`.
pub fn downscale_to_fit(img: &DynamicImage, max_width: u32, max_height: u32) -> RgbaImage {
    let (src_width, src_height) = img.dimensions();
    let (width, height) = fit_dimensions(src_width, src_height, max_width, max_height);
    if (width, height) == (src_width, src_height) {
        return img.to_rgba8();
    }
    debug!(src_width, src_height, width, height, "Downscaling base bitmap");
    img.resize_exact(width, height, FilterType::CatmullRom).to_rgba8()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Frame, Rgba};
    use std::fs::File;
    use tempfile::TempDir;

    fn write_png(dir: &TempDir, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.path().join(name);
        RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_fit_dimensions_downscales_preserving_aspect() {
        assert_eq!(fit_dimensions(4000, 3000, 800, 600), (800, 600));
        assert_eq!(fit_dimensions(4000, 2000, 800, 600), (800, 400));
        assert_eq!(fit_dimensions(1000, 4000, 800, 600), (150, 600));
    }

    #[test]
    fn test_fit_dimensions_never_upscales() {
        assert_eq!(fit_dimensions(320, 240, 1920, 1080), (320, 240));
    }

    #[test]
    fn test_open_and_read_dimensions_png() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "photo.png", 64, 48);
        assert_eq!(read_dimensions(&path).unwrap(), (64, 48));
        let img = open_image(&path).unwrap();
        assert_eq!(img.dimensions(), (64, 48));
    }

    #[test]
    fn test_gif_uses_first_frame() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("anim.gif");
        {
            let mut encoder = GifEncoder::new(File::create(&path).unwrap());
            for shade in [0u8, 200] {
                let buffer = RgbaImage::from_pixel(8, 6, Rgba([shade, shade, shade, 255]));
                let delay = Delay::from_numer_denom_ms(100, 1);
                encoder
                    .encode_frame(Frame::from_parts(buffer, 0, 0, delay))
                    .unwrap();
            }
        }
        assert_eq!(read_dimensions(&path).unwrap(), (8, 6));
        let img = open_image(&path).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(3, 3).0[0], 0);
    }

    #[test]
    fn test_missing_or_garbage_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(open_image(&dir.path().join("missing.png")).is_err());

        let garbage = dir.path().join("garbage.jpg");
        std::fs::write(&garbage, b"not an image at all").unwrap();
        assert!(open_image(&garbage).is_err());
        assert!(read_dimensions(&garbage).is_err());
    }

    #[test]
    fn test_downscale_to_fit() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(400, 300));
        assert_eq!(downscale_to_fit(&img, 100, 100).dimensions(), (100, 75));
        assert_eq!(downscale_to_fit(&img, 1000, 1000).dimensions(), (400, 300));
    }
}
