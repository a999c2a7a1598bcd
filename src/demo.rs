//! Headless driver: binds an image file, zooms in with simulated double-taps
//! and waits for the high-resolution patch.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use image::GenericImageView;
use tracing::{info, warn};

use pinchzoom::decode::{ImageRegionSource, RegionSource};
use pinchzoom::image_loader::{downscale_to_fit, open_image};
use pinchzoom::render::compose_frame;
use pinchzoom::{PointerEvent, ViewerConfig, ViewportController};

const USAGE: &str = "Usage: pinchzoom --path <image> [--viewport WxH] [--zoom-taps N] \
                     [--out file.png] [--timeout-ms N]";

const TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Synthetic time between simulated double-taps, well past the tap windows.
const TAP_SPACING_MS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq)]
pub struct DemoArgs {
    pub path: PathBuf,
    pub viewport: (u32, u32),
    pub zoom_taps: usize,
    pub out: Option<PathBuf>,
    pub timeout_ms: u64,
}

fn parse_viewport(value: &str) -> Result<(u32, u32)> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .context("--viewport must look like WIDTHxHEIGHT")?;
    let w = w.trim().parse::<u32>().context("Failed to parse viewport width")?;
    let h = h.trim().parse::<u32>().context("Failed to parse viewport height")?;
    if w == 0 || h == 0 {
        bail!("--viewport dimensions must be greater than 0");
    }
    Ok((w, h))
}

pub fn parse_args<I>(args: I) -> Result<DemoArgs>
where
    I: IntoIterator<Item = String>,
{
    let mut path: Option<PathBuf> = None;
    let mut viewport = (800, 600);
    let mut zoom_taps: usize = 1;
    let mut out: Option<PathBuf> = None;
    let mut timeout_ms: u64 = 5_000;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--path" => {
                let value = args.next().context("Missing value for --path")?;
                path = Some(PathBuf::from(value));
            }
            "--viewport" => {
                let value = args.next().context("Missing value for --viewport")?;
                viewport = parse_viewport(&value)?;
            }
            "--zoom-taps" => {
                let value = args.next().context("Missing value for --zoom-taps")?;
                zoom_taps = value
                    .parse::<usize>()
                    .context("Failed to parse --zoom-taps as a non-negative integer")?;
            }
            "--out" => {
                let value = args.next().context("Missing value for --out")?;
                out = Some(PathBuf::from(value));
            }
            "--timeout-ms" => {
                let value = args.next().context("Missing value for --timeout-ms")?;
                timeout_ms = value
                    .parse::<u64>()
                    .context("Failed to parse --timeout-ms as a positive integer")?;
            }
            _ => {
                if path.is_none() && !arg.starts_with('-') {
                    path = Some(PathBuf::from(arg));
                } else {
                    bail!("Unknown argument: {}", arg);
                }
            }
        }
    }

    if timeout_ms == 0 {
        bail!("--timeout-ms must be greater than 0");
    }
    let path = path.context(USAGE)?;
    Ok(DemoArgs {
        path,
        viewport,
        zoom_taps,
        out,
        timeout_ms,
    })
}

pub fn run(args: DemoArgs) -> Result<i32> {
    if !args.path.is_file() {
        bail!("Image path is not a file: {}", args.path.display());
    }

    let image = open_image(&args.path)?;
    let (original_width, original_height) = image.dimensions();
    let (viewport_width, viewport_height) = args.viewport;
    let base = downscale_to_fit(&image, viewport_width, viewport_height);
    info!(
        path = %args.path.display(),
        original_width,
        original_height,
        base_width = base.width(),
        base_height = base.height(),
        "Loaded image"
    );

    let source: Arc<dyn RegionSource> = Arc::new(ImageRegionSource::new(image));
    let mut controller = ViewportController::new(ViewerConfig::from_env());
    controller.on_viewport_resize(viewport_width, viewport_height);
    controller
        .bind_image(base, Some(source), original_width, original_height)
        .context("Failed to bind image")?;

    let (cx, cy) = (viewport_width as f32 / 2.0, viewport_height as f32 / 2.0);
    let mut now_ms: u64 = 0;
    for _ in 0..args.zoom_taps {
        now_ms += TAP_SPACING_MS;
        controller.on_pointer_event(&PointerEvent::down(cx, cy, now_ms));
        controller.on_pointer_event(&PointerEvent::up(cx, cy, now_ms + 30));
        controller.on_pointer_event(&PointerEvent::down(cx, cy, now_ms + 120));
        controller.on_pointer_event(&PointerEvent::up(cx, cy, now_ms + 150));
        info!(scale = controller.current_transform().scale, "Double-tap");
    }

    let started = Instant::now();
    let timeout = Duration::from_millis(args.timeout_ms);
    while controller.pending_decode().is_some() && started.elapsed() < timeout {
        now_ms += TICK_INTERVAL.as_millis() as u64;
        controller.tick(now_ms);
        thread::sleep(TICK_INTERVAL);
    }

    match controller.current_patch() {
        Some(patch) => info!(
            token = patch.token,
            rect = ?patch.source_rect,
            width = patch.bitmap.width(),
            height = patch.bitmap.height(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "High-resolution patch ready"
        ),
        None if controller.pending_decode().is_some() => {
            warn!(timeout_ms = args.timeout_ms, "Timed out waiting for region decode")
        }
        None => info!(
            scale = controller.current_transform().scale,
            "No region decode needed at this zoom"
        ),
    }

    if let Some(out) = &args.out {
        let (Some(base), Some(geometry)) = (controller.base_image(), controller.geometry()) else {
            bail!("Viewport has no bound image");
        };
        let transform = controller.current_transform();
        let frame = compose_frame(base, &transform, geometry, controller.current_patch());
        frame
            .save(out)
            .with_context(|| format!("Failed to write frame: {:?}", out))?;
        info!(out = %out.display(), "Wrote composed frame");
    }

    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_defaults_with_positional_path() {
        let parsed = parse_args(args(&["photo.jpg"])).unwrap();
        assert_eq!(parsed.path, PathBuf::from("photo.jpg"));
        assert_eq!(parsed.viewport, (800, 600));
        assert_eq!(parsed.zoom_taps, 1);
        assert_eq!(parsed.out, None);
    }

    #[test]
    fn test_parse_all_flags() {
        let parsed = parse_args(args(&[
            "--path",
            "a.png",
            "--viewport",
            "1024x768",
            "--zoom-taps",
            "2",
            "--out",
            "frame.png",
            "--timeout-ms",
            "250",
        ]))
        .unwrap();
        assert_eq!(parsed.viewport, (1024, 768));
        assert_eq!(parsed.zoom_taps, 2);
        assert_eq!(parsed.out, Some(PathBuf::from("frame.png")));
        assert_eq!(parsed.timeout_ms, 250);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["--path"])).is_err());
        assert!(parse_args(args(&["a.png", "--viewport", "0x10"])).is_err());
        assert!(parse_args(args(&["a.png", "--viewport", "wide"])).is_err());
        assert!(parse_args(args(&["a.png", "--timeout-ms", "0"])).is_err());
        assert!(parse_args(args(&["a.png", "--bogus"])).is_err());
    }
}
