//! Software compositing of the viewport: base bitmap under the transform,
//! then the high-resolution patch on top. Nearest-neighbour sampling.

use image::{Rgba, RgbaImage};

use crate::decode::DecodedPatch;
use crate::geometry::{RectF, Transform, ViewportGeometry};

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Renders one viewport-sized frame.
pub fn compose_frame(
    base: &RgbaImage,
    transform: &Transform,
    geometry: &ViewportGeometry,
    patch: Option<&DecodedPatch>,
) -> RgbaImage {
    let width = geometry.viewport_width as u32;
    let height = geometry.viewport_height as u32;
    let mut frame = RgbaImage::from_pixel(width, height, BACKGROUND);

    let (base_w, base_h) = base.dimensions();
    for (x, y, pixel) in frame.enumerate_pixels_mut() {
        let (ix, iy) = transform.viewport_to_image(geometry, x as f32 + 0.5, y as f32 + 0.5);
        if ix >= 0.0 && iy >= 0.0 && (ix as u32) < base_w && (iy as u32) < base_h {
            *pixel = *base.get_pixel(ix as u32, iy as u32);
        }
    }

    if let Some(patch) = patch {
        draw_patch(&mut frame, &patch.bitmap, patch.dest);
    }
    frame
}

fn draw_patch(frame: &mut RgbaImage, bitmap: &RgbaImage, dest: RectF) {
    if dest.is_empty() || bitmap.width() == 0 || bitmap.height() == 0 {
        return;
    }
    let x0 = dest.left.max(0.0).floor() as u32;
    let y0 = dest.top.max(0.0).floor() as u32;
    let x1 = (dest.right.ceil().max(0.0) as u32).min(frame.width());
    let y1 = (dest.bottom.ceil().max(0.0) as u32).min(frame.height());
    let sx = bitmap.width() as f32 / dest.width();
    let sy = bitmap.height() as f32 / dest.height();

    for y in y0..y1 {
        let cy = y as f32 + 0.5;
        if !(dest.top..dest.bottom).contains(&cy) {
            continue;
        }
        let by = (((cy - dest.top) * sy) as u32).min(bitmap.height() - 1);
        for x in x0..x1 {
            let cx = x as f32 + 0.5;
            if !(dest.left..dest.right).contains(&cx) {
                continue;
            }
            let bx = (((cx - dest.left) * sx) as u32).min(bitmap.width() - 1);
            frame.put_pixel(x, y, *bitmap.get_pixel(bx, by));
        }
    }
}
