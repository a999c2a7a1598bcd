//! Decode requests and the math that plans them.

use image::RgbaImage;
use tracing::trace;

use crate::geometry::{PixelRect, RectF};

/// A region to decode on the worker.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeRequest {
    /// Source rectangle in original-resolution pixels, already clipped.
    pub source_rect: PixelRect,
    pub subsample: u32,
    /// Staleness token; strictly increasing per controller.
    pub token: u64,
    /// Where the decoded pixels go in the viewport.
    pub dest: RectF,
}

/// A decoded high-resolution patch and its place in the viewport.
#[derive(Debug, Clone)]
pub struct DecodedPatch {
    pub token: u64,
    pub bitmap: RgbaImage,
    pub dest: RectF,
    pub source_rect: PixelRect,
}

/// Clipped source rectangle, destination and subsample for one settle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionPlan {
    pub source_rect: PixelRect,
    pub dest: RectF,
    pub subsample: u32,
}

/// Largest power-of-two reduction that still leaves the decoded region at
/// least twice the viewport on both axes.
///
/// The factor is also kept below `source_ratio`: reducing further would be no
/// sharper than the base bitmap that is already on screen.
pub fn select_subsample(
    rect_width: i32,
    rect_height: i32,
    viewport_width: f32,
    viewport_height: f32,
    source_ratio: f32,
) -> u32 {
    let half_w = (rect_width / 2) as f32;
    let half_h = (rect_height / 2) as f32;
    let mut factor: u32 = 1;
    while ((factor * 2) as f32) < source_ratio
        && half_w > viewport_width * factor as f32
        && half_h > viewport_height * factor as f32
    {
        factor *= 2;
    }
    factor
}

/// Plans the decode of `visible` (source coordinates, possibly outside the
/// image) for a viewport of the given size.
///
/// Returns `None` when nothing of the image is visible. When only part of the
/// rectangle is inside the image, the destination shrinks on the matching
/// edges by the same fraction so the patch lines up with the base bitmap.
pub fn plan_region(
    visible: RectF,
    viewport_width: f32,
    viewport_height: f32,
    source_width: u32,
    source_height: u32,
    source_ratio: f32,
) -> Option<RegionPlan> {
    let requested = PixelRect::from_rect_f(visible);
    if requested.is_empty() {
        trace!(?requested, "Empty visible region");
        return None;
    }

    let Some(clipped) = requested.clip_to(source_width, source_height) else {
        trace!(?requested, source_width, source_height, "Visible region outside image");
        return None;
    };

    let subsample = select_subsample(
        requested.width(),
        requested.height(),
        viewport_width,
        viewport_height,
        source_ratio,
    );

    let req_w = requested.width() as f32;
    let req_h = requested.height() as f32;
    let dest = RectF::new(
        (clipped.left - requested.left) as f32 / req_w * viewport_width,
        (clipped.top - requested.top) as f32 / req_h * viewport_height,
        (clipped.right - requested.left) as f32 / req_w * viewport_width,
        (clipped.bottom - requested.top) as f32 / req_h * viewport_height,
    );

    Some(RegionPlan {
        source_rect: clipped,
        dest,
        subsample,
    })
}
