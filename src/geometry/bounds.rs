//! Viewport geometry and the legal ranges for scale and translation.
//!
//! Scale is expressed in normalized units: `1.0` is the fit-to-viewport scale,
//! whatever pixel scale that takes for the bound base bitmap.

use crate::error::{Result, ViewError};

/// Smallest allowed zoom. By construction this is the fit scale.
pub const MIN_SCALE: f32 = 1.0;

/// Sizes of the viewport, the base bitmap and the full-resolution source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportGeometry {
    pub viewport_width: f32,
    pub viewport_height: f32,
    /// Base (screen-resolution) bitmap size.
    pub image_width: f32,
    pub image_height: f32,
    /// Full-resolution source size; equals the base size without a region source.
    pub original_width: f32,
    pub original_height: f32,
    max_scale_multiplier: f32,
}

impl ViewportGeometry {
    pub fn new(
        viewport: (u32, u32),
        image: (u32, u32),
        original: (u32, u32),
        max_scale_multiplier: f32,
    ) -> Result<Self> {
        for (width, height) in [viewport, image, original] {
            if width == 0 || height == 0 {
                return Err(ViewError::InvalidDimensions { width, height });
            }
        }

        Ok(Self {
            viewport_width: viewport.0 as f32,
            viewport_height: viewport.1 as f32,
            image_width: image.0 as f32,
            image_height: image.1 as f32,
            original_width: original.0 as f32,
            original_height: original.1 as f32,
            max_scale_multiplier: max_scale_multiplier.max(1.0),
        })
    }

    /// Pixel scale that fits the base bitmap inside the viewport.
    pub fn fit_scale(&self) -> f32 {
        (self.viewport_width / self.image_width).min(self.viewport_height / self.image_height)
    }

    /// How many source pixels one base-bitmap pixel stands for.
    pub fn source_ratio(&self) -> f32 {
        self.original_width / self.image_width
    }

    /// Zoom at which one source pixel lands on one viewport pixel.
    ///
    /// Never below `MIN_SCALE`: small images on a large screen are shown at fit.
    pub fn normalized_scale(&self) -> f32 {
        (self.source_ratio() / self.fit_scale()).max(MIN_SCALE)
    }

    pub fn max_scale(&self) -> f32 {
        self.max_scale_multiplier * self.normalized_scale()
    }

    /// On-screen size of the base bitmap at `scale`.
    pub fn scaled_size(&self, scale: f32) -> (f32, f32) {
        let pixel_scale = self.fit_scale() * scale;
        (self.image_width * pixel_scale, self.image_height * pixel_scale)
    }

    pub fn viewport_center(&self) -> (f32, f32) {
        (self.viewport_width / 2.0, self.viewport_height / 2.0)
    }
}

/// Legal translation range of the image origin in viewport pixels.
///
/// An axis where the image is smaller than the viewport has `min == max`,
/// the value that centers it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranslationBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl TranslationBounds {
    pub fn clamp(&self, tx: f32, ty: f32) -> (f32, f32) {
        (tx.clamp(self.min_x, self.max_x), ty.clamp(self.min_y, self.max_y))
    }

    pub fn pinned_x(&self) -> bool {
        self.min_x == self.max_x
    }

    pub fn pinned_y(&self) -> bool {
        self.min_y == self.max_y
    }
}

/// Pure clamping rules for scale and translation.
pub struct BoundsCalculator;

impl BoundsCalculator {
    pub fn clamp_translation(scale: f32, geometry: &ViewportGeometry) -> TranslationBounds {
        let (scaled_w, scaled_h) = geometry.scaled_size(scale);
        let (min_x, max_x) = Self::axis_range(scaled_w, geometry.viewport_width);
        let (min_y, max_y) = Self::axis_range(scaled_h, geometry.viewport_height);
        TranslationBounds {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    fn axis_range(scaled: f32, viewport: f32) -> (f32, f32) {
        if scaled < viewport {
            let centered = (viewport - scaled) / 2.0;
            (centered, centered)
        } else {
            (-(scaled - viewport), 0.0)
        }
    }

    pub fn clamp_scale(scale: f32, geometry: &ViewportGeometry) -> f32 {
        scale.clamp(MIN_SCALE, geometry.max_scale())
    }

    /// Rescales `factor` so that `current * factor` lands inside the legal
    /// range, exactly on the bound when it would overshoot.
    pub fn clamp_scale_factor(current: f32, factor: f32, geometry: &ViewportGeometry) -> f32 {
        let target = current * factor;
        let clamped = Self::clamp_scale(target, geometry);
        if clamped == target {
            factor
        } else {
            clamped / current
        }
    }
}
