//! Scale + translation of the base bitmap inside the viewport.
//!
//! A `Transform` is a value: every operation returns a new transform computed
//! from the previous one and a delta, so there is no long chain of in-place
//! updates to accumulate drift.

use super::bounds::{ViewportGeometry, MIN_SCALE};
use super::rect::RectF;

/// Uniform scale (normalized, `1.0` = fit) and the viewport position of the
/// image's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        scale: MIN_SCALE,
        translate_x: 0.0,
        translate_y: 0.0,
    };

    /// Fit-to-viewport transform with the image centered.
    pub fn fit(geometry: &ViewportGeometry) -> Self {
        let (scaled_w, scaled_h) = geometry.scaled_size(MIN_SCALE);
        Self {
            scale: MIN_SCALE,
            translate_x: (geometry.viewport_width - scaled_w) / 2.0,
            translate_y: (geometry.viewport_height - scaled_h) / 2.0,
        }
    }

    /// Scales by `factor` keeping the viewport point `(pivot_x, pivot_y)` fixed.
    #[must_use]
    pub fn scale_about(self, factor: f32, pivot_x: f32, pivot_y: f32) -> Self {
        Self {
            scale: self.scale * factor,
            translate_x: pivot_x - (pivot_x - self.translate_x) * factor,
            translate_y: pivot_y - (pivot_y - self.translate_y) * factor,
        }
    }

    #[must_use]
    pub fn translate_by(self, dx: f32, dy: f32) -> Self {
        Self {
            translate_x: self.translate_x + dx,
            translate_y: self.translate_y + dy,
            ..self
        }
    }

    #[must_use]
    pub fn with_translation(self, translate_x: f32, translate_y: f32) -> Self {
        Self {
            translate_x,
            translate_y,
            ..self
        }
    }

    /// `(scale, translate_x, translate_y)`.
    pub fn current_values(&self) -> (f32, f32, f32) {
        (self.scale, self.translate_x, self.translate_y)
    }

    /// Viewport pixels per base-bitmap pixel.
    pub fn pixel_scale(&self, geometry: &ViewportGeometry) -> f32 {
        self.scale * geometry.fit_scale()
    }

    /// Maps a viewport point to base-bitmap coordinates.
    pub fn viewport_to_image(&self, geometry: &ViewportGeometry, x: f32, y: f32) -> (f32, f32) {
        let pixel_scale = self.pixel_scale(geometry);
        (
            (x - self.translate_x) / pixel_scale,
            (y - self.translate_y) / pixel_scale,
        )
    }

    /// Where the base bitmap lands in viewport coordinates.
    pub fn image_rect(&self, geometry: &ViewportGeometry) -> RectF {
        let (scaled_w, scaled_h) = geometry.scaled_size(self.scale);
        RectF::new(
            self.translate_x,
            self.translate_y,
            self.translate_x + scaled_w,
            self.translate_y + scaled_h,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geo() -> ViewportGeometry {
        ViewportGeometry::new((800, 600), (4000, 2000), (4000, 2000), 2.0).unwrap()
    }

    #[test]
    fn test_fit_centers_image() {
        let t = Transform::fit(&geo());
        assert_eq!(t.scale, 1.0);
        assert!(t.translate_x.abs() < 1e-3);
        assert!((t.translate_y - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_scale_about_keeps_pivot_fixed() {
        let geometry = geo();
        let before = Transform::fit(&geometry);
        let pivot = (300.0, 250.0);
        let image_point = before.viewport_to_image(&geometry, pivot.0, pivot.1);

        let after = before.scale_about(2.5, pivot.0, pivot.1);
        let image_point_after = after.viewport_to_image(&geometry, pivot.0, pivot.1);

        assert_eq!(after.scale, 2.5);
        assert!((image_point.0 - image_point_after.0).abs() < 1e-3);
        assert!((image_point.1 - image_point_after.1).abs() < 1e-3);
    }

    #[test]
    fn test_translate_then_values() {
        let t = Transform::IDENTITY.scale_about(2.0, 0.0, 0.0).translate_by(-10.0, 5.0);
        assert_eq!(t.current_values(), (2.0, -10.0, 5.0));
    }

    #[test]
    fn test_image_rect_matches_scaled_size() {
        let geometry = geo();
        let rect = Transform::fit(&geometry).scale_about(2.0, 400.0, 300.0).image_rect(&geometry);
        assert!((rect.width() - 1600.0).abs() < 1e-2);
        assert!((rect.height() - 800.0).abs() < 1e-2);
    }
}
