//! Full-resolution region sources.
//!
//! A `RegionSource` decodes a sub-rectangle of the full-resolution image at a
//! power-of-two reduction. The scheduler calls it from its worker thread only.

use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use tracing::trace;

use crate::error::{Result, ViewError};
use crate::geometry::PixelRect;

pub trait RegionSource: Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Decodes `rect` (source pixels, inside the image) reduced by `subsample`.
    fn decode_region(&self, rect: PixelRect, subsample: u32) -> Result<RgbaImage>;
}

impl<S: RegionSource + ?Sized> RegionSource for Arc<S> {
    fn width(&self) -> u32 {
        (**self).width()
    }

    fn height(&self) -> u32 {
        (**self).height()
    }

    fn decode_region(&self, rect: PixelRect, subsample: u32) -> Result<RgbaImage> {
        (**self).decode_region(rect, subsample)
    }
}

fn checked_region(rect: PixelRect, width: u32, height: u32) -> Result<(u32, u32, u32, u32)> {
    match rect.clip_to(width, height) {
        Some(clipped) if clipped == rect => Ok((
            rect.left as u32,
            rect.top as u32,
            rect.width() as u32,
            rect.height() as u32,
        )),
        _ => Err(ViewError::DecodeFailed(format!(
            "rectangle {:?} is outside the {}x{} image",
            rect, width, height
        ))),
    }
}

/// Region source backed by a fully decoded image held in memory.
#[derive(Clone)]
pub struct ImageRegionSource {
    image: Arc<DynamicImage>,
}

impl ImageRegionSource {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn from_shared(image: Arc<DynamicImage>) -> Self {
        Self { image }
    }
}

impl RegionSource for ImageRegionSource {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn decode_region(&self, rect: PixelRect, subsample: u32) -> Result<RgbaImage> {
        let (x, y, w, h) = checked_region(rect, self.width(), self.height())?;
        let crop = self.image.crop_imm(x, y, w, h);
        let subsample = subsample.max(1);
        if subsample == 1 {
            return Ok(crop.to_rgba8());
        }

        let out_w = (w / subsample).max(1);
        let out_h = (h / subsample).max(1);
        trace!(x, y, w, h, subsample, out_w, out_h, "Decoding region");
        Ok(crop.resize_exact(out_w, out_h, FilterType::Triangle).to_rgba8())
    }
}

/// Clockwise quarter-turn applied to a source before display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Accepts multiples of 90, including negative ones.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        match degrees.rem_euclid(360) {
            0 => Some(Self::None),
            90 => Some(Self::Cw90),
            180 => Some(Self::Cw180),
            270 => Some(Self::Cw270),
            _ => None,
        }
    }

    fn swaps_axes(self) -> bool {
        matches!(self, Self::Cw90 | Self::Cw270)
    }
}

/// Presents `inner` rotated clockwise by a fixed quarter-turn.
///
/// Rectangles are given in rotated (display) coordinates and mapped back into
/// the unrotated source before decoding.
pub struct RotatedRegionSource<S> {
    inner: S,
    rotation: Rotation,
}

impl<S: RegionSource> RotatedRegionSource<S> {
    pub fn new(inner: S, rotation: Rotation) -> Self {
        Self { inner, rotation }
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    fn to_inner_rect(&self, rect: PixelRect) -> PixelRect {
        let w = self.width() as i32;
        let h = self.height() as i32;
        match self.rotation {
            Rotation::None => rect,
            Rotation::Cw90 => PixelRect::new(
                rect.top,
                w - rect.right,
                rect.top + rect.height(),
                w - rect.right + rect.width(),
            ),
            Rotation::Cw180 => PixelRect::new(
                w - rect.right,
                h - rect.bottom,
                w - rect.right + rect.width(),
                h - rect.bottom + rect.height(),
            ),
            Rotation::Cw270 => PixelRect::new(
                h - rect.bottom,
                rect.left,
                h - rect.bottom + rect.height(),
                rect.left + rect.width(),
            ),
        }
    }
}

impl<S: RegionSource> RegionSource for RotatedRegionSource<S> {
    fn width(&self) -> u32 {
        if self.rotation.swaps_axes() {
            self.inner.height()
        } else {
            self.inner.width()
        }
    }

    fn height(&self) -> u32 {
        if self.rotation.swaps_axes() {
            self.inner.width()
        } else {
            self.inner.height()
        }
    }

    fn decode_region(&self, rect: PixelRect, subsample: u32) -> Result<RgbaImage> {
        let decoded = self.inner.decode_region(self.to_inner_rect(rect), subsample)?;
        Ok(match self.rotation {
            Rotation::None => decoded,
            Rotation::Cw90 => imageops::rotate90(&decoded),
            Rotation::Cw180 => imageops::rotate180(&decoded),
            Rotation::Cw270 => imageops::rotate270(&decoded),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// 4x2 image where every pixel encodes its own coordinates.
    fn coordinate_image() -> DynamicImage {
        let img = RgbaImage::from_fn(4, 2, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_decode_full_resolution_crop() {
        let source = ImageRegionSource::new(coordinate_image());
        let out = source.decode_region(PixelRect::new(1, 0, 3, 2), 1).unwrap();
        assert_eq!(out.dimensions(), (2, 2));
        assert_eq!(out.get_pixel(0, 0).0[..2], [1, 0]);
        assert_eq!(out.get_pixel(1, 1).0[..2], [2, 1]);
    }

    #[test]
    fn test_decode_subsampled_dimensions() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(64, 48));
        let source = ImageRegionSource::new(img);
        let out = source.decode_region(PixelRect::new(0, 0, 64, 48), 4).unwrap();
        assert_eq!(out.dimensions(), (16, 12));
    }

    #[test]
    fn test_decode_outside_fails() {
        let source = ImageRegionSource::new(coordinate_image());
        let err = source.decode_region(PixelRect::new(-1, 0, 2, 2), 1).unwrap_err();
        assert!(matches!(err, ViewError::DecodeFailed(_)));
    }

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(Rotation::from_degrees(0), Some(Rotation::None));
        assert_eq!(Rotation::from_degrees(450), Some(Rotation::Cw90));
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::Cw270));
        assert_eq!(Rotation::from_degrees(45), None);
    }

    #[test]
    fn test_rotated_dimensions_swap() {
        let rotated =
            RotatedRegionSource::new(ImageRegionSource::new(coordinate_image()), Rotation::Cw90);
        assert_eq!((rotated.width(), rotated.height()), (2, 4));
    }

    #[test]
    fn test_rotated_region_matches_rotated_full_image() {
        let original = coordinate_image().to_rgba8();
        for rotation in [Rotation::Cw90, Rotation::Cw180, Rotation::Cw270] {
            let expected = match rotation {
                Rotation::Cw90 => imageops::rotate90(&original),
                Rotation::Cw180 => imageops::rotate180(&original),
                _ => imageops::rotate270(&original),
            };
            let source =
                RotatedRegionSource::new(ImageRegionSource::new(coordinate_image()), rotation);
            let (w, h) = (source.width() as i32, source.height() as i32);
            // Bottom-right 1x2 column of the rotated view.
            let rect = PixelRect::new(w - 1, h - 2, w, h);
            let out = source.decode_region(rect, 1).unwrap();
            assert_eq!(out.dimensions(), (1, 2), "{:?}", rotation);
            for y in 0..2 {
                assert_eq!(
                    out.get_pixel(0, y),
                    expected.get_pixel((w - 1) as u32, (h - 2) as u32 + y),
                    "{:?} row {}",
                    rotation,
                    y
                );
            }
        }
    }
}
