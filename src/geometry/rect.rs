/// Axis-aligned rectangle in viewport coordinates (floating point).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RectF {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl RectF {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

/// Axis-aligned rectangle in source-image pixel coordinates.
///
/// May extend past the image while a request is being planned; it is clipped
/// before being handed to a region source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl PixelRect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Truncates each edge toward zero.
    pub fn from_rect_f(rect: RectF) -> Self {
        Self::new(
            rect.left as i32,
            rect.top as i32,
            rect.right as i32,
            rect.bottom as i32,
        )
    }

    /// Intersection with `[0, width) x [0, height)`; `None` when nothing is left.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<Self> {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        let clipped = Self::new(
            self.left.max(0),
            self.top.max(0),
            self.right.min(w),
            self.bottom.min(h),
        );
        (!clipped.is_empty()).then_some(clipped)
    }
}
