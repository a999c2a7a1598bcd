//! Pure geometry: rectangles, the view transform and its bounds.

pub mod bounds;
pub mod rect;
pub mod transform;

pub use bounds::{BoundsCalculator, TranslationBounds, ViewportGeometry, MIN_SCALE};
pub use rect::{PixelRect, RectF};
pub use transform::Transform;
