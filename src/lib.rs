//! Zoomable image viewport engine.
//!
//! A `ViewportController` shows a screen-resolution base bitmap, lets the user
//! pinch, drag, fling and double-tap zoom it, and once the view settles
//! decodes the visible part of the full-resolution source on a background
//! thread to draw on top.

pub mod config;
pub mod decode;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod image_loader;
pub mod render;
pub mod viewport;

pub use config::ViewerConfig;
pub use decode::{DecodedPatch, ImageRegionSource, RegionSource, RotatedRegionSource, Rotation};
pub use error::{Result, ViewError};
pub use geometry::{Transform, ViewportGeometry};
pub use gesture::{Pointer, PointerEvent, PointerKind};
pub use viewport::{EdgeFlags, FrameUpdate, ViewState, ViewportController};
