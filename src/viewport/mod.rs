//! The zoomable viewport: transform state, gesture handling and patch
//! lifecycle for one bound image.

pub mod controller;

pub use controller::{
    next_zoom_stop, EdgeFlags, FrameUpdate, RedrawCallback, ViewState, ViewportController,
};
