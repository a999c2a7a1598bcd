//! Progressive high-resolution region decoding.
//!
//! This module provides:
//! - `RegionSource` - Decodes sub-rectangles of the full-resolution image
//! - `plan_region` / `select_subsample` - Maps the visible area to a request
//! - `RegionDecodeScheduler` - Single background worker with stale-result discard

pub mod request;
pub mod scheduler;
pub mod source;

pub use request::{plan_region, select_subsample, DecodeRequest, DecodedPatch, RegionPlan};
pub use scheduler::{DecodeOutcome, PatchReadyCallback, RegionDecodeScheduler};
pub use source::{ImageRegionSource, RegionSource, RotatedRegionSource, Rotation};
