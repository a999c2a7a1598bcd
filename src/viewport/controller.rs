//! Viewport controller for a single zoomable image.
//! Features:
//! - Fit-to-viewport on bind and resize, pinch/drag/double-tap zoom with clamping
//! - Fling inertia driven by the host frame clock (`tick`)
//! - High-resolution patch decode for the visible region once the view settles
//!
//! The controller lives on the host's UI thread and owns every piece of
//! mutable view state. The decode worker only ever sees owned requests.

use std::sync::Arc;

use image::RgbaImage;
use tracing::{debug, trace, warn};

use crate::config::ViewerConfig;
use crate::decode::{
    plan_region, DecodeOutcome, DecodeRequest, DecodedPatch, RegionDecodeScheduler, RegionSource,
};
use crate::error::{Result, ViewError};
use crate::geometry::{BoundsCalculator, PixelRect, RectF, Transform, ViewportGeometry, MIN_SCALE};
use crate::gesture::{
    GestureMode, GestureOutput, GestureStateMachine, InertiaState, PointerEvent, Tap,
};

/// Scales this close to a stop count as being on it.
const SCALE_EPSILON: f32 = 1e-3;

/// Host hook asking for a redraw. May be called from the decode worker thread.
pub type RedrawCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Settled,
    /// A drag or pinch is in progress.
    Transforming,
    /// Drag released, fling still decelerating.
    Inertial,
}

/// Which viewport edges the image currently touches (within tolerance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeFlags {
    pub left: bool,
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
}

/// What a frame tick changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameUpdate {
    pub needs_redraw: bool,
    /// A single tap was confirmed (no second tap followed).
    pub clicked: bool,
}

struct BoundImage {
    base: Arc<RgbaImage>,
    original: (u32, u32),
    source: Option<Arc<dyn RegionSource>>,
}

pub struct ViewportController {
    config: ViewerConfig,
    viewport: Option<(u32, u32)>,
    image: Option<BoundImage>,
    geometry: Option<ViewportGeometry>,
    transform: Transform,
    state: ViewState,
    gesture: GestureStateMachine,
    inertia: Option<InertiaState>,
    scheduler: Option<RegionDecodeScheduler>,
    next_token: u64,
    pending_token: Option<u64>,
    /// Source rectangle of the pending or displayed patch.
    last_region: Option<(PixelRect, u32)>,
    patch: Option<DecodedPatch>,
    pending_click_at: Option<u64>,
    edges: EdgeFlags,
    touch_enabled: bool,
    redraw: Option<RedrawCallback>,
}

impl ViewportController {
    pub fn new(config: ViewerConfig) -> Self {
        let gesture = GestureStateMachine::new(&config);
        Self {
            config,
            viewport: None,
            image: None,
            geometry: None,
            transform: Transform::IDENTITY,
            state: ViewState::Settled,
            gesture,
            inertia: None,
            scheduler: None,
            next_token: 1,
            pending_token: None,
            last_region: None,
            patch: None,
            pending_click_at: None,
            edges: EdgeFlags::default(),
            touch_enabled: true,
            redraw: None,
        }
    }

    /// Sets the host redraw hook, replacing any earlier one. Also fired by
    /// the decode worker when a patch is ready to be picked up by `tick`.
    pub fn set_redraw_callback<F>(&mut self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let callback: RedrawCallback = Arc::new(callback);
        if let Some(scheduler) = &self.scheduler {
            let hook = Arc::clone(&callback);
            scheduler.on_patch_ready(move |_| hook());
        }
        self.redraw = Some(callback);
    }

    /// Binds a new image.
    ///
    /// `base` is the screen-resolution bitmap that is always displayed;
    /// `source` optionally decodes the `original_width x original_height`
    /// full-resolution image. Zero dimensions fail and leave the current
    /// image untouched.
    pub fn bind_image(
        &mut self,
        base: impl Into<Arc<RgbaImage>>,
        source: Option<Arc<dyn RegionSource>>,
        original_width: u32,
        original_height: u32,
    ) -> Result<()> {
        let base = base.into();
        let (base_w, base_h) = base.dimensions();
        if base_w == 0 || base_h == 0 {
            return Err(ViewError::InvalidDimensions {
                width: base_w,
                height: base_h,
            });
        }
        if original_width == 0 || original_height == 0 {
            return Err(ViewError::InvalidDimensions {
                width: original_width,
                height: original_height,
            });
        }

        self.clear_patch();
        self.inertia = None;
        self.state = ViewState::Settled;
        // The old worker finishes any running decode on its own; nothing
        // it produces is delivered.
        if let Some(old) = self.scheduler.take() {
            old.detach();
        }
        if let Some(source) = &source {
            let poll_interval = self.config.worker_poll_interval;
            match RegionDecodeScheduler::new(Arc::clone(source), poll_interval) {
                Ok(scheduler) => {
                    if let Some(redraw) = &self.redraw {
                        let hook = Arc::clone(redraw);
                        scheduler.on_patch_ready(move |_| hook());
                    }
                    self.scheduler = Some(scheduler);
                }
                Err(e) => warn!(
                    error = ?e,
                    "Failed to start region decoder, showing base image only"
                ),
            }
        }

        debug!(
            base_w,
            base_h,
            original_width,
            original_height,
            region_source = source.is_some(),
            "Bound image"
        );

        self.image = Some(BoundImage {
            base,
            original: (original_width, original_height),
            source,
        });
        self.gesture.reset();
        self.pending_click_at = None;
        self.rebuild_geometry();
        self.request_redraw();
        Ok(())
    }

    pub fn on_viewport_resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            trace!(width, height, "Ignoring empty viewport size");
            return;
        }
        if self.viewport == Some((width, height)) {
            return;
        }
        debug!(width, height, "Viewport resized");
        self.viewport = Some((width, height));
        self.gesture.reset();
        self.rebuild_geometry();
        self.request_redraw();
    }

    pub fn on_pointer_event(&mut self, event: &PointerEvent) {
        if !self.touch_enabled {
            return;
        }
        if self.geometry.is_none() {
            trace!(
                kind = ?event.kind,
                err = %ViewError::GeometryUninitialized,
                "Ignoring pointer event"
            );
            return;
        }

        match self.gesture.handle(event) {
            GestureOutput::Ignored | GestureOutput::PinchEnded => return,
            // A touch alone is not a transform yet: a still tap on a settled
            // view keeps its patch. A touch that catches a fling stops it.
            GestureOutput::DragStarted => {
                if self.state == ViewState::Inertial {
                    self.inertia = None;
                    self.enter_transforming();
                }
            }
            GestureOutput::PinchStarted => {
                self.inertia = None;
                self.enter_transforming();
            }
            GestureOutput::Translate { dx, dy } => {
                if dx == 0.0 && dy == 0.0 {
                    return;
                }
                self.enter_transforming();
                self.translate_clamped(dx, dy);
            }
            GestureOutput::Scale {
                factor,
                focus_x,
                focus_y,
            } => {
                self.enter_transforming();
                self.apply_pinch(factor, focus_x, focus_y);
            }
            GestureOutput::Released { fling, tap } => self.on_release(fling, tap),
        }
        self.request_redraw();
    }

    /// Advances one animation frame: fling step, decoded patch pickup and
    /// single-tap confirmation.
    pub fn tick(&mut self, now_ms: u64) -> FrameUpdate {
        let mut update = FrameUpdate::default();

        if self.state == ViewState::Inertial {
            update.needs_redraw |= self.step_inertia();
        }

        let outcomes = self
            .scheduler
            .as_ref()
            .map(|s| s.poll_results())
            .unwrap_or_default();
        for outcome in outcomes {
            update.needs_redraw |= self.accept_outcome(outcome);
        }

        if let Some(deadline) = self.pending_click_at {
            if now_ms >= deadline {
                self.pending_click_at = None;
                update.clicked = true;
            }
        }

        update
    }

    pub fn current_transform(&self) -> Transform {
        self.transform
    }

    pub fn current_patch(&self) -> Option<&DecodedPatch> {
        self.patch.as_ref()
    }

    pub fn base_image(&self) -> Option<&Arc<RgbaImage>> {
        self.image.as_ref().map(|image| &image.base)
    }

    pub fn geometry(&self) -> Option<&ViewportGeometry> {
        self.geometry.as_ref()
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn edges(&self) -> EdgeFlags {
        self.edges
    }

    /// Token of the decode request still awaited, if any.
    pub fn pending_decode(&self) -> Option<u64> {
        self.pending_token
    }

    pub fn set_touch_enabled(&mut self, enabled: bool) {
        self.touch_enabled = enabled;
    }

    pub fn is_touch_enabled(&self) -> bool {
        self.touch_enabled
    }

    /// True when a hosting pager may take over a horizontal drag.
    pub fn can_host_scroll(&self) -> bool {
        self.state == ViewState::Settled
            && self.gesture.mode() == GestureMode::Idle
            && (self.transform.scale - MIN_SCALE).abs() < SCALE_EPSILON
    }

    pub fn reset_to_fit(&mut self) {
        let Some(geometry) = self.geometry else {
            return;
        };
        self.transform = Transform::fit(&geometry);
        self.gesture.reset();
        self.inertia = None;
        self.state = ViewState::Settled;
        self.clear_patch();
        self.update_edges();
        self.request_redraw();
    }

    fn rebuild_geometry(&mut self) {
        let (Some(viewport), Some(image)) = (self.viewport, self.image.as_ref()) else {
            return;
        };
        let geometry = match ViewportGeometry::new(
            viewport,
            image.base.dimensions(),
            image.original,
            self.config.max_scale_multiplier,
        ) {
            Ok(geometry) => geometry,
            Err(e) => {
                warn!(error = %e, "Cannot build viewport geometry");
                return;
            }
        };

        self.geometry = Some(geometry);
        self.transform = Transform::fit(&geometry);
        self.inertia = None;
        self.state = ViewState::Settled;
        self.clear_patch();
        self.update_edges();
        debug!(
            fit = geometry.fit_scale(),
            normalized = geometry.normalized_scale(),
            max = geometry.max_scale(),
            "Reset transform to fit"
        );
    }

    fn enter_transforming(&mut self) {
        if self.state != ViewState::Transforming {
            trace!(from = ?self.state, "Entering transforming state");
            self.state = ViewState::Transforming;
        }
        self.clear_patch();
    }

    fn on_release(&mut self, fling: Option<InertiaState>, tap: Option<Tap>) {
        match tap {
            Some(Tap::Single { at_ms, .. }) => {
                let delay = self.config.single_tap_delay.as_millis() as u64;
                self.pending_click_at = Some(at_ms.saturating_add(delay));
            }
            Some(Tap::Double { x, y }) => {
                self.pending_click_at = None;
                self.double_tap_zoom(x, y);
                self.settle();
                return;
            }
            None => {}
        }

        match fling {
            Some(inertia) => {
                trace!(velocity = inertia.velocity, "Entering inertial state");
                self.inertia = Some(inertia);
                self.state = ViewState::Inertial;
                self.clear_patch();
            }
            None => self.settle(),
        }
    }

    /// Returns whether the view moved.
    fn step_inertia(&mut self) -> bool {
        let (Some(geometry), Some(mut inertia)) = (self.geometry, self.inertia) else {
            self.settle();
            return false;
        };

        let (next_dx, next_dy) = inertia.next_delta();
        if next_dx.abs() > geometry.viewport_width || next_dy.abs() > geometry.viewport_height {
            trace!(next_dx, next_dy, "Fling step larger than viewport, stopping");
            self.settle();
            return false;
        }

        let Some((dx, dy)) = inertia.step() else {
            self.settle();
            return false;
        };
        self.translate_clamped(dx, dy);

        if inertia.is_stopped() {
            self.settle();
        } else {
            self.inertia = Some(inertia);
        }
        true
    }

    fn settle(&mut self) {
        if self.state != ViewState::Settled {
            trace!(from = ?self.state, "View settled");
        }
        self.state = ViewState::Settled;
        self.inertia = None;
        self.request_region();
    }

    fn translate_clamped(&mut self, dx: f32, dy: f32) {
        let Some(geometry) = self.geometry else {
            return;
        };
        let bounds = BoundsCalculator::clamp_translation(self.transform.scale, &geometry);
        let (tx, ty) = bounds.clamp(
            self.transform.translate_x + dx,
            self.transform.translate_y + dy,
        );
        self.transform = self.transform.with_translation(tx, ty);
        self.update_edges();
    }

    fn apply_pinch(&mut self, factor: f32, focus_x: f32, focus_y: f32) {
        let Some(geometry) = self.geometry else {
            return;
        };
        if !factor.is_finite() || factor <= 0.0 {
            trace!(factor, "Rejecting pinch factor");
            return;
        }
        let factor = BoundsCalculator::clamp_scale_factor(self.transform.scale, factor, &geometry);
        let target = BoundsCalculator::clamp_scale(self.transform.scale * factor, &geometry);
        self.zoom_to(target, focus_x, focus_y, &geometry);
    }

    fn double_tap_zoom(&mut self, x: f32, y: f32) {
        let Some(geometry) = self.geometry else {
            return;
        };
        let target = next_zoom_stop(self.transform.scale, &geometry);
        debug!(from = self.transform.scale, to = target, "Double-tap zoom");
        self.zoom_to(target, x, y, &geometry);
    }

    /// Scales to `target` about the focus point, collapsing the pivot to the
    /// viewport center on any axis where the image ends up smaller than the
    /// viewport, then re-clamps the translation.
    fn zoom_to(&mut self, target: f32, focus_x: f32, focus_y: f32, geometry: &ViewportGeometry) {
        let current = self.transform.scale;
        let (scaled_w, scaled_h) = geometry.scaled_size(target);
        let (center_x, center_y) = geometry.viewport_center();
        let pivot_x = if scaled_w < geometry.viewport_width {
            center_x
        } else {
            focus_x
        };
        let pivot_y = if scaled_h < geometry.viewport_height {
            center_y
        } else {
            focus_y
        };

        let scaled = self.transform.scale_about(target / current, pivot_x, pivot_y);
        let scaled = Transform {
            scale: target,
            ..scaled
        };
        let bounds = BoundsCalculator::clamp_translation(target, geometry);
        let (tx, ty) = bounds.clamp(scaled.translate_x, scaled.translate_y);
        self.transform = scaled.with_translation(tx, ty);
        self.update_edges();
    }

    fn clear_patch(&mut self) {
        if self.patch.take().is_some() {
            trace!("Cleared high-resolution patch");
        }
        if self.pending_token.take().is_some() {
            if let Some(scheduler) = &self.scheduler {
                scheduler.cancel_pending();
            }
        }
        self.last_region = None;
    }

    /// Visible viewport mapped into full-resolution source coordinates.
    fn visible_source_rect(&self, geometry: &ViewportGeometry) -> RectF {
        let pixel_scale = self.transform.pixel_scale(geometry);
        let ratio = geometry.source_ratio();
        let left = -self.transform.translate_x / pixel_scale;
        let top = -self.transform.translate_y / pixel_scale;
        RectF::new(
            left * ratio,
            top * ratio,
            (left + geometry.viewport_width / pixel_scale) * ratio,
            (top + geometry.viewport_height / pixel_scale) * ratio,
        )
    }

    fn request_region(&mut self) {
        let Some(geometry) = self.geometry else {
            return;
        };
        let Some(source) = self.image.as_ref().and_then(|image| image.source.clone()) else {
            return;
        };
        if self.scheduler.is_none() || geometry.source_ratio() <= 1.0 {
            return;
        }

        if self.transform.scale <= self.config.decode_threshold {
            trace!(scale = self.transform.scale, "Base image is sharp enough, skipping decode");
            self.clear_patch();
            return;
        }

        let visible = self.visible_source_rect(&geometry);
        let Some(plan) = plan_region(
            visible,
            geometry.viewport_width,
            geometry.viewport_height,
            source.width(),
            source.height(),
            geometry.source_ratio(),
        ) else {
            trace!(?visible, "Visible region outside source, dropping decode");
            self.clear_patch();
            return;
        };

        let region = (plan.source_rect, plan.subsample);
        let in_hand = self.patch.is_some() || self.pending_token.is_some();
        if self.last_region == Some(region) && in_hand {
            trace!(rect = ?plan.source_rect, "Region already requested");
            return;
        }

        self.clear_patch();
        let token = self.next_token;
        self.next_token += 1;
        self.pending_token = Some(token);
        self.last_region = Some(region);

        debug!(
            token,
            rect = ?plan.source_rect,
            subsample = plan.subsample,
            "Requesting region decode"
        );
        if let Some(scheduler) = &self.scheduler {
            scheduler.submit(DecodeRequest {
                source_rect: plan.source_rect,
                subsample: plan.subsample,
                token,
                dest: plan.dest,
            });
        }
    }

    /// Installs a finished decode if it answers the request still awaited.
    /// Returns whether the displayed patch changed.
    pub(crate) fn accept_outcome(&mut self, outcome: DecodeOutcome) -> bool {
        if self.pending_token != Some(outcome.token) || self.state != ViewState::Settled {
            debug!(
                token = outcome.token,
                pending = ?self.pending_token,
                "Discarding stale decode result"
            );
            return false;
        }
        self.pending_token = None;

        match outcome.result {
            Ok(patch) => {
                debug!(
                    token = outcome.token,
                    width = patch.bitmap.width(),
                    height = patch.bitmap.height(),
                    "Installed high-resolution patch"
                );
                self.patch = Some(patch);
                true
            }
            Err(e) => {
                warn!(
                    token = outcome.token,
                    error = %e,
                    "Region decode failed, keeping base image"
                );
                self.last_region = None;
                false
            }
        }
    }

    fn update_edges(&mut self) {
        let Some(geometry) = self.geometry else {
            return;
        };
        let tolerance = self.config.edge_tolerance;
        let rect = self.transform.image_rect(&geometry);
        self.edges = EdgeFlags {
            left: rect.left > -tolerance,
            top: rect.top > -tolerance,
            right: rect.right < geometry.viewport_width + tolerance,
            bottom: rect.bottom < geometry.viewport_height + tolerance,
        };
    }

    fn request_redraw(&self) {
        if let Some(redraw) = &self.redraw {
            redraw();
        }
    }
}

/// Double-tap cycle: fit -> 1:1 -> max -> fit.
pub fn next_zoom_stop(scale: f32, geometry: &ViewportGeometry) -> f32 {
    let normalized = geometry.normalized_scale();
    let max = geometry.max_scale();
    if scale < normalized - SCALE_EPSILON {
        normalized
    } else if scale < max - SCALE_EPSILON {
        max
    } else {
        MIN_SCALE
    }
}
