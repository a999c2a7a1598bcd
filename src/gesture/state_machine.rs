//! Turns raw pointer events into drag, pinch and tap intents.
//!
//! The machine never touches the transform. It reports what the user asked
//! for; the controller decides how much of it is legal.

use tracing::trace;

use super::inertia::InertiaState;
use super::pointer::{Pointer, PointerEvent, PointerKind};
use crate::config::ViewerConfig;
use crate::error::ViewError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureMode {
    #[default]
    Idle,
    Dragging,
    Pinching,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tap {
    /// A lone tap. It becomes a click only if no second tap follows.
    Single { x: f32, y: f32, at_ms: u64 },
    Double { x: f32, y: f32 },
}

/// Result of feeding one event to the machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutput {
    Ignored,
    DragStarted,
    Translate { dx: f32, dy: f32 },
    PinchStarted,
    Scale { factor: f32, focus_x: f32, focus_y: f32 },
    /// One finger of a pinch lifted; the remaining one may keep dragging.
    PinchEnded,
    /// All pointers are up.
    Released {
        fling: Option<InertiaState>,
        tap: Option<Tap>,
    },
}

#[derive(Debug, Clone)]
pub struct GestureStateMachine {
    mode: GestureMode,
    start: (f32, f32),
    last: (f32, f32),
    last_move_ms: u64,
    last_span: f32,
    last_delta: (f32, f32),
    velocity: f32,
    /// A pinch happened during this gesture; suppresses tap and fling.
    pinched: bool,
    last_tap_ms: Option<u64>,
    friction: f32,
    click_threshold: f32,
    double_tap_ms: u64,
    pinch_noise: f32,
}

impl GestureStateMachine {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            mode: GestureMode::Idle,
            start: (0.0, 0.0),
            last: (0.0, 0.0),
            last_move_ms: 0,
            last_span: 0.0,
            last_delta: (0.0, 0.0),
            velocity: 0.0,
            pinched: false,
            last_tap_ms: None,
            friction: config.friction,
            click_threshold: config.click_threshold,
            double_tap_ms: config.double_tap_window.as_millis() as u64,
            pinch_noise: config.pinch_noise_threshold,
        }
    }

    pub fn mode(&self) -> GestureMode {
        self.mode
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Drops any in-progress gesture and tap history.
    pub fn reset(&mut self) {
        self.mode = GestureMode::Idle;
        self.velocity = 0.0;
        self.last_delta = (0.0, 0.0);
        self.last_span = 0.0;
        self.pinched = false;
        self.last_tap_ms = None;
    }

    pub fn handle(&mut self, event: &PointerEvent) -> GestureOutput {
        let output = match event.kind {
            PointerKind::Down => self.on_down(event),
            PointerKind::PointerDown => self.on_pointer_down(event),
            PointerKind::Move => self.on_move(event),
            PointerKind::PointerUp => self.on_pointer_up(event),
            PointerKind::Up => self.on_up(event),
        };
        if let Err(err) = &output {
            trace!(kind = ?event.kind, mode = ?self.mode, %err, "Ignoring pointer event");
        }
        output.unwrap_or(GestureOutput::Ignored)
    }

    fn on_down(&mut self, event: &PointerEvent) -> Result<GestureOutput, ViewError> {
        let p = event
            .primary()
            .ok_or(ViewError::MalformedGesture("down without pointer"))?;
        self.mode = GestureMode::Dragging;
        self.start = (p.x, p.y);
        self.last = (p.x, p.y);
        self.last_move_ms = event.timestamp_ms;
        self.last_delta = (0.0, 0.0);
        self.velocity = 0.0;
        self.pinched = false;
        Ok(GestureOutput::DragStarted)
    }

    fn on_pointer_down(&mut self, event: &PointerEvent) -> Result<GestureOutput, ViewError> {
        if self.mode == GestureMode::Idle {
            return Err(ViewError::MalformedGesture("second pointer without first"));
        }
        let (a, b) = event
            .pair()
            .ok_or(ViewError::MalformedGesture("pointer down with one pointer"))?;
        let span = a.distance_to(b);
        if span <= self.pinch_noise {
            trace!(span, "Pinch span below noise threshold");
            return Ok(GestureOutput::Ignored);
        }
        self.mode = GestureMode::Pinching;
        self.last_span = span;
        self.velocity = 0.0;
        self.pinched = true;
        Ok(GestureOutput::PinchStarted)
    }

    fn on_move(&mut self, event: &PointerEvent) -> Result<GestureOutput, ViewError> {
        match self.mode {
            GestureMode::Idle => Err(ViewError::MalformedGesture("move without down")),
            GestureMode::Dragging => {
                let p = event
                    .primary()
                    .ok_or(ViewError::MalformedGesture("move without pointer"))?;
                Ok(self.drag_to(p, event.timestamp_ms))
            }
            GestureMode::Pinching => {
                let Some((a, b)) = event.pair() else {
                    return Ok(GestureOutput::Ignored);
                };
                let span = a.distance_to(b);
                if span <= 0.0 || self.last_span <= 0.0 {
                    return Err(ViewError::MalformedGesture("zero pinch span"));
                }
                let factor = span / self.last_span;
                self.last_span = span;
                let (focus_x, focus_y) = a.midpoint(b);
                Ok(GestureOutput::Scale {
                    factor,
                    focus_x,
                    focus_y,
                })
            }
        }
    }

    fn drag_to(&mut self, p: &Pointer, now_ms: u64) -> GestureOutput {
        let dx = p.x - self.last.0;
        let dy = p.y - self.last.1;
        let elapsed = now_ms.saturating_sub(self.last_move_ms);
        if elapsed > 0 {
            let distance = dx.hypot(dy);
            self.velocity = distance / elapsed as f32 * self.friction;
        }
        self.last_move_ms = now_ms;
        self.last = (p.x, p.y);
        self.last_delta = (dx, dy);
        GestureOutput::Translate { dx, dy }
    }

    fn on_pointer_up(&mut self, event: &PointerEvent) -> Result<GestureOutput, ViewError> {
        match self.mode {
            GestureMode::Idle => Err(ViewError::MalformedGesture("pointer up without down")),
            GestureMode::Dragging => Ok(GestureOutput::Ignored),
            GestureMode::Pinching => {
                // Continue as a drag from the finger that stays down.
                let remaining = event
                    .pointers
                    .get(1)
                    .ok_or(ViewError::MalformedGesture("pinch lift without remaining pointer"))?;
                self.mode = GestureMode::Dragging;
                self.last = (remaining.x, remaining.y);
                self.last_move_ms = event.timestamp_ms;
                self.last_delta = (0.0, 0.0);
                self.velocity = 0.0;
                Ok(GestureOutput::PinchEnded)
            }
        }
    }

    fn on_up(&mut self, event: &PointerEvent) -> Result<GestureOutput, ViewError> {
        if self.mode == GestureMode::Idle {
            return Err(ViewError::MalformedGesture("up without down"));
        }
        let (x, y) = event.primary().map(|p| (p.x, p.y)).unwrap_or(self.last);
        self.mode = GestureMode::Idle;

        if self.pinched {
            self.pinched = false;
            self.velocity = 0.0;
            return Ok(GestureOutput::Released {
                fling: None,
                tap: None,
            });
        }

        let fling = InertiaState::new(self.last_delta, self.velocity, self.friction);
        let fling = (!fling.is_stopped()).then_some(fling);

        let moved_x = (x - self.start.0).abs();
        let moved_y = (y - self.start.1).abs();
        let tap = if moved_x < self.click_threshold && moved_y < self.click_threshold {
            Some(self.classify_tap(x, y, event.timestamp_ms))
        } else {
            None
        };

        Ok(GestureOutput::Released { fling, tap })
    }

    fn classify_tap(&mut self, x: f32, y: f32, now_ms: u64) -> Tap {
        match self.last_tap_ms {
            Some(prev) if now_ms.saturating_sub(prev) <= self.double_tap_ms => {
                self.last_tap_ms = None;
                Tap::Double { x, y }
            }
            _ => {
                self.last_tap_ms = Some(now_ms);
                Tap::Single { x, y, at_ms: now_ms }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> GestureStateMachine {
        GestureStateMachine::new(&ViewerConfig::default())
    }

    #[test]
    fn test_drag_emits_deltas_and_velocity() {
        let mut m = machine();
        assert_eq!(m.handle(&PointerEvent::down(100.0, 100.0, 0)), GestureOutput::DragStarted);
        assert_eq!(m.mode(), GestureMode::Dragging);

        let out = m.handle(&PointerEvent::moved(130.0, 140.0, 10));
        assert_eq!(out, GestureOutput::Translate { dx: 30.0, dy: 40.0 });
        // 50 px in 10 ms, times friction.
        assert!((m.velocity() - 4.5).abs() < 1e-5);
    }

    #[test]
    fn test_release_after_fast_drag_seeds_fling() {
        let mut m = machine();
        m.handle(&PointerEvent::down(0.0, 0.0, 0));
        m.handle(&PointerEvent::moved(20.0, 0.0, 16));
        m.handle(&PointerEvent::moved(40.0, 0.0, 32));
        match m.handle(&PointerEvent::up(40.0, 0.0, 40)) {
            GestureOutput::Released { fling: Some(fling), tap: None } => {
                assert_eq!((fling.direction_x, fling.direction_y), (20.0, 0.0));
                assert!(fling.velocity > 0.0);
            }
            other => panic!("unexpected output: {:?}", other),
        }
        assert_eq!(m.mode(), GestureMode::Idle);
    }

    #[test]
    fn test_move_without_down_is_ignored() {
        let mut m = machine();
        assert_eq!(m.handle(&PointerEvent::moved(5.0, 5.0, 1)), GestureOutput::Ignored);
        assert_eq!(m.handle(&PointerEvent::up(5.0, 5.0, 2)), GestureOutput::Ignored);
        assert_eq!(m.mode(), GestureMode::Idle);
    }

    #[test]
    fn test_pinch_below_noise_is_ignored() {
        let mut m = machine();
        m.handle(&PointerEvent::down(100.0, 100.0, 0));
        let out = m.handle(&PointerEvent::two(
            PointerKind::PointerDown,
            (100.0, 100.0),
            (104.0, 103.0),
            5,
        ));
        assert_eq!(out, GestureOutput::Ignored);
        assert_eq!(m.mode(), GestureMode::Dragging);
    }

    #[test]
    fn test_pinch_reports_span_ratio_and_midpoint() {
        let mut m = machine();
        m.handle(&PointerEvent::down(100.0, 100.0, 0));
        assert_eq!(
            m.handle(&PointerEvent::two(
                PointerKind::PointerDown,
                (100.0, 100.0),
                (200.0, 100.0),
                5,
            )),
            GestureOutput::PinchStarted
        );
        let out = m.handle(&PointerEvent::two(
            PointerKind::Move,
            (50.0, 100.0),
            (250.0, 100.0),
            10,
        ));
        assert_eq!(
            out,
            GestureOutput::Scale {
                factor: 2.0,
                focus_x: 150.0,
                focus_y: 100.0
            }
        );
    }

    #[test]
    fn test_pinch_release_has_no_tap_or_fling() {
        let mut m = machine();
        m.handle(&PointerEvent::down(100.0, 100.0, 0));
        m.handle(&PointerEvent::two(PointerKind::PointerDown, (100.0, 100.0), (200.0, 100.0), 5));
        m.handle(&PointerEvent::two(PointerKind::Move, (90.0, 100.0), (210.0, 100.0), 10));
        assert_eq!(
            m.handle(&PointerEvent::two(PointerKind::PointerUp, (210.0, 100.0), (90.0, 100.0), 20)),
            GestureOutput::PinchEnded
        );
        assert_eq!(m.mode(), GestureMode::Dragging);
        // The remaining finger keeps dragging from where it is.
        assert_eq!(
            m.handle(&PointerEvent::moved(95.0, 100.0, 30)),
            GestureOutput::Translate { dx: 5.0, dy: 0.0 }
        );
        assert_eq!(
            m.handle(&PointerEvent::up(95.0, 100.0, 40)),
            GestureOutput::Released {
                fling: None,
                tap: None
            }
        );
    }

    #[test]
    fn test_double_tap_within_window() {
        let mut m = machine();
        m.handle(&PointerEvent::down(10.0, 10.0, 0));
        let first = m.handle(&PointerEvent::up(12.0, 11.0, 50));
        assert!(matches!(
            first,
            GestureOutput::Released {
                tap: Some(Tap::Single { at_ms: 50, .. }),
                ..
            }
        ));

        m.handle(&PointerEvent::down(10.0, 10.0, 200));
        let second = m.handle(&PointerEvent::up(10.0, 10.0, 250));
        assert_eq!(
            second,
            GestureOutput::Released {
                fling: None,
                tap: Some(Tap::Double { x: 10.0, y: 10.0 })
            }
        );
    }

    #[test]
    fn test_slow_second_tap_is_single_again() {
        let mut m = machine();
        m.handle(&PointerEvent::down(10.0, 10.0, 0));
        m.handle(&PointerEvent::up(10.0, 10.0, 10));
        m.handle(&PointerEvent::down(10.0, 10.0, 500));
        let out = m.handle(&PointerEvent::up(10.0, 10.0, 520));
        assert!(matches!(
            out,
            GestureOutput::Released {
                tap: Some(Tap::Single { at_ms: 520, .. }),
                ..
            }
        ));
    }

    #[test]
    fn test_long_drag_is_not_a_tap() {
        let mut m = machine();
        m.handle(&PointerEvent::down(10.0, 10.0, 0));
        m.handle(&PointerEvent::moved(40.0, 10.0, 500));
        let out = m.handle(&PointerEvent::up(40.0, 10.0, 1000));
        assert!(matches!(out, GestureOutput::Released { tap: None, .. }));
    }
}
