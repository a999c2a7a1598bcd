//! Post-release fling.
//!
//! Each tick moves the view by `direction * velocity` and then multiplies the
//! velocity by the friction. The fling is over once the next step would move
//! less than one pixel on both axes.

/// Per-tick movement below this (on both axes) ends the fling.
pub const STOP_THRESHOLD: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InertiaState {
    /// Last drag delta; the fling keeps moving along it.
    pub direction_x: f32,
    pub direction_y: f32,
    pub velocity: f32,
    pub friction: f32,
}

impl InertiaState {
    pub fn new(direction: (f32, f32), velocity: f32, friction: f32) -> Self {
        Self {
            direction_x: direction.0,
            direction_y: direction.1,
            velocity,
            friction,
        }
    }

    /// Movement the next step would apply.
    pub fn next_delta(&self) -> (f32, f32) {
        (self.direction_x * self.velocity, self.direction_y * self.velocity)
    }

    pub fn is_stopped(&self) -> bool {
        let (dx, dy) = self.next_delta();
        !(dx.is_finite() && dy.is_finite())
            || (dx.abs() < STOP_THRESHOLD && dy.abs() < STOP_THRESHOLD)
    }

    /// Returns this tick's movement and decays the velocity, or `None` once
    /// the fling has stopped.
    pub fn step(&mut self) -> Option<(f32, f32)> {
        if self.is_stopped() {
            return None;
        }
        let delta = self.next_delta();
        self.velocity *= self.friction;
        Some(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_fling_decays_within_expected_ticks() {
        let mut inertia = InertiaState::new((1.0, 0.0), 500.0, 0.9);
        let mut ticks = 0;
        let mut travelled = 0.0;
        while let Some((dx, dy)) = inertia.step() {
            assert_eq!(dy, 0.0);
            travelled += dx;
            ticks += 1;
            assert!(ticks <= 100, "inertia never stopped");
        }
        // ln(1/500) / ln(0.9) ~= 59
        let bound = ((1.0f32 / 500.0).ln() / 0.9f32.ln()).ceil() as usize;
        assert!(ticks <= bound, "took {} ticks, bound {}", ticks, bound);
        assert!(inertia.is_stopped());
        // Geometric series: 500 / (1 - 0.9) minus the tail.
        assert!(travelled > 4900.0 && travelled < 5000.0);
    }

    #[test]
    fn test_slow_fling_is_stopped_immediately() {
        let mut inertia = InertiaState::new((0.5, -0.5), 1.2, 0.9);
        assert!(inertia.is_stopped());
        assert_eq!(inertia.step(), None);
    }

    #[test]
    fn test_direction_is_preserved() {
        let mut inertia = InertiaState::new((-3.0, 4.0), 2.0, 0.5);
        assert_eq!(inertia.step(), Some((-6.0, 8.0)));
        assert_eq!(inertia.step(), Some((-3.0, 4.0)));
        assert_eq!(inertia.step(), Some((-1.5, 2.0)));
        assert_eq!(inertia.step(), Some((-0.75, 1.0)));
        assert_eq!(inertia.step(), None);
    }

    #[test]
    fn test_non_finite_velocity_counts_as_stopped() {
        let inertia = InertiaState::new((1.0, 0.0), f32::INFINITY, 0.9);
        assert!(inertia.is_stopped());
    }
}
