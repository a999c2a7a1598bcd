//! Tunables for gesture handling, inertia and region decoding.
//!
//! Every value has a compiled-in default. `ViewerConfig::from_env` lets a host
//! override them through `PINCHZOOM_*` variables without a rebuild.

use std::time::Duration;

use tracing::debug;

/// Velocity multiplier applied on every inertia tick.
pub const DEFAULT_FRICTION: f32 = 0.9;
/// Maximum pointer travel (per axis) for a press to still count as a tap.
pub const DEFAULT_CLICK_THRESHOLD: f32 = 10.0;
/// Two taps closer than this form a double-tap.
pub const DEFAULT_DOUBLE_TAP_MS: u64 = 300;
/// A lone tap is reported as a click after this delay.
pub const DEFAULT_SINGLE_TAP_DELAY_MS: u64 = 300;
/// Initial two-finger spans at or below this are treated as accidental.
pub const DEFAULT_PINCH_NOISE: f32 = 10.0;
/// Region decoding only runs above this zoom (1.0 = fit).
pub const DEFAULT_DECODE_THRESHOLD: f32 = 1.1;
/// `max_scale = multiplier * normalized_scale`.
pub const DEFAULT_MAX_SCALE_MULTIPLIER: f32 = 2.0;
/// Distance from a viewport edge that still counts as "on the edge".
pub const DEFAULT_EDGE_TOLERANCE: f32 = 10.0;
/// How often the decode worker wakes up to check for shutdown.
const DEFAULT_WORKER_POLL_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub friction: f32,
    pub click_threshold: f32,
    pub double_tap_window: Duration,
    pub single_tap_delay: Duration,
    pub pinch_noise_threshold: f32,
    pub decode_threshold: f32,
    pub max_scale_multiplier: f32,
    pub edge_tolerance: f32,
    pub worker_poll_interval: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            friction: DEFAULT_FRICTION,
            click_threshold: DEFAULT_CLICK_THRESHOLD,
            double_tap_window: Duration::from_millis(DEFAULT_DOUBLE_TAP_MS),
            single_tap_delay: Duration::from_millis(DEFAULT_SINGLE_TAP_DELAY_MS),
            pinch_noise_threshold: DEFAULT_PINCH_NOISE,
            decode_threshold: DEFAULT_DECODE_THRESHOLD,
            max_scale_multiplier: DEFAULT_MAX_SCALE_MULTIPLIER,
            edge_tolerance: DEFAULT_EDGE_TOLERANCE,
            worker_poll_interval: Duration::from_millis(DEFAULT_WORKER_POLL_MS),
        }
    }
}

impl ViewerConfig {
    /// Defaults, overridden by any valid `PINCHZOOM_*` variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Values that fail to parse,
    /// are not finite or are not positive keep their default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let float = |key: &str, fallback: f32| {
            lookup(key)
                .and_then(|v| v.trim().parse::<f32>().ok())
                .filter(|v| v.is_finite() && *v > 0.0)
                .unwrap_or(fallback)
        };
        let millis = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|v| *v > 0)
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };

        let config = Self {
            // Friction >= 1 would never decay.
            friction: Some(float("PINCHZOOM_FRICTION", defaults.friction))
                .filter(|f| *f < 1.0)
                .unwrap_or(defaults.friction),
            click_threshold: float("PINCHZOOM_CLICK_PX", defaults.click_threshold),
            double_tap_window: millis("PINCHZOOM_DOUBLE_TAP_MS", defaults.double_tap_window),
            single_tap_delay: millis("PINCHZOOM_SINGLE_TAP_MS", defaults.single_tap_delay),
            pinch_noise_threshold: float(
                "PINCHZOOM_PINCH_NOISE_PX",
                defaults.pinch_noise_threshold,
            ),
            decode_threshold: float("PINCHZOOM_DECODE_THRESHOLD", defaults.decode_threshold),
            max_scale_multiplier: float(
                "PINCHZOOM_MAX_SCALE_MULTIPLIER",
                defaults.max_scale_multiplier,
            ),
            edge_tolerance: float("PINCHZOOM_EDGE_PX", defaults.edge_tolerance),
            worker_poll_interval: millis("PINCHZOOM_WORKER_POLL_MS", defaults.worker_poll_interval),
        };

        if config != defaults {
            debug!(?config, "Viewer config overridden from environment");
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_constants() {
        let config = ViewerConfig::default();
        assert_eq!(config.friction, 0.9);
        assert_eq!(config.click_threshold, 10.0);
        assert_eq!(config.double_tap_window, Duration::from_millis(300));
        assert_eq!(config.decode_threshold, 1.1);
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = ViewerConfig::from_lookup(lookup_from(&[
            ("PINCHZOOM_FRICTION", "0.8"),
            ("PINCHZOOM_DOUBLE_TAP_MS", "250"),
            ("PINCHZOOM_EDGE_PX", " 4 "),
        ]));
        assert_eq!(config.friction, 0.8);
        assert_eq!(config.double_tap_window, Duration::from_millis(250));
        assert_eq!(config.edge_tolerance, 4.0);
        assert_eq!(config.click_threshold, DEFAULT_CLICK_THRESHOLD);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ViewerConfig::from_lookup(lookup_from(&[
            ("PINCHZOOM_FRICTION", "1.5"),
            ("PINCHZOOM_CLICK_PX", "-3"),
            ("PINCHZOOM_SINGLE_TAP_MS", "soon"),
            ("PINCHZOOM_DECODE_THRESHOLD", "NaN"),
        ]));
        assert_eq!(config, ViewerConfig::default());
    }
}
