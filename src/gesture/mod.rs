//! Gesture recognition for the zoomable viewport.
//!
//! This module provides:
//! - `PointerEvent` - Raw pointer input from the host
//! - `GestureStateMachine` - Drag / pinch / tap recognition
//! - `InertiaState` - Fling deceleration after a drag is released

pub mod inertia;
pub mod pointer;
pub mod state_machine;

pub use inertia::InertiaState;
pub use pointer::{Pointer, PointerEvent, PointerKind};
pub use state_machine::{GestureMode, GestureOutput, GestureStateMachine, Tap};
