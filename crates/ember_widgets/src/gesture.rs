//! Drag gesture details delivered by the host's gesture recognizer

use ember_core::{Axis, Offset};

/// Pointer velocity
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Velocity {
    pub pixels_per_second: Offset,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity {
        pixels_per_second: Offset::ZERO,
    };

    pub fn new(dx: f32, dy: f32) -> Self {
        Self {
            pixels_per_second: Offset::new(dx, dy),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DragStartDetails {
    pub global_position: Offset,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DragUpdateDetails {
    /// Pointer movement since the previous update
    pub delta: Offset,
}

impl DragUpdateDetails {
    pub fn new(delta: Offset) -> Self {
        Self { delta }
    }

    /// Movement along the drag axis
    pub fn primary_delta(&self, axis: Axis) -> f32 {
        self.delta.along(axis)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DragEndDetails {
    pub velocity: Velocity,
}

impl DragEndDetails {
    pub fn new(velocity: Velocity) -> Self {
        Self { velocity }
    }

    /// Release velocity along the drag axis
    pub fn primary_velocity(&self, axis: Axis) -> f32 {
        self.velocity.pixels_per_second.along(axis)
    }
}
