//! Simulations
//!
//! A simulation maps time since start to a position. Controllers run one per
//! drive: an [`InterpolationSimulation`] for fixed-duration plays and a
//! [`SpringSimulation`] for flings.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::curves::Curve;

/// Position/velocity closeness at which a simulation counts as settled
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerance {
    pub distance: f32,
    pub velocity: f32,
}

impl Tolerance {
    pub const fn new(distance: f32, velocity: f32) -> Self {
        Self { distance, velocity }
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::new(1e-3, 1e-3)
    }
}

/// Time-driven position source
///
/// `time` is seconds since the simulation started and only ever increases
/// between calls.
pub trait Simulation: fmt::Debug {
    fn x(&mut self, time: f32) -> f32;

    fn dx(&self, time: f32) -> f32;

    fn is_done(&self, time: f32) -> bool;
}

// ============================================================================
// Interpolation
// ============================================================================

/// Moves from `begin` to `end` over a fixed duration along a curve
#[derive(Debug, Clone)]
pub struct InterpolationSimulation {
    begin: f32,
    end: f32,
    duration_secs: f32,
    curve: Rc<dyn Curve>,
}

impl InterpolationSimulation {
    pub fn new(begin: f32, end: f32, duration: Duration, curve: Rc<dyn Curve>) -> Self {
        Self {
            begin,
            end,
            duration_secs: duration.as_secs_f32(),
            curve,
        }
    }

    fn progress(&self, time: f32) -> f32 {
        if self.duration_secs <= 0.0 {
            return 1.0;
        }
        (time / self.duration_secs).clamp(0.0, 1.0)
    }
}

impl Simulation for InterpolationSimulation {
    fn x(&mut self, time: f32) -> f32 {
        let t = self.progress(time);
        if t == 0.0 {
            self.begin
        } else if t == 1.0 {
            self.end
        } else {
            self.begin + (self.end - self.begin) * self.curve.transform(t)
        }
    }

    fn dx(&self, time: f32) -> f32 {
        // Central difference over a millisecond
        let epsilon = 1e-3;
        let mut probe = self.clone();
        (probe.x(time + epsilon) - probe.x(time - epsilon)) / (2.0 * epsilon)
    }

    fn is_done(&self, time: f32) -> bool {
        time >= self.duration_secs
    }
}

// ============================================================================
// Spring
// ============================================================================

/// Configuration for a spring
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringConfig {
    pub stiffness: f32,
    pub damping: f32,
    pub mass: f32,
}

impl SpringConfig {
    /// Create a new spring configuration
    pub fn new(stiffness: f32, damping: f32, mass: f32) -> Self {
        Self {
            stiffness,
            damping,
            mass,
        }
    }

    /// Spring whose damping is `ratio` times critical damping
    pub fn with_damping_ratio(mass: f32, stiffness: f32, ratio: f32) -> Self {
        let damping = ratio * 2.0 * (mass * stiffness).sqrt();
        Self {
            stiffness,
            damping,
            mass,
        }
    }

    /// Critically damped spring used by controller flings
    pub fn fling() -> Self {
        Self::with_damping_ratio(1.0, 500.0, 1.0)
    }

    /// Calculate critical damping for this spring's stiffness and mass
    pub fn critical_damping(&self) -> f32 {
        2.0 * (self.stiffness * self.mass).sqrt()
    }

    /// Check if the spring is underdamped (will oscillate)
    pub fn is_underdamped(&self) -> bool {
        self.damping < self.critical_damping()
    }

    /// Check if the spring is critically damped (no oscillation, fastest settling)
    pub fn is_critically_damped(&self) -> bool {
        (self.damping - self.critical_damping()).abs() < 0.01
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::fling()
    }
}

/// A spring-based animator stepped with RK4
#[derive(Clone, Copy, Debug)]
pub struct Spring {
    config: SpringConfig,
    tolerance: Tolerance,
    value: f32,
    velocity: f32,
    target: f32,
}

impl Spring {
    pub fn new(config: SpringConfig, initial: f32) -> Self {
        Self {
            config,
            tolerance: Tolerance::default(),
            value: initial,
            velocity: 0.0,
            target: initial,
        }
    }

    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_velocity(mut self, velocity: f32) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Within tolerance of the target
    pub fn is_settled(&self) -> bool {
        (self.value - self.target).abs() < self.tolerance.distance
            && self.velocity.abs() < self.tolerance.velocity
    }

    /// Step the spring simulation using RK4 integration
    pub fn step(&mut self, dt: f32) {
        if self.is_settled() {
            return;
        }

        let k1_v = self.acceleration(self.value, self.velocity);
        let k1_x = self.velocity;

        let k2_v = self.acceleration(
            self.value + k1_x * dt * 0.5,
            self.velocity + k1_v * dt * 0.5,
        );
        let k2_x = self.velocity + k1_v * dt * 0.5;

        let k3_v = self.acceleration(
            self.value + k2_x * dt * 0.5,
            self.velocity + k2_v * dt * 0.5,
        );
        let k3_x = self.velocity + k2_v * dt * 0.5;

        let k4_v = self.acceleration(self.value + k3_x * dt, self.velocity + k3_v * dt);
        let k4_x = self.velocity + k3_v * dt;

        self.velocity += (k1_v + 2.0 * k2_v + 2.0 * k3_v + k4_v) * dt / 6.0;
        self.value += (k1_x + 2.0 * k2_x + 2.0 * k3_x + k4_x) * dt / 6.0;
    }

    fn acceleration(&self, x: f32, v: f32) -> f32 {
        let spring_force = -self.config.stiffness * (x - self.target);
        let damping_force = -self.config.damping * v;
        (spring_force + damping_force) / self.config.mass
    }
}

/// Runs a [`Spring`] toward a target on the simulation clock
///
/// The spring is advanced in small fixed steps so the result does not depend
/// on the frame rate.
#[derive(Debug, Clone)]
pub struct SpringSimulation {
    spring: Spring,
    time: f32,
}

impl SpringSimulation {
    /// Largest integration step, in seconds
    const MAX_STEP: f32 = 1.0 / 240.0;

    pub fn new(
        config: SpringConfig,
        start: f32,
        target: f32,
        velocity: f32,
        tolerance: Tolerance,
    ) -> Self {
        let mut spring = Spring::new(config, start)
            .with_tolerance(tolerance)
            .with_velocity(velocity);
        spring.set_target(target);
        Self { spring, time: 0.0 }
    }

    fn advance(&mut self, time: f32) {
        while self.time < time && !self.spring.is_settled() {
            let dt = (time - self.time).min(Self::MAX_STEP);
            self.spring.step(dt);
            self.time += dt;
        }
        self.time = self.time.max(time);
    }
}

impl Simulation for SpringSimulation {
    fn x(&mut self, time: f32) -> f32 {
        self.advance(time);
        self.spring.value()
    }

    fn dx(&self, _time: f32) -> f32 {
        self.spring.velocity()
    }

    fn is_done(&self, _time: f32) -> bool {
        self.spring.is_settled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::{Easing, Linear};

    #[test]
    fn test_interpolation_endpoints() {
        let mut sim =
            InterpolationSimulation::new(0.2, 1.0, Duration::from_millis(200), Rc::new(Linear));
        assert_eq!(sim.x(0.0), 0.2);
        assert!((sim.x(0.1) - 0.6).abs() < 1e-5);
        assert!(!sim.is_done(0.1));
        assert_eq!(sim.x(0.2), 1.0);
        assert!(sim.is_done(0.2));
        assert!((sim.dx(0.1) - 4.0).abs() < 0.01);
    }

    #[test]
    fn test_interpolation_applies_curve() {
        let mut sim =
            InterpolationSimulation::new(0.0, 1.0, Duration::from_secs(1), Rc::new(Easing::EaseIn));
        assert!(sim.x(0.5) < 0.5);
    }

    #[test]
    fn test_spring_settles_to_target() {
        let mut spring = Spring::new(SpringConfig::fling(), 0.0)
            .with_tolerance(Tolerance::new(0.01, 0.01));
        spring.set_target(1.0);

        // Simulate for 1 second at 240 steps per second
        for _ in 0..240 {
            spring.step(1.0 / 240.0);
        }

        assert!(spring.is_settled());
        assert!((spring.value() - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_fling_spring_is_critically_damped() {
        let config = SpringConfig::fling();
        assert!(config.is_critically_damped());
        assert!(!SpringConfig::new(500.0, 10.0, 1.0).is_critically_damped());
        assert!(SpringConfig::new(500.0, 10.0, 1.0).is_underdamped());
    }

    #[test]
    fn test_spring_simulation_is_frame_rate_independent() {
        let tolerance = Tolerance::new(0.01, f32::INFINITY);
        let mut coarse = SpringSimulation::new(SpringConfig::fling(), 0.0, 1.01, 2.0, tolerance);
        let mut fine = coarse.clone();

        let a = coarse.x(0.1);
        for i in 1..=10 {
            fine.x(i as f32 * 0.01);
        }
        let b = fine.x(0.1);
        assert!((a - b).abs() < 1e-4);
    }

    #[test]
    fn test_spring_simulation_completes() {
        let tolerance = Tolerance::new(0.01, f32::INFINITY);
        let mut sim = SpringSimulation::new(SpringConfig::fling(), 0.3, 1.01, 3.0, tolerance);
        let mut t = 0.0;
        while !sim.is_done(t) && t < 2.0 {
            t += 1.0 / 60.0;
            sim.x(t);
        }
        assert!(sim.is_done(t));
        assert!(sim.x(t) > 1.0);
    }
}
