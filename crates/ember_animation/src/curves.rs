//! Easing curves
//!
//! A curve remaps linear progress in `0.0..=1.0` to eased progress. Curves are
//! pure; by convention `transform(0.0) == 0.0` and `transform(1.0) == 1.0`,
//! which is what lets them compose (an [`Interval`] of a [`Cubic`] of ...).

use std::fmt;

/// Maximum error when solving a cubic bezier for `t`
const CUBIC_ERROR_BOUND: f32 = 0.001;

/// Progress remapping function
pub trait Curve: fmt::Debug {
    /// Curve body for `t` strictly between 0 and 1
    fn transform_internal(&self, t: f32) -> f32;

    /// Map `t` (clamped to 0..=1) through the curve; endpoints map to themselves
    fn transform(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        if t == 0.0 || t == 1.0 {
            return t;
        }
        self.transform_internal(t)
    }
}

/// The identity curve
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Linear;

impl Curve for Linear {
    fn transform_internal(&self, t: f32) -> f32 {
        t
    }
}

/// Cubic bezier through (0,0), (a,b), (c,d), (1,1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cubic {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
}

impl Cubic {
    pub const fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self { a, b, c, d }
    }

    fn evaluate(a: f32, b: f32, m: f32) -> f32 {
        3.0 * a * (1.0 - m) * (1.0 - m) * m + 3.0 * b * (1.0 - m) * m * m + m * m * m
    }
}

impl Curve for Cubic {
    fn transform_internal(&self, t: f32) -> f32 {
        let mut start = 0.0_f32;
        let mut end = 1.0_f32;
        let mut midpoint = 0.5;
        // Bisection converges well inside 32 rounds at f32 precision
        for _ in 0..32 {
            midpoint = (start + end) / 2.0;
            let estimate = Self::evaluate(self.a, self.c, midpoint);
            if (t - estimate).abs() < CUBIC_ERROR_BOUND {
                break;
            }
            if estimate < t {
                start = midpoint;
            } else {
                end = midpoint;
            }
        }
        Self::evaluate(self.b, self.d, midpoint)
    }
}

/// Named curves
///
/// Serializable so configuration files can pick a curve by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Easing {
    #[default]
    Linear,
    /// Quick acceleration, slow landing
    Ease,
    EaseIn,
    EaseOut,
    EaseInOut,
    /// Material standard curve
    FastOutSlowIn,
    /// Quadratic slow-down
    Decelerate,
}

impl Easing {
    pub const EASE: Cubic = Cubic::new(0.25, 0.1, 0.25, 1.0);
    pub const EASE_IN: Cubic = Cubic::new(0.42, 0.0, 1.0, 1.0);
    pub const EASE_OUT: Cubic = Cubic::new(0.0, 0.0, 0.58, 1.0);
    pub const EASE_IN_OUT: Cubic = Cubic::new(0.42, 0.0, 0.58, 1.0);
    pub const FAST_OUT_SLOW_IN: Cubic = Cubic::new(0.4, 0.0, 0.2, 1.0);
}

impl Curve for Easing {
    fn transform_internal(&self, t: f32) -> f32 {
        match self {
            Easing::Linear => t,
            Easing::Ease => Self::EASE.transform_internal(t),
            Easing::EaseIn => Self::EASE_IN.transform_internal(t),
            Easing::EaseOut => Self::EASE_OUT.transform_internal(t),
            Easing::EaseInOut => Self::EASE_IN_OUT.transform_internal(t),
            Easing::FastOutSlowIn => Self::FAST_OUT_SLOW_IN.transform_internal(t),
            Easing::Decelerate => 1.0 - (1.0 - t) * (1.0 - t),
        }
    }
}

/// Holds at 0 until `begin`, runs `curve` over `begin..end`, then holds at 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval<C = Linear> {
    pub begin: f32,
    pub end: f32,
    pub curve: C,
}

impl<C: Curve> Interval<C> {
    pub const fn new(begin: f32, end: f32, curve: C) -> Self {
        Self { begin, end, curve }
    }
}

impl<C: Curve> Curve for Interval<C> {
    fn transform_internal(&self, t: f32) -> f32 {
        let span = self.end - self.begin;
        if span <= 0.0 {
            return if t < self.begin { 0.0 } else { 1.0 };
        }
        let local = ((t - self.begin) / span).clamp(0.0, 1.0);
        if local == 0.0 || local == 1.0 {
            return local;
        }
        self.curve.transform(local)
    }
}

/// Jumps from 0 to 1 at `threshold`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold(pub f32);

impl Curve for Threshold {
    fn transform_internal(&self, t: f32) -> f32 {
        if t < self.0 {
            0.0
        } else {
            1.0
        }
    }
}

/// The curve run backwards: `1 - curve(1 - t)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flipped<C>(pub C);

impl<C: Curve> Curve for Flipped<C> {
    fn transform_internal(&self, t: f32) -> f32 {
        1.0 - self.0.transform(1.0 - t)
    }
}
