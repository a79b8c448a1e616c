//! Tweens
//!
//! An [`Animatable`] maps progress to an output value. Tweens interpolate
//! between a begin and end value; curve tweens remap progress; `chain`
//! composes them so a tween can run on curved progress.

use std::fmt;

use ember_core::{Color, Offset, Size};

use crate::animation::{Animation, AnimationStatus};
use crate::curves::Curve;
use crate::values::Interpolate;

/// Maps a progress value to an output
pub trait Animatable {
    type Output;

    fn transform(&self, t: f32) -> Self::Output;

    /// Output at the animation's current value
    fn evaluate(&self, animation: &dyn Animation) -> Self::Output {
        self.transform(animation.value())
    }

    /// Feed `parent`'s output into this animatable
    fn chain<P>(self, parent: P) -> Chained<Self, P>
    where
        Self: Sized,
        P: Animatable<Output = f32>,
    {
        Chained { outer: self, inner: parent }
    }

    /// Bind to an animation so the output can be read directly
    fn animate<A>(self, parent: A) -> Animated<Self, A>
    where
        Self: Sized,
        A: Animation,
    {
        Animated {
            animatable: self,
            parent,
        }
    }
}

/// Linear interpolation between `begin` and `end`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tween<T> {
    pub begin: T,
    pub end: T,
}

impl<T: Interpolate> Tween<T> {
    pub fn new(begin: T, end: T) -> Self {
        Self { begin, end }
    }

    pub fn lerp(&self, t: f32) -> T {
        Interpolate::lerp(&self.begin, &self.end, t)
    }
}

impl<T: Interpolate> Animatable for Tween<T> {
    type Output = T;

    fn transform(&self, t: f32) -> T {
        if t == 0.0 {
            return self.begin.clone();
        }
        if t == 1.0 {
            return self.end.clone();
        }
        self.lerp(t)
    }
}

pub type ColorTween = Tween<Color>;
pub type OffsetTween = Tween<Offset>;
pub type SizeTween = Tween<Size>;

/// Applies a curve to progress
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurveTween<C> {
    pub curve: C,
}

impl<C: Curve> CurveTween<C> {
    pub fn new(curve: C) -> Self {
        Self { curve }
    }
}

impl<C: Curve> Animatable for CurveTween<C> {
    type Output = f32;

    fn transform(&self, t: f32) -> f32 {
        self.curve.transform(t)
    }
}

/// `outer.transform(inner.transform(t))`
#[derive(Clone, Copy, Debug)]
pub struct Chained<A, P> {
    outer: A,
    inner: P,
}

impl<A, P> Animatable for Chained<A, P>
where
    A: Animatable,
    P: Animatable<Output = f32>,
{
    type Output = A::Output;

    fn transform(&self, t: f32) -> A::Output {
        self.outer.transform(self.inner.transform(t))
    }
}

/// An animatable bound to a parent animation
pub struct Animated<T, A> {
    animatable: T,
    parent: A,
}

impl<T: Animatable, A: Animation> Animated<T, A> {
    pub fn value(&self) -> T::Output {
        self.animatable.transform(self.parent.value())
    }

    pub fn status(&self) -> AnimationStatus {
        self.parent.status()
    }

    pub fn parent(&self) -> &A {
        &self.parent
    }
}

impl<T: fmt::Debug, A: fmt::Debug> fmt::Debug for Animated<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animated")
            .field("animatable", &self.animatable)
            .field("parent", &self.parent)
            .finish()
    }
}
