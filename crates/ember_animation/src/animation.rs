//! Animation values and curved views of them

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::controller::{AnimationController, ListenerId};
use crate::curves::Curve;

/// Where an animation is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum AnimationStatus {
    /// Stopped between the bounds
    Idle,
    Forward,
    Reverse,
    /// Stopped at the upper bound
    Completed,
    /// Stopped at the lower bound
    #[default]
    Dismissed,
}

impl AnimationStatus {
    /// Moving in either direction
    pub fn is_running(self) -> bool {
        matches!(self, AnimationStatus::Forward | AnimationStatus::Reverse)
    }

    /// Resting at either bound
    pub fn is_settled(self) -> bool {
        matches!(self, AnimationStatus::Completed | AnimationStatus::Dismissed)
    }
}

/// A readable animated `f32` with a status
pub trait Animation {
    fn value(&self) -> f32;

    fn status(&self) -> AnimationStatus;
}

/// Applies a curve to a parent controller's value
///
/// With a `reverse_curve`, a run that started in reverse keeps using it until
/// the parent settles, so the curve never swaps mid-flight.
pub struct CurvedAnimation {
    parent: AnimationController,
    curve: Rc<dyn Curve>,
    reverse_curve: Option<Rc<dyn Curve>>,
    curve_direction: Rc<Cell<Option<AnimationStatus>>>,
    listener: ListenerId,
}

impl CurvedAnimation {
    pub fn new(parent: &AnimationController, curve: impl Curve + 'static) -> Self {
        Self::build(parent, Rc::new(curve), None)
    }

    pub fn with_reverse_curve(
        parent: &AnimationController,
        curve: impl Curve + 'static,
        reverse_curve: impl Curve + 'static,
    ) -> Self {
        Self::build(parent, Rc::new(curve), Some(Rc::new(reverse_curve)))
    }

    fn build(
        parent: &AnimationController,
        curve: Rc<dyn Curve>,
        reverse_curve: Option<Rc<dyn Curve>>,
    ) -> Self {
        let curve_direction = Rc::new(Cell::new(None));
        update_curve_direction(&curve_direction, parent.status());
        let direction = curve_direction.clone();
        let listener =
            parent.add_status_listener(move |status| update_curve_direction(&direction, status));
        Self {
            parent: parent.clone(),
            curve,
            reverse_curve,
            curve_direction,
            listener,
        }
    }

    pub fn parent(&self) -> &AnimationController {
        &self.parent
    }

    fn active_curve(&self) -> &Rc<dyn Curve> {
        let direction = self
            .curve_direction
            .get()
            .unwrap_or_else(|| self.parent.status());
        match &self.reverse_curve {
            Some(reverse) if direction == AnimationStatus::Reverse => reverse,
            _ => &self.curve,
        }
    }
}

fn update_curve_direction(direction: &Cell<Option<AnimationStatus>>, status: AnimationStatus) {
    match status {
        AnimationStatus::Forward | AnimationStatus::Reverse => {
            if direction.get().is_none() {
                direction.set(Some(status));
            }
        }
        AnimationStatus::Idle | AnimationStatus::Completed | AnimationStatus::Dismissed => {
            direction.set(None)
        }
    }
}

impl Animation for CurvedAnimation {
    fn value(&self) -> f32 {
        let t = self.parent.value();
        if t == 0.0 || t == 1.0 {
            return t;
        }
        self.active_curve().transform(t)
    }

    fn status(&self) -> AnimationStatus {
        self.parent.status()
    }
}

impl Drop for CurvedAnimation {
    fn drop(&mut self) {
        self.parent.remove_status_listener(self.listener);
    }
}

impl fmt::Debug for CurvedAnimation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurvedAnimation")
            .field("parent", &self.parent)
            .field("curve", &self.curve)
            .field("reverse_curve", &self.reverse_curve)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::{Easing, Linear};
    use ember_core::FrameScheduler;
    use std::time::Duration;

    #[test]
    fn test_curved_value_follows_curve() {
        let scheduler = FrameScheduler::new();
        let controller = AnimationController::new(&scheduler, Duration::from_millis(100)).unwrap();
        let curved = CurvedAnimation::new(&controller, Easing::EaseIn);

        controller.set_value(0.5).unwrap();
        assert!((curved.value() - Easing::EaseIn.transform(0.5)).abs() < 1e-6);
        controller.set_value(1.0).unwrap();
        assert_eq!(curved.value(), 1.0);
    }

    #[test]
    fn test_reverse_curve_sticks_until_settled() {
        let scheduler = FrameScheduler::new();
        let controller = AnimationController::builder()
            .duration(Duration::from_millis(100))
            .value(1.0)
            .build(&scheduler)
            .unwrap();
        let curved = CurvedAnimation::with_reverse_curve(&controller, Easing::EaseIn, Linear);

        controller.reverse(None).unwrap();
        scheduler.pump(Duration::ZERO);
        scheduler.pump(Duration::from_millis(50));
        assert!((curved.value() - 0.5).abs() < 1e-4);
        assert_eq!(curved.status(), AnimationStatus::Reverse);
    }

    #[test]
    fn test_drop_removes_status_listener() {
        let scheduler = FrameScheduler::new();
        let controller = AnimationController::new(&scheduler, Duration::from_millis(100)).unwrap();
        let curved = CurvedAnimation::new(&controller, Easing::Ease);
        let listener = curved.listener;
        drop(curved);
        assert!(!controller.remove_status_listener(listener));
    }
}
