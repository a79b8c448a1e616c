//! Animation controller
//!
//! Holds a progress value within `[lower, upper]` (default `[0, 1]`) and
//! drives it with a [`Simulation`] ticked once per frame. Value listeners
//! fire after every value change; status listeners fire after every status
//! transition. Both run synchronously, in registration order, with no
//! controller borrow held, so they may start another drive.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::animation::{Animation, AnimationStatus};
use crate::curves::{Curve, Linear};
use crate::error::{AnimationError, Result};
use crate::simulation::{InterpolationSimulation, Simulation, SpringConfig, SpringSimulation, Tolerance};
use crate::ticker::{Ticker, TickerFuture, TickerProvider};

/// Settle distance for flings; targets sit this far past the bound
const FLING_TOLERANCE: Tolerance = Tolerance::new(0.01, f32::INFINITY);

/// Identifies a registered listener for removal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Forward,
    Reverse,
}

struct ControllerState {
    value: f32,
    status: AnimationStatus,
    last_reported_status: AnimationStatus,
    direction: Direction,
    lower: f32,
    upper: f32,
    duration: Option<Duration>,
    reverse_duration: Option<Duration>,
    simulation: Option<Box<dyn Simulation>>,
    last_elapsed: Option<Duration>,
    disposed: bool,
}

impl ControllerState {
    fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.lower, self.upper)
    }

    fn settled_status(&self) -> AnimationStatus {
        match self.direction {
            Direction::Forward => AnimationStatus::Completed,
            Direction::Reverse => AnimationStatus::Dismissed,
        }
    }

    fn running_status(&self) -> AnimationStatus {
        match self.direction {
            Direction::Forward => AnimationStatus::Forward,
            Direction::Reverse => AnimationStatus::Reverse,
        }
    }
}

type ValueListener = Rc<dyn Fn(f32)>;
type StatusListener = Rc<dyn Fn(AnimationStatus)>;

struct ControllerInner {
    state: RefCell<ControllerState>,
    ticker: RefCell<Option<Rc<Ticker>>>,
    value_listeners: RefCell<Vec<(ListenerId, ValueListener)>>,
    status_listeners: RefCell<Vec<(ListenerId, StatusListener)>>,
    next_listener_id: Cell<u64>,
    label: String,
}

/// Builder for [`AnimationController`]
#[derive(Clone, Debug, Default)]
pub struct AnimationControllerBuilder {
    duration: Option<Duration>,
    reverse_duration: Option<Duration>,
    lower: Option<f32>,
    upper: Option<f32>,
    value: Option<f32>,
    debug_label: Option<String>,
}

impl AnimationControllerBuilder {
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn duration_ms(self, ms: u32) -> Self {
        self.duration(Duration::from_millis(u64::from(ms)))
    }

    /// Duration used by `reverse()`; falls back to `duration`
    pub fn reverse_duration(mut self, duration: Duration) -> Self {
        self.reverse_duration = Some(duration);
        self
    }

    pub fn bounds(mut self, lower: f32, upper: f32) -> Self {
        self.lower = Some(lower);
        self.upper = Some(upper);
        self
    }

    /// Initial value; defaults to the lower bound
    pub fn value(mut self, value: f32) -> Self {
        self.value = Some(value);
        self
    }

    pub fn debug_label(mut self, label: impl Into<String>) -> Self {
        self.debug_label = Some(label.into());
        self
    }

    pub fn build(self, provider: &impl TickerProvider) -> Result<AnimationController> {
        let lower = self.lower.unwrap_or(0.0);
        let upper = self.upper.unwrap_or(1.0);
        if lower > upper || lower.is_nan() || upper.is_nan() {
            return Err(AnimationError::InvalidBounds { lower, upper });
        }
        let value = self.value.unwrap_or(lower).clamp(lower, upper);
        let status = if value == lower {
            AnimationStatus::Dismissed
        } else if value == upper {
            AnimationStatus::Completed
        } else {
            AnimationStatus::Idle
        };

        let mut ticker_error = None;
        let inner = Rc::new_cyclic(|weak: &Weak<ControllerInner>| {
            let weak = weak.clone();
            let on_tick = Box::new(move |elapsed: Duration| {
                if let Some(inner) = weak.upgrade() {
                    AnimationController { inner }.tick(elapsed);
                }
            });
            let ticker = match provider.create_ticker(on_tick) {
                Ok(ticker) => Some(Rc::new(ticker)),
                Err(err) => {
                    ticker_error = Some(err);
                    None
                }
            };
            ControllerInner {
                state: RefCell::new(ControllerState {
                    value,
                    status,
                    last_reported_status: status,
                    direction: Direction::Forward,
                    lower,
                    upper,
                    duration: self.duration,
                    reverse_duration: self.reverse_duration,
                    simulation: None,
                    last_elapsed: None,
                    disposed: false,
                }),
                ticker: RefCell::new(ticker),
                value_listeners: RefCell::new(Vec::new()),
                status_listeners: RefCell::new(Vec::new()),
                next_listener_id: Cell::new(0),
                label: self
                    .debug_label
                    .unwrap_or_else(|| "AnimationController".to_string()),
            }
        });
        if let Some(err) = ticker_error {
            return Err(err);
        }

        tracing::trace!("{}: created at {} ({:?})", inner.label, value, status);
        Ok(AnimationController { inner })
    }
}

/// Drives a value between two bounds over time
///
/// Cloning yields another handle to the same controller.
#[derive(Clone)]
pub struct AnimationController {
    inner: Rc<ControllerInner>,
}

impl AnimationController {
    pub fn builder() -> AnimationControllerBuilder {
        AnimationControllerBuilder::default()
    }

    /// Controller over `[0, 1]` starting at 0
    pub fn new(provider: &impl TickerProvider, duration: Duration) -> Result<Self> {
        Self::builder().duration(duration).build(provider)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn value(&self) -> f32 {
        self.inner.state.borrow().value
    }

    pub fn status(&self) -> AnimationStatus {
        self.inner.state.borrow().status
    }

    pub fn lower_bound(&self) -> f32 {
        self.inner.state.borrow().lower
    }

    pub fn upper_bound(&self) -> f32 {
        self.inner.state.borrow().upper
    }

    pub fn duration(&self) -> Option<Duration> {
        self.inner.state.borrow().duration
    }

    pub fn set_duration(&self, duration: Option<Duration>) {
        self.inner.state.borrow_mut().duration = duration;
    }

    pub fn reverse_duration(&self) -> Option<Duration> {
        self.inner.state.borrow().reverse_duration
    }

    pub fn set_reverse_duration(&self, duration: Option<Duration>) {
        self.inner.state.borrow_mut().reverse_duration = duration;
    }

    /// Rate of change in units per second; zero when not animating
    pub fn velocity(&self) -> f32 {
        if !self.is_animating() {
            return 0.0;
        }
        let state = self.inner.state.borrow();
        match (&state.simulation, state.last_elapsed) {
            (Some(simulation), Some(elapsed)) => simulation.dx(elapsed.as_secs_f32()),
            _ => 0.0,
        }
    }

    /// A drive is in progress and the ticker is running
    pub fn is_animating(&self) -> bool {
        self.ticker().map(|t| t.is_active()).unwrap_or(false)
    }

    pub fn is_completed(&self) -> bool {
        self.status() == AnimationStatus::Completed
    }

    pub fn is_dismissed(&self) -> bool {
        self.status() == AnimationStatus::Dismissed
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.borrow().disposed
    }

    pub fn debug_label(&self) -> &str {
        &self.inner.label
    }

    // =========================================================================
    // Drives
    // =========================================================================

    /// Animate toward the upper bound, optionally starting from `from`
    pub fn forward(&self, from: Option<f32>) -> Result<TickerFuture> {
        self.ensure_alive()?;
        if let Some(from) = from {
            self.jump_to(from);
        }
        self.inner.state.borrow_mut().direction = Direction::Forward;
        let target = self.upper_bound();
        self.animate_to_internal(target, None, Rc::new(Linear))
    }

    /// Animate toward the lower bound, optionally starting from `from`
    pub fn reverse(&self, from: Option<f32>) -> Result<TickerFuture> {
        self.ensure_alive()?;
        if let Some(from) = from {
            self.jump_to(from);
        }
        self.inner.state.borrow_mut().direction = Direction::Reverse;
        let target = self.lower_bound();
        self.animate_to_internal(target, None, Rc::new(Linear))
    }

    /// Animate forward to `target`
    ///
    /// Without an explicit duration the configured one is scaled by the
    /// fraction of the range left to cover.
    pub fn animate_to(&self, target: f32, duration: Option<Duration>) -> Result<TickerFuture> {
        self.animate_to_with_curve(target, duration, Rc::new(Linear))
    }

    pub fn animate_to_with_curve(
        &self,
        target: f32,
        duration: Option<Duration>,
        curve: Rc<dyn Curve>,
    ) -> Result<TickerFuture> {
        self.ensure_alive()?;
        self.inner.state.borrow_mut().direction = Direction::Forward;
        self.animate_to_internal(target, duration, curve)
    }

    /// Animate in the reverse direction to `target`
    pub fn animate_back(&self, target: f32, duration: Option<Duration>) -> Result<TickerFuture> {
        self.ensure_alive()?;
        self.inner.state.borrow_mut().direction = Direction::Reverse;
        self.animate_to_internal(target, duration, Rc::new(Linear))
    }

    /// Drive with a critically damped spring from the current value
    ///
    /// Negative velocity heads for the lower bound and ends dismissed,
    /// otherwise the upper bound and ends completed.
    pub fn fling(&self, velocity: f32) -> Result<TickerFuture> {
        self.ensure_alive()?;
        let simulation = {
            let mut state = self.inner.state.borrow_mut();
            let target = if velocity < 0.0 {
                state.direction = Direction::Reverse;
                state.lower - FLING_TOLERANCE.distance
            } else {
                state.direction = Direction::Forward;
                state.upper + FLING_TOLERANCE.distance
            };
            SpringSimulation::new(
                SpringConfig::fling(),
                state.value,
                target,
                velocity,
                FLING_TOLERANCE,
            )
        };
        tracing::debug!("{}: fling at {}", self.inner.label, velocity);
        self.halt(true);
        Ok(self.start_simulation(Box::new(simulation)))
    }

    /// Freeze the value and cancel the running drive
    ///
    /// A running controller becomes idle; a settled one keeps its status.
    pub fn stop(&self) {
        let was_animating = self.is_animating();
        self.halt(true);
        if was_animating {
            self.inner.state.borrow_mut().status = AnimationStatus::Idle;
            self.check_status_changed();
        }
    }

    /// Stop and jump to the lower bound
    pub fn reset(&self) -> Result<()> {
        self.ensure_alive()?;
        self.halt(true);
        self.jump_to(self.lower_bound());
        Ok(())
    }

    /// Directly assign the value; rejected while a drive is running
    pub fn set_value(&self, value: f32) -> Result<()> {
        self.ensure_alive()?;
        if self.is_animating() {
            return Err(AnimationError::ValueWhileAnimating(self.inner.label.clone()));
        }
        self.jump_to(value);
        Ok(())
    }

    /// Release the ticker and all listeners
    ///
    /// Every later drive fails with [`AnimationError::Disposed`].
    pub fn dispose(&self) -> Result<()> {
        self.ensure_alive()?;
        {
            let mut state = self.inner.state.borrow_mut();
            state.disposed = true;
            state.simulation = None;
        }
        let ticker = self.inner.ticker.borrow_mut().take();
        let value_listeners = std::mem::take(&mut *self.inner.value_listeners.borrow_mut());
        let status_listeners = std::mem::take(&mut *self.inner.status_listeners.borrow_mut());
        drop(ticker);
        drop(value_listeners);
        drop(status_listeners);
        tracing::debug!("{}: disposed", self.inner.label);
        Ok(())
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    pub fn add_listener(&self, listener: impl Fn(f32) + 'static) -> ListenerId {
        let id = self.next_listener_id();
        self.inner
            .value_listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.value_listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(other, _)| *other != id);
        listeners.len() != before
    }

    pub fn add_status_listener(&self, listener: impl Fn(AnimationStatus) + 'static) -> ListenerId {
        let id = self.next_listener_id();
        self.inner
            .status_listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        id
    }

    pub fn remove_status_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.status_listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(other, _)| *other != id);
        listeners.len() != before
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_alive(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(AnimationError::Disposed(self.inner.label.clone()));
        }
        Ok(())
    }

    fn ticker(&self) -> Option<Rc<Ticker>> {
        self.inner.ticker.borrow().clone()
    }

    fn next_listener_id(&self) -> ListenerId {
        let id = self.inner.next_listener_id.get();
        self.inner.next_listener_id.set(id + 1);
        ListenerId(id)
    }

    /// Drop the simulation and stop the ticker without touching status
    fn halt(&self, canceled: bool) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.simulation = None;
            state.last_elapsed = None;
        }
        if let Some(ticker) = self.ticker() {
            ticker.stop(canceled);
        }
    }

    /// Stop, clamp and assign, deriving status from the new position
    fn jump_to(&self, value: f32) {
        self.halt(true);
        {
            let mut state = self.inner.state.borrow_mut();
            state.value = state.clamp(value);
            state.status = if state.value == state.lower {
                AnimationStatus::Dismissed
            } else if state.value == state.upper {
                AnimationStatus::Completed
            } else {
                AnimationStatus::Idle
            };
        }
        self.notify_listeners();
        self.check_status_changed();
    }

    fn animate_to_internal(
        &self,
        target: f32,
        duration: Option<Duration>,
        curve: Rc<dyn Curve>,
    ) -> Result<TickerFuture> {
        let (start, duration) = {
            let state = self.inner.state.borrow();
            let duration = match duration {
                Some(duration) => duration,
                None => {
                    let range = state.upper - state.lower;
                    let remaining = if range.is_finite() && range > 0.0 {
                        (target - state.value).abs() / range
                    } else {
                        1.0
                    };
                    let directed = match state.direction {
                        Direction::Reverse => state.reverse_duration.or(state.duration),
                        Direction::Forward => state.duration,
                    };
                    match directed {
                        Some(full) => full.mul_f32(remaining),
                        None => return Err(AnimationError::NoDuration(self.inner.label.clone())),
                    }
                }
            };
            (state.value, duration)
        };

        self.halt(true);

        if duration.is_zero() {
            let changed = {
                let mut state = self.inner.state.borrow_mut();
                let target = state.clamp(target);
                let changed = state.value != target;
                state.value = target;
                state.status = state.settled_status();
                changed
            };
            if changed {
                self.notify_listeners();
            }
            self.check_status_changed();
            return Ok(TickerFuture::complete());
        }

        let simulation = InterpolationSimulation::new(start, target, duration, curve);
        Ok(self.start_simulation(Box::new(simulation)))
    }

    fn start_simulation(&self, mut simulation: Box<dyn Simulation>) -> TickerFuture {
        {
            let mut state = self.inner.state.borrow_mut();
            state.value = state.clamp(simulation.x(0.0));
            state.simulation = Some(simulation);
            state.last_elapsed = Some(Duration::ZERO);
            state.status = state.running_status();
        }
        let future = match self.ticker() {
            Some(ticker) => ticker.start(),
            None => TickerFuture::complete(),
        };
        self.check_status_changed();
        future
    }

    fn tick(&self, elapsed: Duration) {
        let finished = {
            let mut state = self.inner.state.borrow_mut();
            if state.disposed {
                return;
            }
            state.last_elapsed = Some(elapsed);
            let seconds = elapsed.as_secs_f32();
            let Some(simulation) = state.simulation.as_mut() else {
                return;
            };
            let x = simulation.x(seconds);
            let done = simulation.is_done(seconds);
            state.value = state.clamp(x);
            if done {
                state.status = state.settled_status();
            }
            tracing::trace!("{}: tick {:?} -> {}", self.inner.label, elapsed, state.value);
            done
        };
        if finished {
            self.halt(false);
        }
        self.notify_listeners();
        self.check_status_changed();
    }

    fn notify_listeners(&self) {
        let snapshot: Vec<(ListenerId, ValueListener)> =
            self.inner.value_listeners.borrow().clone();
        for (id, listener) in snapshot {
            let value = {
                let state = self.inner.state.borrow();
                if state.disposed {
                    return;
                }
                state.value
            };
            let registered = self
                .inner
                .value_listeners
                .borrow()
                .iter()
                .any(|(other, _)| *other == id);
            if registered {
                listener(value);
            }
        }
    }

    fn check_status_changed(&self) {
        let status = {
            let mut state = self.inner.state.borrow_mut();
            if state.disposed || state.status == state.last_reported_status {
                return;
            }
            state.last_reported_status = state.status;
            state.status
        };
        tracing::debug!("{}: status {:?}", self.inner.label, status);

        let snapshot: Vec<(ListenerId, StatusListener)> =
            self.inner.status_listeners.borrow().clone();
        for (id, listener) in snapshot {
            if self.is_disposed() {
                return;
            }
            let registered = self
                .inner
                .status_listeners
                .borrow()
                .iter()
                .any(|(other, _)| *other == id);
            if registered {
                listener(status);
            }
        }
    }
}

impl Animation for AnimationController {
    fn value(&self) -> f32 {
        AnimationController::value(self)
    }

    fn status(&self) -> AnimationStatus {
        AnimationController::status(self)
    }
}

impl fmt::Debug for AnimationController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("AnimationController")
            .field("label", &self.inner.label)
            .field("value", &state.value)
            .field("status", &state.status)
            .field("disposed", &state.disposed)
            .finish()
    }
}
