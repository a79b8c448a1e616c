//! Swipe-to-dismiss
//!
//! A [`Dismissible`] turns drag gestures into a slide-out animation. Releasing
//! past the threshold, or flinging in the dismiss direction, commits: the
//! move animation completes, then a resize animation collapses the item and
//! `on_dismissed` fires. Anything else snaps back to rest.
//!
//! Phases:
//!
//! ```text
//! Idle --drag start--> Dragging --release--> Committing --> Resizing --> Dismissed
//!                          ^                     |
//!                          |                     v
//!                          +----drag start--- SnappingBack --> Idle
//! ```
//!
//! A drag that starts while the move animation is running picks up from the
//! animated position. Once the resize phase begins the item ignores input.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ember_animation::{
    Animatable, AnimationController, AnimationStatus, CurveTween, Easing, Interval, OffsetTween,
    Tween,
};
use ember_core::{Axis, Offset, SchedulerHandle, Size, TextDirection};
use rustc_hash::FxHashMap;

use crate::error::{Result, WidgetError};
use crate::gesture::{DragEndDetails, DragStartDetails, DragUpdateDetails};
use crate::keep_alive::KeepAlive;

/// Minimum release speed along the dismiss axis for a fling (px/s)
pub const MIN_FLING_VELOCITY: f32 = 700.0;

/// Main-axis speed must beat cross-axis speed by this much for a fling (px/s)
pub const MIN_FLING_VELOCITY_DELTA: f32 = 400.0;

/// Converts px/s fling speed into move-controller units per second
pub const FLING_VELOCITY_SCALE: f32 = 1.0 / 300.0;

/// Fraction of the extent a drag must pass to commit on release
pub const DEFAULT_DISMISS_THRESHOLD: f32 = 0.4;

pub const DEFAULT_MOVEMENT_DURATION_MS: u32 = 200;

pub const DEFAULT_RESIZE_DURATION_MS: u32 = 300;

/// Collapse runs over the last 60% of the resize timeline
const RESIZE_TIME_CURVE: Interval<Easing> = Interval::new(0.4, 1.0, Easing::Ease);

// ============================================================================
// Directions
// ============================================================================

/// Directions an item may be dismissed in
///
/// `StartToEnd`/`EndToStart` follow the reading direction, so under RTL a
/// `StartToEnd` swipe moves left.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DismissDirection {
    /// Up or down
    Vertical,
    /// Either way along the reading axis
    #[default]
    Horizontal,
    EndToStart,
    StartToEnd,
    Up,
    Down,
    /// Dragging disabled
    None,
}

impl DismissDirection {
    /// Dismisses along the horizontal axis
    pub fn is_horizontal(self) -> bool {
        matches!(
            self,
            DismissDirection::Horizontal | DismissDirection::EndToStart | DismissDirection::StartToEnd
        )
    }

    pub fn axis(self) -> Axis {
        if self.is_horizontal() {
            Axis::Horizontal
        } else {
            Axis::Vertical
        }
    }
}

/// Sign of `v`, with zero for zero
fn sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Whether release velocities qualify as a fling
///
/// `main` is along the dismiss axis, `cross` across it.
pub fn is_fling(main: f32, cross: f32) -> bool {
    main.abs() - cross.abs() >= MIN_FLING_VELOCITY_DELTA && main.abs() >= MIN_FLING_VELOCITY
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FlingKind {
    /// Toward the current dismiss direction
    Forward,
    /// Back toward rest
    Reverse,
}

// ============================================================================
// Configuration
// ============================================================================

/// Dismissible behavior settings
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DismissibleConfig {
    /// Allowed dismiss directions
    pub direction: DismissDirection,
    /// Per-direction commit thresholds; 1.0 or more disables that direction
    pub dismiss_thresholds: FxHashMap<DismissDirection, f32>,
    /// Full-extent duration for settle and snap-back animations
    pub movement_duration_ms: u32,
    /// Collapse duration after commit; `None` fires `on_dismissed` right away
    pub resize_duration_ms: Option<u32>,
    /// Cross-axis end position of the slide, as a fraction of the size
    pub cross_axis_end_offset: f32,
}

impl Default for DismissibleConfig {
    fn default() -> Self {
        Self {
            direction: DismissDirection::Horizontal,
            dismiss_thresholds: FxHashMap::default(),
            movement_duration_ms: DEFAULT_MOVEMENT_DURATION_MS,
            resize_duration_ms: Some(DEFAULT_RESIZE_DURATION_MS),
            cross_axis_end_offset: 0.0,
        }
    }
}

impl DismissibleConfig {
    pub fn new(direction: DismissDirection) -> Self {
        Self {
            direction,
            ..Self::default()
        }
    }

    /// Swipe toward the reading start, the common list-row gesture
    pub fn end_to_start() -> Self {
        Self::new(DismissDirection::EndToStart)
    }

    pub fn vertical() -> Self {
        Self::new(DismissDirection::Vertical)
    }

    pub fn threshold(mut self, direction: DismissDirection, threshold: f32) -> Self {
        self.dismiss_thresholds.insert(direction, threshold);
        self
    }

    pub fn movement_duration_ms(mut self, ms: u32) -> Self {
        self.movement_duration_ms = ms;
        self
    }

    pub fn resize_duration_ms(mut self, ms: Option<u32>) -> Self {
        self.resize_duration_ms = ms;
        self
    }

    pub fn cross_axis_end_offset(mut self, offset: f32) -> Self {
        self.cross_axis_end_offset = offset;
        self
    }

    /// Threshold in effect for `direction`
    pub fn threshold_for(&self, direction: DismissDirection) -> f32 {
        self.dismiss_thresholds
            .get(&direction)
            .copied()
            .unwrap_or(DEFAULT_DISMISS_THRESHOLD)
    }

    pub fn validate(&self) -> Result<()> {
        for (&direction, &threshold) in &self.dismiss_thresholds {
            if threshold.is_nan() || threshold < 0.0 {
                return Err(WidgetError::InvalidThreshold {
                    direction,
                    threshold,
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Outputs
// ============================================================================

/// Reported on every change of the move animation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DismissUpdateDetails {
    pub direction: DismissDirection,
    /// Progress is past the threshold for `direction`
    pub reached: bool,
    /// `reached` as of the previous update
    pub previous_reached: bool,
    /// Move animation value, 0 at rest and 1 fully off-screen
    pub progress: f32,
}

/// Where the item is in its dismiss cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum DismissPhase {
    #[default]
    Idle,
    Dragging,
    SnappingBack,
    Committing,
    Resizing,
    Dismissed,
}

impl DismissPhase {
    pub fn is_active(&self) -> bool {
        !matches!(self, DismissPhase::Idle)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ResizePhase {
    #[default]
    None,
    Resizing,
    Done,
}

/// What to render this frame
#[derive(Clone, Debug, PartialEq)]
pub enum DismissibleFrame<B> {
    /// Child slid by `slide` (fraction of size) over the background
    Sliding {
        slide: Offset,
        /// `slide` in pixels
        translation: Offset,
        background: Option<B>,
    },
    /// Background collapsing along `axis` to `size_factor` of `size`
    Collapsing {
        size_factor: f32,
        axis: Axis,
        size: Size,
        background: Option<B>,
    },
}

type DismissedCallback = Rc<dyn Fn(DismissDirection)>;
type ResizeCallback = Rc<dyn Fn()>;
type UpdateCallback = Rc<dyn Fn(DismissUpdateDetails)>;
type ConfirmCallback = Rc<dyn Fn(DismissDirection) -> bool>;

#[derive(Default)]
struct Callbacks {
    on_dismissed: Option<DismissedCallback>,
    on_resize: Option<ResizeCallback>,
    on_update: Option<UpdateCallback>,
    confirm_dismiss: Option<ConfirmCallback>,
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Dismissible`]
///
/// `B` is the host's background content, handed back in frames.
pub struct DismissibleBuilder<B> {
    config: DismissibleConfig,
    background: Option<B>,
    secondary_background: Option<B>,
    text_direction: TextDirection,
    size: Size,
    callbacks: Callbacks,
    debug_label: Option<String>,
}

impl<B: Clone + 'static> DismissibleBuilder<B> {
    pub fn config(mut self, config: DismissibleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn background(mut self, background: B) -> Self {
        self.background = Some(background);
        self
    }

    /// Shown instead of `background` for `EndToStart` and `Up` swipes
    pub fn secondary_background(mut self, background: B) -> Self {
        self.secondary_background = Some(background);
        self
    }

    pub fn text_direction(mut self, text_direction: TextDirection) -> Self {
        self.text_direction = text_direction;
        self
    }

    pub fn size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    pub fn on_dismissed(mut self, callback: impl Fn(DismissDirection) + 'static) -> Self {
        self.callbacks.on_dismissed = Some(Rc::new(callback));
        self
    }

    pub fn on_resize(mut self, callback: impl Fn() + 'static) -> Self {
        self.callbacks.on_resize = Some(Rc::new(callback));
        self
    }

    pub fn on_update(mut self, callback: impl Fn(DismissUpdateDetails) + 'static) -> Self {
        self.callbacks.on_update = Some(Rc::new(callback));
        self
    }

    /// Asked when the item has slid out; returning false snaps it back
    pub fn confirm_dismiss(mut self, callback: impl Fn(DismissDirection) -> bool + 'static) -> Self {
        self.callbacks.confirm_dismiss = Some(Rc::new(callback));
        self
    }

    pub fn debug_label(mut self, label: impl Into<String>) -> Self {
        self.debug_label = Some(label.into());
        self
    }

    pub fn build(self, scheduler: &SchedulerHandle) -> Result<Dismissible<B>> {
        if self.secondary_background.is_some() && self.background.is_none() {
            return Err(WidgetError::SecondaryBackgroundWithoutPrimary);
        }
        self.config.validate()?;

        let label = self
            .debug_label
            .unwrap_or_else(|| "Dismissible".to_string());
        let move_controller = AnimationController::builder()
            .duration_ms(self.config.movement_duration_ms)
            .debug_label(format!("{label} move"))
            .build(scheduler)?;

        let inner = Rc::new(DismissibleInner {
            config: self.config,
            background: self.background,
            secondary_background: self.secondary_background,
            callbacks: self.callbacks,
            scheduler: scheduler.clone(),
            label,
            move_controller,
            resize_controller: RefCell::new(None),
            state: RefCell::new(DragState {
                drag_extent: 0.0,
                drag_underway: false,
                size: self.size,
                text_direction: self.text_direction,
                move_end: Offset::ZERO,
                threshold_reached: false,
                size_prior_to_collapse: None,
                dismissed: false,
            }),
        });

        let weak = Rc::downgrade(&inner);
        inner.move_controller.add_listener(move |_| {
            if let Some(inner) = Weak::upgrade(&weak) {
                Dismissible { inner }.handle_move_value_changed();
            }
        });
        let weak = Rc::downgrade(&inner);
        inner.move_controller.add_status_listener(move |status| {
            if let Some(inner) = Weak::upgrade(&weak) {
                Dismissible { inner }.handle_move_status_changed(status);
            }
        });

        let dismissible = Dismissible { inner };
        dismissible.update_move_animation();
        Ok(dismissible)
    }
}

// ============================================================================
// State
// ============================================================================

struct DragState {
    /// Signed pixels dragged along the dismiss axis
    drag_extent: f32,
    drag_underway: bool,
    size: Size,
    text_direction: TextDirection,
    /// Slide target as a fraction of the size
    move_end: Offset,
    threshold_reached: bool,
    size_prior_to_collapse: Option<Size>,
    /// `on_dismissed` has fired
    dismissed: bool,
}

struct DismissibleInner<B> {
    config: DismissibleConfig,
    background: Option<B>,
    secondary_background: Option<B>,
    callbacks: Callbacks,
    scheduler: SchedulerHandle,
    label: String,
    move_controller: AnimationController,
    resize_controller: RefCell<Option<AnimationController>>,
    state: RefCell<DragState>,
}

/// Swipe-to-dismiss state machine
///
/// Cloning yields another handle to the same item.
pub struct Dismissible<B> {
    inner: Rc<DismissibleInner<B>>,
}

impl<B> Clone for Dismissible<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<B: Clone + 'static> Dismissible<B> {
    pub fn builder() -> DismissibleBuilder<B> {
        DismissibleBuilder {
            config: DismissibleConfig::default(),
            background: None,
            secondary_background: None,
            text_direction: TextDirection::Ltr,
            size: Size::ZERO,
            callbacks: Callbacks::default(),
            debug_label: None,
        }
    }

    // =========================================================================
    // Layout inputs
    // =========================================================================

    /// Record the laid-out size of the item
    pub fn set_size(&self, size: Size) {
        self.inner.state.borrow_mut().size = size;
    }

    pub fn set_text_direction(&self, text_direction: TextDirection) {
        self.inner.state.borrow_mut().text_direction = text_direction;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn config(&self) -> &DismissibleConfig {
        &self.inner.config
    }

    pub fn drag_extent(&self) -> f32 {
        self.inner.state.borrow().drag_extent
    }

    /// Move animation value: 0 at rest, 1 fully slid out
    pub fn progress(&self) -> f32 {
        self.inner.move_controller.value()
    }

    pub fn move_controller(&self) -> &AnimationController {
        &self.inner.move_controller
    }

    /// Direction of the current drag extent, `None` at rest
    pub fn dismiss_direction(&self) -> DismissDirection {
        self.extent_to_direction(self.drag_extent())
    }

    /// Dragging or animating
    pub fn is_active(&self) -> bool {
        self.inner.state.borrow().drag_underway || self.inner.move_controller.is_animating()
    }

    pub fn resize_phase(&self) -> ResizePhase {
        let resize = self.inner.resize_controller.borrow().clone();
        match resize {
            None => ResizePhase::None,
            Some(controller) if controller.is_completed() => ResizePhase::Done,
            Some(_) => ResizePhase::Resizing,
        }
    }

    pub fn phase(&self) -> DismissPhase {
        let (dismissed, dragging) = {
            let state = self.inner.state.borrow();
            (state.dismissed, state.drag_underway)
        };
        if dismissed {
            return DismissPhase::Dismissed;
        }
        match self.resize_phase() {
            ResizePhase::Done => return DismissPhase::Dismissed,
            ResizePhase::Resizing => return DismissPhase::Resizing,
            ResizePhase::None => {}
        }
        if dragging {
            return DismissPhase::Dragging;
        }
        let controller = &self.inner.move_controller;
        if !controller.is_animating() {
            return DismissPhase::Idle;
        }
        match controller.status() {
            AnimationStatus::Forward => DismissPhase::Committing,
            AnimationStatus::Reverse => DismissPhase::SnappingBack,
            _ => DismissPhase::Idle,
        }
    }

    /// Collapse factor while resizing: 1.0 at the start, 0.0 when done
    pub fn resize_factor(&self) -> Option<f32> {
        let resize = self.inner.resize_controller.borrow().clone()?;
        let tween = Tween::new(1.0_f32, 0.0).chain(CurveTween::new(RESIZE_TIME_CURVE));
        Some(tween.evaluate(&resize))
    }

    /// Render the current state
    ///
    /// # Panics
    ///
    /// Panics once `on_dismissed` has fired: the host must have removed the
    /// item from its data source by then.
    pub fn frame(&self) -> DismissibleFrame<B> {
        let (dismissed, move_end, size, size_prior) = {
            let state = self.inner.state.borrow();
            (
                state.dismissed,
                state.move_end,
                state.size,
                state.size_prior_to_collapse,
            )
        };
        if dismissed {
            panic!(
                "{} was rendered after on_dismissed fired; it must be removed from the host's \
                 data source in the on_dismissed callback",
                self.inner.label
            );
        }

        let background = self.current_background();
        if let Some(size_factor) = self.resize_factor() {
            return DismissibleFrame::Collapsing {
                size_factor,
                axis: self.inner.config.direction.axis().flip(),
                size: size_prior.unwrap_or(size),
                background,
            };
        }

        let slide = OffsetTween::new(Offset::ZERO, move_end).evaluate(&self.inner.move_controller);
        let translation = Offset::new(slide.x * size.width, slide.y * size.height);
        let background = if self.inner.move_controller.is_dismissed() {
            None
        } else {
            background
        };
        DismissibleFrame::Sliding {
            slide,
            translation,
            background,
        }
    }

    // =========================================================================
    // Gestures
    // =========================================================================

    pub fn handle_drag_start(&self, _details: DragStartDetails) -> Result<()> {
        if !self.accepts_input() {
            return Ok(());
        }
        let controller = &self.inner.move_controller;
        self.inner.state.borrow_mut().drag_underway = true;
        if controller.is_animating() {
            let extent = self.overall_drag_axis_extent()?;
            let value = controller.value();
            {
                let mut state = self.inner.state.borrow_mut();
                state.drag_extent = value * extent * sign(state.drag_extent);
            }
            controller.stop();
            tracing::debug!("{}: drag caught animation at {}", self.inner.label, value);
        } else {
            self.inner.state.borrow_mut().drag_extent = 0.0;
            controller.set_value(0.0)?;
        }
        self.update_move_animation();
        Ok(())
    }

    pub fn handle_drag_update(&self, details: DragUpdateDetails) -> Result<()> {
        if !self.accepts_input() {
            return Ok(());
        }
        let controller = &self.inner.move_controller;
        if !self.is_active() {
            tracing::warn!("{}: drag update without an active drag", self.inner.label);
            return Ok(());
        }
        if controller.is_animating() {
            return Ok(());
        }

        let direction = self.inner.config.direction;
        let delta = details.primary_delta(direction.axis());
        let (old_extent, new_extent) = {
            let mut state = self.inner.state.borrow_mut();
            let old = state.drag_extent;
            let proposed = old + delta;
            let rtl = state.text_direction.is_rtl();
            state.drag_extent = match direction {
                DismissDirection::Horizontal | DismissDirection::Vertical => proposed,
                DismissDirection::Up => proposed.min(0.0),
                DismissDirection::Down => proposed.max(0.0),
                DismissDirection::EndToStart if rtl => proposed.max(0.0),
                DismissDirection::EndToStart => proposed.min(0.0),
                DismissDirection::StartToEnd if rtl => proposed.min(0.0),
                DismissDirection::StartToEnd => proposed.max(0.0),
                DismissDirection::None => 0.0,
            };
            (old, state.drag_extent)
        };

        if sign(old_extent) != sign(new_extent) {
            self.update_move_animation();
        }
        let extent = self.overall_drag_axis_extent()?;
        controller.set_value(new_extent.abs() / extent)?;
        Ok(())
    }

    pub fn handle_drag_end(&self, details: DragEndDetails) -> Result<()> {
        if !self.accepts_input() {
            return Ok(());
        }
        let controller = &self.inner.move_controller;
        if !self.is_active() || controller.is_animating() {
            return Ok(());
        }
        self.inner.state.borrow_mut().drag_underway = false;

        if controller.is_completed() {
            return self.handle_move_completed();
        }

        let axis = self.inner.config.direction.axis();
        let fling_velocity = details.primary_velocity(axis);
        match self.describe_fling(details.velocity.pixels_per_second) {
            Some(FlingKind::Forward) => {
                if self.inner.config.threshold_for(self.dismiss_direction()) >= 1.0 {
                    controller.reverse(None)?;
                } else {
                    self.inner.state.borrow_mut().drag_extent = sign(fling_velocity);
                    tracing::debug!("{}: fling commit at {}", self.inner.label, fling_velocity);
                    controller.fling(fling_velocity.abs() * FLING_VELOCITY_SCALE)?;
                }
            }
            Some(FlingKind::Reverse) => {
                // Extent keeps its side so a catching drag resumes from there
                controller.fling(-fling_velocity.abs() * FLING_VELOCITY_SCALE)?;
            }
            None => {
                if !controller.is_dismissed() {
                    let threshold = self.inner.config.threshold_for(self.dismiss_direction());
                    if controller.value() > threshold {
                        controller.forward(None)?;
                    } else {
                        controller.reverse(None)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Stop all animations and release the controllers
    pub fn dispose(&self) -> Result<()> {
        self.inner.move_controller.dispose()?;
        let resize = self.inner.resize_controller.borrow_mut().take();
        if let Some(resize) = resize {
            resize.dispose()?;
        }
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn accepts_input(&self) -> bool {
        if self.inner.config.direction == DismissDirection::None {
            return false;
        }
        if self.inner.resize_controller.borrow().is_some() || self.inner.state.borrow().dismissed {
            tracing::trace!("{}: ignoring drag after commit", self.inner.label);
            return false;
        }
        true
    }

    fn extent_to_direction(&self, extent: f32) -> DismissDirection {
        if extent == 0.0 {
            return DismissDirection::None;
        }
        if self.inner.config.direction.is_horizontal() {
            let toward_end = match self.inner.state.borrow().text_direction {
                TextDirection::Rtl => extent < 0.0,
                TextDirection::Ltr => extent > 0.0,
            };
            if toward_end {
                DismissDirection::StartToEnd
            } else {
                DismissDirection::EndToStart
            }
        } else if extent > 0.0 {
            DismissDirection::Down
        } else {
            DismissDirection::Up
        }
    }

    fn overall_drag_axis_extent(&self) -> Result<f32> {
        let size = self.inner.state.borrow().size;
        let extent = size.extent(self.inner.config.direction.axis());
        if extent > 0.0 {
            Ok(extent)
        } else {
            Err(WidgetError::MissingExtent)
        }
    }

    fn describe_fling(&self, velocity: Offset) -> Option<FlingKind> {
        if self.drag_extent() == 0.0 {
            // No extent means no direction to compare the fling against
            return None;
        }
        let axis = self.inner.config.direction.axis();
        let main = velocity.along(axis);
        let cross = velocity.across(axis);
        if !is_fling(main, cross) {
            return None;
        }
        if self.extent_to_direction(main) == self.dismiss_direction() {
            Some(FlingKind::Forward)
        } else {
            Some(FlingKind::Reverse)
        }
    }

    fn update_move_animation(&self) {
        let horizontal = self.inner.config.direction.is_horizontal();
        let cross = self.inner.config.cross_axis_end_offset;
        let mut state = self.inner.state.borrow_mut();
        let end = sign(state.drag_extent);
        state.move_end = if horizontal {
            Offset::new(end, cross)
        } else {
            Offset::new(cross, end)
        };
    }

    fn current_background(&self) -> Option<B> {
        if self.inner.secondary_background.is_some() {
            let direction = self.dismiss_direction();
            if matches!(direction, DismissDirection::EndToStart | DismissDirection::Up) {
                return self.inner.secondary_background.clone();
            }
        }
        self.inner.background.clone()
    }

    fn handle_move_value_changed(&self) {
        let Some(on_update) = self.inner.callbacks.on_update.clone() else {
            return;
        };
        let direction = self.dismiss_direction();
        let progress = self.inner.move_controller.value();
        let threshold = self.inner.config.threshold_for(direction);
        let (reached, previous_reached) = {
            let mut state = self.inner.state.borrow_mut();
            let previous = state.threshold_reached;
            state.threshold_reached = progress > threshold;
            (state.threshold_reached, previous)
        };
        on_update(DismissUpdateDetails {
            direction,
            reached,
            previous_reached,
            progress,
        });
    }

    fn handle_move_status_changed(&self, status: AnimationStatus) {
        let dragging = self.inner.state.borrow().drag_underway;
        if dragging {
            return;
        }
        match status {
            AnimationStatus::Completed => {
                if let Err(err) = self.handle_move_completed() {
                    tracing::warn!("{}: failed to finish dismiss: {}", self.inner.label, err);
                }
            }
            AnimationStatus::Dismissed => {
                {
                    let mut state = self.inner.state.borrow_mut();
                    state.drag_extent = 0.0;
                    state.threshold_reached = false;
                }
                self.update_move_animation();
                tracing::trace!("{}: settled at rest", self.inner.label);
            }
            _ => {}
        }
    }

    fn handle_move_completed(&self) -> Result<()> {
        let direction = self.dismiss_direction();
        if self.inner.config.threshold_for(direction) >= 1.0 {
            self.inner.move_controller.reverse(None)?;
            return Ok(());
        }
        let confirmed = match self.inner.callbacks.confirm_dismiss.clone() {
            Some(confirm) => confirm(direction),
            None => true,
        };
        if confirmed {
            self.start_resize_animation(direction)
        } else {
            tracing::debug!("{}: dismiss of {:?} declined", self.inner.label, direction);
            self.inner.move_controller.reverse(None)?;
            Ok(())
        }
    }

    fn start_resize_animation(&self, direction: DismissDirection) -> Result<()> {
        if self.inner.resize_controller.borrow().is_some() {
            tracing::warn!("{}: resize already started", self.inner.label);
            return Ok(());
        }

        let Some(duration_ms) = self.inner.config.resize_duration_ms else {
            tracing::debug!("{}: dismissed {:?} without resize", self.inner.label, direction);
            self.fire_dismissed(direction);
            return Ok(());
        };

        let resize = AnimationController::builder()
            .duration_ms(duration_ms)
            .debug_label(format!("{} resize", self.inner.label))
            .build(&self.inner.scheduler)?;
        let weak = Rc::downgrade(&self.inner);
        resize.add_listener(move |_| {
            if let Some(inner) = Weak::upgrade(&weak) {
                Dismissible { inner }.handle_resize_progress(direction);
            }
        });
        {
            let mut state = self.inner.state.borrow_mut();
            state.size_prior_to_collapse = Some(state.size);
        }
        *self.inner.resize_controller.borrow_mut() = Some(resize.clone());
        tracing::debug!("{}: resize started for {:?}", self.inner.label, direction);
        resize.forward(None)?;
        Ok(())
    }

    fn handle_resize_progress(&self, direction: DismissDirection) {
        let resize = self.inner.resize_controller.borrow().clone();
        let Some(resize) = resize else {
            return;
        };
        if resize.is_completed() {
            self.fire_dismissed(direction);
        } else if let Some(on_resize) = self.inner.callbacks.on_resize.clone() {
            on_resize();
        }
    }

    fn fire_dismissed(&self, direction: DismissDirection) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.dismissed {
                return;
            }
            state.dismissed = true;
        }
        tracing::debug!("{}: dismissed {:?}", self.inner.label, direction);
        if let Some(on_dismissed) = self.inner.callbacks.on_dismissed.clone() {
            on_dismissed(direction);
        }
    }
}

impl<B: Clone + 'static> KeepAlive for Dismissible<B> {
    fn wants_keep_alive(&self) -> bool {
        let resizing = self
            .inner
            .resize_controller
            .borrow()
            .as_ref()
            .map(|c| c.is_animating())
            .unwrap_or(false);
        self.inner.move_controller.is_animating() || resizing
    }
}

impl<B> fmt::Debug for Dismissible<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Dismissible")
            .field("label", &self.inner.label)
            .field("direction", &self.inner.config.direction)
            .field("drag_extent", &state.drag_extent)
            .field("drag_underway", &state.drag_underway)
            .field("progress", &self.inner.move_controller.value())
            .field("dismissed", &state.dismissed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::Velocity;
    use ember_core::FrameScheduler;
    use std::cell::Cell;
    use std::time::Duration;

    const ROW: Size = Size::new(400.0, 60.0);

    fn row(scheduler: &FrameScheduler, config: DismissibleConfig) -> Dismissible<&'static str> {
        Dismissible::builder()
            .config(config)
            .background("primary")
            .size(ROW)
            .build(&scheduler.handle())
            .unwrap()
    }

    fn drag<B: Clone + 'static>(d: &Dismissible<B>, dx: f32) {
        d.handle_drag_start(DragStartDetails::default()).unwrap();
        d.handle_drag_update(DragUpdateDetails::new(Offset::new(dx, 0.0)))
            .unwrap();
    }

    #[test]
    fn test_fling_classification() {
        assert!(is_fling(800.0, 100.0));
        assert!(!is_fling(750.0, 500.0));
        assert!(!is_fling(650.0, 0.0));
        assert!(is_fling(-800.0, 100.0));
        assert!(is_fling(MIN_FLING_VELOCITY, 0.0));
    }

    #[test]
    fn test_extent_maps_to_reading_direction() {
        let scheduler = FrameScheduler::new();
        let d = row(&scheduler, DismissibleConfig::default());
        drag(&d, 50.0);
        assert_eq!(d.dismiss_direction(), DismissDirection::StartToEnd);

        d.set_text_direction(TextDirection::Rtl);
        assert_eq!(d.dismiss_direction(), DismissDirection::EndToStart);
    }

    #[test]
    fn test_single_direction_clamps_at_rest() {
        let scheduler = FrameScheduler::new();
        let d = row(&scheduler, DismissibleConfig::end_to_start());
        drag(&d, -40.0);
        assert_eq!(d.drag_extent(), -40.0);

        d.handle_drag_update(DragUpdateDetails::new(Offset::new(100.0, 0.0)))
            .unwrap();
        assert_eq!(d.drag_extent(), 0.0);
        assert_eq!(d.progress(), 0.0);
    }

    #[test]
    fn test_single_direction_mirrors_under_rtl() {
        let scheduler = FrameScheduler::new();
        let d = row(&scheduler, DismissibleConfig::end_to_start());
        d.set_text_direction(TextDirection::Rtl);
        drag(&d, 40.0);
        assert_eq!(d.drag_extent(), 40.0);
        assert_eq!(d.dismiss_direction(), DismissDirection::EndToStart);
    }

    #[test]
    fn test_progress_tracks_drag() {
        let scheduler = FrameScheduler::new();
        let d = row(&scheduler, DismissibleConfig::default());
        drag(&d, 100.0);
        assert!((d.progress() - 0.25).abs() < 1e-6);
        assert_eq!(d.phase(), DismissPhase::Dragging);

        match d.frame() {
            DismissibleFrame::Sliding {
                slide,
                translation,
                background,
            } => {
                assert!((slide.x - 0.25).abs() < 1e-6);
                assert!((translation.x - 100.0).abs() < 1e-4);
                assert_eq!(background, Some("primary"));
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn test_missing_extent() {
        let scheduler = FrameScheduler::new();
        let d: Dismissible<&'static str> = Dismissible::builder()
            .build(&scheduler.handle())
            .unwrap();
        d.handle_drag_start(DragStartDetails::default()).unwrap();
        let err = d
            .handle_drag_update(DragUpdateDetails::new(Offset::new(10.0, 0.0)))
            .unwrap_err();
        assert_eq!(err, WidgetError::MissingExtent);
    }

    #[test]
    fn test_direction_none_ignores_drags() {
        let scheduler = FrameScheduler::new();
        let d = row(&scheduler, DismissibleConfig::new(DismissDirection::None));
        drag(&d, 120.0);
        assert_eq!(d.drag_extent(), 0.0);
        assert!(!d.is_active());
    }

    #[test]
    fn test_secondary_background_requires_primary() {
        let scheduler = FrameScheduler::new();
        let err = Dismissible::builder()
            .secondary_background("secondary")
            .build(&scheduler.handle())
            .unwrap_err();
        assert_eq!(err, WidgetError::SecondaryBackgroundWithoutPrimary);
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let scheduler = FrameScheduler::new();
        let err = Dismissible::<()>::builder()
            .config(DismissibleConfig::default().threshold(DismissDirection::Up, -0.1))
            .build(&scheduler.handle())
            .unwrap_err();
        assert!(matches!(err, WidgetError::InvalidThreshold { .. }));
    }

    #[test]
    fn test_secondary_background_for_end_to_start() {
        let scheduler = FrameScheduler::new();
        let d = Dismissible::builder()
            .background("primary")
            .secondary_background("secondary")
            .size(ROW)
            .build(&scheduler.handle())
            .unwrap();
        drag(&d, -80.0);
        match d.frame() {
            DismissibleFrame::Sliding { background, .. } => {
                assert_eq!(background, Some("secondary"))
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn test_on_update_reports_threshold_crossing() {
        let scheduler = FrameScheduler::new();
        let updates = Rc::new(RefCell::new(Vec::new()));
        let sink = updates.clone();
        let d = Dismissible::builder()
            .background(())
            .size(ROW)
            .on_update(move |details| sink.borrow_mut().push(details))
            .build(&scheduler.handle())
            .unwrap();

        drag(&d, 100.0);
        d.handle_drag_update(DragUpdateDetails::new(Offset::new(100.0, 0.0)))
            .unwrap();

        let updates = updates.borrow();
        let last = updates.last().unwrap();
        assert_eq!(last.direction, DismissDirection::StartToEnd);
        assert!(last.reached);
        assert!(!last.previous_reached);
        assert!((last.progress - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_confirm_dismiss_false_snaps_back() {
        let scheduler = FrameScheduler::new();
        let dismissed = Rc::new(Cell::new(false));
        let flag = dismissed.clone();
        let d = Dismissible::builder()
            .background(())
            .size(ROW)
            .confirm_dismiss(|_| false)
            .on_dismissed(move |_| flag.set(true))
            .build(&scheduler.handle())
            .unwrap();

        drag(&d, 300.0);
        d.handle_drag_end(DragEndDetails::new(Velocity::ZERO)).unwrap();
        assert_eq!(d.phase(), DismissPhase::Committing);

        let mut t = 0;
        while d.is_active() && t < 2000 {
            scheduler.pump(Duration::from_millis(t));
            t += 16;
        }
        assert!(!dismissed.get());
        assert_eq!(d.progress(), 0.0);
        assert_eq!(d.resize_phase(), ResizePhase::None);
    }

    #[test]
    fn test_keep_alive_while_animating() {
        let scheduler = FrameScheduler::new();
        let d = row(&scheduler, DismissibleConfig::default());
        assert!(!d.wants_keep_alive());
        drag(&d, 40.0);
        d.handle_drag_end(DragEndDetails::new(Velocity::ZERO)).unwrap();
        assert!(d.wants_keep_alive());
        assert_eq!(d.phase(), DismissPhase::SnappingBack);
    }
}
