//! Fading scrollbar
//!
//! The thumb fades in when the scroll position changes and fades out after
//! the view has been still for a moment. Every scroll notification restarts
//! the quiet-period timer. On platforms with a native scrollbar this
//! controller stands aside entirely.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use ember_animation::{Animation, AnimationController, AnimationStatus, CurvedAnimation, Easing};
use ember_core::{Axis, AxisDirection, Color, SchedulerHandle, TargetPlatform, TimerId};

use crate::error::Result;

pub const SCROLLBAR_TIME_TO_FADE_MS: u32 = 600;
pub const SCROLLBAR_FADE_DURATION_MS: u32 = 300;
pub const SCROLLBAR_THICKNESS: f32 = 6.0;
pub const SCROLLBAR_MIN_THUMB_EXTENT: f32 = 18.0;

/// Scrollbar appearance and timing
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScrollbarConfig {
    pub thickness: f32,
    pub min_thumb_extent: f32,
    /// Gap between the thumb and the viewport's leading and trailing edges
    pub main_axis_margin: f32,
    /// Gap between the thumb and the viewport's side
    pub cross_axis_margin: f32,
    pub color: Color,
    /// Quiet period before fading out
    pub time_to_fade_ms: u32,
    pub fade_duration_ms: u32,
}

impl Default for ScrollbarConfig {
    fn default() -> Self {
        Self {
            thickness: SCROLLBAR_THICKNESS,
            min_thumb_extent: SCROLLBAR_MIN_THUMB_EXTENT,
            main_axis_margin: 0.0,
            cross_axis_margin: 0.0,
            color: Color::rgba(0.0, 0.0, 0.0, 0.4),
            time_to_fade_ms: SCROLLBAR_TIME_TO_FADE_MS,
            fade_duration_ms: SCROLLBAR_FADE_DURATION_MS,
        }
    }
}

impl ScrollbarConfig {
    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn thickness(mut self, thickness: f32) -> Self {
        self.thickness = thickness;
        self
    }
}

/// Scroll position snapshot carried by notifications
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollMetrics {
    pub pixels: f32,
    pub min_scroll_extent: f32,
    pub max_scroll_extent: f32,
    pub viewport_dimension: f32,
    pub axis_direction: AxisDirection,
}

impl ScrollMetrics {
    pub fn axis(&self) -> Axis {
        self.axis_direction.axis()
    }

    /// Content scrolled off the leading edge
    pub fn extent_before(&self) -> f32 {
        (self.pixels - self.min_scroll_extent).max(0.0)
    }

    /// Content still below the trailing edge
    pub fn extent_after(&self) -> f32 {
        (self.max_scroll_extent - self.pixels).max(0.0)
    }

    /// Viewport extent not taken up by overscroll
    pub fn extent_inside(&self) -> f32 {
        let vd = self.viewport_dimension;
        vd - (self.min_scroll_extent - self.pixels).clamp(0.0, vd)
            - (self.pixels - self.max_scroll_extent).clamp(0.0, vd)
    }
}

/// Scroll notifications relevant to the scrollbar
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScrollNotification {
    Start(ScrollMetrics),
    Update(ScrollMetrics),
    Overscroll(ScrollMetrics),
    End(ScrollMetrics),
}

impl ScrollNotification {
    pub fn metrics(&self) -> &ScrollMetrics {
        match self {
            ScrollNotification::Start(m)
            | ScrollNotification::Update(m)
            | ScrollNotification::Overscroll(m)
            | ScrollNotification::End(m) => m,
        }
    }
}

/// Thumb placement along the track
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThumbGeometry {
    pub axis: Axis,
    /// Distance from the track start along the scroll axis
    pub offset: f32,
    /// Length along the scroll axis
    pub extent: f32,
    pub thickness: f32,
    pub cross_axis_margin: f32,
    pub color: Color,
    pub opacity: f32,
}

/// What to render this frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScrollbarFrame {
    /// The platform draws its own scrollbar
    PlatformNative,
    /// Faded out, or nothing to show
    Hidden,
    Thumb(ThumbGeometry),
}

/// Compute thumb extent and offset for `metrics`
///
/// The thumb is proportional to the visible fraction of the content, never
/// shorter than `min_thumb_extent` unless the track is, and shrinks while
/// overscrolling at either end.
pub fn thumb_geometry(metrics: &ScrollMetrics, config: &ScrollbarConfig) -> (f32, f32) {
    let track = (metrics.viewport_dimension - 2.0 * config.main_axis_margin).max(0.0);
    let total = metrics.max_scroll_extent - metrics.min_scroll_extent + metrics.viewport_dimension;
    let fraction_visible = if total > 0.0 {
        (metrics.extent_inside() / total).clamp(0.0, 1.0)
    } else {
        1.0
    };

    let min_extent = config.min_thumb_extent.min(track);
    let fraction_overscrolled = if metrics.viewport_dimension > 0.0 {
        1.0 - metrics.extent_inside() / metrics.viewport_dimension
    } else {
        0.0
    };
    let min_extent = if metrics.extent_before() > 0.0 && metrics.extent_after() > 0.0 {
        min_extent
    } else {
        min_extent * (1.0 - fraction_overscrolled.clamp(0.0, 0.2) / 0.2)
    };
    let extent = (track * fraction_visible).max(min_extent).min(track);

    let scrollable = metrics.max_scroll_extent - metrics.min_scroll_extent;
    let fraction_past = if scrollable > 0.0 {
        ((metrics.pixels - metrics.min_scroll_extent) / scrollable).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let fraction_past = if metrics.axis_direction.is_reversed() {
        1.0 - fraction_past
    } else {
        fraction_past
    };
    let offset = config.main_axis_margin + fraction_past * (track - extent);
    (extent, offset)
}

/// Fade-in/fade-out driver for a scrollbar thumb
pub struct Scrollbar {
    scheduler: SchedulerHandle,
    config: ScrollbarConfig,
    platform: TargetPlatform,
    controller: AnimationController,
    opacity: CurvedAnimation,
    fade_timer: Rc<Cell<Option<TimerId>>>,
    metrics: Option<ScrollMetrics>,
}

impl Scrollbar {
    pub fn new(
        scheduler: &SchedulerHandle,
        platform: TargetPlatform,
        config: ScrollbarConfig,
    ) -> Result<Self> {
        let controller = AnimationController::builder()
            .duration_ms(config.fade_duration_ms)
            .debug_label("Scrollbar fade")
            .build(scheduler)?;
        let opacity = CurvedAnimation::new(&controller, Easing::FastOutSlowIn);
        Ok(Self {
            scheduler: scheduler.clone(),
            config,
            platform,
            controller,
            opacity,
            fade_timer: Rc::new(Cell::new(None)),
            metrics: None,
        })
    }

    pub fn platform(&self) -> TargetPlatform {
        self.platform
    }

    /// Switch platforms; going native drops any fade in progress
    pub fn set_platform(&mut self, platform: TargetPlatform) -> Result<()> {
        self.platform = platform;
        if platform.has_native_scrollbar() {
            self.cancel_fade_timer();
            self.controller.reset()?;
        }
        Ok(())
    }

    pub fn controller(&self) -> &AnimationController {
        &self.controller
    }

    /// Thumb opacity, the fade value through fast-out-slow-in
    pub fn opacity(&self) -> f32 {
        self.opacity.value()
    }

    pub fn metrics(&self) -> Option<&ScrollMetrics> {
        self.metrics.as_ref()
    }

    pub fn is_fade_out_pending(&self) -> bool {
        self.fade_timer
            .get()
            .map(|id| self.scheduler.is_timer_pending(id))
            .unwrap_or(false)
    }

    /// React to a scroll notification
    ///
    /// Always returns false so the notification keeps bubbling.
    pub fn handle_scroll_notification(&mut self, notification: &ScrollNotification) -> Result<bool> {
        if self.platform.has_native_scrollbar() {
            return Ok(false);
        }
        if !matches!(
            notification,
            ScrollNotification::Update(_) | ScrollNotification::Overscroll(_)
        ) {
            return Ok(false);
        }

        if self.controller.status() != AnimationStatus::Forward {
            self.controller.forward(None)?;
        }
        self.metrics = Some(*notification.metrics());

        self.cancel_fade_timer();
        let controller = self.controller.clone();
        let slot = self.fade_timer.clone();
        let delay = Duration::from_millis(u64::from(self.config.time_to_fade_ms));
        let id = self.scheduler.schedule_timer(
            delay,
            Box::new(move || {
                slot.set(None);
                tracing::trace!("scrollbar idle, fading out");
                if let Err(err) = controller.reverse(None) {
                    tracing::warn!("scrollbar fade-out failed: {}", err);
                }
            }),
        )?;
        self.fade_timer.set(Some(id));
        Ok(false)
    }

    pub fn frame(&self) -> ScrollbarFrame {
        if self.platform.has_native_scrollbar() {
            return ScrollbarFrame::PlatformNative;
        }
        let opacity = self.opacity();
        let Some(metrics) = self.metrics else {
            return ScrollbarFrame::Hidden;
        };
        if opacity <= 0.0 || metrics.viewport_dimension <= 0.0 {
            return ScrollbarFrame::Hidden;
        }
        let (extent, offset) = thumb_geometry(&metrics, &self.config);
        ScrollbarFrame::Thumb(ThumbGeometry {
            axis: metrics.axis(),
            offset,
            extent,
            thickness: self.config.thickness,
            cross_axis_margin: self.config.cross_axis_margin,
            color: self.config.color.with_opacity(opacity),
            opacity,
        })
    }

    fn cancel_fade_timer(&self) {
        if let Some(id) = self.fade_timer.take() {
            self.scheduler.cancel_timer(id);
        }
    }
}

impl Drop for Scrollbar {
    fn drop(&mut self) {
        self.cancel_fade_timer();
    }
}

impl fmt::Debug for Scrollbar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scrollbar")
            .field("platform", &self.platform)
            .field("opacity", &self.opacity())
            .field("fade_out_pending", &self.is_fade_out_pending())
            .finish()
    }
}
