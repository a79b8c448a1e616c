//! Expansion tile
//!
//! A header that expands to reveal its children. The expanded flag is stored
//! in [`PageStorage`] so a tile scrolled out of a lazy list comes back in the
//! same state, already settled rather than replaying its animation.
//!
//! One 200 ms controller drives everything. Height, header color, icon color
//! and icon rotation follow ease-in; border and background follow ease-out,
//! so the frame and fill lead the content.

use std::fmt;
use std::time::Duration;

use ember_animation::{Animatable, AnimationController, ColorTween, CurveTween, Easing, Tween};
use ember_core::{Color, PageStorage, SchedulerHandle, StorageKey};

use crate::error::Result;
use crate::keep_alive::KeepAlive;

pub const EXPAND_DURATION_MS: u32 = 200;

/// Expansion tile behavior settings
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExpansionTileConfig {
    /// Used when page storage has no entry for the tile
    pub initially_expanded: bool,
    /// Keep collapsed children alive (offstage) instead of removing them
    pub maintain_state: bool,
    pub duration_ms: u32,
}

impl Default for ExpansionTileConfig {
    fn default() -> Self {
        Self {
            initially_expanded: false,
            maintain_state: false,
            duration_ms: EXPAND_DURATION_MS,
        }
    }
}

impl ExpansionTileConfig {
    pub fn expanded() -> Self {
        Self {
            initially_expanded: true,
            ..Self::default()
        }
    }

    pub fn maintain_state(mut self, maintain: bool) -> Self {
        self.maintain_state = maintain;
        self
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(u64::from(self.duration_ms))
    }
}

/// Colors at the collapsed and expanded ends
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExpansionTileStyle {
    /// Top and bottom border when expanded; fades from clear
    pub divider_color: Color,
    pub header_color: Color,
    pub header_expanded_color: Color,
    pub icon_color: Color,
    pub icon_expanded_color: Color,
    /// Fill when expanded; clear when collapsed
    pub background_color: Option<Color>,
}

impl Default for ExpansionTileStyle {
    fn default() -> Self {
        let accent = Color::from_hex(0x2196F3);
        Self {
            divider_color: Color::rgba(0.0, 0.0, 0.0, 0.12),
            header_color: Color::rgba(0.0, 0.0, 0.0, 0.87),
            header_expanded_color: accent,
            icon_color: Color::rgba(0.0, 0.0, 0.0, 0.54),
            icon_expanded_color: accent,
            background_color: None,
        }
    }
}

/// How the tile's children take part in the frame
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChildrenVisibility {
    /// Laid out and painted, clipped by `height_factor`
    Visible,
    /// Kept alive but neither painted nor ticking
    Offstage,
    /// Not built
    Removed,
}

/// Interpolated values for one frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExpansionTileFrame {
    /// Fraction of the children's height shown
    pub height_factor: f32,
    /// Trailing icon rotation in turns, 0 collapsed to 0.5 expanded
    pub icon_turns: f32,
    pub border_color: Color,
    pub header_color: Color,
    pub icon_color: Color,
    pub background_color: Color,
    pub children: ChildrenVisibility,
}

/// Two-state expand/collapse controller
pub struct ExpansionTile {
    controller: AnimationController,
    storage: PageStorage,
    key: StorageKey,
    expanded: bool,
    config: ExpansionTileConfig,
    style: ExpansionTileStyle,
    on_expansion_changed: Option<Box<dyn FnMut(bool)>>,
}

impl ExpansionTile {
    /// Create a tile, restoring its state from `storage` under `key`
    pub fn new(
        scheduler: &SchedulerHandle,
        storage: PageStorage,
        key: StorageKey,
        config: ExpansionTileConfig,
    ) -> Result<Self> {
        let expanded = storage
            .read_state::<bool>(&key)
            .unwrap_or(config.initially_expanded);
        let controller = AnimationController::builder()
            .duration(config.duration())
            .value(if expanded { 1.0 } else { 0.0 })
            .debug_label(format!("ExpansionTile {key}"))
            .build(scheduler)?;
        tracing::trace!("ExpansionTile {}: restored expanded={}", key, expanded);

        Ok(Self {
            controller,
            storage,
            key,
            expanded,
            config,
            style: ExpansionTileStyle::default(),
            on_expansion_changed: None,
        })
    }

    pub fn style(mut self, style: ExpansionTileStyle) -> Self {
        self.style = style;
        self
    }

    pub fn on_expansion_changed(mut self, callback: impl FnMut(bool) + 'static) -> Self {
        self.on_expansion_changed = Some(Box::new(callback));
        self
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn key(&self) -> &StorageKey {
        &self.key
    }

    pub fn controller(&self) -> &AnimationController {
        &self.controller
    }

    /// Header tap: flip the state, animate, persist and notify
    pub fn toggle(&mut self) -> Result<()> {
        self.expanded = !self.expanded;
        if self.expanded {
            self.controller.forward(None)?;
        } else {
            self.controller.reverse(None)?;
        }
        self.storage.write_state(&self.key, self.expanded);
        tracing::debug!("ExpansionTile {}: expanded={}", self.key, self.expanded);

        if let Some(callback) = self.on_expansion_changed.as_mut() {
            callback(self.expanded);
        }
        Ok(())
    }

    pub fn set_expanded(&mut self, expanded: bool) -> Result<()> {
        if expanded != self.expanded {
            self.toggle()?;
        }
        Ok(())
    }

    /// Collapsed and settled
    pub fn is_closed(&self) -> bool {
        !self.expanded && self.controller.is_dismissed()
    }

    pub fn frame(&self) -> ExpansionTileFrame {
        let ease_in = CurveTween::new(Easing::EaseIn);
        let ease_out = CurveTween::new(Easing::EaseOut);
        let style = &self.style;
        let background = style.background_color.unwrap_or(Color::TRANSPARENT);

        let children = if !self.is_closed() {
            ChildrenVisibility::Visible
        } else if self.config.maintain_state {
            ChildrenVisibility::Offstage
        } else {
            ChildrenVisibility::Removed
        };

        ExpansionTileFrame {
            height_factor: ease_in.evaluate(&self.controller),
            icon_turns: Tween::new(0.0_f32, 0.5)
                .chain(ease_in)
                .evaluate(&self.controller),
            border_color: ColorTween::new(style.divider_color.with_alpha(0.0), style.divider_color)
                .chain(ease_out)
                .evaluate(&self.controller),
            header_color: ColorTween::new(style.header_color, style.header_expanded_color)
                .chain(ease_in)
                .evaluate(&self.controller),
            icon_color: ColorTween::new(style.icon_color, style.icon_expanded_color)
                .chain(ease_in)
                .evaluate(&self.controller),
            background_color: ColorTween::new(background.with_alpha(0.0), background)
                .chain(ease_out)
                .evaluate(&self.controller),
            children,
        }
    }
}

impl KeepAlive for ExpansionTile {
    fn wants_keep_alive(&self) -> bool {
        self.controller.is_animating()
    }
}

impl fmt::Debug for ExpansionTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpansionTile")
            .field("key", &self.key)
            .field("expanded", &self.expanded)
            .field("value", &self.controller.value())
            .finish()
    }
}
