//! Widget error types

use ember_animation::AnimationError;
use ember_core::CoreError;
use thiserror::Error;

use crate::dismissible::DismissDirection;

/// Errors raised while configuring or driving a widget
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WidgetError {
    /// A secondary background only makes sense alongside a primary one
    #[error("Dismissible has a secondary background but no background")]
    SecondaryBackgroundWithoutPrimary,

    #[error("Dismiss threshold for {direction:?} must be a non-negative number, got {threshold}")]
    InvalidThreshold {
        direction: DismissDirection,
        threshold: f32,
    },

    /// Drag math needs the widget's extent along the dismiss axis
    #[error("Widget extent along the drag axis is unknown; call set_size() after layout")]
    MissingExtent,

    #[error(transparent)]
    Animation(#[from] AnimationError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for widget operations
pub type Result<T> = std::result::Result<T, WidgetError>;
