//! Animation error types

use ember_core::CoreError;
use thiserror::Error;

/// Errors raised when driving an animation controller
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    /// The controller was driven after `dispose()`
    #[error("AnimationController {0} was used after being disposed")]
    Disposed(String),

    /// A timed drive was requested but no duration is configured
    #[error("AnimationController {0} has no duration for this drive")]
    NoDuration(String),

    /// Direct assignment while forward/reverse/fling is running
    #[error("AnimationController {0} cannot set value while animating; call stop() first")]
    ValueWhileAnimating(String),

    #[error("Invalid animation bounds: lower {lower} must not exceed upper {upper}")]
    InvalidBounds { lower: f32, upper: f32 },

    #[error(transparent)]
    Scheduler(#[from] CoreError),
}

/// Result type for animation operations
pub type Result<T> = std::result::Result<T, AnimationError>;
