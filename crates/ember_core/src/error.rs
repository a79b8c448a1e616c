//! Core error types

use thiserror::Error;

/// Errors raised by the scheduler and the focus tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The focus scope was disposed or never belonged to this manager
    #[error("Unknown focus scope: {0}")]
    UnknownScope(String),

    /// The focus node was disposed or never belonged to this manager
    #[error("Unknown focus node: {0}")]
    UnknownNode(String),

    /// Inserting the scope would make it its own ancestor
    #[error("Focus scope {child} cannot become a child of its descendant {parent}")]
    FocusCycle { parent: String, child: String },

    /// The scheduler behind a handle has been dropped
    #[error("Frame scheduler has been dropped")]
    SchedulerDropped,
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
