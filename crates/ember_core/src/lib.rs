//! Ember Core Runtime
//!
//! Foundational primitives for the Ember widget framework:
//!
//! - **Frame Scheduler**: virtual frame clock driving tickers, timers and microtasks
//! - **Focus Tree**: arena-backed scope tree with coalesced focus recomputation
//! - **Page Storage**: keyed state that survives widgets being recreated
//! - **Geometry & Color**: the value types animations interpolate
//!
//! # Example
//!
//! ```rust
//! use ember_core::{FocusManager, FrameScheduler};
//!
//! let scheduler = FrameScheduler::new();
//! let focus = FocusManager::new(scheduler.handle());
//!
//! let field = focus.create_node(Some("search"));
//! focus.request_focus(focus.root_scope(), field).unwrap();
//!
//! // Focus changes land at the end of the scheduling step
//! assert!(!focus.has_focus(field));
//! scheduler.flush_microtasks();
//! assert!(focus.has_focus(field));
//! ```

pub mod color;
pub mod env;
pub mod error;
pub mod focus;
pub mod geometry;
pub mod scheduler;
pub mod store;

pub use color::Color;
pub use env::{TargetPlatform, TextDirection};
pub use error::{CoreError, Result};
pub use focus::{FocusListener, FocusListenerId, FocusManager, FocusNodeId, FocusScopeId};
pub use geometry::{Axis, AxisDirection, Offset, Size};
pub use scheduler::{
    FrameScheduler, Microtask, SchedulerHandle, TickCallback, TickerId, TimerId,
};
pub use store::{PageStorage, StorageKey};
