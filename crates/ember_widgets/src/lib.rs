//! Ember Interaction Widgets
//!
//! Stateful widget logic layered on the animation engine. Each widget owns
//! its controllers, consumes gesture or scroll input from the host, and hands
//! back a plain frame value for the host's render pipeline.
//!
//! - **Dismissible**: swipe-to-dismiss with fling detection, snap-back and collapse
//! - **ExpansionTile**: expand/collapse with state restored from page storage
//! - **Scrollbar**: thumb that fades in on scroll and out after a quiet period
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use ember_core::{FrameScheduler, Offset, Size};
//! use ember_widgets::{
//!     Dismissible, DragEndDetails, DragStartDetails, DragUpdateDetails, Velocity,
//! };
//!
//! let scheduler = FrameScheduler::new();
//! let row: Dismissible<()> = Dismissible::builder()
//!     .size(Size::new(400.0, 60.0))
//!     .on_dismissed(|direction| println!("dismissed {direction:?}"))
//!     .build(&scheduler.handle())
//!     .unwrap();
//!
//! row.handle_drag_start(DragStartDetails::default()).unwrap();
//! row.handle_drag_update(DragUpdateDetails::new(Offset::new(60.0, 0.0))).unwrap();
//! row.handle_drag_end(DragEndDetails::new(Velocity::ZERO)).unwrap();
//!
//! // Short drag: snaps back
//! for frame in 0..30 {
//!     scheduler.pump(Duration::from_millis(frame * 16));
//! }
//! assert_eq!(row.progress(), 0.0);
//! ```

pub mod dismissible;
pub mod error;
pub mod expansion_tile;
pub mod gesture;
pub mod keep_alive;
pub mod scrollbar;

pub use dismissible::{
    is_fling, DismissDirection, DismissPhase, DismissUpdateDetails, Dismissible,
    DismissibleBuilder, DismissibleConfig, DismissibleFrame, ResizePhase,
    DEFAULT_DISMISS_THRESHOLD, DEFAULT_MOVEMENT_DURATION_MS, DEFAULT_RESIZE_DURATION_MS,
    FLING_VELOCITY_SCALE, MIN_FLING_VELOCITY, MIN_FLING_VELOCITY_DELTA,
};
pub use error::{Result, WidgetError};
pub use expansion_tile::{
    ChildrenVisibility, ExpansionTile, ExpansionTileConfig, ExpansionTileFrame,
    ExpansionTileStyle, EXPAND_DURATION_MS,
};
pub use gesture::{DragEndDetails, DragStartDetails, DragUpdateDetails, Velocity};
pub use keep_alive::KeepAlive;
pub use scrollbar::{
    thumb_geometry, ScrollMetrics, ScrollNotification, Scrollbar, ScrollbarConfig,
    ScrollbarFrame, ThumbGeometry, SCROLLBAR_FADE_DURATION_MS, SCROLLBAR_MIN_THUMB_EXTENT,
    SCROLLBAR_THICKNESS, SCROLLBAR_TIME_TO_FADE_MS,
};
