//! Ember Animation System
//!
//! Controllers, curves, tweens and physics simulations driven by the
//! `ember_core` frame scheduler.
//!
//! # Features
//!
//! - **AnimationController**: forward/reverse/animate-to/fling drives over a bounded value
//! - **Curves**: cubic beziers, intervals, thresholds and named easings
//! - **Tweens**: typed interpolation for scalars, offsets, sizes and colors
//! - **Spring Physics**: RK4-integrated springs used for flings
//! - **Tickers**: frame callbacks with awaitable completion futures
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use ember_animation::{AnimationController, AnimationStatus};
//! use ember_core::FrameScheduler;
//!
//! let scheduler = FrameScheduler::new();
//! let controller = AnimationController::new(&scheduler, Duration::from_millis(200)).unwrap();
//!
//! controller.forward(None).unwrap();
//! scheduler.pump(Duration::ZERO);
//! scheduler.pump(Duration::from_millis(200));
//! assert_eq!(controller.status(), AnimationStatus::Completed);
//! ```

pub mod animation;
pub mod controller;
pub mod curves;
pub mod error;
pub mod simulation;
pub mod ticker;
pub mod tween;
pub mod values;

pub use animation::{Animation, AnimationStatus, CurvedAnimation};
pub use controller::{AnimationController, AnimationControllerBuilder, ListenerId};
pub use curves::{Cubic, Curve, Easing, Flipped, Interval, Linear, Threshold};
pub use error::{AnimationError, Result};
pub use simulation::{
    InterpolationSimulation, Simulation, Spring, SpringConfig, SpringSimulation, Tolerance,
};
pub use ticker::{Ticker, TickerFuture, TickerProvider};
pub use tween::{
    Animatable, Animated, Chained, ColorTween, CurveTween, OffsetTween, SizeTween, Tween,
};
pub use values::Interpolate;
