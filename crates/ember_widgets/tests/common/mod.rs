//! Shared helpers for widget integration tests

#![allow(dead_code)]

use std::time::Duration;

use ember_core::{FrameScheduler, SchedulerHandle};

/// Frame interval used when stepping the clock
pub const FRAME_MS: u64 = 16;

/// Route `tracing` output to the test harness; `RUST_LOG` picks the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_test_writer()
        .try_init();
}

/// Virtual frame clock
pub struct Clock {
    pub scheduler: FrameScheduler,
    now: Duration,
}

impl Clock {
    pub fn new() -> Self {
        init_tracing();
        Self {
            scheduler: FrameScheduler::new(),
            now: Duration::ZERO,
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.scheduler.handle()
    }

    pub fn now_ms(&self) -> u64 {
        self.now.as_millis() as u64
    }

    /// Run a frame without moving the clock
    pub fn frame(&mut self) {
        self.scheduler.pump(self.now);
    }

    /// Move the clock forward and run one frame
    pub fn advance(&mut self, ms: u64) {
        self.now += Duration::from_millis(ms);
        self.scheduler.pump(self.now);
    }

    /// Step frame by frame until nothing is scheduled, up to ten seconds
    pub fn settle(&mut self) {
        let limit = self.now + Duration::from_secs(10);
        self.frame();
        while self.scheduler.has_pending_work() && self.now < limit {
            self.advance(FRAME_MS);
        }
    }
}
