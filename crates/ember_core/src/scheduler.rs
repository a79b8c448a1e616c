//! Frame scheduler
//!
//! Drives everything time-based in Ember from a single logical thread:
//! - **Tickers**: per-frame callbacks receiving the time elapsed since their first frame
//! - **Timers**: one-shot callbacks fired once the frame clock passes their deadline
//! - **Microtasks**: deferred work flushed at the end of each scheduling step
//!
//! The clock is virtual. The host calls [`FrameScheduler::pump`] with the frame
//! timestamp once per display frame, which makes every animation deterministic
//! under test.
//!
//! ```ignore
//! let scheduler = FrameScheduler::new();
//! let handle = scheduler.handle();
//!
//! let ticker = handle.register_ticker(Box::new(|elapsed| println!("{elapsed:?}"))).unwrap();
//! handle.start_ticker(ticker);
//!
//! scheduler.pump(Duration::from_millis(16));
//! scheduler.pump(Duration::from_millis(32)); // prints 16ms
//! ```

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::error::{CoreError, Result};

new_key_type! {
    /// Handle to a registered ticker
    pub struct TickerId;
    /// Handle to a pending one-shot timer
    pub struct TimerId;
}

/// Callback invoked once per frame with the elapsed time since the ticker's first frame
pub type TickCallback = Box<dyn FnMut(Duration)>;

/// Deferred unit of work
pub type Microtask = Box<dyn FnOnce()>;

struct TickerEntry {
    /// Taken out while the callback runs so it may reenter the scheduler
    callback: Option<TickCallback>,
    /// Timestamp of the first frame seen after the last start
    start: Option<Duration>,
    active: bool,
}

struct TimerEntry {
    deadline: Duration,
    /// Insertion order, breaks ties between equal deadlines
    seq: u64,
    callback: Option<Microtask>,
}

struct SchedulerInner {
    tickers: SlotMap<TickerId, TickerEntry>,
    timers: SlotMap<TimerId, TimerEntry>,
    microtasks: VecDeque<Microtask>,
    now: Duration,
    frame_count: u64,
    timer_seq: u64,
}

impl SchedulerInner {
    fn take_due_timer(&mut self) -> Option<Microtask> {
        let now = self.now;
        let due = self
            .timers
            .iter()
            .filter(|(_, t)| t.deadline <= now)
            .min_by_key(|(_, t)| (t.deadline, t.seq))
            .map(|(id, _)| id)?;
        self.timers.remove(due).and_then(|t| t.callback)
    }

    fn active_tickers(&self) -> SmallVec<[TickerId; 8]> {
        self.tickers
            .iter()
            .filter(|(_, t)| t.active)
            .map(|(id, _)| id)
            .collect()
    }
}

/// Owner of the frame clock
///
/// Hold one per UI thread and hand out [`SchedulerHandle`]s to animations,
/// widgets and the focus manager.
pub struct FrameScheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                tickers: SlotMap::with_key(),
                timers: SlotMap::with_key(),
                microtasks: VecDeque::new(),
                now: Duration::ZERO,
                frame_count: 0,
                timer_seq: 0,
            })),
        }
    }

    /// Get a weak handle for registering tickers, timers and microtasks
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Advance the clock to `now` and run one frame
    ///
    /// Order: due timers (each followed by a microtask flush), then every
    /// active ticker, then a final microtask flush.
    ///
    /// Returns true if another frame is needed (active tickers or pending timers).
    pub fn pump(&self, now: Duration) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            if now < inner.now {
                tracing::warn!(
                    "FrameScheduler::pump: clock moved backwards ({:?} -> {:?}), ignoring",
                    inner.now,
                    now
                );
            } else {
                inner.now = now;
            }
            inner.frame_count += 1;
        }

        loop {
            let due = self.inner.borrow_mut().take_due_timer();
            match due {
                Some(callback) => {
                    callback();
                    self.flush_microtasks();
                }
                None => break,
            }
        }

        let (ids, now) = {
            let inner = self.inner.borrow();
            (inner.active_tickers(), inner.now)
        };
        tracing::trace!("frame at {:?}: {} active tickers", now, ids.len());

        for id in ids {
            let taken = {
                let mut inner = self.inner.borrow_mut();
                match inner.tickers.get_mut(id) {
                    Some(entry) if entry.active => {
                        let start = *entry.start.get_or_insert(now);
                        entry.callback.take().map(|cb| (cb, now.saturating_sub(start)))
                    }
                    _ => None,
                }
            };

            if let Some((mut callback, elapsed)) = taken {
                callback(elapsed);
                let mut inner = self.inner.borrow_mut();
                if let Some(entry) = inner.tickers.get_mut(id) {
                    if entry.callback.is_none() {
                        entry.callback = Some(callback);
                    }
                }
            }
        }

        self.flush_microtasks();
        self.has_pending_work()
    }

    /// Run queued microtasks until the queue is empty
    ///
    /// Microtasks queued while flushing run in the same flush.
    pub fn flush_microtasks(&self) {
        loop {
            let task = self.inner.borrow_mut().microtasks.pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
    }

    /// Current frame clock
    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    /// Number of frames pumped so far
    pub fn frame_count(&self) -> u64 {
        self.inner.borrow().frame_count
    }

    /// True if any ticker is active and wants the next frame
    pub fn has_scheduled_frame(&self) -> bool {
        self.inner.borrow().tickers.iter().any(|(_, t)| t.active)
    }

    /// True if there are active tickers, timers or microtasks outstanding
    pub fn has_pending_work(&self) -> bool {
        let inner = self.inner.borrow();
        inner.tickers.iter().any(|(_, t)| t.active)
            || !inner.timers.is_empty()
            || !inner.microtasks.is_empty()
    }

    /// Earliest pending timer deadline, for hosts that sleep between frames
    pub fn next_timer_deadline(&self) -> Option<Duration> {
        self.inner
            .borrow()
            .timers
            .iter()
            .map(|(_, t)| t.deadline)
            .min()
    }

    pub fn ticker_count(&self) -> usize {
        self.inner.borrow().tickers.len()
    }

    pub fn timer_count(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    pub fn microtask_count(&self) -> usize {
        self.inner.borrow().microtasks.len()
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("FrameScheduler")
            .field("now", &inner.now)
            .field("frame_count", &inner.frame_count)
            .field("tickers", &inner.tickers.len())
            .field("timers", &inner.timers.len())
            .field("microtasks", &inner.microtasks.len())
            .finish()
    }
}

/// A weak handle to the frame scheduler
///
/// Operations on a handle whose scheduler has been dropped are no-ops that
/// report failure through their return value.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Weak<RefCell<SchedulerInner>>,
}

impl SchedulerHandle {
    /// A handle that is never alive, useful as a placeholder
    pub fn detached() -> Self {
        Self { inner: Weak::new() }
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Current frame clock, or zero if the scheduler is gone
    pub fn now(&self) -> Duration {
        self.inner
            .upgrade()
            .map(|inner| inner.borrow().now)
            .unwrap_or_default()
    }

    // =========================================================================
    // Tickers
    // =========================================================================

    /// Register an inactive ticker
    pub fn register_ticker(&self, callback: TickCallback) -> Result<TickerId> {
        let inner = self.inner.upgrade().ok_or(CoreError::SchedulerDropped)?;
        let id = inner.borrow_mut().tickers.insert(TickerEntry {
            callback: Some(callback),
            start: None,
            active: false,
        });
        Ok(id)
    }

    /// Start ticking from the next frame; elapsed time restarts at zero
    pub fn start_ticker(&self, id: TickerId) {
        if let Some(inner) = self.inner.upgrade() {
            if let Some(entry) = inner.borrow_mut().tickers.get_mut(id) {
                entry.active = true;
                entry.start = None;
            }
        }
    }

    pub fn stop_ticker(&self, id: TickerId) {
        if let Some(inner) = self.inner.upgrade() {
            if let Some(entry) = inner.borrow_mut().tickers.get_mut(id) {
                entry.active = false;
                entry.start = None;
            }
        }
    }

    pub fn is_ticker_active(&self, id: TickerId) -> bool {
        self.inner
            .upgrade()
            .and_then(|inner| inner.borrow().tickers.get(id).map(|t| t.active))
            .unwrap_or(false)
    }

    pub fn remove_ticker(&self, id: TickerId) {
        if let Some(inner) = self.inner.upgrade() {
            // Dropping the callback may drop captured state that touches the
            // scheduler again, so release the borrow first.
            let removed = inner.borrow_mut().tickers.remove(id);
            drop(removed);
        }
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// Fire `callback` on the first frame at or after `now + delay`
    pub fn schedule_timer(&self, delay: Duration, callback: Microtask) -> Result<TimerId> {
        let inner = self.inner.upgrade().ok_or(CoreError::SchedulerDropped)?;
        let mut inner = inner.borrow_mut();
        inner.timer_seq += 1;
        let entry = TimerEntry {
            deadline: inner.now + delay,
            seq: inner.timer_seq,
            callback: Some(callback),
        };
        Ok(inner.timers.insert(entry))
    }

    /// Cancel a pending timer; returns false if it already fired or was cancelled
    pub fn cancel_timer(&self, id: TimerId) -> bool {
        match self.inner.upgrade() {
            Some(inner) => {
                let removed = inner.borrow_mut().timers.remove(id);
                removed.is_some()
            }
            None => false,
        }
    }

    pub fn is_timer_pending(&self, id: TimerId) -> bool {
        self.inner
            .upgrade()
            .map(|inner| inner.borrow().timers.contains_key(id))
            .unwrap_or(false)
    }

    // =========================================================================
    // Microtasks
    // =========================================================================

    /// Queue work for the end of the current scheduling step
    pub fn schedule_microtask(&self, task: Microtask) -> Result<()> {
        let inner = self.inner.upgrade().ok_or(CoreError::SchedulerDropped)?;
        inner.borrow_mut().microtasks.push_back(task);
        Ok(())
    }
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}
