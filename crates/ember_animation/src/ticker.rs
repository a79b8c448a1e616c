//! Tickers and ticker futures
//!
//! A [`Ticker`] is one frame-callback registration on the [`FrameScheduler`].
//! Starting it hands back a [`TickerFuture`] which resolves when the ticker is
//! stopped normally and is marked canceled when stopped with `canceled = true`.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use ember_core::{FrameScheduler, SchedulerHandle, TickerId};
use smallvec::SmallVec;

use crate::error::Result;

// ============================================================================
// TickerFuture
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FutureState {
    Pending,
    Complete,
    Canceled,
}

struct FutureInner {
    state: FutureState,
    wakers: SmallVec<[Waker; 1]>,
    on_complete: Vec<Box<dyn FnOnce()>>,
}

/// Completion signal for one run of a ticker
///
/// A future superseded by a later drive is canceled and never completes;
/// awaiting it stays pending forever.
#[derive(Clone)]
pub struct TickerFuture {
    inner: Rc<RefCell<FutureInner>>,
}

impl TickerFuture {
    fn pending() -> Self {
        Self {
            inner: Rc::new(RefCell::new(FutureInner {
                state: FutureState::Pending,
                wakers: SmallVec::new(),
                on_complete: Vec::new(),
            })),
        }
    }

    /// A future that has already completed
    pub fn complete() -> Self {
        let future = Self::pending();
        future.inner.borrow_mut().state = FutureState::Complete;
        future
    }

    pub fn is_complete(&self) -> bool {
        self.inner.borrow().state == FutureState::Complete
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.borrow().state == FutureState::Canceled
    }

    /// Run `callback` on completion, immediately if already complete
    ///
    /// Never runs if the future is canceled.
    pub fn when_complete(&self, callback: impl FnOnce() + 'static) {
        let state = self.inner.borrow().state;
        match state {
            FutureState::Complete => callback(),
            FutureState::Pending => self.inner.borrow_mut().on_complete.push(Box::new(callback)),
            FutureState::Canceled => {}
        }
    }

    fn settle(&self, state: FutureState) {
        let (wakers, callbacks) = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != FutureState::Pending {
                return;
            }
            inner.state = state;
            let callbacks = std::mem::take(&mut inner.on_complete);
            (std::mem::take(&mut inner.wakers), callbacks)
        };
        for waker in wakers {
            waker.wake();
        }
        if state == FutureState::Complete {
            for callback in callbacks {
                callback();
            }
        }
    }
}

impl Future for TickerFuture {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut inner = self.inner.borrow_mut();
        match inner.state {
            FutureState::Complete => Poll::Ready(()),
            _ => {
                if !inner.wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    inner.wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

impl fmt::Debug for TickerFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickerFuture")
            .field("state", &self.inner.borrow().state)
            .finish()
    }
}

// ============================================================================
// Ticker
// ============================================================================

/// Something that can create tickers
///
/// Widget states hold one of these instead of inheriting ticker behavior.
pub trait TickerProvider {
    fn create_ticker(&self, on_tick: Box<dyn FnMut(Duration)>) -> Result<Ticker>;
}

impl TickerProvider for SchedulerHandle {
    fn create_ticker(&self, on_tick: Box<dyn FnMut(Duration)>) -> Result<Ticker> {
        let id = self.register_ticker(on_tick)?;
        Ok(Ticker {
            handle: self.clone(),
            id,
            future: RefCell::new(None),
        })
    }
}

impl TickerProvider for FrameScheduler {
    fn create_ticker(&self, on_tick: Box<dyn FnMut(Duration)>) -> Result<Ticker> {
        self.handle().create_ticker(on_tick)
    }
}

/// A per-frame callback registration
///
/// Elapsed time passed to the callback restarts from zero on each `start()`.
/// Dropping the ticker unregisters it.
pub struct Ticker {
    handle: SchedulerHandle,
    id: TickerId,
    future: RefCell<Option<TickerFuture>>,
}

impl Ticker {
    /// Start ticking; any previous run is canceled first
    pub fn start(&self) -> TickerFuture {
        let future = TickerFuture::pending();
        let previous = self.future.borrow_mut().replace(future.clone());
        self.handle.start_ticker(self.id);
        if let Some(previous) = previous {
            previous.settle(FutureState::Canceled);
        }
        future
    }

    /// Stop ticking, completing or canceling the current future
    ///
    /// Completion callbacks run after the ticker is stopped, so they may
    /// restart it.
    pub fn stop(&self, canceled: bool) {
        self.handle.stop_ticker(self.id);
        let future = self.future.borrow_mut().take();
        if let Some(future) = future {
            let state = if canceled {
                FutureState::Canceled
            } else {
                FutureState::Complete
            };
            future.settle(state);
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_ticker_active(self.id)
    }

    pub fn id(&self) -> TickerId {
        self.id
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if let Some(future) = self.future.get_mut().take() {
            future.settle(FutureState::Canceled);
        }
        self.handle.remove_ticker(self.id);
    }
}

impl fmt::Debug for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticker")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
