//! Bounded blocking primitives for the controller tasks.
//!
//! Every task in the core is a plain thread that must never wait forever.
//! These wrappers put a timeout on each suspension point by driving the
//! `embassy-sync` futures with `futures-lite::block_on` under an
//! `embassy-time` deadline. Non-blocking variants (`try_*`) are the only
//! ones allowed from the receive interrupt path.
//!
//! ```text
//!  producer ──try_send()──▶ ┌──────────────┐ ──recv_timeout()──▶ consumer
//!                           │ Queue<T, N>  │
//!  producer ──send_timeout()▶└──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Timer, with_timeout};
use futures_lite::future::block_on;

/// Bounded MPMC queue with timeout-bounded blocking operations.
pub struct Queue<T, const N: usize> {
    inner: Channel<CriticalSectionRawMutex, T, N>,
}

impl<T, const N: usize> Queue<T, N> {
    pub const fn new() -> Self {
        Self {
            inner: Channel::new(),
        }
    }

    /// Non-blocking send. Hands the item back when the queue is full.
    pub fn try_send(&self, item: T) -> Result<(), T> {
        self.inner.try_send(item).map_err(|e| match e {
            embassy_sync::channel::TrySendError::Full(item) => item,
        })
    }

    /// Send, waiting at most `timeout` for space. The item is dropped on
    /// timeout.
    pub fn send_timeout(&self, item: T, timeout: Duration) -> Result<(), TimedOut> {
        block_on(with_timeout(timeout, self.inner.send(item))).map_err(|_| TimedOut)
    }

    /// Non-blocking receive.
    pub fn try_recv(&self) -> Option<T> {
        self.inner.try_receive().ok()
    }

    /// Receive, waiting at most `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        block_on(with_timeout(timeout, self.inner.receive())).ok()
    }

    /// Drop everything currently queued.
    pub fn drain(&self) -> usize {
        let mut n = 0;
        while self.inner.try_receive().is_ok() {
            n += 1;
        }
        n
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T, const N: usize> Default for Queue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// A bounded wait expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOut;

/// Binary semaphore: one token that can be taken by one holder and given
/// back from any context, including a completion callback.
pub struct BinarySemaphore {
    token: Channel<CriticalSectionRawMutex, (), 1>,
}

impl BinarySemaphore {
    /// Create the semaphore with its token available.
    pub fn new() -> Self {
        let sem = Self {
            token: Channel::new(),
        };
        sem.give();
        sem
    }

    /// Take the token, waiting at most `timeout`.
    pub fn take_timeout(&self, timeout: Duration) -> Result<(), TimedOut> {
        block_on(with_timeout(timeout, self.token.receive())).map_err(|_| TimedOut)
    }

    /// Take the token without waiting.
    pub fn try_take(&self) -> bool {
        self.token.try_receive().is_ok()
    }

    /// Return the token. Returns `false` if the token was already available.
    pub fn give(&self) -> bool {
        self.token.try_send(()).is_ok()
    }

    pub fn is_available(&self) -> bool {
        !self.token.is_empty()
    }
}

impl Default for BinarySemaphore {
    fn default() -> Self {
        Self::new()
    }
}

/// Block the calling task for `d`.
pub fn sleep(d: Duration) {
    block_on(Timer::after(d));
}
