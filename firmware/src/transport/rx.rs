//! Receive path of one UART link: idle-line handling and buffer hand-off.
//!
//! ```text
//!   DMA ──▶ current buffer ──idle line──▶ on_idle_line()
//!                                            │ swap in a fresh buffer
//!                                            │ (pool empty: reuse current,
//!                                            │  frame dropped, counted)
//!                                            ▼
//!                                     RxRoute::route(filled)
//!                                      ├─ command frames ──▶ dispatcher
//!                                      ├─ file data      ──▶ transfer engine
//!                                      └─ replies        ──▶ print streamer
//! ```
//!
//! Everything on this path is non-blocking: it runs in interrupt context
//! on the target.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::trace;

use super::pool::{BufferPool, PooledBuffer};

/// Decides where a filled receive buffer goes.
pub trait RxRoute: Send + Sync {
    /// Consume `buf`. Must not block; on a full queue, drop the buffer and
    /// record it in `stats`.
    fn route(&self, buf: PooledBuffer, stats: &RxStats);
}

// ── Counters ──────────────────────────────────────────────────

/// Per-link receive counters.
#[derive(Default)]
pub struct RxStats {
    frames: AtomicU32,
    pool_exhausted: AtomicU32,
    queue_full: AtomicU32,
    overflow_bytes: AtomicU32,
    malformed: AtomicU32,
}

impl RxStats {
    pub fn record_queue_full(&self) {
        self.queue_full.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RxStatsSnapshot {
        RxStatsSnapshot {
            frames: self.frames.load(Ordering::Relaxed),
            pool_exhausted: self.pool_exhausted.load(Ordering::Relaxed),
            queue_full: self.queue_full.load(Ordering::Relaxed),
            overflow_bytes: self.overflow_bytes.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxStatsSnapshot {
    pub frames: u32,
    pub pool_exhausted: u32,
    pub queue_full: u32,
    pub overflow_bytes: u32,
    pub malformed: u32,
}

impl RxStatsSnapshot {
    /// Total frames lost for any reason.
    pub fn lost(&self) -> u32 {
        self.pool_exhausted + self.queue_full + self.malformed
    }
}

// ── Channel ───────────────────────────────────────────────────

pub struct RxChannel<R> {
    name: &'static str,
    pool: Arc<BufferPool>,
    current: Mutex<CriticalSectionRawMutex, RefCell<Option<PooledBuffer>>>,
    route: R,
    stats: RxStats,
}

impl<R: RxRoute> RxChannel<R> {
    pub fn new(name: &'static str, pool: Arc<BufferPool>, route: R) -> Self {
        let current = pool.acquire();
        Self {
            name,
            pool,
            current: Mutex::new(RefCell::new(current)),
            route,
            stats: RxStats::default(),
        }
    }

    /// Idle-line interrupt: `data` is what the DMA wrote since the last
    /// boundary.
    pub fn on_idle_line(&self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let filled = self.current.lock(|cell| {
            let mut cur = cell.borrow_mut();
            let mut buf = match cur.take().or_else(|| self.pool.acquire()) {
                Some(b) => b,
                None => {
                    self.stats.pool_exhausted.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            };

            let over = buf.fill(data);
            if over > 0 {
                self.stats
                    .overflow_bytes
                    .fetch_add(over as u32, Ordering::Relaxed);
            }

            if let Some(fresh) = self.pool.acquire() {
                *cur = Some(fresh);
                Some(buf)
            } else {
                // No spare buffer: keep receiving into this one and lose
                // the frame.
                self.stats.pool_exhausted.fetch_add(1, Ordering::Relaxed);
                buf.clear();
                *cur = Some(buf);
                None
            }
        });

        if let Some(buf) = filled {
            self.stats.frames.fetch_add(1, Ordering::Relaxed);
            trace!("RX[{}]: {} bytes", self.name, buf.len());
            self.route.route(buf, &self.stats);
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn stats(&self) -> RxStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    pub fn route(&self) -> &R {
        &self.route
    }
}
