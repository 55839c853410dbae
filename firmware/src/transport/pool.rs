//! Fixed pool of receive buffers.
//!
//! ```text
//!   ┌──────────┐ acquire() ┌──────────────┐ submit ┌──────────────┐
//!   │ free list │─────────▶│ DMA target   │───────▶│ consumer     │
//!   │ (Channel) │◀─────────┴──────────────┴────────┴──────────────┘
//!   └──────────┘        drop(PooledBuffer): clear + return
//! ```
//!
//! Each buffer has exactly one owner at a time. Ownership moves with the
//! [`PooledBuffer`] value; dropping it clears the data and puts it back on
//! the free list, so a buffer can never be returned twice or leak while a
//! queue still references it.

use core::ops::Deref;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::Duration;
use futures_lite::future::block_on;
use log::error;

/// Capacity of one receive buffer in bytes.
pub const RX_BUFFER_SIZE: usize = 2048;

/// Buffers per link (one is normally held as the active DMA target).
pub const POOL_SIZE: usize = 6;

pub type RxBuffer = heapless::Vec<u8, RX_BUFFER_SIZE>;

pub struct BufferPool {
    free: Channel<CriticalSectionRawMutex, Box<RxBuffer>, POOL_SIZE>,
    outstanding: AtomicUsize,
}

impl BufferPool {
    pub fn new() -> Arc<Self> {
        let pool = Self {
            free: Channel::new(),
            outstanding: AtomicUsize::new(0),
        };
        for _ in 0..POOL_SIZE {
            // Capacity equals POOL_SIZE, so filling cannot fail.
            let _ = pool.free.try_send(Box::new(RxBuffer::new()));
        }
        Arc::new(pool)
    }

    /// Take a buffer without waiting. Safe on the receive interrupt path.
    pub fn acquire(self: &Arc<Self>) -> Option<PooledBuffer> {
        let buf = self.free.try_receive().ok()?;
        Some(self.wrap(buf))
    }

    /// Take a buffer, waiting at most `timeout` for one to be returned.
    pub fn acquire_timeout(self: &Arc<Self>, timeout: Duration) -> Option<PooledBuffer> {
        let buf = block_on(embassy_time::with_timeout(timeout, self.free.receive())).ok()?;
        Some(self.wrap(buf))
    }

    fn wrap(self: &Arc<Self>, buf: Box<RxBuffer>) -> PooledBuffer {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        PooledBuffer {
            buf: Some(buf),
            pool: Arc::clone(self),
        }
    }

    /// Buffers currently checked out.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Buffers currently on the free list.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub const fn capacity(&self) -> usize {
        POOL_SIZE
    }

    fn release(&self, mut buf: Box<RxBuffer>) {
        buf.clear();
        if self.free.try_send(buf).is_err() {
            error!("POOL: free list overflow, buffer discarded");
        }
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A checked-out receive buffer. Returns itself to the pool on drop.
pub struct PooledBuffer {
    buf: Option<Box<RxBuffer>>,
    pool: Arc<BufferPool>,
}

impl PooledBuffer {
    /// Append received bytes. Returns how many bytes did not fit.
    pub fn fill(&mut self, data: &[u8]) -> usize {
        let Some(buf) = self.buf.as_mut() else {
            return data.len();
        };
        let room = RX_BUFFER_SIZE - buf.len();
        let take = room.min(data.len());
        // `take` never exceeds the remaining capacity.
        let _ = buf.extend_from_slice(&data[..take]);
        data.len() - take
    }

    /// Discard the content, keeping ownership.
    pub fn clear(&mut self) {
        if let Some(buf) = self.buf.as_mut() {
            buf.clear();
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_deref().map_or(&[][..], |b| b.as_slice())
    }
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl core::fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PooledBuffer({} bytes)", self.as_bytes().len())
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release(buf);
        }
    }
}
