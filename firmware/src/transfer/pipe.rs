//! Data path between the companion receive route and the transfer engine.
//!
//! The pipe owns the file-data queue, the "receiving" flag that tells the
//! receive route to divert buffers away from the command queue, and the
//! abort flag raised by transmission-complete. The sentinel message wakes a
//! receiver blocked on an empty queue.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_time::Duration;

use crate::sync::{Queue, TimedOut};
use crate::transport::pool::PooledBuffer;

/// Depth of the file-data queue.
pub const FILE_QUEUE_DEPTH: usize = 4;

#[derive(Debug)]
pub enum TransferMsg {
    /// A received slice of the file body.
    Chunk(PooledBuffer),
    /// End of transfer; sent by the transmission-complete handler.
    Finish,
}

/// The file-data queue had no room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFull;

pub struct TransferPipe {
    data: Queue<TransferMsg, FILE_QUEUE_DEPTH>,
    receiving: AtomicBool,
    abort: AtomicBool,
}

impl TransferPipe {
    pub const fn new() -> Self {
        Self {
            data: Queue::new(),
            receiving: AtomicBool::new(false),
            abort: AtomicBool::new(false),
        }
    }

    /// `true` while a transfer engine is in its Receiving state.
    pub fn is_receiving(&self) -> bool {
        self.receiving.load(Ordering::Acquire)
    }

    pub(crate) fn set_receiving(&self, on: bool) {
        self.receiving.store(on, Ordering::Release);
    }

    pub fn request_abort(&self) {
        self.abort.store(true, Ordering::Release);
    }

    pub fn abort_requested(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    /// Non-blocking hand-off from the receive route. On a full queue the
    /// chunk is dropped, which returns its buffer to the pool.
    pub fn push_chunk(&self, buf: PooledBuffer) -> Result<(), QueueFull> {
        self.data
            .try_send(TransferMsg::Chunk(buf))
            .map_err(|_| QueueFull)
    }

    /// Push the end-of-transfer sentinel, waiting at most `timeout` for room.
    pub fn push_sentinel(&self, timeout: Duration) -> Result<(), TimedOut> {
        self.data.send_timeout(TransferMsg::Finish, timeout)
    }

    pub fn recv(&self, timeout: Duration) -> Option<TransferMsg> {
        self.data.recv_timeout(timeout)
    }

    /// Clear flags and discard stale messages before a new transfer.
    pub(crate) fn reset(&self) -> usize {
        self.abort.store(false, Ordering::Release);
        self.receiving.store(false, Ordering::Release);
        self.data.drain()
    }

    pub fn queued(&self) -> usize {
        self.data.len()
    }
}

impl Default for TransferPipe {
    fn default() -> Self {
        Self::new()
    }
}
