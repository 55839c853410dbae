//! UART seam — non-blocking transmit start plus a completion signal.
//!
//! The [`TxChannel`](super::tx::TxChannel) holds the link's transmit token
//! while a transmission is in flight. The token travels to the UART as a
//! [`TxDone`] and comes back when the hardware reports completion, either
//! via [`TxDone::complete`] from the DMA-complete callback or by dropping
//! the `TxDone` (start failure, adapter teardown).

use std::sync::Arc;

use log::trace;

use crate::sync::BinarySemaphore;

/// Hardware-level transmit failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartError {
    /// The peripheral is not initialised or in a fault state.
    NotReady,
    /// The DMA engine refused the request.
    DmaRejected,
}

/// Byte-oriented UART with DMA transmit.
pub trait UartPort: Send {
    /// Start transmitting `data`. Must not block until completion.
    ///
    /// On success the implementation keeps `done` until the hardware has
    /// shifted out the last byte, then completes it. On error `done` is
    /// dropped, which releases the link immediately.
    fn start_transmit(&mut self, data: &[u8], done: TxDone) -> Result<(), UartError>;
}

/// Transmit-completion token. Releases the link's transmit lock exactly
/// once, when completed or dropped.
pub struct TxDone {
    lock: Arc<BinarySemaphore>,
}

impl TxDone {
    pub(crate) fn new(lock: Arc<BinarySemaphore>) -> Self {
        Self { lock }
    }

    /// Signal that the transmission finished.
    pub fn complete(self) {
        trace!("UART: transmit complete");
        drop(self);
    }
}

impl Drop for TxDone {
    fn drop(&mut self) {
        if !self.lock.give() {
            log::warn!("UART: completion with transmit lock already free");
        }
    }
}

/// A UART that accepts and immediately completes every transmission.
/// Used as the default link when nothing is attached.
pub struct NullUart;

impl UartPort for NullUart {
    fn start_transmit(&mut self, _data: &[u8], done: TxDone) -> Result<(), UartError> {
        done.complete();
        Ok(())
    }
}
