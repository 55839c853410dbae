//! Serialized transmit path of one UART link.
//!
//! ```text
//!   send(bytes)
//!     │ len >= TX_BUFFER_SIZE ──▶ Err(Oversized)     (lock untouched)
//!     │ take lock (bounded)  ──▶ Err(LinkBusy)
//!     │ copy into send buffer
//!     │ start_transmit(buf, TxDone)
//!     │    ├─ Err ──▶ TxDone dropped, lock released, Err(StartFailed)
//!     │    └─ Ok  ──▶ return; lock released on hardware completion
//! ```
//!
//! At most one transmission is in flight per link. Waiters are not queued
//! in FIFO order; whoever wakes first after the release wins.

use std::sync::{Arc, Mutex, PoisonError};

use embassy_time::Duration;
use log::{debug, warn};

use super::uart::{TxDone, UartPort};
use crate::error::TransportError;
use crate::sync::BinarySemaphore;

/// Capacity of the internal send buffer. Payloads must be strictly smaller.
pub const TX_BUFFER_SIZE: usize = 1024;

struct TxInner {
    uart: Box<dyn UartPort>,
    buf: heapless::Vec<u8, TX_BUFFER_SIZE>,
}

pub struct TxChannel {
    name: &'static str,
    lock: Arc<BinarySemaphore>,
    lock_timeout: Duration,
    // Only the transmit-lock holder touches this.
    inner: Mutex<TxInner>,
}

impl TxChannel {
    pub fn new(name: &'static str, uart: Box<dyn UartPort>, lock_timeout: Duration) -> Self {
        Self {
            name,
            lock: Arc::new(BinarySemaphore::new()),
            lock_timeout,
            inner: Mutex::new(TxInner {
                uart,
                buf: heapless::Vec::new(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Queue `data` for transmission on this link.
    pub fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        if data.len() >= TX_BUFFER_SIZE {
            warn!("TX[{}]: {} bytes exceeds send buffer", self.name, data.len());
            return Err(TransportError::Oversized);
        }
        if data.is_empty() {
            return Ok(());
        }
        if self.lock.take_timeout(self.lock_timeout).is_err() {
            warn!("TX[{}]: transmit lock timeout", self.name);
            return Err(TransportError::LinkBusy);
        }

        let done = TxDone::new(Arc::clone(&self.lock));
        let res = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let TxInner { uart, buf } = &mut *inner;
            buf.clear();
            // Length checked above.
            let _ = buf.extend_from_slice(data);
            uart.start_transmit(buf.as_slice(), done)
        };

        match res {
            Ok(()) => {
                debug!("TX[{}]: {} bytes", self.name, data.len());
                Ok(())
            }
            Err(e) => {
                warn!("TX[{}]: start failed: {:?}", self.name, e);
                Err(TransportError::StartFailed)
            }
        }
    }

    pub fn send_str(&self, text: &str) -> Result<(), TransportError> {
        self.send(text.as_bytes())
    }

    /// `true` when no transmission is in flight.
    pub fn is_idle(&self) -> bool {
        self.lock.is_available()
    }
}
