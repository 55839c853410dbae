//! Printer link: line transmit, ack wait and temperature query.
//!
//! ```text
//!   send_line("G1 X10") ──▶ TxChannel ──▶ printer
//!   wait_ack(timeout)   ◀── ReplyQueue ◀── PrinterRoute ◀── printer
//!        │ per reply line: T:/B: ──▶ PrinterParams (wait continues)
//!        │                 ok     ──▶ Ack
//!        └ sliced by ack_poll_slice so a stop is seen promptly
//! ```
//!
//! A job holds the link's session for its whole run. The temperature query
//! only ever *tries* the session, so it never interleaves with a job.

use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_time::{Duration, Instant};
use futures_lite::future::block_on;
use log::{debug, trace};

use super::gcode::{MAX_GCODE_LINE, is_ack, parse_temperatures};
use super::params::PrinterParams;
use crate::error::TransportError;
use crate::transport::route::ReplyQueue;
use crate::transport::tx::TxChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    Ack,
    TimedOut,
    /// The cancel check fired before an ack arrived.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempQuery {
    /// A reply with temperature fields arrived.
    Updated,
    /// No temperature reply within the timeout.
    NoReply,
    /// A job owns the link; nothing was sent.
    Skipped,
}

/// Exclusive use of the printer link for an ack-driven exchange.
pub type Session<'a> = MutexGuard<'a, CriticalSectionRawMutex, ()>;

pub struct PrinterLink {
    tx: Arc<TxChannel>,
    replies: Arc<ReplyQueue>,
    params: Arc<PrinterParams>,
    session: Mutex<CriticalSectionRawMutex, ()>,
    slice: Duration,
}

impl PrinterLink {
    pub fn new(
        tx: Arc<TxChannel>,
        replies: Arc<ReplyQueue>,
        params: Arc<PrinterParams>,
        slice: Duration,
    ) -> Self {
        Self {
            tx,
            replies,
            params,
            session: Mutex::new(()),
            slice,
        }
    }

    /// Wait for and hold the link session.
    pub fn session(&self) -> Session<'_> {
        block_on(self.session.lock())
    }

    pub fn is_in_session(&self) -> bool {
        self.session.try_lock().is_err()
    }

    /// Send one G-code line, adding the terminator.
    pub fn send_line(&self, line: &str) -> Result<(), TransportError> {
        let mut out: heapless::Vec<u8, { MAX_GCODE_LINE + 1 }> = heapless::Vec::new();
        out.extend_from_slice(line.as_bytes())
            .map_err(|_| TransportError::Oversized)?;
        out.push(b'\n').map_err(|_| TransportError::Oversized)?;
        trace!("PRINT: > {}", line);
        self.tx.send(&out)
    }

    /// Send pre-terminated command text as is.
    pub fn send_raw(&self, text: &str) -> Result<(), TransportError> {
        self.tx.send_str(text)
    }

    /// Drop replies left over from earlier exchanges.
    pub fn discard_replies(&self) -> usize {
        self.replies.drain()
    }

    /// Wait for an `ok`, caching any telemetry seen on the way. `cancel`
    /// is checked between slices.
    pub fn wait_ack(&self, timeout: Duration, cancel: &dyn Fn() -> bool) -> AckOutcome {
        let deadline = Instant::now() + timeout;
        loop {
            if cancel() {
                return AckOutcome::Cancelled;
            }
            let now = Instant::now();
            if now >= deadline {
                return AckOutcome::TimedOut;
            }
            let wait = (deadline - now).min(self.slice);
            if let Some(buf) = self.replies.recv_timeout(wait) {
                if self.absorb(&buf).acked {
                    return AckOutcome::Ack;
                }
            }
        }
    }

    /// Ask for temperatures with `M105` unless a job holds the link.
    pub fn query_temperatures(&self, timeout: Duration) -> Result<TempQuery, TransportError> {
        let Ok(_session) = self.session.try_lock() else {
            return Ok(TempQuery::Skipped);
        };
        self.discard_replies();
        self.send_line("M105")?;

        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                debug!("PRINT: no reply to M105");
                return Ok(TempQuery::NoReply);
            }
            if let Some(buf) = self.replies.recv_timeout(deadline - now) {
                if self.absorb(&buf).telemetry {
                    return Ok(TempQuery::Updated);
                }
            }
        }
    }

    fn absorb(&self, buf: &[u8]) -> Absorbed {
        let mut seen = Absorbed::default();
        let text = String::from_utf8_lossy(buf);
        for line in text.lines() {
            trace!("PRINT: < {}", line);
            if let Some(r) = parse_temperatures(line) {
                self.params.apply_reading(r);
                seen.telemetry = true;
            }
            if is_ack(line) {
                seen.acked = true;
            }
        }
        seen
    }
}

#[derive(Default)]
struct Absorbed {
    acked: bool,
    telemetry: bool,
}
