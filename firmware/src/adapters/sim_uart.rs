//! Simulated UARTs for the host build.

use std::io::Write as _;
use std::sync::{Arc, Mutex, PoisonError};

use crate::transport::uart::{TxDone, UartError, UartPort};

/// Writes every transmission to stdout and completes at once. Stands in for
/// the companion link when the host binary is driven from a terminal.
pub struct StdoutUart;

impl UartPort for StdoutUart {
    fn start_transmit(&mut self, data: &[u8], done: TxDone) -> Result<(), UartError> {
        let mut out = std::io::stdout().lock();
        let res = out.write_all(data).and_then(|()| out.flush());
        done.complete();
        res.map_err(|_| UartError::NotReady)
    }
}

/// Appends every transmission to a shared byte log and completes at once.
#[derive(Clone, Default)]
pub struct RecordingUart {
    log: Arc<Mutex<Vec<u8>>>,
}

impl RecordingUart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything transmitted so far.
    pub fn bytes(&self) -> Vec<u8> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes()).into_owned()
    }

    /// Take and clear the log.
    pub fn take(&self) -> Vec<u8> {
        core::mem::take(&mut *self.log.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl UartPort for RecordingUart {
    fn start_transmit(&mut self, data: &[u8], done: TxDone) -> Result<(), UartError> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
        done.complete();
        Ok(())
    }
}
