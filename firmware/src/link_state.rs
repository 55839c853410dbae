//! Companion-link and printer-link state, shared by every task.
//!
//! ```text
//!   companion:  Init ──wifi up──▶ Idle ◀──────▶ Busy (transfer / print)
//!   printer:    Init ──▶ Idle ◀──▶ Busy (job)      any ──e-stop──▶ Error
//! ```
//!
//! Both machines sit behind one critical-section mutex so a reader always
//! sees a consistent pair, and check-then-set transitions are atomic.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanionState {
    Init,
    Idle,
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrinterState {
    Init,
    Idle,
    Busy,
    Error,
}

/// Snapshot of both link states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSnapshot {
    pub companion: CompanionState,
    pub printer: PrinterState,
}

pub struct LinkState {
    inner: Mutex<CriticalSectionRawMutex, Cell<LinkSnapshot>>,
}

impl LinkState {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(LinkSnapshot {
                companion: CompanionState::Init,
                printer: PrinterState::Init,
            })),
        }
    }

    pub fn snapshot(&self) -> LinkSnapshot {
        self.inner.lock(Cell::get)
    }

    pub fn companion(&self) -> CompanionState {
        self.snapshot().companion
    }

    pub fn printer(&self) -> PrinterState {
        self.snapshot().printer
    }

    /// Set the companion state, returning the previous one.
    pub fn set_companion(&self, next: CompanionState) -> CompanionState {
        let prev = self.inner.lock(|c| {
            let mut s = c.get();
            let prev = s.companion;
            s.companion = next;
            c.set(s);
            prev
        });
        if prev != next {
            debug!("LINK: companion {:?} -> {:?}", prev, next);
        }
        prev
    }

    /// Set the printer state, returning the previous one.
    pub fn set_printer(&self, next: PrinterState) -> PrinterState {
        let prev = self.inner.lock(|c| {
            let mut s = c.get();
            let prev = s.printer;
            s.printer = next;
            c.set(s);
            prev
        });
        if prev != next {
            debug!("LINK: printer {:?} -> {:?}", prev, next);
        }
        prev
    }

    /// Atomically move the printer to `Busy` unless it is already busy or
    /// latched in `Error`. Returns the blocking state on refusal.
    pub fn try_claim_printer(&self) -> Result<(), PrinterState> {
        let res = self.inner.lock(|c| {
            let mut s = c.get();
            match s.printer {
                PrinterState::Busy | PrinterState::Error => Err(s.printer),
                PrinterState::Init | PrinterState::Idle => {
                    s.printer = PrinterState::Busy;
                    c.set(s);
                    Ok(())
                }
            }
        });
        if res.is_ok() {
            debug!("LINK: printer claimed");
        }
        res
    }

    /// End of a job: printer back to `Idle` unless latched in `Error`.
    /// Returns the resulting printer state.
    pub fn release_printer(&self) -> PrinterState {
        let (prev, next) = self.inner.lock(|c| {
            let mut s = c.get();
            let prev = s.printer;
            if prev != PrinterState::Error {
                s.printer = PrinterState::Idle;
                c.set(s);
            }
            (prev, s.printer)
        });
        if prev != next {
            debug!("LINK: printer {:?} -> {:?}", prev, next);
        }
        next
    }

    /// Companion back to `Idle` unless a transfer holds it `Busy`.
    pub fn release_companion(&self) -> CompanionState {
        let (prev, next) = self.inner.lock(|c| {
            let mut s = c.get();
            let prev = s.companion;
            if prev != CompanionState::Busy {
                s.companion = CompanionState::Idle;
                c.set(s);
            }
            (prev, s.companion)
        });
        if prev != next {
            debug!("LINK: companion {:?} -> {:?}", prev, next);
        }
        next
    }

    /// Return both links to `Idle`.
    pub fn reset_idle(&self) {
        self.inner.lock(|c| {
            c.set(LinkSnapshot {
                companion: CompanionState::Idle,
                printer: PrinterState::Idle,
            });
        });
        debug!("LINK: both links idle");
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}
