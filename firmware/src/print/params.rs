//! Cached printer parameters.
//!
//! Written by the streamer, the printer link (telemetry replies), the
//! printer command handlers and the poller; read by the query handlers.
//! Everything goes through one critical-section cell so readers always see
//! a consistent snapshot.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use super::gcode::TempReading;
use crate::app::events::RemainingTime;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParamSnapshot {
    /// Last reported nozzle temperature (°C).
    pub nozzle_temp: i32,
    /// Last reported bed temperature (°C).
    pub bed_temp: i32,
    /// Last nozzle setpoint sent.
    pub nozzle_target: i32,
    /// Last bed setpoint sent.
    pub bed_target: i32,
    /// Spool weight (g).
    pub filament_weight: i32,
    /// Job progress, 0–100.
    pub progress: u8,
    pub remaining_secs: u32,
    /// Estimate from the file header at job start.
    pub initial_secs: u32,
}

impl ParamSnapshot {
    pub fn remaining_time(&self) -> RemainingTime {
        RemainingTime::from_secs(self.remaining_secs)
    }
}

pub struct PrinterParams {
    inner: Mutex<CriticalSectionRawMutex, Cell<ParamSnapshot>>,
}

impl PrinterParams {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(ParamSnapshot {
                nozzle_temp: 0,
                bed_temp: 0,
                nozzle_target: 0,
                bed_target: 0,
                filament_weight: 0,
                progress: 0,
                remaining_secs: 0,
                initial_secs: 0,
            })),
        }
    }

    pub fn snapshot(&self) -> ParamSnapshot {
        self.inner.lock(Cell::get)
    }

    pub fn nozzle_temp(&self) -> i32 {
        self.snapshot().nozzle_temp
    }

    pub fn bed_temp(&self) -> i32 {
        self.snapshot().bed_temp
    }

    pub fn filament_weight(&self) -> i32 {
        self.snapshot().filament_weight
    }

    pub fn progress(&self) -> u8 {
        self.snapshot().progress
    }

    pub fn remaining_secs(&self) -> u32 {
        self.snapshot().remaining_secs
    }

    fn update(&self, f: impl FnOnce(&mut ParamSnapshot)) {
        self.inner.lock(|c| {
            let mut s = c.get();
            f(&mut s);
            c.set(s);
        });
    }

    /// Apply whatever fields a reply carried.
    pub(crate) fn apply_reading(&self, r: TempReading) {
        self.update(|s| {
            if let Some(t) = r.nozzle {
                s.nozzle_temp = t;
            }
            if let Some(t) = r.bed {
                s.bed_temp = t;
            }
        });
    }

    pub(crate) fn set_nozzle_target(&self, c: i32) {
        self.update(|s| s.nozzle_target = c);
    }

    pub(crate) fn set_bed_target(&self, c: i32) {
        self.update(|s| s.bed_target = c);
    }

    pub(crate) fn set_filament_weight(&self, g: i32) {
        self.update(|s| s.filament_weight = g);
    }

    /// A job starts: progress back to 0, estimate from the header.
    pub(crate) fn start_job(&self, initial_secs: u32) {
        self.update(|s| {
            s.progress = 0;
            s.initial_secs = initial_secs;
            s.remaining_secs = initial_secs;
        });
    }

    pub(crate) fn set_progress(&self, progress: u8, remaining_secs: u32) {
        self.update(|s| {
            s.progress = progress;
            s.remaining_secs = remaining_secs;
        });
    }
}

impl Default for PrinterParams {
    fn default() -> Self {
        Self::new()
    }
}
