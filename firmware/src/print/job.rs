//! Pause/stop requests for the running print job.
//!
//! One atomic byte holds both flags so the streamer reads a consistent pair
//! at each check point. The print service owns it next to the job slot.

use core::sync::atomic::{AtomicU8, Ordering};

const PAUSE: u8 = 1 << 0;
const STOP: u8 = 1 << 1;

#[derive(Debug)]
pub struct JobControl {
    flags: AtomicU8,
}

impl JobControl {
    pub const fn new() -> Self {
        Self {
            flags: AtomicU8::new(0),
        }
    }

    /// Flip pause/resume. Returns `true` if the job is now paused.
    pub fn toggle_pause(&self) -> bool {
        self.flags.fetch_xor(PAUSE, Ordering::AcqRel) & PAUSE == 0
    }

    pub fn set_paused(&self, paused: bool) {
        if paused {
            self.flags.fetch_or(PAUSE, Ordering::AcqRel);
        } else {
            self.flags.fetch_and(!PAUSE, Ordering::AcqRel);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.flags.load(Ordering::Acquire) & PAUSE != 0
    }

    pub fn request_stop(&self) {
        self.flags.fetch_or(STOP, Ordering::AcqRel);
    }

    pub fn stop_requested(&self) -> bool {
        self.flags.load(Ordering::Acquire) & STOP != 0
    }

    /// Clear both flags (job start and cleanup).
    pub fn clear(&self) {
        self.flags.store(0, Ordering::Release);
    }
}

impl Default for JobControl {
    fn default() -> Self {
        Self::new()
    }
}
