//! Job progress by bytes consumed, and the remaining-time estimate.

use embassy_time::{Duration, Instant};

/// Progress while lines remain to be sent never reaches 100.
const STREAMING_CAP: u8 = 99;

#[derive(Debug, Clone)]
pub struct ProgressTracker {
    size: u64,
    initial_secs: u32,
    progress: u8,
    remaining_secs: u32,
    refresh: Duration,
    last_refresh: Instant,
}

impl ProgressTracker {
    pub fn new(size: u64, initial_secs: u32, refresh: Duration) -> Self {
        Self::starting_at(size, initial_secs, refresh, Instant::now())
    }

    pub fn starting_at(size: u64, initial_secs: u32, refresh: Duration, now: Instant) -> Self {
        Self {
            size,
            initial_secs,
            progress: 0,
            remaining_secs: initial_secs,
            refresh,
            last_refresh: now,
        }
    }

    /// Fold in the bytes consumed so far. Progress never decreases.
    /// Returns `true` when the remaining-time estimate was refreshed.
    pub fn update(&mut self, consumed: u64, now: Instant) -> bool {
        if self.size > 0 {
            let pct = (consumed.saturating_mul(100) / self.size).min(u64::from(STREAMING_CAP));
            self.progress = self.progress.max(pct as u8);
        }

        if now.saturating_duration_since(self.last_refresh) < self.refresh {
            return false;
        }
        self.last_refresh = now;
        if self.progress > 0 && self.initial_secs > 0 {
            self.remaining_secs = estimate_remaining(self.initial_secs, self.progress);
        }
        true
    }

    /// Normal end of job.
    pub fn complete(&mut self) {
        self.progress = 100;
        self.remaining_secs = 0;
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn initial_secs(&self) -> u32 {
        self.initial_secs
    }
}

/// `initial · (100 − progress) / 100`, in whole seconds.
pub fn estimate_remaining(initial_secs: u32, progress: u8) -> u32 {
    let left = u64::from(100u8.saturating_sub(progress));
    (u64::from(initial_secs) * left / 100) as u32
}
