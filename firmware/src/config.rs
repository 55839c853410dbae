//! System configuration parameters
//!
//! Every period, timeout and retry bound used by the protocol core.
//! Values can be overridden from a JSON file on the host build
//! (see [`adapters::config_file`](crate::adapters::config_file)).

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Log verbosity selectable from the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const fn to_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Links ---
    /// Maximum wait for a link's transmit lock (milliseconds)
    pub tx_lock_timeout_ms: u32,

    // --- Dispatcher ---
    /// Command queue wait; doubles as the housekeeping tick (milliseconds)
    pub dispatcher_wait_ms: u32,

    // --- File transfer ---
    /// Delay before acknowledging start-transmission / filename (milliseconds)
    pub ready_delay_ms: u32,
    /// File-data queue wait per receive attempt (milliseconds)
    pub file_wait_ms: u32,
    /// Consecutive empty waits before the sender is declared stalled
    pub stall_limit: u8,
    /// Bounded wait when pushing the end-of-transfer sentinel (milliseconds)
    pub sentinel_send_ms: u32,
    /// Poll period while waiting for the transfer task to end (milliseconds)
    pub teardown_poll_ms: u32,
    /// Number of teardown polls before giving up
    pub teardown_poll_retries: u32,

    // --- Printing ---
    /// Ack wait for standard G-code lines (milliseconds)
    pub ack_timeout_ms: u32,
    /// Ack wait for blocking lines: homing, probing, heat-and-wait (milliseconds)
    pub blocking_ack_timeout_ms: u32,
    /// Slice length of an ack wait between stop checks (milliseconds)
    pub ack_poll_slice_ms: u32,
    /// Poll period while a job is paused (milliseconds)
    pub pause_poll_ms: u32,
    /// Minimum period between remaining-time refreshes (milliseconds)
    pub eta_refresh_ms: u32,
    /// Upper clamp for nozzle setpoints (Celsius)
    pub max_nozzle_temp_c: i32,
    /// Upper clamp for bed setpoints (Celsius)
    pub max_bed_temp_c: i32,

    // --- Telemetry ---
    /// Parameter polling period (milliseconds)
    pub telemetry_interval_ms: u32,
    /// Timeout of an explicit temperature query (milliseconds)
    pub temp_query_timeout_ms: u32,

    // --- Logging ---
    pub log_level: LogLevel,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Links
            tx_lock_timeout_ms: 2000,

            // Dispatcher
            dispatcher_wait_ms: 1000,

            // File transfer
            ready_delay_ms: 100,
            file_wait_ms: 1000,
            stall_limit: 5,
            sentinel_send_ms: 10,
            teardown_poll_ms: 10,
            teardown_poll_retries: 1000, // 10 s total

            // Printing
            ack_timeout_ms: 5000,
            blocking_ack_timeout_ms: 600_000, // 10 min: bed heat-up worst case
            ack_poll_slice_ms: 50,
            pause_poll_ms: 10,
            eta_refresh_ms: 1000,
            max_nozzle_temp_c: 280,
            max_bed_temp_c: 120,

            // Telemetry
            telemetry_interval_ms: 1000,
            temp_query_timeout_ms: 2000,

            log_level: LogLevel::Info,
        }
    }
}

/// Convert a millisecond config field to a timer duration.
pub const fn millis(ms: u32) -> Duration {
    Duration::from_millis(ms as u64)
}

impl SystemConfig {
    /// Range-check every field. Out-of-range values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(10..=60_000).contains(&self.tx_lock_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "tx_lock_timeout_ms must be 10–60000",
            ));
        }
        if !(10..=10_000).contains(&self.dispatcher_wait_ms) {
            return Err(ConfigError::ValidationFailed(
                "dispatcher_wait_ms must be 10–10000",
            ));
        }
        if self.ready_delay_ms > 5000 {
            return Err(ConfigError::ValidationFailed("ready_delay_ms must be 0–5000"));
        }
        if !(10..=60_000).contains(&self.file_wait_ms) {
            return Err(ConfigError::ValidationFailed("file_wait_ms must be 10–60000"));
        }
        if !(1..=50).contains(&self.stall_limit) {
            return Err(ConfigError::ValidationFailed("stall_limit must be 1–50"));
        }
        if self.teardown_poll_ms == 0 || self.teardown_poll_retries == 0 {
            return Err(ConfigError::ValidationFailed(
                "teardown polling must be non-zero",
            ));
        }
        if self.ack_timeout_ms == 0 || self.blocking_ack_timeout_ms < self.ack_timeout_ms {
            return Err(ConfigError::ValidationFailed(
                "blocking_ack_timeout_ms must be >= ack_timeout_ms > 0",
            ));
        }
        if self.ack_poll_slice_ms == 0 || self.pause_poll_ms == 0 {
            return Err(ConfigError::ValidationFailed("poll periods must be non-zero"));
        }
        if !(1..=400).contains(&self.max_nozzle_temp_c) {
            return Err(ConfigError::ValidationFailed("max_nozzle_temp_c must be 1–400"));
        }
        if !(1..=150).contains(&self.max_bed_temp_c) {
            return Err(ConfigError::ValidationFailed("max_bed_temp_c must be 1–150"));
        }
        if !(100..=60_000).contains(&self.telemetry_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "telemetry_interval_ms must be 100–60000",
            ));
        }
        if self.temp_query_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "temp_query_timeout_ms must be non-zero",
            ));
        }
        Ok(())
    }
}
