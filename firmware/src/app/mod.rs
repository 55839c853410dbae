//! Application boundary — port traits and the events the core emits.
//!
//! Everything the protocol core needs from the outside world (file store,
//! weight sensor, display, persistent config) is reached through the
//! **port traits** in [`ports`], so every service is testable on the host
//! with in-memory adapters.

pub mod events;
pub mod ports;
