//! PrintBridge controller core library.
//!
//! The serial protocol and transfer engine of a 3D-printer front-end
//! controller: the companion-link command dispatcher, the file-receive
//! state machine with SHA-256 verification, and the ack-driven G-code
//! streamer. Hardware is reached through the port traits in [`app::ports`]
//! and [`transport::uart`]; [`adapters`] carries the host implementations.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod bridge;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod link_state;
pub mod print;
pub mod sync;
pub mod tasks;
pub mod telemetry;
pub mod transfer;
pub mod transport;
