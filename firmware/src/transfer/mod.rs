//! File upload from the companion link.
//!
//! | Module    | Role                                                   |
//! |-----------|--------------------------------------------------------|
//! | `pipe`    | file-data queue, receiving flag, abort flag, sentinel  |
//! | `hash`    | rolling SHA-256 and stored-file re-hash                |
//! | `engine`  | Init → Receiving → Closing state machine (own task)    |
//! | `service` | companion verbs: Wi-Fi status, upload handshake        |

pub mod engine;
pub mod hash;
pub mod pipe;
pub mod service;

/// Longest file name accepted from the companion.
pub const MAX_FILE_NAME: usize = 64;

pub use engine::{TransferDeps, TransferEngine, TransferOutcome, TransferReport, TransferTiming};
pub use pipe::{TransferMsg, TransferPipe};
pub use service::CompanionService;
