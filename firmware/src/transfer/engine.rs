//! File-receive state machine.
//!
//! Flow: set-filename → Init → N × chunk → Receiving → sentinel → Closing
//!
//! ```text
//!   ┌──────┐ file created  ┌───────────┐ Finish / abort / stall ┌─────────┐
//!   │ Init │──────────────▶│ Receiving │───────────────────────▶│ Closing │
//!   └──┬───┘               └───────────┘   write error          └─────────┘
//!      └──────────── create failed ────────────────────────────────▲
//! ```
//!
//! The engine runs on its own task and returns a [`TransferReport`] through
//! the task's join handle. Verification against the sender's digest is the
//! command layer's job; the engine only computes.

use std::sync::Arc;

use embassy_time::{Duration, Instant};
use log::{debug, info, warn};

use super::hash::{ContentHasher, HexDigest};
use super::pipe::{TransferMsg, TransferPipe};
use crate::app::events::{FileName, MachineStatus, StatusEvent};
use crate::app::ports::{FileHandle, FileStore, StatusSink, StorageError};
use crate::config::{SystemConfig, millis};
use crate::link_state::{CompanionState, LinkState};
use crate::sync::sleep;
use crate::transport::tx::TxChannel;

/// Sent once the target file is open and the engine accepts data.
pub const READY_REPLY: &[u8] = b"Name ok\n";

/// Sent when the sender stalls, asking it to restart the upload.
pub const RESET_REPLY: &[u8] = b"reset\n";

// ── Outcome types ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Init,
    Receiving,
    Closing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The sentinel (or abort) closed a healthy transfer.
    Completed,
    /// No data arrived for the configured number of waits.
    Stalled,
    /// The file store failed.
    Failed(StorageError),
}

/// What the engine hands back when its task ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub file_name: FileName,
    pub bytes: u64,
    pub elapsed_ms: u64,
    pub digest: HexDigest,
    pub outcome: TransferOutcome,
}

// ── Collaborators and timing ──────────────────────────────────

/// Shared collaborators of a transfer.
#[derive(Clone)]
pub struct TransferDeps {
    pub store: Arc<dyn FileStore>,
    pub link: Arc<TxChannel>,
    pub pipe: Arc<TransferPipe>,
    pub links: Arc<LinkState>,
    pub status: Arc<dyn StatusSink>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferTiming {
    pub ready_delay: Duration,
    pub file_wait: Duration,
    pub stall_limit: u8,
}

impl TransferTiming {
    pub fn from_config(cfg: &SystemConfig) -> Self {
        Self {
            ready_delay: millis(cfg.ready_delay_ms),
            file_wait: millis(cfg.file_wait_ms),
            stall_limit: cfg.stall_limit,
        }
    }
}

// ── Engine ────────────────────────────────────────────────────

pub struct TransferEngine {
    state: TransferState,
    name: FileName,
    deps: TransferDeps,
    timing: TransferTiming,
    file: Option<Box<dyn FileHandle>>,
    hasher: ContentHasher,
    stalls: u8,
    outcome: TransferOutcome,
    started: Instant,
}

impl TransferEngine {
    pub fn new(name: FileName, deps: TransferDeps, timing: TransferTiming) -> Self {
        Self {
            state: TransferState::Init,
            name,
            deps,
            timing,
            file: None,
            hasher: ContentHasher::new(),
            stalls: 0,
            outcome: TransferOutcome::Completed,
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Drive the state machine to completion.
    pub fn run(mut self) -> TransferReport {
        loop {
            let current = self.state;
            self.state = match current {
                TransferState::Init => self.on_init(),
                TransferState::Receiving => self.on_receiving(),
                TransferState::Closing => return self.close(),
            };
        }
    }

    fn on_init(&mut self) -> TransferState {
        let stale = self.deps.pipe.reset();
        if stale > 0 {
            debug!("XFER: discarded {} stale messages", stale);
        }

        match self.deps.store.create(&self.name) {
            Ok(f) => self.file = Some(f),
            Err(e) => {
                warn!("XFER: cannot create '{}': {}", self.name, e);
                self.outcome = TransferOutcome::Failed(e);
                return TransferState::Closing;
            }
        }
        self.hasher = ContentHasher::new();
        self.stalls = 0;
        self.started = Instant::now();

        // Divert companion traffic before the sender is told to go ahead.
        self.deps.pipe.set_receiving(true);
        self.deps
            .status
            .emit(&StatusEvent::Status(MachineStatus::Receiving));

        sleep(self.timing.ready_delay);
        if let Err(e) = self.deps.link.send(READY_REPLY) {
            warn!("XFER: ready reply not sent: {}", e);
        }
        info!("XFER: receiving '{}'", self.name);
        TransferState::Receiving
    }

    fn on_receiving(&mut self) -> TransferState {
        match self.deps.pipe.recv(self.timing.file_wait) {
            Some(TransferMsg::Chunk(buf)) => {
                self.stalls = 0;
                let Some(file) = self.file.as_mut() else {
                    return TransferState::Closing;
                };
                if let Err(e) = file.write(&buf) {
                    warn!("XFER: write failed after {} bytes: {}", self.hasher.bytes(), e);
                    self.outcome = TransferOutcome::Failed(e);
                    return TransferState::Closing;
                }
                self.hasher.update(&buf);
                TransferState::Receiving
            }
            Some(TransferMsg::Finish) => {
                debug!("XFER: sentinel received");
                TransferState::Closing
            }
            None if self.deps.pipe.abort_requested() => TransferState::Closing,
            None => {
                self.stalls += 1;
                warn!(
                    "XFER: no data ({}/{})",
                    self.stalls, self.timing.stall_limit
                );
                if self.stalls < self.timing.stall_limit {
                    return TransferState::Receiving;
                }
                warn!("XFER: sender stalled, requesting restart");
                if let Err(e) = self.deps.link.send(RESET_REPLY) {
                    warn!("XFER: reset request not sent: {}", e);
                }
                self.outcome = TransferOutcome::Stalled;
                TransferState::Closing
            }
        }
    }

    fn close(mut self) -> TransferReport {
        self.deps.pipe.set_receiving(false);

        if let Some(file) = self.file.take() {
            if let Err(e) = file.close() {
                warn!("XFER: close failed: {}", e);
                if self.outcome == TransferOutcome::Completed {
                    self.outcome = TransferOutcome::Failed(e);
                }
            }
        }

        let bytes = self.hasher.bytes();
        let digest = core::mem::take(&mut self.hasher).finalize();
        let elapsed_ms = self.started.elapsed().as_millis();
        info!(
            "XFER: '{}' closed: {} bytes in {} ms, {:?}",
            self.name, bytes, elapsed_ms, self.outcome
        );

        self.deps.links.set_companion(CompanionState::Idle);
        self.deps
            .status
            .emit(&StatusEvent::Status(MachineStatus::Idle));

        TransferReport {
            file_name: self.name,
            bytes,
            elapsed_ms,
            digest,
            outcome: self.outcome,
        }
    }
}
