//! Companion-link commands: Wi-Fi status and the file upload handshake.
//!
//! ```text
//!   companion                     controller
//!   START_TRANSMISSION ─────────▶ companion Busy
//!                      ◀───────── "STM ok"
//!   SET_FILENAME[a.gcode] ──────▶ spawn TransferEngine
//!                      ◀───────── "Name ok"      (engine Receiving)
//!   <file body bursts> ─────────▶ file-data queue
//!   TRANSMISSION_OVER[sha256] ──▶ abort flag + sentinel, wait for engine,
//!                      ◀───────── "Transfer:ok" | "Transfer:corrupt" | "Transfer:error"
//! ```

use core::cell::RefCell;
use core::fmt::Write as _;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Duration;
use log::{info, warn};

use super::MAX_FILE_NAME;
use super::engine::{TransferDeps, TransferEngine, TransferOutcome, TransferReport, TransferTiming};
use super::hash::{digests_match, hash_stored_file};
use crate::app::events::{FileName, StatusEvent};
use crate::config::{SystemConfig, millis};
use crate::dispatcher::command::{Response, Verb};
use crate::dispatcher::registry::CommandHandler;
use crate::error::{Error, ProtocolError, Result, TransferError};
use crate::link_state::CompanionState;
use crate::sync::sleep;
use crate::tasks::{TaskSlot, TaskSpec, spawn_task};

/// Reply to start-transmission once the controller is ready.
pub const STM_REPLY: &[u8] = b"STM ok\n";

pub struct CompanionService {
    deps: TransferDeps,
    timing: TransferTiming,
    sentinel_wait: Duration,
    teardown_poll: Duration,
    teardown_retries: u32,
    slot: TaskSlot<TransferReport>,
    last_report: Mutex<CriticalSectionRawMutex, RefCell<Option<TransferReport>>>,
}

impl CompanionService {
    /// Verbs served by this handler.
    pub const VERBS: [Verb; 4] = [
        Verb::WifiStatus,
        Verb::StartTransmission,
        Verb::SetFilename,
        Verb::TransmissionComplete,
    ];

    pub fn new(cfg: &SystemConfig, deps: TransferDeps) -> Self {
        Self {
            deps,
            timing: TransferTiming::from_config(cfg),
            sentinel_wait: millis(cfg.sentinel_send_ms),
            teardown_poll: millis(cfg.teardown_poll_ms),
            teardown_retries: cfg.teardown_poll_retries,
            slot: TaskSlot::new("transfer"),
            last_report: Mutex::new(RefCell::new(None)),
        }
    }

    pub fn is_transfer_running(&self) -> bool {
        self.slot.is_running()
    }

    /// Report of the most recently finished transfer.
    pub fn last_report(&self) -> Option<TransferReport> {
        self.last_report.lock(|r| r.borrow().clone())
    }

    // ── Handlers ──────────────────────────────────────────────

    /// `1<ip>` = companion joined a network; anything else = not connected.
    fn wifi_status(&self, args: &str) -> Result<()> {
        let mut chars = args.trim().chars();
        match chars.next() {
            Some('1') => {
                info!("LINK: companion online, ip={}", chars.as_str());
                // A running upload keeps the link busy.
                if self.deps.links.companion() != CompanionState::Busy {
                    self.deps.links.set_companion(CompanionState::Idle);
                }
                Ok(())
            }
            Some(_) => {
                info!("LINK: companion offline");
                self.deps.links.set_companion(CompanionState::Init);
                Ok(())
            }
            None => Err(ProtocolError::MalformedArgument.into()),
        }
    }

    fn start_transmission(&self) -> Result<()> {
        if self.slot.is_running() {
            return Err(Error::AlreadyRunning("transfer"));
        }
        self.deps.links.set_companion(CompanionState::Busy);
        sleep(self.timing.ready_delay);
        self.deps.link.send(STM_REPLY)?;
        Ok(())
    }

    fn set_filename(&self, args: &str) -> Result<()> {
        let name = match validate_file_name(args) {
            Ok(n) => n,
            Err(e) => {
                self.deps.links.set_companion(CompanionState::Idle);
                return Err(e.into());
            }
        };

        let deps = self.deps.clone();
        let timing = self.timing;
        let res = self.slot.start(|| {
            spawn_task(TaskSpec::TRANSFER, move || {
                TransferEngine::new(name, deps, timing).run()
            })
        });
        match res {
            Ok(()) => {
                self.deps.links.set_companion(CompanionState::Busy);
                Ok(())
            }
            // The running transfer owns the link state; leave it alone.
            Err(e @ Error::AlreadyRunning(_)) => Err(e),
            Err(e) => {
                self.deps.links.set_companion(CompanionState::Idle);
                Err(e)
            }
        }
    }

    fn transmission_complete(&self, args: &str, response: &mut Response) -> Result<()> {
        let res = self.finish_transfer(args);
        let verdict = match res {
            Ok(()) => "ok",
            Err(Error::Transfer(TransferError::IntegrityMismatch)) => "corrupt",
            Err(_) => "error",
        };
        let _ = write!(response, "Transfer:{}", verdict);
        res
    }

    /// Tear down the engine, then verify the stored file against `expected`.
    fn finish_transfer(&self, expected: &str) -> Result<()> {
        if self.slot.is_running() {
            self.deps.pipe.request_abort();
            if self.deps.pipe.push_sentinel(self.sentinel_wait).is_err() {
                // The abort flag still ends the engine on its next empty wait.
                warn!("XFER: sentinel not queued, relying on abort flag");
            }
        }
        let was_idle = !self.slot.is_occupied();
        let Some(report) = self.slot.join_within(self.teardown_poll, self.teardown_retries) else {
            self.deps.links.set_companion(CompanionState::Idle);
            return Err(if was_idle {
                TransferError::NotActive
            } else {
                TransferError::TeardownTimeout
            }
            .into());
        };
        self.last_report
            .lock(|r| *r.borrow_mut() = Some(report.clone()));

        match report.outcome {
            TransferOutcome::Completed => {}
            TransferOutcome::Stalled => return Err(TransferError::Stalled.into()),
            TransferOutcome::Failed(e) => return Err(e.into()),
        }
        if expected.trim().is_empty() {
            return Err(ProtocolError::MalformedArgument.into());
        }

        if !digests_match(expected, &report.digest) {
            warn!(
                "XFER: digest mismatch for '{}' (got {}), re-hashing stored file",
                report.file_name, report.digest
            );
            let rehashed = hash_stored_file(self.deps.store.as_ref(), &report.file_name)?;
            if !digests_match(expected, &rehashed) {
                warn!("XFER: '{}' failed verification, file kept", report.file_name);
                return Err(TransferError::IntegrityMismatch.into());
            }
            info!("XFER: re-hash matched");
        }

        info!(
            "XFER: '{}' verified ({} bytes, {} ms)",
            report.file_name, report.bytes, report.elapsed_ms
        );
        self.deps
            .status
            .emit(&StatusEvent::UploadComplete(report.file_name));
        Ok(())
    }
}

impl CommandHandler for CompanionService {
    fn handle(&self, verb: Verb, args: &str, response: Option<&mut Response>) -> Result<()> {
        match (verb, response) {
            (Verb::WifiStatus, _) => self.wifi_status(args),
            (Verb::StartTransmission, _) => self.start_transmission(),
            (Verb::SetFilename, _) => self.set_filename(args),
            (Verb::TransmissionComplete, Some(resp)) => self.transmission_complete(args, resp),
            _ => Err(ProtocolError::UnknownVerb.into()),
        }
    }
}

/// Accept plain names in the store root only.
pub fn validate_file_name(raw: &str) -> core::result::Result<FileName, TransferError> {
    let name = raw.trim();
    let bad = name.is_empty()
        || name.len() > MAX_FILE_NAME
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);
    if bad {
        return Err(TransferError::InvalidName);
    }
    FileName::try_from(name).map_err(|_| TransferError::InvalidName)
}
